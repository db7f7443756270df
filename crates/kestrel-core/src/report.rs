use crate::scenario::{Scenario, Step};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Category of a failed step or run
///
/// Each category maps to its own process exit code so callers can tell
/// infrastructure trouble apart from application behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Navigation,
    Assertion,
    Io,
    Timeout,
    Infrastructure,
}

impl FailureKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            FailureKind::Assertion => 10,
            FailureKind::Navigation => 11,
            FailureKind::Io => 12,
            FailureKind::Timeout => 13,
            FailureKind::Infrastructure => 20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Navigation => "navigation error",
            FailureKind::Assertion => "assertion failed",
            FailureKind::Io => "I/O error",
            FailureKind::Timeout => "timeout",
            FailureKind::Infrastructure => "infrastructure error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a step failed, with enough context to reproduce it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub scenario: String,
    pub step_index: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl StepFailure {
    pub fn new(
        scenario: impl Into<String>,
        step_index: usize,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            step_index,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in '{}' step {}: {}",
            self.kind, self.scenario, self.step_index, self.message
        )
    }
}

impl std::error::Error for StepFailure {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Passed,
    Failed(StepFailure),
    /// Not attempted because an earlier step failed
    Skipped,
}

impl StepOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, StepOutcome::Passed)
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match self {
            StepOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub index: usize,
    pub step: Step,
    pub outcome: StepOutcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

/// Outcome of one scenario run
///
/// Holds exactly one result per scenario step, in step order.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub results: Vec<StepResult>,
    pub verdict: Verdict,
    /// Screenshots written during the run
    pub artifacts: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    /// Assemble a report, deriving the verdict from the results
    pub fn new(
        scenario: Scenario,
        results: Vec<StepResult>,
        artifacts: Vec<PathBuf>,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        let verdict = if results.iter().all(|r| r.outcome.is_passed()) {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        Self {
            scenario,
            results,
            verdict,
            artifacts,
            started_at,
            elapsed_ms,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// The step failure that ended the run, if any
    pub fn first_failure(&self) -> Option<&StepFailure> {
        self.results.iter().find_map(|r| r.outcome.failure())
    }

    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == StepOutcome::Skipped)
            .count()
    }
}

/// Lifecycle of a single scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Passed,
    Failed,
}

impl RunState {
    /// Move to `Running`; only valid from `NotStarted`
    pub fn start(self) -> Option<RunState> {
        match self {
            RunState::NotStarted => Some(RunState::Running),
            _ => None,
        }
    }

    /// Move to a terminal state; only valid from `Running`
    pub fn finish(self, verdict: Verdict) -> Option<RunState> {
        match (self, verdict) {
            (RunState::Running, Verdict::Pass) => Some(RunState::Passed),
            (RunState::Running, Verdict::Fail) => Some(RunState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Passed | RunState::Failed)
    }
}
