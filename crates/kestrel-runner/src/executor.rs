use crate::guard::SessionGuard;
use crate::{Error, Result};
use chrono::Utc;
use futures::FutureExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use kestrel_core::{
    BrowserSession, ExecutorConfig, FailureKind, RoleQuery, RunState, Scenario, ScenarioReport,
    SessionError, SessionProvider, SessionResult, Step, StepFailure, StepOutcome, StepResult,
};
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use url::Url;

/// Why a single step failed, before it is tied to a scenario and index
#[derive(Debug)]
struct StepError {
    kind: FailureKind,
    message: String,
}

impl StepError {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of running several scenarios
#[derive(Debug)]
pub struct RunSummary {
    /// Reports in scenario input order
    pub reports: Vec<ScenarioReport>,
    /// Infrastructure failure that stopped the run, if any
    pub aborted: Option<Error>,
    /// Scenarios never started or cancelled because the run was aborted
    pub not_run: Vec<String>,
}

impl RunSummary {
    pub fn passed(&self) -> bool {
        self.aborted.is_none() && self.reports.iter().all(|r| r.passed())
    }
}

/// Runs scenarios against sessions handed out by a provider
pub struct Executor<P> {
    provider: P,
    config: ExecutorConfig,
    teardown: TaskTracker,
}

impl<P: SessionProvider> Executor<P> {
    pub fn new(provider: P, config: ExecutorConfig) -> Self {
        Self {
            provider,
            config,
            teardown: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Wait until every session closed in the background has finished
    ///
    /// Runs that were cancelled hand their session close to a background
    /// task; callers that cancel `run` themselves await this before exiting.
    pub async fn wait_for_teardown(&self) {
        if self.teardown.is_empty() {
            return;
        }
        tracing::debug!("Waiting for {} session teardown(s)", self.teardown.len());
        self.teardown.close();
        self.teardown.wait().await;
        self.teardown.reopen();
    }

    /// Run one scenario in a fresh session
    ///
    /// Steps run in order and stop at the first failure; the remaining steps
    /// are reported as skipped. The session is released on every path.
    /// Only a failure to acquire the session is returned as an error.
    pub async fn run(&self, scenario: Scenario) -> Result<ScenarioReport> {
        let span = tracing::info_span!("scenario", name = %scenario.name());
        self.run_scenario(scenario).instrument(span).await
    }

    async fn run_scenario(&self, scenario: Scenario) -> Result<ScenarioReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut state = RunState::NotStarted;

        tracing::info!(
            "Running scenario '{}' ({} steps)",
            scenario.name(),
            scenario.steps().len()
        );

        let session = self
            .provider
            .acquire()
            .await
            .map_err(|source| Error::Infrastructure {
                scenario: scenario.name().to_string(),
                source,
            })?;
        let mut guard = SessionGuard::new(scenario.name(), session, self.teardown.clone());
        state = transition(scenario.name(), state, state.start());

        let total = scenario.steps().len();
        let mut results = Vec::with_capacity(total);
        let mut artifacts = Vec::new();
        let mut failed = false;

        for (index, step) in scenario.steps().iter().enumerate() {
            if failed {
                tracing::debug!("[{}/{}] skipped: {}", index + 1, total, step);
                results.push(StepResult {
                    index,
                    step: step.clone(),
                    outcome: StepOutcome::Skipped,
                    elapsed_ms: 0,
                });
                continue;
            }

            let step_clock = Instant::now();
            let outcome = match self.execute_step(guard.session(), step).await {
                Ok(artifact) => {
                    tracing::debug!("[{}/{}] passed: {}", index + 1, total, step);
                    artifacts.extend(artifact);
                    StepOutcome::Passed
                }
                Err(e) => {
                    tracing::info!(
                        "[{}/{}] failed: {} ({}: {})",
                        index + 1,
                        total,
                        step,
                        e.kind,
                        e.message
                    );
                    failed = true;
                    StepOutcome::Failed(StepFailure::new(
                        scenario.name(),
                        index,
                        e.kind,
                        e.message,
                    ))
                }
            };

            results.push(StepResult {
                index,
                step: step.clone(),
                outcome,
                elapsed_ms: elapsed_ms(step_clock),
            });
        }

        guard.release().await;

        let report = ScenarioReport::new(scenario, results, artifacts, started_at, elapsed_ms(clock));
        state = transition(report.scenario.name(), state, state.finish(report.verdict));
        tracing::info!(
            "Scenario '{}' finished: {} ({:?})",
            report.scenario.name(),
            report.verdict,
            state
        );

        Ok(report)
    }

    /// Run scenarios with at most `concurrency` sessions open at once
    ///
    /// Reports come back in input order. An infrastructure error stops the
    /// run: nothing further is started, runs that already finished are still
    /// reported, the rest are cancelled. Returns only after every cancelled
    /// run's session has been closed.
    pub async fn run_all(&self, scenarios: Vec<Scenario>, concurrency: usize) -> RunSummary {
        let names: Vec<String> = scenarios.iter().map(|s| s.name().to_string()).collect();
        let mut slots: Vec<Option<ScenarioReport>> = names.iter().map(|_| None).collect();
        let mut queue = scenarios.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut aborted: Option<(usize, Error)> = None;

        loop {
            while aborted.is_none() && in_flight.len() < concurrency.max(1) {
                match queue.next() {
                    Some((index, scenario)) => {
                        in_flight.push(async move { (index, self.run(scenario).await) })
                    }
                    None => break,
                }
            }

            let next = if aborted.is_some() {
                // Collect runs that are already complete, cancel the others
                match in_flight.next().now_or_never() {
                    Some(next) => next,
                    None => break,
                }
            } else {
                in_flight.next().await
            };

            match next {
                Some((index, Ok(report))) => slots[index] = Some(report),
                Some((index, Err(e))) => {
                    tracing::error!("{}", e);
                    if aborted.is_none() {
                        aborted = Some((index, e));
                    }
                }
                None => break,
            }
        }

        let cancelled = in_flight.len();
        drop(in_flight);
        if cancelled > 0 {
            tracing::warn!("Cancelled {} scenario(s) still in flight", cancelled);
        }
        self.wait_for_teardown().await;

        let aborted_index = aborted.as_ref().map(|(index, _)| *index);
        let not_run = names
            .into_iter()
            .enumerate()
            .filter(|(index, _)| slots[*index].is_none() && Some(*index) != aborted_index)
            .map(|(_, name)| name)
            .collect();

        RunSummary {
            reports: slots.into_iter().flatten().collect(),
            aborted: aborted.map(|(_, e)| e),
            not_run,
        }
    }

    async fn execute_step(
        &self,
        session: &mut dyn BrowserSession,
        step: &Step,
    ) -> std::result::Result<Option<PathBuf>, StepError> {
        match step {
            Step::Navigate { url } => {
                let target = self
                    .config
                    .resolve_url(url)
                    .map_err(|e| StepError::new(FailureKind::Navigation, e.to_string()))?;
                let limit = self.config.navigation_timeout;

                // A page load that never finishes is a navigation failure
                self.bounded("navigate", limit, session.navigate(&target, limit))
                    .await
                    .map_err(|e| StepError::new(FailureKind::Navigation, e.message))?
                    .map_err(|e| {
                        StepError::new(FailureKind::Navigation, format!("{}: {}", target, e))
                    })?;
                Ok(None)
            }
            Step::AssertUrl { expected } => {
                let expected = self
                    .config
                    .resolve_url(expected)
                    .map_err(|e| StepError::new(FailureKind::Assertion, e.to_string()))?;
                self.await_url(session, &expected).await?;
                Ok(None)
            }
            Step::AssertVisible { role, name, exact } => {
                let query = RoleQuery {
                    role: role.clone(),
                    name: name.clone(),
                    exact: *exact,
                };
                let limit = self.config.assertion_timeout;

                let visible = self
                    .bounded("wait_for_role", limit, session.wait_for_role(&query, limit))
                    .await?
                    .map_err(session_failure)?;
                if !visible {
                    return Err(StepError::new(
                        FailureKind::Assertion,
                        format!(
                            "no visible element with {} within {}ms",
                            query,
                            limit.as_millis()
                        ),
                    ));
                }
                Ok(None)
            }
            Step::Screenshot { path } => {
                let path = self.config.artifact_path(path);
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        StepError::new(
                            FailureKind::Io,
                            format!("cannot create {}: {}", parent.display(), e),
                        )
                    })?;
                }

                let limit = self.config.navigation_timeout;
                self.bounded("screenshot", limit, session.capture_screenshot(&path, limit))
                    .await?
                    .map_err(|e| match e {
                        SessionError::Timeout { .. } => {
                            StepError::new(FailureKind::Timeout, e.to_string())
                        }
                        _ => StepError::new(
                            FailureKind::Io,
                            format!("cannot write {}: {}", path.display(), e),
                        ),
                    })?;
                tracing::debug!("Screenshot saved to {}", path.display());
                Ok(Some(path))
            }
        }
    }

    /// Poll the current URL until it equals `expected` or the assertion
    /// timeout runs out
    async fn await_url(
        &self,
        session: &mut dyn BrowserSession,
        expected: &Url,
    ) -> std::result::Result<(), StepError> {
        let limit = self.config.assertion_timeout;
        let deadline = Instant::now() + limit;

        loop {
            let current = self
                .bounded("current_url", limit, session.current_url())
                .await?
                .map_err(session_failure)?;

            if urls_match(&current, expected) {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(StepError::new(
                    FailureKind::Assertion,
                    format!(
                        "expected URL {} within {}ms, last saw {}",
                        expected,
                        limit.as_millis(),
                        current
                    ),
                ));
            }

            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    /// Give a session call its step timeout plus the grace period
    async fn bounded<T, F>(
        &self,
        operation: &'static str,
        limit: Duration,
        call: F,
    ) -> std::result::Result<SessionResult<T>, StepError>
    where
        F: Future<Output = SessionResult<T>>,
    {
        let window = limit + self.config.grace_period;
        tokio::time::timeout(window, call).await.map_err(|_| {
            StepError::new(
                FailureKind::Timeout,
                format!("{} did not return within {}ms", operation, window.as_millis()),
            )
        })
    }
}

fn session_failure(error: SessionError) -> StepError {
    match error {
        SessionError::Timeout { .. } => StepError::new(FailureKind::Timeout, error.to_string()),
        SessionError::Io(_) => StepError::new(FailureKind::Io, error.to_string()),
        _ => StepError::new(FailureKind::Navigation, error.to_string()),
    }
}

fn urls_match(current: &str, expected: &Url) -> bool {
    match Url::parse(current) {
        Ok(current) => &current == expected,
        Err(_) => current == expected.as_str(),
    }
}

fn transition(scenario: &str, from: RunState, to: Option<RunState>) -> RunState {
    match to {
        Some(next) => {
            tracing::trace!("Scenario '{}': {:?} -> {:?}", scenario, from, next);
            next
        }
        None => {
            tracing::warn!("Scenario '{}': ignoring transition out of {:?}", scenario, from);
            from
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
