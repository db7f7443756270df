use crate::executor::RunSummary;
use console::{StyledObject, style};
use kestrel_core::{FailureKind, ScenarioReport, StepOutcome};
use serde::Serialize;
use std::io::{self, Write};

/// Process exit status derived from scenario verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure(FailureKind),
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure(kind) => kind.exit_code(),
        }
    }

    /// Exit status of a single report
    pub fn of(report: &ScenarioReport) -> Self {
        match report.first_failure() {
            Some(failure) => ExitStatus::Failure(failure.kind),
            None => ExitStatus::Success,
        }
    }

    /// First failure in scenario input order, or success
    pub fn of_run(run: &RunSummary) -> Self {
        run.reports
            .iter()
            .map(Self::of)
            .find(|status| *status != ExitStatus::Success)
            .or_else(|| {
                run.aborted
                    .as_ref()
                    .map(|_| ExitStatus::Failure(FailureKind::Infrastructure))
            })
            .unwrap_or(ExitStatus::Success)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReportFormat {
    Pretty,
    Json,
}

#[derive(Serialize)]
struct RunDocument<'a> {
    reports: &'a [ScenarioReport],
    aborted: Option<String>,
    not_run: &'a [String],
    exit_code: i32,
}

/// Writes step-by-step results and turns verdicts into exit codes
pub struct Reporter<W> {
    out: W,
    format: ReportFormat,
    styled: bool,
}

impl Reporter<io::Stdout> {
    /// Report to stdout, styled when the terminal supports colours
    pub fn stdout(format: ReportFormat) -> Self {
        Self {
            out: io::stdout(),
            format,
            styled: console::colors_enabled(),
        }
    }
}

impl<W: Write> Reporter<W> {
    /// Report to any writer, without terminal styling
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self {
            out,
            format,
            styled: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print one scenario's results and return its exit status
    pub fn summarize(&mut self, report: &ScenarioReport) -> ExitStatus {
        let status = ExitStatus::of(report);
        let written = match self.format {
            ReportFormat::Pretty => self.write_pretty(report, status),
            ReportFormat::Json => self.write_json(report),
        };
        self.warn_on_error(written);
        status
    }

    /// Print every report of a run plus totals
    pub fn summarize_run(&mut self, run: &RunSummary) -> ExitStatus {
        let status = ExitStatus::of_run(run);
        let written = match self.format {
            ReportFormat::Pretty => self.write_run_pretty(run, status),
            ReportFormat::Json => self.write_json(&RunDocument {
                reports: &run.reports,
                aborted: run.aborted.as_ref().map(|e| e.to_string()),
                not_run: &run.not_run,
                exit_code: status.code(),
            }),
        };
        self.warn_on_error(written);
        status
    }

    fn write_pretty(&mut self, report: &ScenarioReport, status: ExitStatus) -> io::Result<()> {
        let total = report.results.len();

        writeln!(
            self.out,
            "\n{} {}",
            self.paint(style("Scenario:").blue().bold()),
            self.paint(style(report.scenario.name()).bold())
        )?;
        if let Some(description) = report.scenario.description() {
            writeln!(self.out, "  {}", self.paint(style(description).dim()))?;
        }

        for result in &report.results {
            let position = format!("[{}/{}]", result.index + 1, total);
            match &result.outcome {
                StepOutcome::Passed => writeln!(
                    self.out,
                    "  {} {} {} ({}ms)",
                    self.paint(style("✓").green()),
                    position,
                    result.step,
                    result.elapsed_ms
                )?,
                StepOutcome::Failed(failure) => {
                    writeln!(
                        self.out,
                        "  {} {} {} ({}ms)",
                        self.paint(style("✗").red()),
                        position,
                        result.step,
                        result.elapsed_ms
                    )?;
                    writeln!(
                        self.out,
                        "      {}: {}",
                        self.paint(style(failure.kind.as_str()).red()),
                        failure.message
                    )?;
                }
                StepOutcome::Skipped => writeln!(
                    self.out,
                    "  {} {} {} (skipped)",
                    self.paint(style("-").dim()),
                    position,
                    result.step
                )?,
            }
        }

        for artifact in &report.artifacts {
            writeln!(self.out, "  screenshot: {}", artifact.display())?;
        }

        let verdict = match status {
            ExitStatus::Success => self.paint(style(report.verdict.to_string()).green().bold()),
            ExitStatus::Failure(_) => self.paint(style(report.verdict.to_string()).red().bold()),
        };
        writeln!(
            self.out,
            "  {} {} in {}ms (exit code {})",
            verdict,
            report.scenario.name(),
            report.elapsed_ms,
            status.code()
        )
    }

    fn write_run_pretty(&mut self, run: &RunSummary, status: ExitStatus) -> io::Result<()> {
        for report in &run.reports {
            let report_status = ExitStatus::of(report);
            self.write_pretty(report, report_status)?;
        }

        if let Some(error) = &run.aborted {
            writeln!(
                self.out,
                "\n{} {}",
                self.paint(style("Aborted:").red().bold()),
                error
            )?;
        }
        if !run.not_run.is_empty() {
            writeln!(self.out, "  not run: {}", run.not_run.join(", "))?;
        }

        let passed = run.reports.iter().filter(|r| r.passed()).count();
        let failed = run.reports.len() - passed + usize::from(run.aborted.is_some());
        let total = run.reports.len() + usize::from(run.aborted.is_some()) + run.not_run.len();
        writeln!(
            self.out,
            "\n{} scenario(s): {} passed, {} failed, {} not run (exit code {})",
            total,
            passed,
            failed,
            run.not_run.len(),
            status.code()
        )
    }

    fn write_json<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.out, value)?;
        writeln!(self.out)
    }

    fn paint<D>(&self, object: StyledObject<D>) -> StyledObject<D> {
        object.force_styling(self.styled)
    }

    fn warn_on_error(&self, written: io::Result<()>) {
        if let Err(e) = written {
            tracing::warn!("Failed to write report: {}", e);
        }
    }
}
