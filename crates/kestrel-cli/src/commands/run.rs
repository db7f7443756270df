use crate::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use kestrel_browser::{ChromiumProvider, LaunchOptions};
use kestrel_core::config::DEFAULT_BASE_URL;
use kestrel_core::{ExecutorConfig, ScenarioLoader, ScenarioSet};
use kestrel_runner::{Executor, Reporter};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for a scenario run, from flags or the environment
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Base URL relative scenario URLs resolve against
    #[arg(long, env = "KESTREL_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Seconds a page load may take
    #[arg(long, env = "KESTREL_NAVIGATION_TIMEOUT", default_value_t = 30, value_name = "SECS")]
    pub navigation_timeout: u64,

    /// Seconds a URL or visibility assertion may take to become true
    #[arg(long, env = "KESTREL_ASSERTION_TIMEOUT", default_value_t = 5, value_name = "SECS")]
    pub assertion_timeout: u64,

    /// Directory relative screenshot paths are written under
    #[arg(long, env = "KESTREL_ARTIFACTS_DIR", default_value = ".")]
    pub artifacts_dir: PathBuf,

    /// Number of scenarios run at the same time, each in its own browser
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Path to the Chrome or Chromium executable
    #[arg(long, env = "CHROME")]
    pub chrome_path: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chrome sandbox (needed as root in most containers)
    #[arg(long)]
    pub no_sandbox: bool,
}

impl RunOptions {
    pub fn executor_config(&self) -> Result<ExecutorConfig> {
        let config = ExecutorConfig::new(&self.base_url)
            .with_context(|| format!("Invalid --base-url {}", self.base_url))?
            .with_navigation_timeout(Duration::from_secs(self.navigation_timeout))
            .with_assertion_timeout(Duration::from_secs(self.assertion_timeout))
            .with_artifacts_dir(self.artifacts_dir.clone());
        Ok(config)
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            chrome_path: self.chrome_path.clone(),
            headless: !self.headed,
            no_sandbox: self.no_sandbox,
            request_timeout: Duration::from_secs(self.navigation_timeout),
            ..LaunchOptions::default()
        }
    }
}

/// Load, execute and report the given scenarios; returns the process exit code
pub fn execute(inputs: &[String], options: &RunOptions, format: OutputFormat) -> Result<i32> {
    let config = options.executor_config()?;
    let scenarios = ScenarioLoader::load_all(inputs)?;
    let set = ScenarioSet::new(scenarios, &config.artifacts_dir)?;
    tracing::info!(
        "Running {} scenario(s) against {}",
        set.len(),
        config.base_url
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let provider = ChromiumProvider::new(options.launch_options(), config.poll_interval);
    let executor = Executor::new(provider, config);

    let spinner = progress_spinner(set.len(), format);
    let run = runtime.block_on(executor.run_all(set.into_inner(), usize::from(options.concurrency)));
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let mut reporter = Reporter::stdout(format.into());
    let status = reporter.summarize_run(&run);
    Ok(status.code())
}

/// Spinner on stderr while several scenarios run in pretty mode
fn progress_spinner(count: usize, format: OutputFormat) -> Option<ProgressBar> {
    if count < 2 || format != OutputFormat::Pretty {
        return None;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Running {} scenarios", count));
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}
