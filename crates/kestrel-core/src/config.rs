use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Base URL of the application under test when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Upper bound for a page load
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for URL and visibility assertions to become true
pub const DEFAULT_ASSERTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between URL checks while an assertion is pending
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Extra time a session call gets beyond its step timeout before it is
/// treated as hung
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Settings shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub base_url: Url,
    pub navigation_timeout: Duration,
    pub assertion_timeout: Duration,
    pub poll_interval: Duration,
    pub grace_period: Duration,
    /// Directory relative screenshot paths are written under
    pub artifacts_dir: PathBuf,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            assertion_timeout: DEFAULT_ASSERTION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
            artifacts_dir: PathBuf::from("."),
        }
    }
}

impl ExecutorConfig {
    /// Create a configuration targeting `base_url` with default timeouts
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_url(base_url)?,
            ..Self::default()
        })
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_assertion_timeout(mut self, timeout: Duration) -> Self {
        self.assertion_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Resolve a scenario URL (absolute, or relative to the base URL)
    pub fn resolve_url(&self, target: &str) -> Result<Url> {
        self.base_url.join(target).map_err(|source| Error::Url {
            url: target.to_string(),
            source,
        })
    }

    /// Resolve a screenshot path against the artifacts directory
    pub fn artifact_path(&self, path: &Path) -> PathBuf {
        resolve_artifact(&self.artifacts_dir, path)
    }
}

pub(crate) fn resolve_artifact(artifacts_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        artifacts_dir.join(path)
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| Error::Url {
        url: url.to_string(),
        source,
    })
}
