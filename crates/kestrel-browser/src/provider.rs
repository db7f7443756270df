use crate::{ChromeFinder, ChromiumSession, LaunchOptions};
use async_trait::async_trait;
use kestrel_core::{BrowserSession, SessionError, SessionProvider, SessionResult};
use std::path::PathBuf;
use std::time::Duration;

/// Launches a separate headless Chrome for every acquired session
pub struct ChromiumProvider {
    options: LaunchOptions,
    poll_interval: Duration,
}

impl ChromiumProvider {
    pub fn new(options: LaunchOptions, poll_interval: Duration) -> Self {
        Self {
            options,
            poll_interval,
        }
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }

    fn chrome_path(&self) -> SessionResult<PathBuf> {
        ChromeFinder::new(self.options.chrome_path.clone())
            .find()
            .map_err(|e| SessionError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl SessionProvider for ChromiumProvider {
    async fn acquire(&self) -> SessionResult<Box<dyn BrowserSession>> {
        let chrome = self.chrome_path()?;
        let session = ChromiumSession::launch(&chrome, &self.options, self.poll_interval)
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        Ok(Box::new(session))
    }
}
