use crate::{Error, LaunchOptions, Result, ScratchProfile};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use kestrel_core::{BrowserSession, RoleQuery, SessionError, SessionResult};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// Lists accessible names of visible elements with a role; evaluates to a string array
const ROLE_QUERY_JS: &str = include_str!("role_query.js");

/// One isolated Chrome instance driven over the DevTools protocol
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    poll_interval: Duration,
    // Held until close so the user-data dir outlives the browser process
    _profile: ScratchProfile,
}

impl ChromiumSession {
    /// Start Chrome with a fresh profile and open a blank page
    pub async fn launch(
        chrome: &Path,
        options: &LaunchOptions,
        poll_interval: Duration,
    ) -> Result<Self> {
        let profile = ScratchProfile::create()?;
        let config = options.browser_config(chrome, profile.path())?;

        tracing::debug!("Launching Chrome: {}", chrome.display());
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))?;

        // The handler drives every CDP exchange and must run before any command
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(e.into());
            }
        };
        tracing::info!("Chrome session ready");

        Ok(Self {
            browser,
            page,
            handler_task,
            poll_interval,
            _profile: profile,
        })
    }

    /// Accessible names of the visible elements carrying `role`
    async fn names_with_role(&self, role: &str) -> Result<Vec<String>> {
        let args = serde_json::to_string(&[role]).map_err(|e| Error::Cdp(e.to_string()))?;
        let mut params = EvaluateParams::new(format!("({}).apply(null, {})", ROLE_QUERY_JS, args));
        params.return_by_value = Some(true);

        let result = self.page.evaluate_expression(params).await?;
        result
            .into_value::<Vec<String>>()
            .map_err(|e| Error::Cdp(format!("Unexpected role query result: {}", e)))
    }

    async fn query_role(&self, query: &RoleQuery) -> Result<bool> {
        let names = self.names_with_role(&query.role).await?;
        Ok(names.iter().any(|name| query.matches_name(name)))
    }
}

/// Bound a CDP call, reporting an overrun as a session timeout
async fn within<T>(
    operation: &'static str,
    after: Duration,
    call: impl Future<Output = Result<T>>,
) -> SessionResult<T> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => result.map_err(SessionError::from),
        Err(_) => Err(SessionError::Timeout { operation, after }),
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> SessionResult<()> {
        tracing::debug!("Navigating to {}", url);
        within("navigate", timeout, async {
            self.page
                .goto(url.as_str())
                .await
                .map_err(|e| Error::Cdp(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            SessionError::Protocol(message) => SessionError::Navigation(message),
            other => other,
        })
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        let url = self.page.url().await.map_err(Error::from)?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn wait_for_role(&mut self, query: &RoleQuery, timeout: Duration) -> SessionResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            // Evaluation errors during a page transition are retried until the deadline
            match within("assert_visible", remaining, self.query_role(query)).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(SessionError::Timeout { .. }) => return Ok(false),
                Err(e) => tracing::debug!("Role query failed, retrying: {}", e),
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }

    async fn capture_screenshot(&mut self, path: &Path, timeout: Duration) -> SessionResult<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        let png = within("screenshot", timeout, async {
            Ok(self.page.screenshot(params).await?)
        })
        .await?;

        tokio::fs::write(path, &png).await?;
        tracing::debug!("Wrote {} bytes to {}", png.len(), path.display());
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> SessionResult<()> {
        let closed = self.browser.close().await.map_err(Error::from);
        if closed.is_ok() {
            if let Err(e) = self.browser.wait().await {
                tracing::debug!("Waiting for Chrome to exit failed: {}", e);
            }
        } else if let Some(Err(e)) = self.browser.kill().await {
            tracing::warn!("Failed to kill Chrome: {}", e);
        }
        self.handler_task.abort();
        tracing::debug!("Chrome session closed");

        closed.map(|_| ()).map_err(SessionError::from)
    }
}
