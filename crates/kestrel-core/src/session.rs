//! Browser session capability
//!
//! The executor drives pages only through these traits, so any automation
//! binding (CDP, WebDriver, a scripted fake) can stand behind them.

use crate::scenario::RoleQuery;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("{operation} did not complete within {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Session could not be acquired: {0}")]
    Unavailable(String),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// An isolated browser context used by exactly one scenario run
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and wait for the navigation to settle
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> SessionResult<()>;

    /// URL of the current page after redirects
    async fn current_url(&mut self) -> SessionResult<String>;

    /// Wait until an element matching `query` is visible
    ///
    /// Returns `Ok(false)` when nothing matching became visible in time.
    async fn wait_for_role(&mut self, query: &RoleQuery, timeout: Duration)
    -> SessionResult<bool>;

    /// Capture the rendered page as PNG into `path`
    async fn capture_screenshot(&mut self, path: &Path, timeout: Duration) -> SessionResult<()>;

    /// Tear the session down, releasing every resource it holds
    async fn close(self: Box<Self>) -> SessionResult<()>;
}

/// Hands out fresh, unshared sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> SessionResult<Box<dyn BrowserSession>>;
}
