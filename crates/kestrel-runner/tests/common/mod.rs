//! Scripted stand-in for a browser and the application under test

#![allow(dead_code)]

use async_trait::async_trait;
use kestrel_core::{
    BrowserSession, ExecutorConfig, RoleQuery, Scenario, SessionError, SessionProvider,
    SessionResult, Step,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// A page served by the fake application
#[derive(Clone, Default)]
pub struct FakePage {
    pub redirect_to: Option<String>,
    pub elements: Vec<(String, String)>,
}

impl FakePage {
    pub fn with_heading(name: &str) -> Self {
        Self {
            redirect_to: None,
            elements: vec![("heading".to_string(), name.to_string())],
        }
    }

    pub fn redirect(to: &str) -> Self {
        Self {
            redirect_to: Some(to.to_string()),
            elements: vec![],
        }
    }
}

/// Routes by path; unknown paths refuse the connection
#[derive(Clone, Default)]
pub struct FakeApp {
    pages: HashMap<String, FakePage>,
}

impl FakeApp {
    pub fn route(mut self, path: &str, page: FakePage) -> Self {
        self.pages.insert(path.to_string(), page);
        self
    }

    /// The two CloudRay behaviours under verification
    pub fn cloudray() -> Self {
        Self::default()
            .route(
                "/",
                FakePage::with_heading("CloudRay: The Free, Unlimited Cloud Storage"),
            )
            .route("/dashboard", FakePage::redirect("/login"))
            .route("/login", FakePage::with_heading("Login to CloudRay"))
    }
}

#[derive(Default)]
pub struct Counters {
    pub attempts: AtomicUsize,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub screenshots: AtomicUsize,
}

impl Counters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn screenshots(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    pub app: FakeApp,
    pub counters: Arc<Counters>,
    pub unavailable: bool,
    pub navigate_delay: Option<Duration>,
    pub hang_navigate: bool,
    pub hang_screenshot: bool,
    /// Only this acquisition attempt (0-based) fails, after `acquire_delay`
    pub fail_attempt: Option<usize>,
    pub acquire_delay: Option<Duration>,
    /// Close takes this long before the session counts as released
    pub close_delay: Option<Duration>,
}

impl FakeProvider {
    pub fn new(app: FakeApp) -> Self {
        Self {
            app,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    async fn acquire(&self) -> SessionResult<Box<dyn BrowserSession>> {
        let attempt = self.counters.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self.unavailable || self.fail_attempt == Some(attempt);
        if failing {
            if let Some(delay) = self.acquire_delay {
                tokio::time::sleep(delay).await;
            }
            return Err(SessionError::Unavailable("Chrome not found".to_string()));
        }

        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            app: self.app.clone(),
            counters: Arc::clone(&self.counters),
            current: "about:blank".to_string(),
            navigate_delay: self.navigate_delay,
            hang_navigate: self.hang_navigate,
            hang_screenshot: self.hang_screenshot,
            close_delay: self.close_delay,
        }))
    }
}

pub struct FakeSession {
    app: FakeApp,
    counters: Arc<Counters>,
    current: String,
    navigate_delay: Option<Duration>,
    hang_navigate: bool,
    hang_screenshot: bool,
    close_delay: Option<Duration>,
}

impl FakeSession {
    fn current_page(&self) -> Option<&FakePage> {
        let url = Url::parse(&self.current).ok()?;
        self.app.pages.get(url.path())
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &Url, _timeout: Duration) -> SessionResult<()> {
        if self.hang_navigate {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(delay) = self.navigate_delay {
            tokio::time::sleep(delay).await;
        }

        let page = self
            .app
            .pages
            .get(url.path())
            .ok_or_else(|| SessionError::Navigation("net::ERR_CONNECTION_REFUSED".to_string()))?;

        self.current = match &page.redirect_to {
            Some(target) => url
                .join(target)
                .map_err(|e| SessionError::Navigation(e.to_string()))?
                .to_string(),
            None => url.to_string(),
        };
        Ok(())
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        Ok(self.current.clone())
    }

    async fn wait_for_role(&mut self, query: &RoleQuery, timeout: Duration) -> SessionResult<bool> {
        let visible = self.current_page().is_some_and(|page| {
            page.elements
                .iter()
                .any(|(role, name)| *role == query.role && query.matches_name(name))
        });
        if !visible {
            tokio::time::sleep(timeout).await;
        }
        Ok(visible)
    }

    async fn capture_screenshot(&mut self, path: &Path, _timeout: Duration) -> SessionResult<()> {
        if self.hang_screenshot {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        tokio::fs::write(path, b"\x89PNG\r\n\x1a\n").await?;
        self.counters.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(self: Box<Self>) -> SessionResult<()> {
        if let Some(delay) = self.close_delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn test_config(artifacts_dir: &Path) -> ExecutorConfig {
    ExecutorConfig::new("http://localhost:3000")
        .unwrap()
        .with_navigation_timeout(Duration::from_millis(200))
        .with_assertion_timeout(Duration::from_millis(150))
        .with_poll_interval(Duration::from_millis(10))
        .with_grace_period(Duration::from_millis(100))
        .with_artifacts_dir(artifacts_dir)
}

pub fn auth_redirect() -> Scenario {
    Scenario::new(
        "auth-redirect",
        vec![
            Step::Navigate {
                url: "/dashboard".to_string(),
            },
            Step::AssertUrl {
                expected: "/login".to_string(),
            },
            Step::AssertVisible {
                role: "heading".to_string(),
                name: "Login to CloudRay".to_string(),
                exact: false,
            },
            Step::Screenshot {
                path: PathBuf::from("auth_redirect.png"),
            },
        ],
    )
    .unwrap()
}

pub fn landing_page() -> Scenario {
    Scenario::new(
        "landing-page",
        vec![
            Step::Navigate {
                url: "/".to_string(),
            },
            Step::AssertVisible {
                role: "heading".to_string(),
                name: "CloudRay: The Free, Unlimited Cloud Storage".to_string(),
                exact: false,
            },
            Step::Screenshot {
                path: PathBuf::from("landing_page.png"),
            },
        ],
    )
    .unwrap()
}
