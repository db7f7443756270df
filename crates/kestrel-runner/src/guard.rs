use kestrel_core::BrowserSession;
use tokio_util::task::TaskTracker;

/// Owns a session for the length of one scenario run
///
/// `release` closes the session explicitly. If the guard is dropped first
/// (the run future was cancelled or a step panicked) the close is spawned
/// onto the current runtime and registered with `teardown`, so whoever owns
/// the tracker can wait for it. Either way `close` runs at most once.
pub struct SessionGuard {
    scenario: String,
    session: Option<Box<dyn BrowserSession>>,
    teardown: TaskTracker,
}

impl SessionGuard {
    pub fn new(
        scenario: impl Into<String>,
        session: Box<dyn BrowserSession>,
        teardown: TaskTracker,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            session: Some(session),
            teardown,
        }
    }

    pub fn session(&mut self) -> &mut dyn BrowserSession {
        self.session
            .as_deref_mut()
            .expect("session is held until the guard is released")
    }

    /// Close the session and wait for teardown to finish
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!("Releasing session for '{}'", self.scenario);
            close(&self.scenario, session).await;
        }
    }
}

async fn close(scenario: &str, session: Box<dyn BrowserSession>) {
    if let Err(e) = session.close().await {
        tracing::warn!("Session teardown for '{}' failed: {}", scenario, e);
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    "Scenario '{}' ended early, releasing its session in the background",
                    self.scenario
                );
                let scenario = std::mem::take(&mut self.scenario);
                self.teardown.spawn_on(
                    async move { close(&scenario, session).await },
                    &handle,
                );
            }
            Err(_) => {
                tracing::warn!(
                    "No async runtime to close the session for '{}', dropping it",
                    self.scenario
                );
                drop(session);
            }
        }
    }
}
