//! Rendering-capable browser sessions
//!
//! The heavy tier only needs four operations from a browser: navigate, read
//! the page source, read the title and close. [`RenderDriver`] hands out
//! sessions; [`SessionGuard`] makes sure each one is closed exactly once,
//! including when the owning future is dropped or panics.

use async_trait::async_trait;
use std::time::Duration;

use crate::utils::error::BrowserError;

/// Timeouts applied to a freshly opened session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub page_load: Duration,
    pub script: Duration,
}

impl SessionTimeouts {
    /// Same value for page load and script execution
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            page_load: timeout,
            script: timeout,
        }
    }
}

/// Factory for browser sessions
#[async_trait]
pub trait RenderDriver: Send + Sync {
    /// Open a new session with the given timeouts
    ///
    /// An error here with [`BrowserError::is_fatal`] means the capability is
    /// unusable and the caller must not retry.
    async fn open_session(
        &self,
        timeouts: SessionTimeouts,
    ) -> Result<Box<dyn RenderSession>, BrowserError>;
}

/// One live browser session
#[async_trait]
pub trait RenderSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn page_source(&mut self) -> Result<String, BrowserError>;

    async fn title(&mut self) -> Result<String, BrowserError>;

    /// Release the session; must tolerate being called on a dead session
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Scoped owner of a session
///
/// Call [`SessionGuard::release`] on the normal path. If the guard is dropped
/// while still holding a session (cancellation, panic), the close is spawned
/// on the current runtime instead.
pub struct SessionGuard {
    session: Option<Box<dyn RenderSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn RenderSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Borrow the live session
    pub fn session_mut(&mut self) -> Result<&mut dyn RenderSession, BrowserError> {
        match self.session.as_mut() {
            Some(session) => Ok(session.as_mut()),
            None => Err(BrowserError::Closed),
        }
    }

    /// Close the session now
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "Failed to close browser session");
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!(error = %e, "Failed to close abandoned browser session");
                    }
                });
            }
            Err(_) => {
                tracing::error!("Browser session dropped outside a runtime; it may leak");
            }
        }
    }
}
