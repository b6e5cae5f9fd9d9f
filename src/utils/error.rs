//! Error types for the browser (WebDriver) layer
//!
//! The heavy tier talks to a rendering-capable browser through a session
//! abstraction; every failure on that path is expressed as a [`BrowserError`].

use thiserror::Error;

/// Errors that can occur while driving a browser session
#[derive(Error, Debug)]
pub enum BrowserError {
    /// The browser capability could not be started at all
    #[error("browser session could not be started: {0}")]
    SessionStart(String),

    /// Page load or script execution exceeded its timeout
    #[error("page load timed out")]
    Timeout,

    /// The browser reported a navigation failure (net::ERR_*, DNS, ...)
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The driver answered with something the client did not understand
    #[error("webdriver protocol error: {0}")]
    Protocol(String),

    /// Transport failure talking to the driver after the session was created
    #[error("webdriver transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The session was already released
    #[error("browser session already closed")]
    Closed,
}

impl BrowserError {
    /// A fatal fault means the capability itself is unusable; retrying on a
    /// fresh session would fail the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionStart(_))
    }
}
