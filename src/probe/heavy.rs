//! Heavy tier: render the page in a real browser session
//!
//! Each attempt opens its own session, navigates, waits a short random settle
//! delay, then inspects the rendered source and title. Transient failures
//! (render timeouts and browser network errors) are retried while the attempt
//! budget lasts; a session that cannot be started ends the probe at once.

use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::classify::{classify_browser, classify_rendered, Failure};
use super::session::{RenderDriver, RenderSession, SessionGuard, SessionTimeouts};
use crate::models::{Endpoint, HeavySettings, ProbeOutcome, ProbeTier};
use crate::utils::error::BrowserError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Extra time allowed on top of the page-load timeout for one attempt
pub const NAVIGATION_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on closing a session after an attempt
pub const RELEASE_GRACE: Duration = Duration::from_secs(10);

/// Status reported for a clean render when the fast tier saw nothing
const DEFAULT_SUCCESS_STATUS: u16 = 200;

/// Upper bound on the delay between attempts
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Random pause after navigation so late scripts can swap in error pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelay {
    pub min: Duration,
    pub max: Duration,
}

impl Default for SettleDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(500),
            max: Duration::from_millis(1000),
        }
    }
}

impl SettleDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No settling at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min == max {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Failure of one heavy attempt
#[derive(Debug, Clone)]
struct AttemptError {
    failure: Failure,
    fatal: bool,
}

impl AttemptError {
    fn from_browser(err: &BrowserError) -> Self {
        Self {
            failure: classify_browser(err),
            fatal: err.is_fatal(),
        }
    }

    fn rendered(failure: Failure) -> Self {
        Self {
            failure,
            fatal: false,
        }
    }

    fn is_retryable(&self) -> bool {
        !self.fatal && self.failure.kind.is_transient()
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fatal {
            write!(f, "fatal {}", self.failure)
        } else {
            write!(f, "{}", self.failure)
        }
    }
}

/// Browser-backed prober
pub struct HeavyProber {
    driver: Arc<dyn RenderDriver>,
    settle: SettleDelay,
    retry_delay: Duration,
}

impl HeavyProber {
    pub fn new(driver: Arc<dyn RenderDriver>) -> Self {
        Self {
            driver,
            settle: SettleDelay::default(),
            retry_delay: Duration::ZERO,
        }
    }

    pub fn with_settle(mut self, settle: SettleDelay) -> Self {
        self.settle = settle;
        self
    }

    /// Delay before the second attempt; later attempts back off exponentially
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Probe an endpoint, retrying transient failures within `settings.max_attempts`
    ///
    /// `prior_status` is the code the fast tier saw, if it saw one; a clean
    /// render reports it instead of a synthetic 200.
    pub async fn probe(
        &self,
        endpoint: &Endpoint,
        settings: HeavySettings,
        prior_status: Option<u16>,
    ) -> ProbeOutcome {
        let started = Instant::now();
        let retry = RetryConfig::with_delays(
            settings.max_attempts,
            self.retry_delay.as_millis() as u64,
            MAX_RETRY_DELAY_MS,
        );

        let attempted = with_retry_if(
            &retry,
            move |attempt| self.attempt(endpoint, settings, attempt),
            AttemptError::is_retryable,
        )
        .await;

        let latency = started.elapsed();
        let outcome = match attempted.result {
            Ok(()) => ProbeOutcome::success(
                ProbeTier::Heavy,
                prior_status.unwrap_or(DEFAULT_SUCCESS_STATUS),
                latency,
            ),
            Err(e) => {
                if e.fatal {
                    tracing::error!(
                        endpoint = %endpoint.name,
                        error = %e.failure,
                        "Browser session could not be started"
                    );
                }
                ProbeOutcome::failure(ProbeTier::Heavy, e.failure, latency)
            }
        };

        outcome.with_attempts(attempted.attempts)
    }

    /// Deadline for opening a session and rendering one page
    ///
    /// Closing the session afterwards gets at most [`RELEASE_GRACE`] on top.
    pub fn attempt_bound(&self, settings: HeavySettings) -> Duration {
        settings.timeout + NAVIGATION_GRACE + self.settle.max
    }

    async fn attempt(
        &self,
        endpoint: &Endpoint,
        settings: HeavySettings,
        attempt: u32,
    ) -> Result<(), AttemptError> {
        tracing::debug!(
            endpoint = %endpoint.name,
            attempt = attempt,
            timeout_secs = settings.timeout.as_secs(),
            "Opening browser session"
        );

        let deadline = Instant::now() + self.attempt_bound(settings);

        let opened = tokio::time::timeout_at(
            deadline,
            self.driver.open_session(SessionTimeouts::uniform(settings.timeout)),
        )
        .await
        .unwrap_or_else(|_| Err(BrowserError::Timeout));
        let session = opened.map_err(|e| AttemptError::from_browser(&e))?;
        let mut guard = SessionGuard::new(session);

        let rendered = match guard.session_mut() {
            Ok(session) => {
                tokio::time::timeout_at(deadline, self.render(session, &endpoint.address))
                    .await
                    .unwrap_or_else(|_| Err(BrowserError::Timeout))
            }
            Err(e) => Err(e),
        };

        if tokio::time::timeout(RELEASE_GRACE, guard.release())
            .await
            .is_err()
        {
            tracing::warn!(endpoint = %endpoint.name, "Browser session close timed out");
        }

        let (source, title) = rendered.map_err(|e| AttemptError::from_browser(&e))?;

        match classify_rendered(&source, &title) {
            Some(failure) => Err(AttemptError::rendered(failure)),
            None => Ok(()),
        }
    }

    async fn render(
        &self,
        session: &mut dyn RenderSession,
        address: &str,
    ) -> Result<(String, String), BrowserError> {
        session.navigate(address).await?;

        let settle = self.settle.sample();
        tokio::time::sleep(settle).await;

        let source = session.page_source().await?;
        let title = session.title().await?;
        Ok((source, title))
    }
}
