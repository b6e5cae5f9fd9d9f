//! Probe tiers, failure classification and routing
//!
//! - [`fast`]: one HTTP request, high concurrency, no retries
//! - [`heavy`]: full page render through a WebDriver session, retried
//! - [`classify`]: the shared failure taxonomy
//! - [`routing`]: which tier(s) an endpoint goes through each cycle

pub mod classify;
pub mod fast;
pub mod heavy;
pub mod routing;
pub mod session;
pub mod webdriver;

use async_trait::async_trait;

use crate::models::{Endpoint, ProbeOutcome};

pub use classify::{ErrorKind, Failure};
pub use fast::HttpProber;
pub use heavy::{HeavyProber, SettleDelay};
pub use routing::{CyclePlan, Route};
pub use session::{RenderDriver, RenderSession, SessionGuard, SessionTimeouts};
pub use webdriver::WebDriverClient;

/// Lightweight reachability check
///
/// Implementations never fail: every outcome, including transport errors,
/// is expressed as a classified [`ProbeOutcome`].
#[async_trait]
pub trait FastProbe: Send + Sync {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome;
}
