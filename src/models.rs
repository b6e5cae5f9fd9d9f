// Core data structures for the sentinela monitor

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::probe::classify::{ErrorKind, Failure};
use crate::utils::duration_millis;

/// How prominently an endpoint is shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTier {
    /// Very large card spanning two columns
    Hero,
    /// Standard card
    #[default]
    Highlight,
    /// Condensed card
    Small,
}

impl DisplayTier {
    /// CSS class used by the dashboard template
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Hero => "card-hero",
            Self::Highlight => "card-highlight",
            Self::Small => "card-small",
        }
    }
}

/// Settings for the heavy (browser) tier of one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeavySettings {
    /// Page-load timeout; the script timeout uses the same value
    pub timeout: Duration,

    /// Total attempts per cycle (at least 1)
    pub max_attempts: u32,
}

impl Default for HeavySettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 2,
        }
    }
}

/// Per-endpoint probing policy, resolved once at configuration load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbePolicy {
    /// Skip the fast tier and always render the page
    pub requires_heavy_probe: bool,

    /// Render the page when the fast tier gets no response at all
    pub fallback_to_heavy: bool,

    /// Heavy tier timeout and attempt budget (override or tier default)
    pub heavy: HeavySettings,
}

/// One monitored named network address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub address: String,
    pub display: DisplayTier,
    pub policy: ProbePolicy,
}

impl Endpoint {
    /// Create an endpoint with the default display tier and policy
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            display: DisplayTier::default(),
            policy: ProbePolicy::default(),
        }
    }

    /// Set the display tier
    pub fn with_display(mut self, display: DisplayTier) -> Self {
        self.display = display;
        self
    }

    /// Set the probing policy
    pub fn with_policy(mut self, policy: ProbePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// HTTP status as observed by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpStatus {
    Code(u16),
    #[default]
    Unknown,
}

impl HttpStatus {
    /// Numeric code, if known
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for HttpStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Code(code) => serializer.serialize_u16(*code),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Which tier produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeTier {
    Fast,
    Heavy,
}

impl ProbeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Heavy => "heavy",
        }
    }
}

/// Result of probing one endpoint with one tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub status: HttpStatus,
    pub latency: Duration,
    /// Empty iff `ok`
    pub error_detail: String,
    /// `None` iff `ok`
    pub error_kind: Option<ErrorKind>,
    pub tier: ProbeTier,
    pub attempts: u32,
}

impl ProbeOutcome {
    /// Reachable endpoint
    pub fn success(tier: ProbeTier, code: u16, latency: Duration) -> Self {
        Self {
            ok: true,
            status: HttpStatus::Code(code),
            latency,
            error_detail: String::new(),
            error_kind: None,
            tier,
            attempts: 1,
        }
    }

    /// Classified failure
    pub fn failure(tier: ProbeTier, failure: Failure, latency: Duration) -> Self {
        let Failure {
            kind,
            status,
            detail,
        } = failure;
        let error_detail = if detail.trim().is_empty() {
            kind.as_str().to_string()
        } else {
            detail
        };

        Self {
            ok: false,
            status,
            latency,
            error_detail,
            error_kind: Some(kind),
            tier,
            attempts: 1,
        }
    }

    /// Placeholder for an endpoint whose probe task never reported back
    pub fn not_checked(tier: ProbeTier) -> Self {
        Self::failure(
            tier,
            Failure::new(ErrorKind::Unclassified, HttpStatus::Unknown, "not checked"),
            Duration::ZERO,
        )
    }

    /// Record how many attempts produced this outcome
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Whether this failure came from the fast tier with no response at all
    pub fn is_request_error(&self) -> bool {
        self.error_kind == Some(ErrorKind::RequestError)
    }
}

/// One row of a sealed cycle: endpoint identity plus its outcome
#[derive(Debug, Clone, Serialize)]
pub struct EndpointResult {
    pub name: String,
    pub address: String,
    pub display: DisplayTier,
    pub ok: bool,
    pub status: HttpStatus,
    pub latency_ms: u64,
    pub error_detail: String,
    pub error_kind: Option<ErrorKind>,
    pub tier: ProbeTier,
    pub attempts: u32,
}

impl EndpointResult {
    pub fn new(endpoint: &Endpoint, outcome: ProbeOutcome) -> Self {
        Self {
            name: endpoint.name.clone(),
            address: endpoint.address.clone(),
            display: endpoint.display,
            ok: outcome.ok,
            status: outcome.status,
            latency_ms: duration_millis(outcome.latency),
            error_detail: outcome.error_detail,
            error_kind: outcome.error_kind,
            tier: outcome.tier,
            attempts: outcome.attempts,
        }
    }
}

/// Sealed, inventory-ordered outcome set for one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleSnapshot {
    /// 1-based cycle counter since process start
    pub cycle: u64,
    pub generated_at: DateTime<Local>,
    pub elapsed_ms: u64,
    pub results: Vec<EndpointResult>,
}

impl CycleSnapshot {
    /// Number of reachable endpoints
    pub fn up_count(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }

    /// Number of unreachable endpoints
    pub fn down_count(&self) -> usize {
        self.results.len() - self.up_count()
    }

    /// Result row by endpoint name
    pub fn get(&self, name: &str) -> Option<&EndpointResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Endpoint names in emitted order
    pub fn names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }
}
