//! Per-endpoint tier selection
//!
//! The route for every endpoint is computed once at cycle start from its
//! resolved [`ProbePolicy`] and does not change until the next cycle.

use crate::models::{Endpoint, HeavySettings, ProbeOutcome};

/// How one endpoint is probed in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Fast tier only; its outcome is final
    Fast,

    /// Fast tier first, heavy tier when the fast tier got no response at all
    FastThenHeavy(HeavySettings),

    /// Heavy tier only; the fast tier is never called
    Heavy(HeavySettings),
}

impl Route {
    /// Route for an endpoint
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        let policy = &endpoint.policy;

        if policy.requires_heavy_probe {
            Self::Heavy(policy.heavy)
        } else if policy.fallback_to_heavy {
            Self::FastThenHeavy(policy.heavy)
        } else {
            Self::Fast
        }
    }

    /// Whether this route may need a browser session
    pub fn uses_heavy(&self) -> bool {
        !matches!(self, Self::Fast)
    }

    /// Heavy settings to escalate with after a fast outcome, if any
    ///
    /// Only a `request_error` escalates; server errors and successes are final.
    pub fn escalation(&self, fast: &ProbeOutcome) -> Option<HeavySettings> {
        match self {
            Self::FastThenHeavy(settings) if fast.is_request_error() => Some(*settings),
            _ => None,
        }
    }
}

/// Routes for a whole inventory, index-aligned with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePlan {
    routes: Vec<Route>,
}

impl CyclePlan {
    pub fn new(endpoints: &[Endpoint]) -> Self {
        Self {
            routes: endpoints.iter().map(Route::for_endpoint).collect(),
        }
    }

    pub fn route(&self, index: usize) -> Route {
        self.routes.get(index).copied().unwrap_or(Route::Fast)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Endpoints routed straight to the heavy tier
    pub fn heavy_only_count(&self) -> usize {
        self.routes
            .iter()
            .filter(|r| matches!(r, Route::Heavy(_)))
            .count()
    }

    /// Endpoints whose first probe is on the fast tier
    pub fn fast_first_count(&self) -> usize {
        self.routes.len() - self.heavy_only_count()
    }
}
