//! Fast tier: one lightweight HTTP request per endpoint per cycle
//!
//! Any completed exchange below 500 counts as reachable; the body is not
//! inspected. Certificates are not verified and redirects are followed, so
//! the probe sees what a browser user would eventually land on.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    redirect, Client,
};
use std::time::{Duration, Instant};

use super::classify::{classify_status, classify_transport};
use super::FastProbe;
use crate::models::{Endpoint, ProbeOutcome, ProbeTier};

/// Pool of realistic User-Agent strings for rotation
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

/// Maximum redirects followed before giving up
const MAX_REDIRECTS: usize = 10;

/// HTTP prober for the fast tier
pub struct HttpProber {
    /// HTTP client with the tier timeout and relaxed TLS
    client: Client,

    /// Tier timeout, kept for logging
    timeout: Duration,
}

impl HttpProber {
    /// Create a prober with the given per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be created
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Probe a single address
    pub async fn probe_address(&self, address: &str) -> ProbeOutcome {
        let started = Instant::now();
        let headers = self.build_headers();

        match self.client.get(address).headers(headers).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                let latency = started.elapsed();

                match classify_status(code) {
                    Some(failure) => ProbeOutcome::failure(ProbeTier::Fast, failure, latency),
                    None => ProbeOutcome::success(ProbeTier::Fast, code, latency),
                }
            }
            Err(e) => {
                tracing::debug!(
                    address = %address,
                    timeout_ms = self.timeout.as_millis(),
                    error = %e,
                    "Fast probe got no response"
                );
                ProbeOutcome::failure(ProbeTier::Fast, classify_transport(&e), started.elapsed())
            }
        }
    }

    /// Build browser-like request headers
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(self.random_user_agent()));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}

#[async_trait]
impl FastProbe for HttpProber {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome {
        self.probe_address(&endpoint.address).await
    }
}
