//! Failure classification for both probe tiers
//!
//! Raw signals (transport errors, browser error pages, gateway titles,
//! WebDriver faults) are mapped onto a closed taxonomy. Matching is ordered:
//! DNS markers are checked before generic connection markers, and
//! status-derived classifications before the catch-all.

use regex::Regex;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::sync::OnceLock;

use crate::models::HttpStatus;
use crate::utils::error::BrowserError;
use crate::utils::{first_line, truncate_text};

/// Longest raw message kept in an `unclassified` detail
pub const MAX_DETAIL_LEN: usize = 120;

/// Longest page title echoed back in a gateway detail
const MAX_TITLE_LEN: usize = 60;

/// Browser network-error markers, in precedence order
pub const NETWORK_MARKERS: &[&str] = &[
    "DNS_PROBE_FINISHED_NXDOMAIN",
    "ERR_NAME_NOT_RESOLVED",
    "ERR_CONNECTION_REFUSED",
    "ERR_CONNECTION_TIMED_OUT",
    "ERR_CONNECTION_RESET",
    "ERR_CONNECTION_CLOSED",
    "ERR_ADDRESS_UNREACHABLE",
    "ERR_INTERNET_DISCONNECTED",
    "ERR_TIMED_OUT",
    "ERR_SSL_PROTOCOL_ERROR",
    "ERR_CERT_AUTHORITY_INVALID",
    "ERR_CERT_COMMON_NAME_INVALID",
    "ERR_CERT_DATE_INVALID",
];

/// Short fragments seen in driver error messages, mapped to a marker
const DRIVER_FRAGMENTS: &[(&str, &str)] = &[
    ("NXDOMAIN", "DNS_PROBE_FINISHED_NXDOMAIN"),
    ("NAME_NOT_RESOLVED", "ERR_NAME_NOT_RESOLVED"),
    ("REFUSED", "ERR_CONNECTION_REFUSED"),
    ("TIMED_OUT", "ERR_CONNECTION_TIMED_OUT"),
    ("UNREACHABLE", "ERR_ADDRESS_UNREACHABLE"),
];

/// Closed set of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 5xx received by the fast tier
    ServerError,
    /// No response at all on the fast tier (DNS, connect, TLS, timeout)
    RequestError,
    /// 502/503/504 surfaced through the rendered page
    GatewayError,
    /// Browser-level network error page or navigation failure
    RenderNetworkError,
    /// Page load or script execution exceeded its timeout
    RenderTimeout,
    /// Anything else; the raw message is preserved
    Unclassified,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServerError => "server_error",
            Self::RequestError => "request_error",
            Self::GatewayError => "gateway_error",
            Self::RenderNetworkError => "render_network_error",
            Self::RenderTimeout => "render_timeout",
            Self::Unclassified => "unclassified",
        }
    }

    /// Heavy-tier failures that are retried while attempts remain
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RenderTimeout | Self::RenderNetworkError)
    }

    pub fn all() -> [Self; 6] {
        [
            Self::ServerError,
            Self::RequestError,
            Self::GatewayError,
            Self::RenderNetworkError,
            Self::RenderTimeout,
            Self::Unclassified,
        ]
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure: kind, observed status and a human-readable detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub status: HttpStatus,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, status: HttpStatus, detail: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Classify a response status received by the fast tier
///
/// Returns `None` for anything below 500, which the fast tier treats as reachable.
pub fn classify_status(code: u16) -> Option<Failure> {
    (code >= 500).then(|| {
        Failure::new(
            ErrorKind::ServerError,
            HttpStatus::Code(code),
            format!("server error {code}"),
        )
    })
}

/// Classify a fast-tier failure that happened before any response
pub fn classify_transport(err: &reqwest::Error) -> Failure {
    let cause = if err.is_timeout() {
        format!("timed out ({})", root_cause(err))
    } else {
        describe_transport_cause(err)
    };

    Failure::new(
        ErrorKind::RequestError,
        HttpStatus::Unknown,
        format!("request error: {cause}"),
    )
}

/// Describe a transport error chain, naming DNS failures before generic connect failures
pub fn describe_transport_cause(err: &(dyn StdError + 'static)) -> String {
    let chain = error_chain(err).to_lowercase();
    let root = root_cause(err);

    let label = if dns_pattern().is_match(&chain) {
        "dns resolution failed"
    } else if chain.contains("timed out") || chain.contains("timeout") {
        "timed out"
    } else if tls_pattern().is_match(&chain) {
        "tls handshake failed"
    } else if chain.contains("connection refused") {
        "connection refused"
    } else if chain.contains("connection reset") || chain.contains("connection closed") {
        "connection closed"
    } else if chain.contains("connect") {
        "connection failed"
    } else {
        return truncate_text(&root, MAX_DETAIL_LEN);
    };

    truncate_text(&format!("{label} ({root})"), MAX_DETAIL_LEN)
}

/// Inspect a rendered page for browser network-error markers, then gateway titles
pub fn classify_rendered(page_source: &str, title: &str) -> Option<Failure> {
    if let Some(marker) = NETWORK_MARKERS
        .iter()
        .find(|marker| page_source.contains(*marker))
    {
        return Some(Failure::new(
            ErrorKind::RenderNetworkError,
            HttpStatus::Unknown,
            *marker,
        ));
    }

    gateway_family(title).map(|code| {
        Failure::new(
            ErrorKind::GatewayError,
            HttpStatus::Code(code),
            format!(
                "gateway error {code} via browser ({})",
                truncate_text(title.trim(), MAX_TITLE_LEN)
            ),
        )
    })
}

/// Status family announced by a gateway error title, if any
pub fn gateway_family(title: &str) -> Option<u16> {
    let lower = title.to_lowercase();
    if let Some(captures) = gateway_code_pattern().captures(&lower) {
        return captures[1].parse().ok();
    }

    if lower.contains("bad gateway") {
        Some(502)
    } else if lower.contains("service unavailable") {
        Some(503)
    } else if lower.contains("gateway timeout") || lower.contains("gateway time-out") {
        Some(504)
    } else {
        None
    }
}

/// Classify a browser session fault
pub fn classify_browser(err: &BrowserError) -> Failure {
    match err {
        BrowserError::Timeout => Failure::new(
            ErrorKind::RenderTimeout,
            HttpStatus::Unknown,
            "render timeout",
        ),
        BrowserError::Transport(e) if e.is_timeout() => Failure::new(
            ErrorKind::RenderTimeout,
            HttpStatus::Unknown,
            "render timeout",
        ),
        BrowserError::Navigation(message) => match driver_marker(message) {
            Some(marker) => {
                Failure::new(ErrorKind::RenderNetworkError, HttpStatus::Unknown, marker)
            }
            None => unclassified(message),
        },
        BrowserError::SessionStart(message) => {
            unclassified(&format!("browser unavailable: {message}"))
        }
        other => unclassified(&other.to_string()),
    }
}

/// Catch-all classification preserving a bounded prefix of the raw message
pub fn unclassified(message: &str) -> Failure {
    let line = first_line(message);
    let detail = if line.is_empty() {
        "unknown error".to_string()
    } else {
        truncate_text(line, MAX_DETAIL_LEN)
    };

    Failure::new(ErrorKind::Unclassified, HttpStatus::Unknown, detail)
}

fn driver_marker(message: &str) -> Option<&'static str> {
    let upper = message.to_uppercase();

    NETWORK_MARKERS
        .iter()
        .copied()
        .find(|marker| upper.contains(marker))
        .or_else(|| {
            DRIVER_FRAGMENTS
                .iter()
                .find(|(fragment, _)| upper.contains(fragment))
                .map(|(_, marker)| *marker)
        })
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(inner) = current.source() {
        current = inner;
    }
    first_line(&current.to_string()).to_string()
}

fn dns_pattern() -> &'static Regex {
    static DNS_RE: OnceLock<Regex> = OnceLock::new();
    DNS_RE.get_or_init(|| {
        Regex::new(
            r"dns error|failed to lookup address|name or service not known|no such host|nodename nor servname|name resolution",
        )
        .expect("Invalid regex pattern")
    })
}

fn tls_pattern() -> &'static Regex {
    static TLS_RE: OnceLock<Regex> = OnceLock::new();
    TLS_RE.get_or_init(|| {
        Regex::new(r"certificate|\btls\b|\bssl\b|handshake").expect("Invalid regex pattern")
    })
}

fn gateway_code_pattern() -> &'static Regex {
    static GATEWAY_RE: OnceLock<Regex> = OnceLock::new();
    GATEWAY_RE.get_or_init(|| Regex::new(r"\b(50[234])\b").expect("Invalid regex pattern"))
}
