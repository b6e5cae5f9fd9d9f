//! Unified error handling for the sentinela crate
//!
//! Probe failures never surface as errors: they are classified into
//! [`ProbeOutcome`](crate::models::ProbeOutcome)s. The types here cover
//! everything around the probes: output sinks, browser plumbing and
//! templating. Configuration problems are reported through `anyhow`.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping the domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use sentinela::error::{Error, ErrorCategory};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(error = %err, "Will try again next cycle");
//!     } else {
//!         tracing::error!(category = ?err.category(), error = %err, "Giving up");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::utils::error::BrowserError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, WebDriver transport)
    Network,
    /// Browser session errors
    Browser,
    /// Storage and I/O errors
    Storage,
    /// Serialization and templating errors
    Rendering,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Browser => "browser",
            Self::Storage => "storage",
            Self::Rendering => "rendering",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the sentinela crate
#[derive(Error, Debug)]
pub enum Error {
    /// Browser session errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Dashboard template errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Dashboard template registration errors
    #[error("Template error: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Check if this error may go away on the next cycle
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Browser(e) => !e.is_fatal(),
            Self::Io(_) => true,
            Self::Http(_) => true,
            Self::Json(_) | Self::Template(_) | Self::TemplateSyntax(_) => false,
            Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) => ErrorCategory::Network,
            Self::Browser(BrowserError::Transport(_)) => ErrorCategory::Network,
            Self::Browser(_) => ErrorCategory::Browser,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::Template(_) | Self::TemplateSyntax(_) => {
                ErrorCategory::Rendering
            }
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
