//! Error types for dbbuilder.
//!
//! Library crates use [`DbBuilderError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Every error maps onto a [`FailureClass`], which is what the retry layer
//! looks at when deciding whether to wait, retry, or give up.

use std::path::PathBuf;

/// Top-level error type for all dbbuilder operations.
#[derive(Debug, thiserror::Error)]
pub enum DbBuilderError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The external service signalled quota exhaustion (HTTP 429 and friends).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Timeouts, connection resets, 5xx responses.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Non-retryable response from an external API.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Network error that is not worth retrying (bad URL, client build failure).
    #[error("network error: {0}")]
    Network(String),

    /// A generative response could not be parsed into the expected shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A parsed list had the wrong number of elements.
    #[error("expected {expected} items, got {actual}")]
    QuantityMismatch { expected: usize, actual: usize },

    /// The retry budget ran out.
    #[error("gave up after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: String },

    /// A required input file does not exist.
    #[error("could not find file: {}", path.display())]
    MissingInput { path: PathBuf },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unequal table columns, bad target key, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DbBuilderError>;

/// How the retry layer should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Wait the backoff interval, then retry.
    RateLimited,
    /// Retry immediately.
    Transient,
    /// Propagate to the caller.
    Fatal,
}

impl DbBuilderError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error for the retry layer.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::RateLimited(_) => FailureClass::RateLimited,
            Self::Transient(_) => FailureClass::Transient,
            _ => FailureClass::Fatal,
        }
    }

    /// Whether a fresh generation might fix this (bad shape, wrong length).
    pub fn is_regenerable(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::QuantityMismatch { .. })
    }
}
