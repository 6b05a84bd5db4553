// src/error.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-visible failures. Per-source and per-link failures never surface
/// here; they are recorded in the batch outcome instead.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn code_str(&self) -> &'static str {
        match self {
            CoreError::InvalidOptions(_) => "invalid_options",
            CoreError::UnknownSource(_) => "unknown_source",
            CoreError::Http(_) => "http_client",
            CoreError::Io(_) => "io",
            CoreError::Config(_) => "config",
            CoreError::Internal(_) => "internal_error",
        }
    }
}

/// Closed taxonomy of per-task failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A single task exceeded its own timeout
    Timeout,
    /// The task was aborted because the batch deadline elapsed
    Cancelled,
    /// A source adapter failed or returned malformed data
    SourceFailure,
    /// A link extractor failed for a chosen result
    ExtractionFailure,
    /// Network failure while probing a link
    ProbeFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::SourceFailure => "source_failure",
            ErrorKind::ExtractionFailure => "extraction_failure",
            ErrorKind::ProbeFailure => "probe_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured failure entry for one source in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{source_id}: {kind}: {detail}")]
pub struct SourceError {
    /// Source identifier that failed
    #[serde(rename = "source")]
    pub source_id: String,

    pub kind: ErrorKind,

    /// Human-readable detail
    pub detail: String,
}

impl SourceError {
    pub fn new(source: impl Into<String>, kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            source_id: source.into(),
            kind,
            detail: detail.into(),
        }
    }

    pub fn failure(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(source, ErrorKind::SourceFailure, detail)
    }

    pub fn extraction(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(source, ErrorKind::ExtractionFailure, detail)
    }

    pub fn timeout(source: impl Into<String>, after_ms: u128) -> Self {
        Self::new(
            source,
            ErrorKind::Timeout,
            format!("timeout after {}ms", after_ms),
        )
    }

    pub fn cancelled(source: impl Into<String>) -> Self {
        Self::new(
            source,
            ErrorKind::Cancelled,
            "cancelled at overall deadline",
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

/// Transport-level failure from a link probe. Collapses into a `Dead`
/// verdict inside the health engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Timeout => ErrorKind::Timeout,
            _ => ErrorKind::ProbeFailure,
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout
        } else if err.is_connect() {
            ProbeError::Connect(err.to_string())
        } else if err.is_builder() {
            ProbeError::InvalidUrl(err.to_string())
        } else {
            ProbeError::Request(err.to_string())
        }
    }
}
