//! Error types for twinprobe-core.
//!
//! Every failure a probe can hit is an explicit variant. Nothing here is
//! retried: the probes exist to surface divergence from the remote contract,
//! so errors propagate to the step that triggered them.

use std::time::Duration;

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Comprehensive error type for probe operations.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Configuration error (bad file, bad URL, invalid value).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport refused or dropped the connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request exceeded the fixed timeout ceiling.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A call returned a status other than the documented one.
    #[error("unexpected status for {operation}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        /// The operation that diverged.
        operation: String,
        /// The documented status code.
        expected: u16,
        /// The status code actually returned.
        actual: u16,
    },

    /// The remote side signalled absence (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Payload could not be decoded as structured data.
    #[error("decode error: {0}")]
    Decode(String),

    /// The time boundary cannot produce a valid replay window.
    #[error("invalid time boundary: {0}")]
    InvalidBoundary(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not occur in production).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProbeError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates an invalid boundary error.
    #[must_use]
    pub fn invalid_boundary(msg: impl Into<String>) -> Self {
        Self::InvalidBoundary(msg.into())
    }

    /// Creates an unexpected status error.
    #[must_use]
    pub fn unexpected_status(operation: impl Into<String>, expected: u16, actual: u16) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            expected,
            actual,
        }
    }

    /// Describes a call that answered with a status other than `expected`.
    ///
    /// A 404 where the resource should exist is reported as absence.
    #[must_use]
    pub fn divergence(operation: impl Into<String>, expected: u16, actual: u16) -> Self {
        if actual == 404 {
            Self::NotFound(operation.into())
        } else {
            Self::unexpected_status(operation, expected, actual)
        }
    }

    /// Returns true if the failure happened below HTTP (refused, dropped, timed out).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }
}
