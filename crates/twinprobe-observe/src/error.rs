//! Observation error types.

use twinprobe_core::ProbeError;

/// Result type alias for observe operations.
pub type Result<T> = std::result::Result<T, ObserveError>;

/// Observation errors.
///
/// Operator interrupts and peer closes are not errors; they end an
/// observation normally and are reported through the summary.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// The channel could not be opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// The receive task panicked or was cancelled unexpectedly.
    #[error("receive task failed: {0}")]
    Join(String),

    /// Error from the core crate.
    #[error(transparent)]
    Core(#[from] ProbeError),
}

impl ObserveError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a join error.
    #[must_use]
    pub fn join(msg: impl Into<String>) -> Self {
        Self::Join(msg.into())
    }

    /// Returns true if the channel could not be reached.
    ///
    /// Anything else is a setup problem on the probe side.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Join(_) => false,
            Self::Core(e) => e.is_transport(),
        }
    }
}
