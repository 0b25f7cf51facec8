//! Harness error types.

use twinprobe_core::ProbeError;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Harness errors.
///
/// A failed step is not an error: it is recorded in the report. These
/// variants cover runs that cannot produce a report at all.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The run had to stop before producing any result.
    #[error("aborted: {0}")]
    Abort(String),

    /// Core probe error.
    #[error(transparent)]
    Core(#[from] ProbeError),
}

impl HarnessError {
    /// Creates an abort error.
    #[must_use]
    pub fn abort(msg: impl Into<String>) -> Self {
        Self::Abort(msg.into())
    }

    /// Returns true if the service under test could not be reached.
    ///
    /// Anything else is a setup problem on the probe side.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        match self {
            Self::Abort(_) => true,
            Self::Core(e) => e.is_transport(),
        }
    }
}
