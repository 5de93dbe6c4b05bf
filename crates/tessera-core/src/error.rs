//! Execution boundary error types.

use thiserror::Error;

use crate::CapabilityId;

/// Errors raised while talking to the execution boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No execution boundary is attached to the host.
    #[error("execution boundary unavailable")]
    Unavailable,

    /// The boundary does not implement the requested operation.
    #[error("unsupported by execution boundary: {0}")]
    Unsupported(String),

    /// A capability invocation failed on the far side of the boundary.
    #[error("capability {capability} failed: {message}")]
    Invocation {
        /// The capability that was invoked.
        capability: CapabilityId,
        /// Failure reason reported by the boundary.
        message: String,
    },

    /// The boundary answered with something the host cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// I/O error (filesystem-backed boundaries).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for execution boundary operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
