//! Shared state error types.

use thiserror::Error;

/// Errors from shared state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// A merge was attempted with something other than a JSON object.
    #[error("shared state updates must be objects, got {0}")]
    NotAnObject(&'static str),
}

/// Result type for shared state operations.
pub type StateResult<T> = Result<T, StateError>;
