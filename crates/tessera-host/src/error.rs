//! Host error types.
//!
//! Load failures never escape the loader as panics or raw Lua errors; they
//! are folded into [`LoadError`] so that callers can tell the failure modes
//! apart while still treating all of them as "no module".

use thiserror::Error;

/// Why a capability's UI module could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The host runs without an execution boundary.
    #[error("no execution boundary is available")]
    BoundaryUnavailable,

    /// The boundary was reachable but the source retrieval failed.
    #[error("source retrieval failed: {0}")]
    Bridge(String),

    /// The boundary answered without any module source text.
    #[error("the execution boundary returned no module source")]
    EmptySource,

    /// The source text raised while being evaluated.
    #[error("module evaluation failed: {0}")]
    Evaluation(String),

    /// The evaluated module does not export a callable `render`.
    #[error("module does not export a callable render function")]
    MissingRender,

    /// The sandbox itself could not be prepared.
    #[error("sandbox setup failed: {0}")]
    Sandbox(String),
}

/// Result type for module loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Why a mount did not reach the ready state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    /// The module could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The module's `render` raised, or returned something unusable.
    #[error("render failed: {0}")]
    Render(String),
}

/// Result type for mounting.
pub type MountResult<T> = Result<T, MountError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_errors_are_distinguishable() {
        let errors = [
            LoadError::BoundaryUnavailable,
            LoadError::Bridge("down".into()),
            LoadError::EmptySource,
            LoadError::Evaluation("boom".into()),
            LoadError::MissingRender,
            LoadError::Sandbox("oom".into()),
        ];
        for (i, a) in errors.iter().enumerate() {
            for (j, b) in errors.iter().enumerate() {
                assert_eq!(i == j, a == b);
            }
        }
    }

    #[test]
    fn test_mount_error_wraps_load_error_transparently() {
        let err = MountError::from(LoadError::EmptySource);
        assert_eq!(err.to_string(), LoadError::EmptySource.to_string());
    }
}
