//! Engine error types

use crate::value::Handle;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Guest engine errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The heap object limit was reached.
    #[error("heap object limit reached ({limit})")]
    HeapLimit {
        /// The configured limit.
        limit: usize,
    },

    /// A handle that is stale or belongs to another engine.
    #[error("stale or foreign handle {0:?}")]
    BadHandle(Handle),

    /// An object of the wrong kind for the requested operation.
    #[error("expected a {expected} object, got {got}")]
    KindMismatch {
        /// Kind required by the operation.
        expected: &'static str,
        /// Kind actually found.
        got: &'static str,
    },

    /// Call target is not callable.
    #[error("value is not callable")]
    NotCallable,

    /// A guest function body threw.
    #[error("{0}")]
    Thrown(String),
}
