//! Error types for the process-selection core.

use thiserror::Error;

/// Why a configuration handed to [`crate::Optimizer::initialize`] was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KrpsimError {
    #[error("process `{0}` has non-positive delay")]
    NonPositiveDelay(String),

    #[error("duplicate process name `{0}`")]
    DuplicateProcess(String),

    #[error("target `{0}` is neither produced nor consumed by any process")]
    DanglingTarget(String),
}

/// Convenience alias for fallible core operations.
pub type KrpsimResult<T> = Result<T, KrpsimError>;
