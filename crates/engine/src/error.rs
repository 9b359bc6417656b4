//! Engine errors.

use weft_core::{Fault, OperationId};
use weft_registry::{RegistryError, SelectorError};

/// Result type for resolution.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while resolving an operation to a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Registry lookup failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Selection rules could not be compiled
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// No single interface member stands for the operation
    #[error("No interface pointcut for {operation}: {reason}")]
    NoInterfacePointcut {
        /// Operation being resolved
        operation: OperationId,
        /// Why mapping failed
        reason: String,
    },

    /// Generic arguments do not fit the operation
    #[error("{operation} takes {expected} generic arguments, got {actual}")]
    GenericArity {
        /// Operation being specialized
        operation: OperationId,
        /// Type-level plus member-level parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },
}

impl From<EngineError> for Fault {
    fn from(error: EngineError) -> Self {
        Fault::Resolution(Box::new(error))
    }
}
