//! Faults raised while executing an advice chain.

/// Result alias for chain execution.
pub type Result<T> = std::result::Result<T, Fault>;

/// A failure observed by the caller of an advised operation.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    /// Raised by an operation body or an advice
    #[error(transparent)]
    Raised(#[from] anyhow::Error),

    /// Several faults gathered by a combinator; callers only ever see the first
    #[error("{} aggregated faults", .0.len())]
    Aggregate(Vec<Fault>),

    /// The underlying future was aborted
    #[error("operation cancelled")]
    Cancelled,

    /// The operation could not be resolved to an advice chain
    #[error("resolution failed: {0}")]
    Resolution(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Fault {
    /// Raise a fault from a message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Raised(anyhow::Error::msg(message))
    }

    /// Raise a fault from any error.
    pub fn raise<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Raised(anyhow::Error::new(error))
    }

    /// Wrap several faults.
    pub fn aggregate(faults: impl IntoIterator<Item = Fault>) -> Self {
        Self::Aggregate(faults.into_iter().collect())
    }

    /// Strip aggregation wrappers, keeping the first underlying cause.
    ///
    /// An empty aggregate has no cause to expose and is returned as is.
    pub fn flatten(self) -> Self {
        match self {
            Self::Aggregate(mut faults) if !faults.is_empty() => faults.swap_remove(0).flatten(),
            other => other,
        }
    }

    /// Borrow the raised error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Raised(e) => e.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Whether the fault is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<futures::future::Aborted> for Fault {
    fn from(_: futures::future::Aborted) -> Self {
        Self::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn test_flatten_keeps_first_cause() {
        let fault = Fault::aggregate([
            Fault::aggregate([Fault::raise(DiskFull), Fault::msg("second")]),
            Fault::Cancelled,
        ]);
        let flat = fault.flatten();
        assert!(flat.downcast_ref::<DiskFull>().is_some());
    }

    #[test]
    fn test_flatten_leaves_plain_faults() {
        assert!(Fault::Cancelled.flatten().is_cancelled());
        assert_eq!(Fault::msg("boom").flatten().to_string(), "boom");
        assert!(matches!(Fault::aggregate([]).flatten(), Fault::Aggregate(v) if v.is_empty()));
    }

    #[test]
    fn test_aborted_is_cancellation() {
        let fault: Fault = futures::future::Aborted.into();
        assert!(fault.is_cancelled());
    }
}
