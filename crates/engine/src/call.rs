//! What generated call sites hand the engine.

use std::any::Any;
use weft_core::{OperationId, Target, TypeKey, Value};

/// One intercepted call.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Declared operation; advices are gathered for it and it keys the cache
    pub operation: OperationId,
    /// Operation whose body runs innermost; `None` when the caller has none
    pub inner: Option<OperationId>,
    /// Receiver, `None` for static operations
    pub target: Option<Target>,
    /// Argument values, by position
    pub parameters: Vec<Value>,
    /// Type advices see as declaring the operation; defaults to the advised operation's
    pub declaring_type: Option<TypeKey>,
    /// Receiver implemented entirely by advices
    pub abstracted_target: bool,
    /// Generic arguments: the declaring type's, then the operation's own
    pub generic_arguments: Vec<TypeKey>,
}

impl CallSite {
    /// A call whose own body runs innermost.
    pub fn new(operation: OperationId) -> Self {
        Self {
            inner: Some(operation.clone()),
            ..Self::interface(operation)
        }
    }

    /// A call with no body of its own, such as an auto-implemented interface member.
    pub fn interface(operation: OperationId) -> Self {
        Self {
            operation,
            inner: None,
            target: None,
            parameters: Vec::new(),
            declaring_type: None,
            abstracted_target: false,
            generic_arguments: Vec::new(),
        }
    }

    /// Run `inner`'s body innermost instead.
    pub fn inner(mut self, inner: OperationId) -> Self {
        self.inner = Some(inner);
        self
    }

    /// Set the receiver.
    pub fn on(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Append an argument.
    pub fn arg<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.parameters.push(Value::new(value));
        self
    }

    /// Replace all arguments.
    pub fn args(mut self, values: Vec<Value>) -> Self {
        self.parameters = values;
        self
    }

    /// Override the declaring type advices observe.
    pub fn declared_on(mut self, declaring_type: impl Into<String>) -> Self {
        self.declaring_type = Some(TypeKey::new(declaring_type));
        self
    }

    /// Mark the receiver as implemented entirely by advices.
    pub fn abstracted(mut self) -> Self {
        self.abstracted_target = true;
        self
    }

    /// Bind generic arguments.
    pub fn generic_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_arguments = arguments.into_iter().map(|a| TypeKey::new(a)).collect();
        self
    }
}
