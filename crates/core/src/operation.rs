//! Operation definitions: the interceptable members advices attach to.

use crate::declaration::PointcutRules;
use crate::fault::Fault;
use crate::id::{OperationId, TypeKey};
use crate::value::{Target, Value};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

/// What kind of member an operation is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Plain method
    #[default]
    Method,
    /// Constructor (has no return slot)
    Constructor,
    /// Property getter
    Getter {
        /// Property name
        property: String,
    },
    /// Property setter
    Setter {
        /// Property name
        property: String,
    },
}

impl OperationKind {
    /// The accessed property and whether the accessor is the setter.
    pub fn accessor(&self) -> Option<(&str, bool)> {
        match self {
            Self::Getter { property } => Some((property, false)),
            Self::Setter { property } => Some((property, true)),
            _ => None,
        }
    }
}

/// Declared return shape of an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    /// Synchronous, possibly unit
    #[default]
    Value,
    /// A future carrying nothing
    Future,
    /// A future carrying a value
    ValueFuture,
}

impl ReturnShape {
    /// Whether callers receive a future.
    pub fn is_future(self) -> bool {
        !matches!(self, Self::Value)
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name
    pub name: String,
}

/// Outcome of a synchronous body.
pub type BodyResult = Result<Option<Value>, Fault>;

/// A future produced by an asynchronous body.
pub type PendingValue = BoxFuture<'static, BodyResult>;

type SyncFn = dyn Fn(CallFrame) -> BodyResult + Send + Sync;
type AsyncFn = dyn Fn(CallFrame) -> PendingValue + Send + Sync;

/// The implementation behind a pointcut.
#[derive(Clone)]
pub enum Body {
    /// Runs to completion on the calling thread.
    Sync(Arc<SyncFn>),
    /// Returns a future.
    Async(Arc<AsyncFn>),
}

impl Body {
    /// A synchronous body.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(CallFrame) -> BodyResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// An asynchronous body.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(CallFrame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BodyResult> + Send + 'static,
    {
        Self::Async(Arc::new(move |frame| Box::pin(f(frame))))
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Body::Sync"),
            Self::Async(_) => f.write_str("Body::Async"),
        }
    }
}

/// Everything a body receives when the innermost layer calls it.
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    /// Receiver, `None` for static operations
    pub target: Option<Target>,
    /// Current parameter values, after every advice has had its say
    pub parameters: Vec<Value>,
    /// Arguments bound to the declaring type's generic parameters
    pub type_arguments: Vec<TypeKey>,
    /// Arguments bound to the operation's own generic parameters
    pub method_arguments: Vec<TypeKey>,
}

impl CallFrame {
    /// Parameter at `index`, as a `T`.
    pub fn arg<T: std::any::Any + Clone>(&self, index: usize) -> Result<T, Fault> {
        self.parameters
            .get(index)
            .and_then(|v| v.get::<T>())
            .ok_or_else(|| {
                Fault::msg(format!(
                    "parameter {index} is not a {}",
                    std::any::type_name::<T>()
                ))
            })
    }
}

/// Definition of an interceptable operation.
#[derive(Debug, Clone)]
pub struct OperationDef {
    /// Identity
    pub id: OperationId,
    /// Member kind
    pub kind: OperationKind,
    /// Declared parameters, by position
    pub parameters: Vec<ParameterDef>,
    /// Declared return shape
    pub returns: ReturnShape,
    /// Number of the operation's own generic parameters
    pub generic_arity: usize,
    /// Operation-local rules over advice type names, applied after the advices' own selectors
    pub advice_rules: PointcutRules,
    /// Implementation; `None` for abstract or interface members
    pub body: Option<Body>,
}

impl OperationDef {
    /// A method with no parameters and a synchronous return.
    pub fn new(id: OperationId) -> Self {
        Self {
            id,
            kind: OperationKind::Method,
            parameters: Vec::new(),
            returns: ReturnShape::Value,
            generic_arity: 0,
            advice_rules: PointcutRules::default(),
            body: None,
        }
    }

    /// Set the member kind.
    pub fn kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Append a parameter.
    pub fn parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParameterDef { name: name.into() });
        self
    }

    /// Set the return shape.
    pub fn returns(mut self, shape: ReturnShape) -> Self {
        self.returns = shape;
        self
    }

    /// Declare own generic parameters.
    pub fn generic(mut self, arity: usize) -> Self {
        self.generic_arity = arity;
        self
    }

    /// Exclude advices whose type name matches `pattern`.
    pub fn exclude_advices(mut self, pattern: impl Into<String>) -> Self {
        self.advice_rules.exclude.push(pattern.into());
        self
    }

    /// Set the implementation.
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether the operation has a return slot (constructors do not).
    pub fn has_return_slot(&self) -> bool {
        !matches!(self.kind, OperationKind::Constructor)
    }

    /// Name of the parameter at `index`; `None` for the return slot.
    pub fn parameter_name(&self, index: i32) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.parameters.get(i))
            .map(|p| p.name.as_str())
    }
}

/// An operation definition bound to concrete generic arguments.
///
/// Non-generic operations are instances with empty argument lists.
#[derive(Debug, Clone)]
pub struct OperationInstance {
    /// The definition
    pub def: Arc<OperationDef>,
    /// Arguments for the declaring type's generic parameters
    pub type_arguments: Arc<[TypeKey]>,
    /// Arguments for the operation's own generic parameters
    pub method_arguments: Arc<[TypeKey]>,
}

impl OperationInstance {
    /// The definition itself, unbound.
    pub fn definition(def: Arc<OperationDef>) -> Self {
        Self {
            def,
            type_arguments: Arc::from(Vec::new()),
            method_arguments: Arc::from(Vec::new()),
        }
    }

    /// Identity of the underlying definition.
    pub fn id(&self) -> &OperationId {
        &self.def.id
    }

    /// Whether any generic argument is bound.
    pub fn is_instantiated(&self) -> bool {
        !self.type_arguments.is_empty() || !self.method_arguments.is_empty()
    }
}

impl std::fmt::Display for OperationInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.def.id.declaring_type)?;
        write_arguments(f, &self.type_arguments)?;
        write!(f, "::{}", self.def.id.member)?;
        write_arguments(f, &self.method_arguments)
    }
}

fn write_arguments(f: &mut std::fmt::Formatter<'_>, args: &[TypeKey]) -> std::fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    let names: Vec<&str> = args.iter().map(TypeKey::as_str).collect();
    write!(f, "<{}>", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_builder() {
        let op = OperationDef::new(OperationId::new("Cart", "add"))
            .parameter("item")
            .parameter("count")
            .returns(ReturnShape::ValueFuture)
            .exclude_advices("Audit*");

        assert_eq!(op.parameters.len(), 2);
        assert_eq!(op.parameter_name(1), Some("count"));
        assert_eq!(op.parameter_name(-1), None);
        assert!(op.has_return_slot());
        assert!(op.returns.is_future());
        assert_eq!(op.advice_rules.exclude, vec!["Audit*".to_string()]);
    }

    #[test]
    fn test_constructor_has_no_return_slot() {
        let op = OperationDef::new(OperationId::new("Cart", "new")).kind(OperationKind::Constructor);
        assert!(!op.has_return_slot());
    }

    #[test]
    fn test_instance_display() {
        let def = Arc::new(OperationDef::new(OperationId::new("Repo", "find")).generic(1));
        let instance = OperationInstance {
            def,
            type_arguments: Arc::from(vec![TypeKey::new("User")]),
            method_arguments: Arc::from(vec![TypeKey::new("Uuid")]),
        };
        assert_eq!(instance.to_string(), "Repo<User>::find<Uuid>");
        assert!(instance.is_instantiated());
    }

    #[test]
    fn test_call_frame_arg() {
        let frame = CallFrame {
            parameters: vec![Value::new(7_i64)],
            ..Default::default()
        };
        assert_eq!(frame.arg::<i64>(0).unwrap(), 7);
        assert!(frame.arg::<String>(0).is_err());
        assert!(frame.arg::<i64>(3).is_err());
    }
}
