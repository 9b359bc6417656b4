//! Advices and registries shared by the engine tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use weft_core::{
    Advice, AdviceContext, Body, Fault, MethodAdvice, MethodAdviceContext, MethodAsyncAdvice,
    MethodAsyncAdviceContext, OperationDef, OperationId, OperationKind, ParameterAdvice,
    ParameterAdviceContext, PropertyAdvice, PropertyAdviceContext, PropertyDef, Result,
    ReturnShape, TypeDef, Value,
};
use weft_registry::Registry;

/// Entries pushed by recording advices, in execution order.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

/// Logs `name>` before and `<name` after proceeding.
pub struct Recorder {
    name: String,
    journal: Journal,
}

impl Recorder {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
        }
    }

    /// A method advice named `name`, with its own journal.
    pub fn advice(name: &str, priority: Option<i32>) -> (Advice, Journal) {
        let journal = journal();
        (Self::advice_into(name, priority, &journal), journal)
    }

    /// A method advice named `name`, logging into `journal`.
    pub fn advice_into(name: &str, priority: Option<i32>, journal: &Journal) -> Advice {
        let builder = Advice::builder(name, Self::new(name, journal)).method();
        match priority {
            Some(level) => builder.priority(level).build(),
            None => builder.build(),
        }
    }

    fn push(&self, entry: String) {
        self.journal.lock().push(entry);
    }
}

impl MethodAdvice for Recorder {
    fn advise(&self, context: &mut MethodAdviceContext<'_>) -> Result<()> {
        self.push(format!("{}>", self.name));
        context.proceed()?;
        self.push(format!("<{}", self.name));
        Ok(())
    }
}

#[async_trait]
impl MethodAsyncAdvice for Recorder {
    async fn advise(&self, context: &mut MethodAsyncAdviceContext) -> Result<()> {
        self.push(format!("{}>>", self.name));
        context.proceed().await?;
        self.push(format!("<<{}", self.name));
        Ok(())
    }
}

impl ParameterAdvice for Recorder {
    fn advise(&self, context: &mut ParameterAdviceContext<'_>) -> Result<()> {
        self.push(format!("{}[{}]", self.name, context.index()));
        context.proceed()
    }
}

impl PropertyAdvice for Recorder {
    fn advise(&self, context: &mut PropertyAdviceContext<'_>) -> Result<()> {
        let role = if context.is_setter() { "set" } else { "get" };
        self.push(format!("{}:{}:{}", self.name, role, context.property().name));
        context.proceed()
    }
}

/// Doubles an `i32` result once the inner layers have finished, even when
/// the result is still a future.
pub struct Doubler;

#[async_trait]
impl MethodAsyncAdvice for Doubler {
    async fn advise(&self, context: &mut MethodAsyncAdviceContext) -> Result<()> {
        context.proceed().await?;
        if let Some(value) = context.return_as::<i32>() {
            context.set_return_value(Value::new(value * 2));
        }
        Ok(())
    }
}

impl MethodAdvice for Doubler {
    fn advise(&self, context: &mut MethodAdviceContext<'_>) -> Result<()> {
        context.proceed()?;
        context.map_return(|value| {
            Ok(value.map(|v| match v.get::<i32>() {
                Some(n) => Value::new(n * 2),
                None => v,
            }))
        })
    }
}

/// Error raised by failing bodies.
#[derive(Debug, thiserror::Error)]
#[error("disk full")]
pub struct DiskFull;

/// `Calc` in module `math`:
///
/// * `add(a, b)`: synchronous sum
/// * `add_later(a, b)`: sum computed by a future
/// * `tick()`: future with no value
/// * `fail()` / `fail_later()`: raise [`DiskFull`]
/// * `Total` property with `get_total` / `set_total`
pub fn calc() -> Registry {
    let mut registry = Registry::new();
    registry.register_type(TypeDef::new("Calc", "math")).unwrap();
    registry
        .register_property(PropertyDef::new("Calc", "Total").getter("get_total").setter("set_total"))
        .unwrap();
    registry
        .register_operation(
            OperationDef::new(OperationId::new("Calc", "add"))
                .parameter("a")
                .parameter("b")
                .body(Body::sync(|frame| {
                    Ok(Some(Value::new(frame.arg::<i32>(0)? + frame.arg::<i32>(1)?)))
                })),
        )
        .unwrap();
    registry
        .register_operation(
            OperationDef::new(OperationId::new("Calc", "add_later"))
                .parameter("a")
                .parameter("b")
                .returns(ReturnShape::ValueFuture)
                .body(Body::future(|frame| async move {
                    Ok(Some(Value::new(frame.arg::<i32>(0)? + frame.arg::<i32>(1)?)))
                })),
        )
        .unwrap();
    registry
        .register_operation(
            OperationDef::new(OperationId::new("Calc", "tick"))
                .returns(ReturnShape::Future)
                .body(Body::future(|_| async { Ok(None) })),
        )
        .unwrap();
    registry
        .register_operation(
            OperationDef::new(OperationId::new("Calc", "fail")).body(Body::sync(|_| Err(Fault::raise(DiskFull)))),
        )
        .unwrap();
    registry
        .register_operation(
            OperationDef::new(OperationId::new("Calc", "fail_later"))
                .returns(ReturnShape::ValueFuture)
                .body(Body::future(|_| async { Err(Fault::raise(DiskFull)) })),
        )
        .unwrap();
    registry
        .register_operation(
            OperationDef::new(OperationId::new("Calc", "get_total"))
                .kind(OperationKind::Getter { property: "Total".into() })
                .body(Body::sync(|frame| {
                    Ok(frame.target.and_then(|t| t.field("Calc", "total")))
                })),
        )
        .unwrap();
    registry
        .register_operation(
            OperationDef::new(OperationId::new("Calc", "set_total"))
                .kind(OperationKind::Setter { property: "Total".into() })
                .parameter("value")
                .body(Body::sync(|frame| {
                    if let (Some(target), Some(value)) = (&frame.target, frame.parameters.first()) {
                        target.set_field("Calc", "total", value.clone());
                    }
                    Ok(None)
                })),
        )
        .unwrap();
    registry
}

pub fn op(member: &str) -> OperationId {
    OperationId::new("Calc", member)
}
