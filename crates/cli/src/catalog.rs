//! Advices and bodies manifests can name.
//!
//! Values flowing through these are `serde_json::Value`s.

use async_trait::async_trait;
use serde_json::Value as Json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;
use weft_core::{
    Advice, AdviceContext, Body, CallFrame, Fault, MethodAdvice, MethodAdviceContext,
    MethodAsyncAdvice, MethodAsyncAdviceContext, OperationInfoAdvice, OperationInfoContext,
    ParameterAdvice, ParameterAdviceContext, Result, Value,
};
use weft_registry::AdviceCatalog;

/// Logs entry and exit of the synchronous part of a call.
struct Trace;

impl MethodAdvice for Trace {
    fn advise(&self, context: &mut MethodAdviceContext<'_>) -> Result<()> {
        let operation = context.operation().to_string();
        info!(%operation, invocation = %context.invocation_id(), "Enter");
        context.proceed()?;
        let pending = context.is_pending() || context.has_pending_return();
        info!(%operation, pending, "Leave");
        Ok(())
    }
}

/// Measures the whole call, including asynchronous work.
struct Timing;

#[async_trait]
impl MethodAsyncAdvice for Timing {
    async fn advise(&self, context: &mut MethodAsyncAdviceContext) -> Result<()> {
        let started = Instant::now();
        let outcome = context.proceed().await;
        info!(
            operation = %context.operation(),
            elapsed_us = elapsed_micros(started),
            ok = outcome.is_ok(),
            "Timed"
        );
        outcome
    }
}

/// Microseconds since `started`, saturating at `u64::MAX`.
fn elapsed_micros(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Rejects `null` in the bound slot.
struct NotNull;

impl ParameterAdvice for NotNull {
    fn advise(&self, context: &mut ParameterAdviceContext<'_>) -> Result<()> {
        if !context.is_return() && is_null(context.value()) {
            let name = context.name().unwrap_or("?").to_string();
            return Err(Fault::msg(format!("parameter `{name}` must not be null")));
        }
        context.proceed()?;
        if context.is_return() && !context.operation().def.returns.is_future() && is_null(context.value()) {
            return Err(Fault::msg(format!("{} returned null", context.operation())));
        }
        Ok(())
    }
}

fn is_null(value: Option<Value>) -> bool {
    matches!(value.and_then(|v| v.get::<Json>()), Some(Json::Null))
}

/// Counts calls per receiver in an introduced field.
struct Counter;

impl MethodAdvice for Counter {
    fn advise(&self, context: &mut MethodAdviceContext<'_>) -> Result<()> {
        if let Some(calls) = context.target().and_then(|t| t.field("Counter", "calls")) {
            if let Some(calls) = calls.downcast_ref::<AtomicU64>() {
                let n = calls.fetch_add(1, Ordering::Relaxed) + 1;
                info!(operation = %context.operation(), calls = n, "Counted");
            }
        }
        context.proceed()
    }
}

/// Prints operation signatures when info advices are processed.
struct Signature;

impl OperationInfoAdvice for Signature {
    fn advise(&self, context: &OperationInfoContext<'_>) {
        let op = context.operation();
        let params: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        println!("{}({}) -> {:?}", op.id, params.join(", "), op.returns);
    }
}

fn json_args(frame: &CallFrame) -> Vec<Json> {
    frame.parameters.iter().filter_map(|v| v.get::<Json>()).collect()
}

fn sum(frame: &CallFrame) -> std::result::Result<Option<Value>, Fault> {
    let mut total = 0.0;
    for arg in json_args(frame) {
        total += arg
            .as_f64()
            .ok_or_else(|| Fault::msg(format!("not a number: {arg}")))?;
    }
    Ok(Some(Value::new(Json::from(total))))
}

/// The built-in catalog.
pub fn builtin() -> AdviceCatalog {
    AdviceCatalog::new()
        .with_advice("trace", Advice::builder("Trace", Trace).method().build())
        .with_advice("timing", Advice::builder("Timing", Timing).async_method().build())
        .with_advice("not_null", Advice::builder("NotNull", NotNull).parameter().build())
        .with_advice(
            "counter",
            Advice::builder("Counter", Counter)
                .method()
                .introduce("calls", || Value::new(AtomicU64::new(0)))
                .build(),
        )
        .with_advice("signature", Advice::builder("Signature", Signature).operation_info().build())
        .with_body("echo", Body::sync(|frame| Ok(frame.parameters.first().cloned())))
        .with_body("sum", Body::sync(|frame| sum(&frame)))
        .with_body("sum_later", Body::future(|frame| async move { sum(&frame) }))
        .with_body(
            "concat",
            Body::sync(|frame| {
                let text: String = json_args(&frame)
                    .iter()
                    .map(|a| a.as_str().map_or_else(|| a.to_string(), str::to_string))
                    .collect();
                Ok(Some(Value::new(Json::from(text))))
            }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use weft_core::{OperationDef, OperationId, ParameterDef, ReturnShape, Scope, Target, TypeDef};
    use weft_engine::{CallSite, Engine};
    use weft_registry::Registry;

    fn engine(body: &str, advices: &[&str]) -> (Engine, OperationId) {
        let catalog = builtin();
        let mut registry = Registry::new();
        registry.register_type(TypeDef::new("Calc", "demo")).unwrap();
        let id = OperationId::new("Calc", "run");
        let mut def = OperationDef::new(id.clone()).body(catalog.body(body).unwrap());
        def.parameters = vec![ParameterDef { name: "a".into() }, ParameterDef { name: "b".into() }];
        if body.ends_with("later") {
            def.returns = ReturnShape::ValueFuture;
        }
        registry.register_operation(def).unwrap();
        for name in advices {
            registry.attach(catalog.advice(name).unwrap(), Scope::operation(id.clone())).unwrap();
        }
        (Engine::new(Arc::new(registry)), id)
    }

    fn call(id: &OperationId, args: [Json; 2]) -> CallSite {
        CallSite::new(id.clone())
            .on(Target::new(()))
            .args(args.into_iter().map(Value::new).collect())
    }

    #[test]
    fn test_sum_with_trace_and_counter() {
        let (engine, id) = engine("sum", &["trace", "counter"]);
        let target = Target::new(());
        let site = CallSite::new(id.clone()).on(target.clone()).arg(json!(2)).arg(json!(3.5));
        let returned = engine.proceed(site).unwrap();
        assert_eq!(returned.get::<Json>(), Some(json!(5.5)));

        engine.proceed(call(&id, [json!(1), json!(1)]).on(target.clone())).unwrap();
        let calls = target.field("Counter", "calls").unwrap();
        assert_eq!(calls.downcast_ref::<AtomicU64>().unwrap().load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_not_null_rejects_before_body() {
        let (engine, id) = engine("sum", &["not_null"]);
        let err = engine.proceed(call(&id, [json!(1), Json::Null])).unwrap_err();
        assert!(err.to_string().contains("`b` must not be null"));
    }

    #[test]
    fn test_elapsed_micros_is_monotonic() {
        let started = Instant::now();
        let first = elapsed_micros(started);
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(elapsed_micros(started) >= first + 1_000);
    }

    #[tokio::test]
    async fn test_trace_on_future_body_sees_settled_sum() {
        let (engine, id) = engine("sum_later", &["trace", "counter"]);
        let target = Target::new(());
        let value = engine
            .proceed(call(&id, [json!(1), json!(2)]).on(target.clone()))
            .unwrap()
            .settle()
            .await
            .unwrap();
        assert_eq!(value.and_then(|v| v.get::<Json>()), Some(json!(3.0)));
        let calls = target.field("Counter", "calls").unwrap();
        assert_eq!(calls.downcast_ref::<AtomicU64>().unwrap().load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_timing_on_future_body() {
        let (engine, id) = engine("sum_later", &["timing"]);
        let value = engine
            .proceed(call(&id, [json!(40), json!(2)]))
            .unwrap()
            .settle()
            .await
            .unwrap();
        assert_eq!(value.and_then(|v| v.get::<Json>()), Some(json!(42.0)));
    }
}
