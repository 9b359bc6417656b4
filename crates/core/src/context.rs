//! Invocation state and the contexts advices receive.
//!
//! One [`AdviceValues`] is created per call and shared by every layer of
//! that call's chain. Layers are linked explicitly: each holds the next
//! one, and [`Layer::invoke`] returns a [`Completion`] that is either
//! already settled or a future the caller must drive.

use crate::fault::{Fault, Result};
use crate::id::{InvocationId, TypeKey};
use crate::operation::{OperationDef, OperationInstance, PendingValue, ReturnShape};
use crate::types::{PropertyBinding, PropertyDef};
use crate::value::{Target, Value};
use crate::wait::wait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

/// The return slot of an invocation.
#[derive(Default)]
pub enum ReturnSlot {
    /// Nothing returned (yet)
    #[default]
    Empty,
    /// A settled value
    Value(Value),
    /// A value still being computed
    Pending(PendingValue),
}

impl std::fmt::Debug for ReturnSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl ReturnSlot {
    /// Whether the slot holds a settled value.
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Whether the slot holds a future.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Mutable state of one invocation.
#[derive(Debug)]
pub struct AdviceValues {
    invocation: InvocationId,
    target: Option<Target>,
    declaring_type: TypeKey,
    parameters: Vec<Value>,
    return_slot: ReturnSlot,
}

/// Invocation state shared by the layers of one chain.
pub type SharedValues = Arc<Mutex<AdviceValues>>;

impl AdviceValues {
    /// Fresh state for a call.
    pub fn new(target: Option<Target>, declaring_type: TypeKey, parameters: Vec<Value>) -> Self {
        Self {
            invocation: InvocationId::new(),
            target,
            declaring_type,
            parameters,
            return_slot: ReturnSlot::Empty,
        }
    }

    /// Wrap for sharing across layers.
    pub fn shared(self) -> SharedValues {
        Arc::new(Mutex::new(self))
    }

    /// Invocation id.
    pub fn invocation(&self) -> InvocationId {
        self.invocation
    }

    /// Receiver.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Declaring type of the advised operation.
    pub fn declaring_type(&self) -> &TypeKey {
        &self.declaring_type
    }

    /// Parameter values.
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Mutable parameter values.
    pub fn parameters_mut(&mut self) -> &mut Vec<Value> {
        &mut self.parameters
    }

    /// Return slot.
    pub fn return_slot(&self) -> &ReturnSlot {
        &self.return_slot
    }

    /// Replace the return slot.
    pub fn set_return_slot(&mut self, slot: ReturnSlot) {
        self.return_slot = slot;
    }

    /// Store what a body returned.
    pub fn set_returned(&mut self, value: Option<Value>) {
        self.return_slot = value.map_or(ReturnSlot::Empty, ReturnSlot::Value);
    }

    /// Move the return slot out, leaving it empty.
    pub fn take_return_slot(&mut self) -> ReturnSlot {
        std::mem::take(&mut self.return_slot)
    }
}

/// How far a layer got when invoked.
#[must_use]
pub enum Completion {
    /// Everything already ran
    Settled,
    /// Work remains; drive the future to finish the chain
    Pending(BoxFuture<'static, Result<()>>),
}

impl Completion {
    /// A pending completion.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    /// Whether work remains.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Drive the remaining work, if any.
    pub async fn settle(self) -> Result<()> {
        match self {
            Self::Settled => Ok(()),
            Self::Pending(future) => future.await,
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Settled => f.write_str("Settled"),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// One link of an advice chain.
pub trait Layer: Send + Sync {
    /// Run this layer and, through it, every layer inside it.
    fn invoke(&self, values: &SharedValues) -> Result<Completion>;
}

/// Accessors shared by every per-call advice context.
///
/// Each accessor takes the invocation lock only for its own duration.
pub trait AdviceContext {
    /// Shared invocation state.
    fn values(&self) -> &SharedValues;

    /// Id of the current invocation.
    fn invocation_id(&self) -> InvocationId {
        self.values().lock().invocation()
    }

    /// Receiver, `None` for static operations.
    fn target(&self) -> Option<Target> {
        self.values().lock().target().cloned()
    }

    /// Declaring type of the advised operation.
    fn declaring_type(&self) -> TypeKey {
        self.values().lock().declaring_type().clone()
    }

    /// Parameter value at `index`.
    fn parameter(&self, index: usize) -> Option<Value> {
        self.values().lock().parameters().get(index).cloned()
    }

    /// Parameter value at `index`, as a `T`.
    fn parameter_as<T: Any + Clone>(&self, index: usize) -> Option<T> {
        self.parameter(index).and_then(|v| v.get::<T>())
    }

    /// Snapshot of all parameter values.
    fn parameters(&self) -> Vec<Value> {
        self.values().lock().parameters().to_vec()
    }

    /// Replace the parameter value at `index`.
    fn set_parameter(&self, index: usize, value: Value) -> Result<()> {
        let mut values = self.values().lock();
        let count = values.parameters().len();
        let slot = values
            .parameters_mut()
            .get_mut(index)
            .ok_or_else(|| Fault::msg(format!("parameter index {index} out of range ({count} parameters)")))?;
        *slot = value;
        Ok(())
    }

    /// Settled return value, if any.
    fn return_value(&self) -> Option<Value> {
        match self.values().lock().return_slot() {
            ReturnSlot::Value(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Settled return value, as a `T`.
    fn return_as<T: Any + Clone>(&self) -> Option<T> {
        self.return_value().and_then(|v| v.get::<T>())
    }

    /// Replace the return value.
    fn set_return_value(&self, value: Value) {
        self.values().lock().set_return_slot(ReturnSlot::Value(value));
    }

    /// Clear the return value.
    fn clear_return_value(&self) {
        self.values().lock().set_return_slot(ReturnSlot::Empty);
    }

    /// Replace the return value with one still being computed.
    fn set_pending_return(&self, future: PendingValue) {
        self.values().lock().set_return_slot(ReturnSlot::Pending(future));
    }

    /// Whether the return slot holds a future.
    fn has_pending_return(&self) -> bool {
        matches!(self.values().lock().return_slot(), ReturnSlot::Pending(_))
    }
}

/// Apply `f` to the return slot: now when settled or empty, on settlement
/// when pending.
fn map_slot<F>(values: &SharedValues, f: F) -> Result<()>
where
    F: FnOnce(Option<Value>) -> Result<Option<Value>> + Send + 'static,
{
    let slot = values.lock().take_return_slot();
    let value = match slot {
        ReturnSlot::Pending(pending) => {
            let mapped: PendingValue = Box::pin(async move {
                let value = pending.await?;
                f(value)
            });
            values.lock().set_return_slot(ReturnSlot::Pending(mapped));
            return Ok(());
        }
        ReturnSlot::Value(value) => Some(value),
        ReturnSlot::Empty => None,
    };
    let mapped = f(value)?;
    values.lock().set_returned(mapped);
    Ok(())
}

/// Apply `f` to the return value once `completion` and the slot have settled.
fn map_after<F>(completion: &mut Completion, values: &SharedValues, f: F) -> Result<()>
where
    F: FnOnce(Option<Value>) -> Result<Option<Value>> + Send + 'static,
{
    match std::mem::replace(completion, Completion::Settled) {
        Completion::Settled => map_slot(values, f),
        Completion::Pending(remainder) => {
            let values = values.clone();
            *completion = Completion::pending(async move {
                remainder.await?;
                map_slot(&values, f)
            });
            Ok(())
        }
    }
}

/// Invoke `next` from a synchronous advice.
///
/// For operations returning a plain value the call is finished before
/// returning: any asynchronous remainder is waited on and a pending return
/// slot settled, so code after `proceed` runs after every inner layer. For
/// future-returning operations the remainder is handed back untouched.
fn advance(values: &SharedValues, next: &dyn Layer, shape: ReturnShape) -> Result<Completion> {
    let completion = next.invoke(values)?;
    if shape.is_future() {
        return Ok(completion);
    }
    wait(completion.settle())?;
    let slot = values.lock().take_return_slot();
    match slot {
        ReturnSlot::Pending(pending) => {
            let value = wait(pending)?;
            values.lock().set_returned(value);
        }
        other => values.lock().set_return_slot(other),
    }
    Ok(Completion::Settled)
}

/// Context of a [`crate::MethodAdvice`].
pub struct MethodAdviceContext<'a> {
    values: &'a SharedValues,
    next: &'a dyn Layer,
    operation: &'a OperationInstance,
    completion: Completion,
}

impl<'a> MethodAdviceContext<'a> {
    /// Create a context in front of `next`.
    pub fn new(values: &'a SharedValues, next: &'a dyn Layer, operation: &'a OperationInstance) -> Self {
        Self {
            values,
            next,
            operation,
            completion: Completion::Settled,
        }
    }

    /// The advised operation.
    pub fn operation(&self) -> &OperationInstance {
        self.operation
    }

    /// Run the inner layers.
    ///
    /// For operations returning a plain value every inner layer and the
    /// body have finished when this returns. For future-returning
    /// operations asynchronous layers are carried outwards and have not run
    /// yet, and the body's result is a pending return slot; use
    /// [`Self::map_return`] to post-process it.
    pub fn proceed(&mut self) -> Result<()> {
        self.completion = advance(self.values, self.next, self.operation.def.returns)?;
        Ok(())
    }

    /// Whether inner layers left asynchronous work.
    pub fn is_pending(&self) -> bool {
        self.completion.is_pending()
    }

    /// Transform the return value after [`Self::proceed`].
    ///
    /// Settled results are transformed now. When the inner layers left
    /// asynchronous work, or the body left a future in the return slot, `f`
    /// runs once they settle, so synchronous advices can post-process the
    /// results of future-returning operations.
    pub fn map_return<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(Option<Value>) -> Result<Option<Value>> + Send + 'static,
    {
        map_after(&mut self.completion, self.values, f)
    }

    /// What the inner layers left behind.
    pub fn into_completion(self) -> Completion {
        self.completion
    }
}

impl AdviceContext for MethodAdviceContext<'_> {
    fn values(&self) -> &SharedValues {
        self.values
    }
}

/// Context of a [`crate::MethodAsyncAdvice`].
///
/// Owns its handles so it can live inside the call's future.
pub struct MethodAsyncAdviceContext {
    values: SharedValues,
    next: Arc<dyn Layer>,
    operation: OperationInstance,
}

impl MethodAsyncAdviceContext {
    /// Create a context in front of `next`.
    pub fn new(values: SharedValues, next: Arc<dyn Layer>, operation: OperationInstance) -> Self {
        Self {
            values,
            next,
            operation,
        }
    }

    /// The advised operation.
    pub fn operation(&self) -> &OperationInstance {
        &self.operation
    }

    /// Run the inner layers to completion.
    ///
    /// A pending return slot is awaited, so the settled value is readable
    /// afterwards.
    pub async fn proceed(&mut self) -> Result<()> {
        self.next.invoke(&self.values)?.settle().await?;
        let slot = self.values.lock().take_return_slot();
        match slot {
            ReturnSlot::Pending(pending) => {
                let value = pending.await?;
                self.values.lock().set_returned(value);
            }
            other => self.values.lock().set_return_slot(other),
        }
        Ok(())
    }
}

impl AdviceContext for MethodAsyncAdviceContext {
    fn values(&self) -> &SharedValues {
        &self.values
    }
}

/// Context of a [`crate::ParameterAdvice`].
pub struct ParameterAdviceContext<'a> {
    values: &'a SharedValues,
    next: &'a dyn Layer,
    operation: &'a OperationInstance,
    index: i32,
    completion: Completion,
}

impl<'a> ParameterAdviceContext<'a> {
    /// Create a context for parameter `index` ([`crate::RETURN_SLOT`] for the return slot).
    pub fn new(
        values: &'a SharedValues,
        next: &'a dyn Layer,
        operation: &'a OperationInstance,
        index: i32,
    ) -> Self {
        Self {
            values,
            next,
            operation,
            index,
            completion: Completion::Settled,
        }
    }

    /// The advised operation.
    pub fn operation(&self) -> &OperationInstance {
        self.operation
    }

    /// Bound position.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Whether the bound slot is the return value.
    pub fn is_return(&self) -> bool {
        self.index < 0
    }

    /// Declared name of the bound parameter; `None` for the return slot.
    pub fn name(&self) -> Option<&str> {
        self.operation.def.parameter_name(self.index)
    }

    /// Current value of the bound slot.
    pub fn value(&self) -> Option<Value> {
        match usize::try_from(self.index) {
            Ok(index) => self.parameter(index),
            Err(_) => self.return_value(),
        }
    }

    /// Replace the value of the bound slot.
    pub fn set_value(&self, value: Value) -> Result<()> {
        match usize::try_from(self.index) {
            Ok(index) => self.set_parameter(index, value),
            Err(_) => {
                self.set_return_value(value);
                Ok(())
            }
        }
    }

    /// Run the inner layers, as [`MethodAdviceContext::proceed`] does.
    pub fn proceed(&mut self) -> Result<()> {
        self.completion = advance(self.values, self.next, self.operation.def.returns)?;
        Ok(())
    }

    /// Transform the return value, as [`MethodAdviceContext::map_return`] does.
    pub fn map_return<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(Option<Value>) -> Result<Option<Value>> + Send + 'static,
    {
        map_after(&mut self.completion, self.values, f)
    }

    /// What the inner layers left behind.
    pub fn into_completion(self) -> Completion {
        self.completion
    }
}

impl AdviceContext for ParameterAdviceContext<'_> {
    fn values(&self) -> &SharedValues {
        self.values
    }
}

/// Context of a [`crate::PropertyAdvice`].
pub struct PropertyAdviceContext<'a> {
    values: &'a SharedValues,
    next: &'a dyn Layer,
    operation: &'a OperationInstance,
    binding: &'a PropertyBinding,
    completion: Completion,
}

impl<'a> PropertyAdviceContext<'a> {
    /// Create a context for `operation`, an accessor of `binding`.
    pub fn new(
        values: &'a SharedValues,
        next: &'a dyn Layer,
        operation: &'a OperationInstance,
        binding: &'a PropertyBinding,
    ) -> Self {
        Self {
            values,
            next,
            operation,
            binding,
            completion: Completion::Settled,
        }
    }

    /// The accessor being called.
    pub fn operation(&self) -> &OperationInstance {
        self.operation
    }

    /// The property.
    pub fn property(&self) -> &PropertyDef {
        &self.binding.property
    }

    /// Whether the setter is being called.
    pub fn is_setter(&self) -> bool {
        self.binding.is_setter
    }

    /// Whether the getter is being called.
    pub fn is_getter(&self) -> bool {
        !self.binding.is_setter
    }

    /// The value being assigned (setter) or returned (getter).
    pub fn value(&self) -> Option<Value> {
        if self.is_setter() {
            self.parameter(0)
        } else {
            self.return_value()
        }
    }

    /// Replace the value being assigned (setter) or returned (getter).
    pub fn set_value(&self, value: Value) -> Result<()> {
        if self.is_setter() {
            self.set_parameter(0, value)
        } else {
            self.set_return_value(value);
            Ok(())
        }
    }

    /// Run the inner layers, as [`MethodAdviceContext::proceed`] does.
    pub fn proceed(&mut self) -> Result<()> {
        self.completion = advance(self.values, self.next, self.operation.def.returns)?;
        Ok(())
    }

    /// Transform the return value, as [`MethodAdviceContext::map_return`] does.
    pub fn map_return<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(Option<Value>) -> Result<Option<Value>> + Send + 'static,
    {
        map_after(&mut self.completion, self.values, f)
    }

    /// What the inner layers left behind.
    pub fn into_completion(self) -> Completion {
        self.completion
    }
}

impl AdviceContext for PropertyAdviceContext<'_> {
    fn values(&self) -> &SharedValues {
        self.values
    }
}

/// Context of a [`crate::OperationInfoAdvice`].
pub struct OperationInfoContext<'a> {
    operation: &'a OperationDef,
}

impl<'a> OperationInfoContext<'a> {
    /// Create a context.
    pub fn new(operation: &'a OperationDef) -> Self {
        Self { operation }
    }

    /// The operation.
    pub fn operation(&self) -> &OperationDef {
        self.operation
    }
}

/// Context of a [`crate::PropertyInfoAdvice`].
pub struct PropertyInfoContext<'a> {
    property: &'a PropertyDef,
}

impl<'a> PropertyInfoContext<'a> {
    /// Create a context.
    pub fn new(property: &'a PropertyDef) -> Self {
        Self { property }
    }

    /// The property.
    pub fn property(&self) -> &PropertyDef {
        self.property
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::OperationId;
    use crate::operation::ReturnShape;

    /// Returns the sum of two `i32` parameters.
    struct Sum;

    impl Layer for Sum {
        fn invoke(&self, values: &SharedValues) -> Result<Completion> {
            let mut values = values.lock();
            let total: i32 = values.parameters().iter().filter_map(|v| v.get::<i32>()).sum();
            values.set_returned(Some(Value::new(total)));
            Ok(Completion::Settled)
        }
    }

    /// Settles the sum later.
    struct LateSum;

    impl Layer for LateSum {
        fn invoke(&self, values: &SharedValues) -> Result<Completion> {
            let values = values.clone();
            Ok(Completion::pending(async move { Sum.invoke(&values).map(|_| ()) }))
        }
    }

    fn values(params: Vec<i32>) -> SharedValues {
        AdviceValues::new(None, TypeKey::new("Calc"), params.into_iter().map(Value::new).collect()).shared()
    }

    fn operation() -> OperationInstance {
        operation_returning(ReturnShape::Value)
    }

    fn operation_returning(shape: ReturnShape) -> OperationInstance {
        OperationInstance::definition(Arc::new(
            OperationDef::new(OperationId::new("Calc", "add"))
                .parameter("a")
                .parameter("b")
                .returns(shape),
        ))
    }

    /// Stores the sum as a pending return value.
    struct FutureSum;

    impl Layer for FutureSum {
        fn invoke(&self, values: &SharedValues) -> Result<Completion> {
            let total: i32 = values.lock().parameters().iter().filter_map(|v| v.get::<i32>()).sum();
            values
                .lock()
                .set_return_slot(ReturnSlot::Pending(Box::pin(async move { Ok::<_, Fault>(Some(Value::new(total))) })));
            Ok(Completion::Settled)
        }
    }

    #[test]
    fn test_method_context_proceeds_and_rewrites() {
        let values = values(vec![1, 2]);
        let op = operation();
        let mut ctx = MethodAdviceContext::new(&values, &Sum, &op);

        ctx.set_parameter(0, Value::new(10)).unwrap();
        ctx.proceed().unwrap();
        assert_eq!(ctx.return_as::<i32>(), Some(12));
        assert!(!ctx.is_pending());
        assert!(ctx.set_parameter(5, Value::new(0)).is_err());
    }

    #[test]
    fn test_parameter_context_targets_slot() {
        let values = values(vec![3, 4]);
        let op = operation();

        let mut ctx = ParameterAdviceContext::new(&values, &Sum, &op, 1);
        assert_eq!(ctx.name(), Some("b"));
        ctx.set_value(Value::new(40)).unwrap();
        ctx.proceed().unwrap();

        let ret = ParameterAdviceContext::new(&values, &Sum, &op, crate::RETURN_SLOT);
        assert!(ret.is_return());
        assert_eq!(ret.name(), None);
        assert_eq!(ret.value().and_then(|v| v.get::<i32>()), Some(43));
    }

    #[test]
    fn test_property_context_reads_setter_argument() {
        let values = values(vec![9]);
        let binding = PropertyBinding {
            property: PropertyDef::new("Calc", "Total").setter("set_total"),
            is_setter: true,
        };
        let op = operation();
        let ctx = PropertyAdviceContext::new(&values, &Sum, &op, &binding);
        assert!(ctx.is_setter());
        assert_eq!(ctx.value().and_then(|v| v.get::<i32>()), Some(9));
    }

    #[tokio::test]
    async fn test_async_context_awaits_pending_layers() {
        let values = values(vec![20, 22]);
        let mut ctx = MethodAsyncAdviceContext::new(values, Arc::new(LateSum), operation());
        assert!(ctx.return_value().is_none());
        ctx.proceed().await.unwrap();
        assert_eq!(ctx.return_as::<i32>(), Some(42));
    }

    #[test]
    fn test_sync_proceed_carries_pending_remainder_for_futures() {
        let values = values(vec![1, 1]);
        let op = operation_returning(ReturnShape::ValueFuture);
        let mut ctx = MethodAdviceContext::new(&values, &LateSum, &op);
        ctx.proceed().unwrap();
        assert!(ctx.is_pending());
        assert!(ctx.return_value().is_none());

        futures::executor::block_on(ctx.into_completion().settle()).unwrap();
        assert!(values.lock().return_slot().is_value());
    }

    #[test]
    fn test_sync_proceed_finishes_value_operations() {
        let values = values(vec![1, 1]);
        let op = operation();

        let mut ctx = MethodAdviceContext::new(&values, &LateSum, &op);
        ctx.proceed().unwrap();
        assert!(!ctx.is_pending());
        assert_eq!(ctx.return_as::<i32>(), Some(2));

        let mut ctx = MethodAdviceContext::new(&values, &FutureSum, &op);
        ctx.proceed().unwrap();
        assert!(!ctx.has_pending_return());
        assert_eq!(ctx.return_as::<i32>(), Some(2));
    }

    #[test]
    fn test_map_return_settled_and_pending() {
        let values = values(vec![20, 1]);
        let op = operation_returning(ReturnShape::ValueFuture);
        let double = |value: Option<Value>| -> Result<Option<Value>> {
            Ok(value.and_then(|v| v.get::<i32>()).map(|n| Value::new(n * 2)))
        };

        let mut ctx = MethodAdviceContext::new(&values, &Sum, &op);
        ctx.proceed().unwrap();
        ctx.map_return(double).unwrap();
        assert_eq!(ctx.return_as::<i32>(), Some(42));

        let mut ctx = MethodAdviceContext::new(&values, &FutureSum, &op);
        ctx.proceed().unwrap();
        assert!(ctx.has_pending_return());
        ctx.map_return(double).unwrap();
        let ReturnSlot::Pending(pending) = values.lock().take_return_slot() else {
            panic!("return slot should still be pending");
        };
        let value = futures::executor::block_on(pending).unwrap();
        assert_eq!(value.and_then(|v| v.get::<i32>()), Some(42));
    }

    #[test]
    fn test_map_return_waits_for_asynchronous_remainder() {
        let values = values(vec![4, 4]);
        let op = operation_returning(ReturnShape::ValueFuture);
        let mut ctx = MethodAdviceContext::new(&values, &LateSum, &op);
        ctx.proceed().unwrap();
        ctx.map_return(|value| Ok(value.and_then(|v| v.get::<i32>()).map(|n| Value::new(n + 1))))
            .unwrap();
        assert!(ctx.is_pending());
        assert!(ctx.return_value().is_none());

        futures::executor::block_on(ctx.into_completion().settle()).unwrap();
        let ReturnSlot::Value(value) = values.lock().take_return_slot() else {
            panic!("return slot should be settled");
        };
        assert_eq!(value.get::<i32>(), Some(9));
    }

    #[test]
    fn test_map_return_fault_surfaces_when_settled() {
        let values = values(vec![1, 2]);
        let op = operation_returning(ReturnShape::ValueFuture);
        let mut ctx = MethodAdviceContext::new(&values, &FutureSum, &op);
        ctx.proceed().unwrap();
        ctx.map_return(|_| Err(Fault::msg("rejected"))).unwrap();
        let ReturnSlot::Pending(pending) = values.lock().take_return_slot() else {
            panic!("return slot should still be pending");
        };
        assert!(futures::executor::block_on(pending).is_err());
    }

    #[tokio::test]
    async fn test_async_context_settles_pending_return() {
        let values = values(vec![40, 2]);
        let op = operation_returning(ReturnShape::ValueFuture);
        let mut ctx = MethodAsyncAdviceContext::new(values, Arc::new(FutureSum), op);
        ctx.proceed().await.unwrap();
        assert_eq!(ctx.return_as::<i32>(), Some(42));
    }
}
