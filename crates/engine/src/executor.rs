//! Driving a built chain and shaping its outcome for the caller.
//!
//! Synchronous operations run the whole chain on the calling thread, blocking
//! on any asynchronous remainder. Future-returning operations run the
//! synchronous outer layers at call time and hand back a future for the rest;
//! that future settles once the chain's remainder and the future left in the
//! return slot have both settled. Every fault reaching the caller has its
//! aggregation wrappers stripped.

use futures::future::BoxFuture;
use weft_core::{wait, Completion, Fault, Layer, Result, ReturnShape, ReturnSlot, SharedValues, Value};

/// Future handed to callers of future-returning operations.
pub type AdvisedFuture = BoxFuture<'static, Result<Option<Value>>>;

/// What an advised call returns.
pub enum Returned {
    /// Outcome of a synchronous operation; `None` for unit
    Value(Option<Value>),
    /// Outcome of a future-returning operation
    Future(AdvisedFuture),
}

impl Returned {
    /// Whether the caller received a future.
    pub fn is_future(&self) -> bool {
        matches!(self, Self::Future(_))
    }

    /// Settled value of a synchronous operation.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => value.as_ref(),
            Self::Future(_) => None,
        }
    }

    /// Settled value of a synchronous operation, as a `T`.
    pub fn get<T: std::any::Any + Clone>(&self) -> Option<T> {
        self.value().and_then(|v| v.get::<T>())
    }

    /// Await the outcome, whatever the shape.
    pub async fn settle(self) -> Result<Option<Value>> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Future(future) => future.await,
        }
    }
}

impl std::fmt::Debug for Returned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Future(_) => f.write_str("Future"),
        }
    }
}

/// Run the chain headed by `head` for an operation of shape `shape`.
///
/// Only synchronous operations return `Err`; future-returning operations
/// always return a future, faulted if the chain failed early.
pub fn execute(head: &dyn Layer, values: SharedValues, shape: ReturnShape) -> Result<Returned> {
    let completion = head.invoke(&values);
    match shape {
        ReturnShape::Value => {
            wait(completion.map_err(Fault::flatten)?.settle()).map_err(Fault::flatten)?;
            let value = settled(take_slot(&values)).map_err(Fault::flatten)?;
            Ok(Returned::Value(value))
        }
        ReturnShape::Future => Ok(Returned::Future(Box::pin(finish(completion, values)))),
        ReturnShape::ValueFuture => Ok(Returned::Future(Box::pin(finish_with_value(completion, values)))),
    }
}

/// Settle a bare future; whatever the slot held is discarded.
async fn finish(completion: Result<Completion>, values: SharedValues) -> Result<Option<Value>> {
    finish_with_value(completion, values).await?;
    Ok(None)
}

async fn finish_with_value(completion: Result<Completion>, values: SharedValues) -> Result<Option<Value>> {
    completion.map_err(Fault::flatten)?.settle().await.map_err(Fault::flatten)?;
    let slot = take_slot(&values);
    match slot {
        ReturnSlot::Empty => Ok(None),
        ReturnSlot::Value(value) => Ok(Some(value)),
        ReturnSlot::Pending(pending) => pending.await.map_err(Fault::flatten),
    }
}

fn take_slot(values: &SharedValues) -> ReturnSlot {
    values.lock().take_return_slot()
}

/// Resolve a return slot on the calling thread.
fn settled(slot: ReturnSlot) -> Result<Option<Value>> {
    match slot {
        ReturnSlot::Empty => Ok(None),
        ReturnSlot::Value(value) => Ok(Some(value)),
        ReturnSlot::Pending(pending) => wait(pending),
    }
}
