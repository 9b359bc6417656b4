//! Weft core model.
//!
//! This crate defines what flows through an advice chain: operation and
//! type definitions, advice attachments, type-erased values, faults, and
//! the contexts each advice capability receives.

#![warn(missing_docs)]

// Identities
mod id;

// Definitions
mod types;
mod operation;
mod declaration;

// Execution
mod value;
mod fault;
mod advice;
mod context;
mod wait;

// Re-exports
pub use id::*;

pub use types::{TypeDef, PropertyDef, PropertyBinding};
pub use operation::{
    OperationDef, OperationKind, OperationInstance, ParameterDef, ReturnShape,
    Body, BodyResult, CallFrame, PendingValue,
};
pub use declaration::{AdviceDeclaration, Scope, PointcutRules, Priority, RETURN_SLOT};

pub use value::{Value, Target};
pub use fault::{Fault, Result};
pub use advice::{
    Advice, AdviceBuilder, AdviceInstance, Capabilities, IntroducedField,
    MethodAdvice, MethodAsyncAdvice, PropertyAdvice, ParameterAdvice,
    OperationInfoAdvice, PropertyInfoAdvice,
};
pub use context::{
    AdviceValues, SharedValues, ReturnSlot, Completion, Layer, AdviceContext,
    MethodAdviceContext, MethodAsyncAdviceContext, ParameterAdviceContext,
    PropertyAdviceContext, OperationInfoContext, PropertyInfoContext,
};
pub use wait::wait;
