//! Chain building: one layer per advice capability, innermost the pointcut.
//!
//! For each advice, outermost first, the capabilities nest as
//!
//! ```text
//! property → async method → method → parameter → (next advice) … → pointcut
//! ```

use crate::descriptor::SpecializedDescriptor;
use crate::introduction::FieldIntroducer;
use std::sync::Arc;
use weft_core::{
    Advice, AdviceInstance, Body, CallFrame, Completion, Layer, MethodAdvice,
    MethodAdviceContext, MethodAsyncAdvice, MethodAsyncAdviceContext, OperationInstance,
    ParameterAdvice, ParameterAdviceContext, PropertyAdvice, PropertyAdviceContext,
    PropertyBinding, Result, ReturnSlot, SharedValues,
};

/// Kind of layer an advice capability contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Bound to one parameter or the return slot
    Parameter(i32),
    /// Synchronous whole-operation advice
    Method,
    /// Asynchronous whole-operation advice
    AsyncMethod,
    /// Property accessor advice
    Property,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parameter(index) if *index < 0 => f.write_str("return"),
            Self::Parameter(index) => write!(f, "parameter {index}"),
            Self::Method => f.write_str("method"),
            Self::AsyncMethod => f.write_str("async method"),
            Self::Property => f.write_str("property"),
        }
    }
}

/// Layers `descriptor` produces, innermost first, excluding the pointcut.
pub fn plan(descriptor: &SpecializedDescriptor) -> Vec<(LayerKind, &AdviceInstance)> {
    let mut layers = Vec::new();
    for instance in descriptor.advices.iter().rev() {
        let advice = &instance.advice;
        if let (Some(_), Some(index)) = (advice.parameter(), instance.parameter_index) {
            layers.push((LayerKind::Parameter(index), instance));
        }
        if advice.method().is_some() {
            layers.push((LayerKind::Method, instance));
        }
        if advice.async_method().is_some() {
            layers.push((LayerKind::AsyncMethod, instance));
        }
        if advice.property().is_some() && descriptor.property.is_some() {
            layers.push((LayerKind::Property, instance));
        }
    }
    layers
}

/// Builds the layer stack for one call.
#[derive(Default)]
pub struct ChainBuilder<'a> {
    introducer: Option<&'a dyn FieldIntroducer>,
}

impl<'a> ChainBuilder<'a> {
    /// Builder that introduces no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder that introduces advice fields on the receiver before first use.
    pub fn with_introducer(introducer: &'a dyn FieldIntroducer) -> Self {
        Self {
            introducer: Some(introducer),
        }
    }

    /// Build the chain and return its outermost layer.
    pub fn build(&self, descriptor: &SpecializedDescriptor, values: &SharedValues) -> Arc<dyn Layer> {
        let target = values.lock().target().cloned();
        let mut introduced: Vec<&Advice> = Vec::new();

        let mut head: Arc<dyn Layer> = Arc::new(PointcutLayer {
            pointcut: descriptor.pointcut.clone(),
        });
        for (kind, instance) in plan(descriptor) {
            let advice = &instance.advice;
            if let (Some(introducer), Some(target)) = (self.introducer, &target) {
                if !introduced.iter().any(|a| a.ptr_eq(advice)) {
                    introducer.ensure_introduced(advice, target);
                    introduced.push(advice);
                }
            }
            head = wrap(kind, advice, descriptor, head);
        }
        head
    }
}

fn wrap(kind: LayerKind, advice: &Advice, descriptor: &SpecializedDescriptor, next: Arc<dyn Layer>) -> Arc<dyn Layer> {
    let operation = descriptor.advised.clone();
    match (kind, &descriptor.property) {
        (LayerKind::Parameter(index), _) => match advice.parameter() {
            Some(advice) => Arc::new(ParameterLayer {
                advice: advice.clone(),
                operation,
                index,
                next,
            }),
            None => next,
        },
        (LayerKind::Method, _) => match advice.method() {
            Some(advice) => Arc::new(MethodLayer {
                advice: advice.clone(),
                operation,
                next,
            }),
            None => next,
        },
        (LayerKind::AsyncMethod, _) => match advice.async_method() {
            Some(advice) => Arc::new(AsyncMethodLayer {
                advice: advice.clone(),
                operation,
                next,
            }),
            None => next,
        },
        (LayerKind::Property, Some(binding)) => match advice.property() {
            Some(advice) => Arc::new(PropertyLayer {
                advice: advice.clone(),
                operation,
                binding: binding.clone(),
                next,
            }),
            None => next,
        },
        (LayerKind::Property, None) => next,
    }
}

/// Innermost layer: calls the pointcut body, if there is one.
///
/// A future-returning body leaves its future in the return slot.
struct PointcutLayer {
    pointcut: Option<OperationInstance>,
}

impl Layer for PointcutLayer {
    fn invoke(&self, values: &SharedValues) -> Result<Completion> {
        let Some((pointcut, body)) = self
            .pointcut
            .as_ref()
            .and_then(|p| p.def.body.as_ref().map(|body| (p, body)))
        else {
            return Ok(Completion::Settled);
        };

        let frame = {
            let values = values.lock();
            CallFrame {
                target: values.target().cloned(),
                parameters: values.parameters().to_vec(),
                type_arguments: pointcut.type_arguments.to_vec(),
                method_arguments: pointcut.method_arguments.to_vec(),
            }
        };

        match body {
            Body::Sync(call) => {
                let returned = call(frame)?;
                values.lock().set_returned(returned);
                Ok(Completion::Settled)
            }
            Body::Async(call) => {
                values.lock().set_return_slot(ReturnSlot::Pending(call(frame)));
                Ok(Completion::Settled)
            }
        }
    }
}

struct MethodLayer {
    advice: Arc<dyn MethodAdvice>,
    operation: OperationInstance,
    next: Arc<dyn Layer>,
}

impl Layer for MethodLayer {
    fn invoke(&self, values: &SharedValues) -> Result<Completion> {
        let mut context = MethodAdviceContext::new(values, self.next.as_ref(), &self.operation);
        self.advice.advise(&mut context)?;
        Ok(context.into_completion())
    }
}

struct AsyncMethodLayer {
    advice: Arc<dyn MethodAsyncAdvice>,
    operation: OperationInstance,
    next: Arc<dyn Layer>,
}

impl Layer for AsyncMethodLayer {
    fn invoke(&self, values: &SharedValues) -> Result<Completion> {
        let advice = self.advice.clone();
        let mut context = MethodAsyncAdviceContext::new(values.clone(), self.next.clone(), self.operation.clone());
        Ok(Completion::pending(async move { advice.advise(&mut context).await }))
    }
}

struct ParameterLayer {
    advice: Arc<dyn ParameterAdvice>,
    operation: OperationInstance,
    index: i32,
    next: Arc<dyn Layer>,
}

impl Layer for ParameterLayer {
    fn invoke(&self, values: &SharedValues) -> Result<Completion> {
        let mut context = ParameterAdviceContext::new(values, self.next.as_ref(), &self.operation, self.index);
        self.advice.advise(&mut context)?;
        Ok(context.into_completion())
    }
}

struct PropertyLayer {
    advice: Arc<dyn PropertyAdvice>,
    operation: OperationInstance,
    binding: PropertyBinding,
    next: Arc<dyn Layer>,
}

impl Layer for PropertyLayer {
    fn invoke(&self, values: &SharedValues) -> Result<Completion> {
        let mut context = PropertyAdviceContext::new(values, self.next.as_ref(), &self.operation, &self.binding);
        self.advice.advise(&mut context)?;
        Ok(context.into_completion())
    }
}
