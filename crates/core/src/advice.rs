//! Advices and the capabilities they implement.

use crate::context::{
    MethodAdviceContext, MethodAsyncAdviceContext, OperationInfoContext, ParameterAdviceContext,
    PropertyAdviceContext, PropertyInfoContext,
};
use crate::declaration::PointcutRules;
use crate::fault::Result;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;

/// Advice around a whole operation, run synchronously at call time.
pub trait MethodAdvice: Send + Sync {
    /// Run the advice; call `context.proceed()` to reach the next layer.
    fn advise(&self, context: &mut MethodAdviceContext<'_>) -> Result<()>;
}

/// Advice around a whole operation, run when the call's future is polled.
#[async_trait]
pub trait MethodAsyncAdvice: Send + Sync {
    /// Run the advice; await `context.proceed()` to reach the next layer.
    async fn advise(&self, context: &mut MethodAsyncAdviceContext) -> Result<()>;
}

/// Advice around a property accessor.
pub trait PropertyAdvice: Send + Sync {
    /// Run the advice.
    fn advise(&self, context: &mut PropertyAdviceContext<'_>) -> Result<()>;
}

/// Advice bound to one parameter or to the return slot.
pub trait ParameterAdvice: Send + Sync {
    /// Run the advice.
    fn advise(&self, context: &mut ParameterAdviceContext<'_>) -> Result<()>;
}

/// Advice run once per operation definition, on metadata only.
pub trait OperationInfoAdvice: Send + Sync {
    /// Inspect the operation.
    fn advise(&self, context: &OperationInfoContext<'_>);
}

/// Advice run once per property definition, on metadata only.
pub trait PropertyInfoAdvice: Send + Sync {
    /// Inspect the property.
    fn advise(&self, context: &PropertyInfoContext<'_>);
}

/// Capabilities an advice implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Implements [`MethodAdvice`]
    pub method: bool,
    /// Implements [`MethodAsyncAdvice`]
    pub async_method: bool,
    /// Implements [`PropertyAdvice`]
    pub property: bool,
    /// Implements [`ParameterAdvice`]
    pub parameter: bool,
    /// Implements [`OperationInfoAdvice`]
    pub operation_info: bool,
    /// Implements [`PropertyInfoAdvice`]
    pub property_info: bool,
}

/// A field an advice introduces on every receiver it advises.
#[derive(Clone)]
pub struct IntroducedField {
    /// Field name, scoped by the advice type
    pub name: String,
    init: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl IntroducedField {
    /// Initial value of the field.
    pub fn initial_value(&self) -> Value {
        (self.init)()
    }
}

impl std::fmt::Debug for IntroducedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntroducedField").field("name", &self.name).finish()
    }
}

struct AdviceParts {
    type_name: String,
    priority: Option<i32>,
    rules: PointcutRules,
    introduced: Vec<IntroducedField>,
    method: Option<Arc<dyn MethodAdvice>>,
    async_method: Option<Arc<dyn MethodAsyncAdvice>>,
    property: Option<Arc<dyn PropertyAdvice>>,
    parameter: Option<Arc<dyn ParameterAdvice>>,
    operation_info: Option<Arc<dyn OperationInfoAdvice>>,
    property_info: Option<Arc<dyn PropertyInfoAdvice>>,
}

/// A materialized advice: one object plus its declared metadata.
///
/// Clones share the object; identity is the shared allocation.
#[derive(Clone)]
pub struct Advice {
    parts: Arc<AdviceParts>,
}

impl Advice {
    /// Start describing an advice of type `type_name` backed by `advice`.
    pub fn builder<A>(type_name: impl Into<String>, advice: A) -> AdviceBuilder<A>
    where
        A: Send + Sync + 'static,
    {
        AdviceBuilder::new(type_name, advice)
    }

    /// Advice type name, matched by operation-local advice rules.
    pub fn type_name(&self) -> &str {
        &self.parts.type_name
    }

    /// Declared priority, if any.
    pub fn priority(&self) -> Option<i32> {
        self.parts.priority
    }

    /// The advice's own pointcut rules over operation names.
    pub fn rules(&self) -> &PointcutRules {
        &self.parts.rules
    }

    /// Fields introduced on advised receivers.
    pub fn introduced_fields(&self) -> &[IntroducedField] {
        &self.parts.introduced
    }

    /// Operation capability.
    pub fn method(&self) -> Option<&Arc<dyn MethodAdvice>> {
        self.parts.method.as_ref()
    }

    /// Asynchronous operation capability.
    pub fn async_method(&self) -> Option<&Arc<dyn MethodAsyncAdvice>> {
        self.parts.async_method.as_ref()
    }

    /// Property capability.
    pub fn property(&self) -> Option<&Arc<dyn PropertyAdvice>> {
        self.parts.property.as_ref()
    }

    /// Parameter capability.
    pub fn parameter(&self) -> Option<&Arc<dyn ParameterAdvice>> {
        self.parts.parameter.as_ref()
    }

    /// Operation metadata capability.
    pub fn operation_info(&self) -> Option<&Arc<dyn OperationInfoAdvice>> {
        self.parts.operation_info.as_ref()
    }

    /// Property metadata capability.
    pub fn property_info(&self) -> Option<&Arc<dyn PropertyInfoAdvice>> {
        self.parts.property_info.as_ref()
    }

    /// Summary of implemented capabilities.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            method: self.parts.method.is_some(),
            async_method: self.parts.async_method.is_some(),
            property: self.parts.property.is_some(),
            parameter: self.parts.parameter.is_some(),
            operation_info: self.parts.operation_info.is_some(),
            property_info: self.parts.property_info.is_some(),
        }
    }

    /// Whether both handles refer to the same advice.
    pub fn ptr_eq(&self, other: &Advice) -> bool {
        Arc::ptr_eq(&self.parts, &other.parts)
    }
}

impl std::fmt::Debug for Advice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Advice")
            .field("type_name", &self.parts.type_name)
            .field("priority", &self.parts.priority)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Builder for [`Advice`]; each capability is opted into explicitly.
pub struct AdviceBuilder<A> {
    advice: Arc<A>,
    parts: AdviceParts,
}

impl<A: Send + Sync + 'static> AdviceBuilder<A> {
    /// Create a new builder.
    pub fn new(type_name: impl Into<String>, advice: A) -> Self {
        Self {
            advice: Arc::new(advice),
            parts: AdviceParts {
                type_name: type_name.into(),
                priority: None,
                rules: PointcutRules::default(),
                introduced: Vec::new(),
                method: None,
                async_method: None,
                property: None,
                parameter: None,
                operation_info: None,
                property_info: None,
            },
        }
    }

    /// Set priority.
    pub fn priority(mut self, level: i32) -> Self {
        self.parts.priority = Some(level);
        self
    }

    /// Only advise operations whose full name matches `pattern`.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.parts.rules.include.push(pattern.into());
        self
    }

    /// Never advise operations whose full name matches `pattern`.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.parts.rules.exclude.push(pattern.into());
        self
    }

    /// Introduce a field on advised receivers.
    pub fn introduce<F>(mut self, name: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.parts.introduced.push(IntroducedField {
            name: name.into(),
            init: Arc::new(init),
        });
        self
    }

    /// Finish.
    pub fn build(self) -> Advice {
        Advice {
            parts: Arc::new(self.parts),
        }
    }
}

impl<A: MethodAdvice + 'static> AdviceBuilder<A> {
    /// Enable the operation capability.
    pub fn method(mut self) -> Self {
        self.parts.method = Some(self.advice.clone() as Arc<dyn MethodAdvice>);
        self
    }
}

impl<A: MethodAsyncAdvice + 'static> AdviceBuilder<A> {
    /// Enable the asynchronous operation capability.
    pub fn async_method(mut self) -> Self {
        self.parts.async_method = Some(self.advice.clone() as Arc<dyn MethodAsyncAdvice>);
        self
    }
}

impl<A: PropertyAdvice + 'static> AdviceBuilder<A> {
    /// Enable the property capability.
    pub fn property(mut self) -> Self {
        self.parts.property = Some(self.advice.clone() as Arc<dyn PropertyAdvice>);
        self
    }
}

impl<A: ParameterAdvice + 'static> AdviceBuilder<A> {
    /// Enable the parameter capability.
    pub fn parameter(mut self) -> Self {
        self.parts.parameter = Some(self.advice.clone() as Arc<dyn ParameterAdvice>);
        self
    }
}

impl<A: OperationInfoAdvice + 'static> AdviceBuilder<A> {
    /// Enable the operation metadata capability.
    pub fn operation_info(mut self) -> Self {
        self.parts.operation_info = Some(self.advice.clone() as Arc<dyn OperationInfoAdvice>);
        self
    }
}

impl<A: PropertyInfoAdvice + 'static> AdviceBuilder<A> {
    /// Enable the property metadata capability.
    pub fn property_info(mut self) -> Self {
        self.parts.property_info = Some(self.advice.clone() as Arc<dyn PropertyInfoAdvice>);
        self
    }
}

/// An advice as applied to one operation.
#[derive(Debug, Clone)]
pub struct AdviceInstance {
    /// The advice
    pub advice: Advice,
    /// Bound parameter position ([`crate::RETURN_SLOT`] for the return slot);
    /// `None` when the advice applies to the whole operation
    pub parameter_index: Option<i32>,
}

impl AdviceInstance {
    /// Whole-operation instance.
    pub fn new(advice: Advice) -> Self {
        Self {
            advice,
            parameter_index: None,
        }
    }

    /// Instance bound to a parameter position.
    pub fn at_parameter(advice: Advice, index: i32) -> Self {
        Self {
            advice,
            parameter_index: Some(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl MethodAdvice for Noop {
        fn advise(&self, context: &mut MethodAdviceContext<'_>) -> Result<()> {
            context.proceed()
        }
    }

    impl ParameterAdvice for Noop {
        fn advise(&self, context: &mut ParameterAdviceContext<'_>) -> Result<()> {
            context.proceed()
        }
    }

    #[test]
    fn test_builder_records_capabilities() {
        let advice = Advice::builder("Noop", Noop)
            .priority(5)
            .method()
            .parameter()
            .include("Cart.*")
            .introduce("hits", || Value::new(0_u64))
            .build();

        let caps = advice.capabilities();
        assert!(caps.method && caps.parameter);
        assert!(!caps.async_method && !caps.property);
        assert_eq!(advice.priority(), Some(5));
        assert_eq!(advice.rules().include, vec!["Cart.*".to_string()]);
        assert_eq!(advice.introduced_fields()[0].initial_value().get::<u64>(), Some(0));
    }

    #[test]
    fn test_clones_share_identity() {
        let a = Advice::builder("Noop", Noop).method().build();
        let b = a.clone();
        let c = Advice::builder("Noop", Noop).method().build();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
