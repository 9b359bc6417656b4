//! The engine facade: resolve, specialize, build, execute.

use crate::cache::DescriptorResolver;
use crate::call::CallSite;
use crate::chain::{plan, ChainBuilder, LayerKind};
use crate::config::EngineConfig;
use crate::descriptor::AspectDescriptor;
use crate::error::Result;
use crate::executor::{execute, Returned};
use crate::info;
use crate::introduction::{FieldIntroducer, TargetFieldIntroducer};
use dashmap::DashSet;
use std::sync::Arc;
use tracing::Instrument;
use weft_core::{AdviceInstance, AdviceValues, Fault, ModuleKey, OperationId, TypeKey};
use weft_registry::Registry;

/// One layer of a described chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescription {
    /// Advice type name
    pub advice: String,
    /// Capability the layer runs
    pub kind: LayerKind,
    /// Effective priority
    pub priority: i32,
}

/// Intercepts calls to registered operations.
pub struct Engine {
    resolver: DescriptorResolver,
    introducer: Arc<dyn FieldIntroducer>,
    processed: DashSet<TypeKey>,
}

impl Engine {
    /// Create an engine with default configuration.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(registry: Arc<Registry>, config: EngineConfig) -> Self {
        Self {
            resolver: DescriptorResolver::new(registry, config),
            introducer: Arc::new(TargetFieldIntroducer),
            processed: DashSet::new(),
        }
    }

    /// Replace the field introducer.
    pub fn with_introducer(mut self, introducer: Arc<dyn FieldIntroducer>) -> Self {
        self.introducer = introducer;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        self.resolver.config()
    }

    /// The registry.
    pub fn registry(&self) -> &Registry {
        self.resolver.registry()
    }

    /// The descriptor resolver.
    pub fn resolver(&self) -> &DescriptorResolver {
        &self.resolver
    }

    /// Run an intercepted call through its advice chain.
    pub fn proceed(&self, call: CallSite) -> std::result::Result<Returned, Fault> {
        let descriptor = self
            .resolver
            .resolve(&call.operation, call.inner.as_ref(), call.abstracted_target)?;
        let mut descriptor = descriptor.specialize(self.registry(), &call.generic_arguments)?;
        if let Some(advice) = call.target.as_ref().and_then(|t| t.advice()) {
            descriptor = descriptor.with_advice(AdviceInstance::new(advice.clone()), self.config().default_priority);
        }

        let declaring_type = call
            .declaring_type
            .unwrap_or_else(|| descriptor.advised.id().declaring_type.clone());
        let values = AdviceValues::new(call.target, declaring_type, call.parameters);
        let span = tracing::debug_span!(
            "invocation",
            id = %values.invocation(),
            operation = %descriptor.advised,
        );
        let values = values.shared();

        let returned = span.in_scope(|| {
            tracing::trace!(advices = descriptor.advices.len(), "Building chain");
            let builder = if self.config().introduce_fields {
                ChainBuilder::with_introducer(self.introducer.as_ref())
            } else {
                ChainBuilder::new()
            };
            let head = builder.build(&descriptor, &values);
            execute(head.as_ref(), values, descriptor.advised.def.returns)
        });

        match returned {
            Ok(Returned::Future(future)) => Ok(Returned::Future(Box::pin(future.instrument(span)))),
            Err(fault) => {
                tracing::debug!(parent: &span, error = %fault, "Advised call failed");
                Err(fault)
            }
            other => other,
        }
    }

    /// Resolve `operation` as a call running its own body would.
    pub fn descriptor(&self, operation: &OperationId) -> Result<Arc<AspectDescriptor>> {
        self.resolver.resolve(operation, Some(operation), false)
    }

    /// Layers a call to `operation` runs through, outermost first.
    pub fn describe(&self, operation: &OperationId) -> Result<Vec<LayerDescription>> {
        let descriptor = self.descriptor(operation)?.specialize(self.registry(), &[])?;
        let default_priority = self.config().default_priority;
        Ok(plan(&descriptor)
            .into_iter()
            .rev()
            .map(|(kind, instance)| LayerDescription {
                advice: instance.advice.type_name().to_string(),
                kind,
                priority: crate::ordering::priority_of(&instance.advice, default_priority),
            })
            .collect())
    }

    /// Run the info advices of `type_key`, once per engine.
    ///
    /// Returns the number of advice runs; zero when already processed.
    pub fn process_info_advices(&self, type_key: &TypeKey) -> Result<usize> {
        self.registry().type_def(type_key)?;
        if !self.processed.insert(type_key.clone()) {
            return Ok(0);
        }
        info::process_type(self.registry(), type_key)
    }

    /// Run the info advices of every type `module` defines.
    pub fn process_module_info_advices(&self, module: &ModuleKey) -> Result<usize> {
        let types: Vec<TypeKey> = self.registry().types_in(module).map(|t| t.key.clone()).collect();
        let mut runs = 0;
        for type_key in &types {
            runs += self.process_info_advices(type_key)?;
        }
        Ok(runs)
    }
}
