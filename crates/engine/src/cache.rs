//! Descriptor resolution and the process-wide descriptor cache.

use crate::config::EngineConfig;
use crate::descriptor::AspectDescriptor;
use crate::error::{EngineError, Result};
use crate::ordering::order;
use dashmap::DashMap;
use std::sync::Arc;
use weft_core::{OperationDef, OperationId};
use weft_registry::{discover, select, Registry};

/// What a descriptor is cached under: the declared operation and the parts
/// of the call shape that change which operations are advised and run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    /// Declared operation
    pub declared: OperationId,
    /// Operation whose body runs innermost, if the call names one
    pub inner: Option<OperationId>,
    /// Receiver implemented entirely by advices; only meaningful without `inner`
    pub abstracted: bool,
}

impl DescriptorKey {
    /// Key for a call shape.
    pub fn new(declared: &OperationId, inner: Option<&OperationId>, abstracted: bool) -> Self {
        Self {
            declared: declared.clone(),
            inner: inner.cloned(),
            abstracted: abstracted && inner.is_none(),
        }
    }
}

impl std::fmt::Display for DescriptorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.inner, self.abstracted) {
            (Some(inner), _) => write!(f, "{} via {inner}", self.declared),
            (None, true) => write!(f, "{} (abstracted)", self.declared),
            (None, false) => write!(f, "{} (interface)", self.declared),
        }
    }
}

/// Descriptors keyed by call shape.
///
/// Entries are never evicted. When two callers race to publish for the
/// same key, the first insert wins and both observe it.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: DashMap<DescriptorKey, Arc<AspectDescriptor>>,
}

impl DescriptorCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a descriptor.
    pub fn get(&self, key: &DescriptorKey) -> Option<Arc<AspectDescriptor>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Publish `descriptor` unless one is already present; return the stored one.
    pub fn publish(&self, key: DescriptorKey, descriptor: Arc<AspectDescriptor>) -> Arc<AspectDescriptor> {
        self.entries.entry(key).or_insert(descriptor).value().clone()
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns operation identities into cached [`AspectDescriptor`]s.
pub struct DescriptorResolver {
    registry: Arc<Registry>,
    config: EngineConfig,
    cache: DescriptorCache,
}

impl DescriptorResolver {
    /// Create a resolver over `registry`.
    pub fn new(registry: Arc<Registry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            cache: DescriptorCache::new(),
        }
    }

    /// The registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The cache.
    pub fn cache(&self) -> &DescriptorCache {
        &self.cache
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Descriptor for `declared`, building and caching it on first use.
    ///
    /// `inner` is the operation whose body runs innermost; `None` when the
    /// caller has none. `abstracted` marks a receiver whose implementation
    /// comes entirely from advices. Each call shape is cached separately.
    /// Failures are not cached.
    pub fn resolve(
        &self,
        declared: &OperationId,
        inner: Option<&OperationId>,
        abstracted: bool,
    ) -> Result<Arc<AspectDescriptor>> {
        let key = DescriptorKey::new(declared, inner, abstracted);
        if let Some(descriptor) = self.cache.get(&key) {
            return Ok(descriptor);
        }

        let built = Arc::new(self.build(declared, inner, abstracted)?);
        let published = self.cache.publish(key.clone(), built.clone());
        if Arc::ptr_eq(&published, &built) {
            tracing::debug!(
                key = %key,
                advices = published.advices().len(),
                "Cached aspect descriptor"
            );
        } else {
            tracing::debug!(key = %key, "Discarded descriptor built concurrently");
        }
        Ok(published)
    }

    /// Build a descriptor without consulting or filling the cache.
    pub fn build(&self, declared: &OperationId, inner: Option<&OperationId>, abstracted: bool) -> Result<AspectDescriptor> {
        let declared_def = self.registry.operation(declared)?.clone();
        let pointcut = inner
            .map(|id| self.registry.operation(id).cloned())
            .transpose()?;

        let advised = if inner.is_none() && !abstracted && self.config.interface_pointcuts {
            self.interface_member(&declared_def)?
        } else {
            declared_def
        };

        let discovery = discover(&self.registry, &advised)?;
        let selected = select(&advised, discovery.advices)?;
        let advices = order(selected, self.config.default_priority);

        Ok(AspectDescriptor::new(advices, pointcut, advised, discovery.property))
    }

    /// The same-named member of the single interface `op`'s type implements.
    fn interface_member(&self, op: &OperationDef) -> Result<Arc<OperationDef>> {
        let no_pointcut = |reason: String| EngineError::NoInterfacePointcut {
            operation: op.id.clone(),
            reason,
        };

        let ty = self.registry.type_def(&op.id.declaring_type)?;
        let interface = match ty.interfaces.as_slice() {
            [interface] => interface,
            others => {
                return Err(no_pointcut(format!(
                    "{} implements {} interfaces, expected exactly one",
                    ty.key,
                    others.len()
                )))
            }
        };

        let member = OperationId {
            declaring_type: interface.clone(),
            member: op.id.member.clone(),
        };
        self.registry
            .operation(&member)
            .cloned()
            .map_err(|_| no_pointcut(format!("{interface} has no member {}", op.id.member)))
    }
}
