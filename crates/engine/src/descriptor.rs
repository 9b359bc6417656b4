//! Aspect descriptors: the resolved, ordered view of one advised operation.

use crate::error::{EngineError, Result};
use crate::ordering::order;
use std::sync::Arc;
use weft_core::{AdviceInstance, OperationDef, OperationInstance, PropertyBinding, TypeKey};
use weft_registry::Registry;

/// Everything needed to build a chain for one operation definition.
///
/// Immutable once built. Instantiations for concrete generic arguments are
/// derived with [`AspectDescriptor::specialize`] and share the advice list.
#[derive(Debug, Clone)]
pub struct AspectDescriptor {
    advices: Arc<[AdviceInstance]>,
    pointcut: Option<Arc<OperationDef>>,
    advised: Arc<OperationDef>,
    property: Option<PropertyBinding>,
}

impl AspectDescriptor {
    /// Create a descriptor. `advices` must already be ordered.
    pub fn new(
        advices: Vec<AdviceInstance>,
        pointcut: Option<Arc<OperationDef>>,
        advised: Arc<OperationDef>,
        property: Option<PropertyBinding>,
    ) -> Self {
        Self {
            advices: advices.into(),
            pointcut,
            advised,
            property,
        }
    }

    /// Advices, outermost first.
    pub fn advices(&self) -> &[AdviceInstance] {
        &self.advices
    }

    /// The operation whose body runs innermost; `None` when there is none.
    pub fn pointcut(&self) -> Option<&Arc<OperationDef>> {
        self.pointcut.as_ref()
    }

    /// The operation advices were gathered for.
    pub fn advised(&self) -> &Arc<OperationDef> {
        &self.advised
    }

    /// Property accessed by the advised operation.
    pub fn property(&self) -> Option<&PropertyBinding> {
        self.property.as_ref()
    }

    /// Bind to concrete generic arguments.
    ///
    /// `arguments` lists the declaring type's arguments first, then the
    /// operation's own. An empty list keeps the definitions as they are.
    pub fn specialize(&self, registry: &Registry, arguments: &[TypeKey]) -> Result<SpecializedDescriptor> {
        let advised = instantiate(registry, &self.advised, arguments)?;
        let pointcut = self
            .pointcut
            .as_ref()
            .map(|def| instantiate(registry, def, arguments))
            .transpose()?;
        Ok(SpecializedDescriptor {
            advices: self.advices.clone(),
            pointcut,
            advised,
            property: self.property.clone(),
        })
    }
}

/// An [`AspectDescriptor`] bound to the generic arguments of one call.
///
/// Never cached.
#[derive(Debug, Clone)]
pub struct SpecializedDescriptor {
    /// Advices, outermost first
    pub advices: Arc<[AdviceInstance]>,
    /// Operation whose body runs innermost
    pub pointcut: Option<OperationInstance>,
    /// Operation advices were gathered for
    pub advised: OperationInstance,
    /// Property accessed by the advised operation
    pub property: Option<PropertyBinding>,
}

impl SpecializedDescriptor {
    /// Copy with one more advice, re-ordered by priority.
    ///
    /// The extra advice lands after existing advices of equal priority.
    pub fn with_advice(&self, instance: AdviceInstance, default_priority: i32) -> Self {
        let mut advices = self.advices.to_vec();
        advices.push(instance);
        Self {
            advices: order(advices, default_priority).into(),
            ..self.clone()
        }
    }
}

/// Bind `def` to a flattened list of generic arguments.
pub fn instantiate(registry: &Registry, def: &Arc<OperationDef>, arguments: &[TypeKey]) -> Result<OperationInstance> {
    if arguments.is_empty() {
        return Ok(OperationInstance::definition(def.clone()));
    }

    let type_arity = registry.type_def(&def.id.declaring_type)?.generic_arity;
    let arity_error = || EngineError::GenericArity {
        operation: def.id.clone(),
        expected: type_arity + def.generic_arity,
        actual: arguments.len(),
    };
    if arguments.len() < type_arity {
        return Err(arity_error());
    }

    let (type_arguments, rest) = arguments.split_at(type_arity);
    let method_arguments = match def.generic_arity {
        0 => &[][..],
        n if n == rest.len() => rest,
        _ => return Err(arity_error()),
    };

    Ok(OperationInstance {
        def: def.clone(),
        type_arguments: type_arguments.into(),
        method_arguments: method_arguments.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Recorder;
    use weft_core::{OperationId, TypeDef};

    /// `Repo<T>` with `find<K>` and `count`.
    fn repo() -> Registry {
        let mut registry = Registry::new();
        registry.register_type(TypeDef::new("Repo", "data").generic(1)).unwrap();
        registry
            .register_operation(OperationDef::new(OperationId::new("Repo", "find")).generic(1))
            .unwrap();
        registry
            .register_operation(OperationDef::new(OperationId::new("Repo", "count")))
            .unwrap();
        registry
    }

    fn descriptor(registry: &Registry, member: &str) -> AspectDescriptor {
        let def = registry.operation(&OperationId::new("Repo", member)).unwrap().clone();
        let advices = ["Outer", "Inner"]
            .iter()
            .map(|n| AdviceInstance::new(Recorder::advice(n, None).0))
            .collect();
        AspectDescriptor::new(advices, Some(def.clone()), def, None)
    }

    fn keys(names: &[&str]) -> Vec<TypeKey> {
        names.iter().map(|n| TypeKey::new(*n)).collect()
    }

    #[test]
    fn test_specialize_splits_arguments() {
        let registry = repo();
        let find = descriptor(&registry, "find");

        let special = find.specialize(&registry, &keys(&["User", "Uuid"])).unwrap();
        assert_eq!(special.advised.to_string(), "Repo<User>::find<Uuid>");
        assert_eq!(special.pointcut.unwrap().to_string(), "Repo<User>::find<Uuid>");

        let count = descriptor(&registry, "count");
        let special = count.specialize(&registry, &keys(&["User"])).unwrap();
        assert_eq!(special.advised.to_string(), "Repo<User>::count");
    }

    #[test]
    fn test_specializations_share_advices() {
        let registry = repo();
        let find = descriptor(&registry, "find");

        let users = find.specialize(&registry, &keys(&["User", "Uuid"])).unwrap();
        let orders = find.specialize(&registry, &keys(&["Order", "u64"])).unwrap();
        assert!(Arc::ptr_eq(&users.advices, &orders.advices));
        assert!(Arc::ptr_eq(&users.advices, &find.advices));

        let names: Vec<&str> = orders.advices.iter().map(|a| a.advice.type_name()).collect();
        assert_eq!(names, vec!["Outer", "Inner"]);
    }

    #[test]
    fn test_specialize_rejects_wrong_arity() {
        let registry = repo();
        let find = descriptor(&registry, "find");
        assert!(matches!(
            find.specialize(&registry, &keys(&["User"])),
            Err(EngineError::GenericArity { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            find.specialize(&registry, &keys(&["A", "B", "C"])),
            Err(EngineError::GenericArity { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_empty_arguments_keep_definition() {
        let registry = repo();
        let special = descriptor(&registry, "find").specialize(&registry, &[]).unwrap();
        assert!(!special.advised.is_instantiated());
    }

    #[test]
    fn test_with_advice_keeps_priority_order() {
        let registry = repo();
        let special = descriptor(&registry, "count").specialize(&registry, &[]).unwrap();
        let (urgent, _) = Recorder::advice("Urgent", Some(9));
        let (late, _) = Recorder::advice("Late", None);

        let extended = special
            .with_advice(AdviceInstance::new(urgent), 0)
            .with_advice(AdviceInstance::new(late), 0);
        let names: Vec<&str> = extended.advices.iter().map(|a| a.advice.type_name()).collect();
        assert_eq!(names, vec!["Urgent", "Outer", "Inner", "Late"]);
        assert_eq!(special.advices.len(), 2);
    }
}
