//! Advice discovery: harvest every attachment that applies to an operation.
//!
//! Owners are visited from the widest scope to the narrowest:
//!
//! ```text
//! modules → type hierarchy (ancestors first) → operation → property → parameters / return
//! ```
//!
//! The resulting order is the tie-break order used when priorities are equal.

use crate::registry::{Registry, RegistryError, Result};
use std::collections::HashSet;
use weft_core::{
    Advice, AdviceInstance, ModuleKey, OperationDef, PropertyBinding, Scope, TypeDef, TypeKey,
    RETURN_SLOT,
};

/// Everything discovered for one operation, before selection.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Advice instances in discovery order
    pub advices: Vec<AdviceInstance>,
    /// The property this operation accesses, if it is an accessor
    pub property: Option<PropertyBinding>,
}

/// Types whose declarations reach operations of `declaring`.
///
/// The lexical nest is walked outermost first; each member of the nest is
/// preceded by its ancestors, root first. Duplicates keep their first position.
pub fn type_scope<'r>(registry: &'r Registry, declaring: &TypeKey) -> Result<Vec<&'r TypeDef>> {
    let mut nest = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(declaring.clone());
    while let Some(key) = current {
        if !seen.insert(key.clone()) {
            return Err(RegistryError::CyclicHierarchy(key));
        }
        let def = registry.type_def(&key)?;
        nest.push(def);
        current = def.enclosing.clone();
    }
    nest.reverse();

    let mut scope: Vec<&TypeDef> = Vec::new();
    for def in nest {
        for ty in lineage(registry, def)? {
            if !scope.iter().any(|t| t.key == ty.key) {
                scope.push(ty);
            }
        }
    }
    Ok(scope)
}

/// `def` and its base chain, root first.
fn lineage<'r>(registry: &'r Registry, def: &'r TypeDef) -> Result<Vec<&'r TypeDef>> {
    let mut chain = vec![def];
    let mut seen = HashSet::from([def.key.clone()]);
    let mut base = def.base.clone();
    while let Some(key) = base {
        if !seen.insert(key.clone()) {
            return Err(RegistryError::CyclicHierarchy(key));
        }
        let parent = registry.type_def(&key)?;
        chain.push(parent);
        base = parent.base.clone();
    }
    chain.reverse();
    Ok(chain)
}

/// The property `op` accesses, when it is a getter or setter of a declared property.
pub fn property_binding(registry: &Registry, op: &OperationDef) -> Option<PropertyBinding> {
    let (name, is_setter) = op.kind.accessor()?;
    let property = registry.property(&op.id.declaring_type, name)?;
    if property.accessor_role(&op.id.member) != Some(is_setter) {
        return None;
    }
    Some(PropertyBinding {
        property: property.clone(),
        is_setter,
    })
}

/// Collect every advice attached to `op` at any scope.
///
/// Whole-operation advices with the parameter capability are replicated
/// once per parameter and once for the return slot. Advices attached
/// directly to a parameter are appended next to the replicas of that
/// position; the two are never merged.
pub fn discover(registry: &Registry, op: &OperationDef) -> Result<Discovery> {
    let types = type_scope(registry, &op.id.declaring_type)?;

    let mut modules: Vec<&ModuleKey> = Vec::new();
    for ty in &types {
        if !modules.contains(&&ty.module) {
            modules.push(&ty.module);
        }
    }

    let mut whole: Vec<&Advice> = Vec::new();
    for module in modules {
        whole.extend(registry.advices_at(&Scope::Module {
            module: module.clone(),
        }));
    }
    for ty in &types {
        whole.extend(registry.advices_at(&Scope::Type {
            type_key: ty.key.clone(),
        }));
    }
    whole.extend(registry.advices_at(&Scope::operation(op.id.clone())));

    let property = property_binding(registry, op);
    if let Some(binding) = &property {
        whole.extend(registry.advices_at(&Scope::Property {
            declaring_type: binding.property.declaring_type.clone(),
            name: binding.property.name.clone(),
        }));
    }

    let (parameter_wide, plain): (Vec<&Advice>, Vec<&Advice>) =
        whole.into_iter().partition(|a| a.capabilities().parameter);

    let mut advices: Vec<AdviceInstance> = plain
        .into_iter()
        .map(|a| AdviceInstance::new(a.clone()))
        .collect();

    let mut slots: Vec<i32> = (0..op.parameters.len()).filter_map(|i| i32::try_from(i).ok()).collect();
    if op.has_return_slot() {
        slots.push(RETURN_SLOT);
    }
    for index in slots {
        advices.extend(
            parameter_wide
                .iter()
                .map(|a| AdviceInstance::at_parameter((*a).clone(), index)),
        );
        advices.extend(
            registry
                .advices_at(&Scope::parameter(op.id.clone(), index))
                .iter()
                .map(|a| AdviceInstance::at_parameter(a.clone(), index)),
        );
    }

    tracing::debug!(
        operation = %op.id,
        discovered = advices.len(),
        property = property.is_some(),
        "Discovered advices"
    );

    Ok(Discovery { advices, property })
}
