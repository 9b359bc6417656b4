//! Metadata-only advices, run once per definition.

use crate::error::Result;
use weft_core::{OperationInfoContext, PropertyInfoContext, Scope, TypeKey};
use weft_registry::Registry;

/// Run the info advices attached to the operations and properties of `type_key`.
///
/// Returns the number of advice runs.
pub fn process_type(registry: &Registry, type_key: &TypeKey) -> Result<usize> {
    registry.type_def(type_key)?;
    let mut runs = 0;

    for op in registry.operations_of(type_key) {
        for advice in registry.advices_at(&Scope::operation(op.id.clone())) {
            if let Some(info) = advice.operation_info() {
                info.advise(&OperationInfoContext::new(op));
                runs += 1;
            }
        }
    }

    for property in registry.properties_of(type_key) {
        let scope = Scope::Property {
            declaring_type: property.declaring_type.clone(),
            name: property.name.clone(),
        };
        for advice in registry.advices_at(&scope) {
            if let Some(info) = advice.property_info() {
                info.advise(&PropertyInfoContext::new(property));
                runs += 1;
            }
        }
    }

    if runs > 0 {
        tracing::debug!(type_key = %type_key, runs, "Processed info advices");
    }
    Ok(runs)
}
