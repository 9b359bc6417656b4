//! Declarative registry of types, operations and advice attachments.

use std::collections::HashMap;
use std::sync::Arc;
use weft_core::{
    Advice, AdviceDeclaration, ModuleKey, OperationDef, OperationId, PropertyDef, Scope, TypeDef,
    TypeKey,
};

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised while populating or querying the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Type not registered
    #[error("Unknown type: {0}")]
    UnknownType(TypeKey),

    /// Operation not registered
    #[error("Unknown operation: {0}")]
    UnknownOperation(OperationId),

    /// Property not registered
    #[error("Unknown property: {0}.{1}")]
    UnknownProperty(TypeKey, String),

    /// Registered twice
    #[error("Duplicate definition: {0}")]
    Duplicate(String),

    /// Base or enclosing chain loops back on itself
    #[error("Cyclic type hierarchy at {0}")]
    CyclicHierarchy(TypeKey),

    /// Parameter-scoped declaration outside the operation's slots
    #[error("Parameter index {index} out of range for {operation}")]
    ParameterIndex {
        /// Operation
        operation: OperationId,
        /// Offending index
        index: i32,
    },

    /// Manifest names an advice the catalog does not provide
    #[error("Unknown advice type: {0}")]
    UnknownAdvice(String),

    /// Manifest names a body the catalog does not provide
    #[error("Unknown body: {0}")]
    UnknownBody(String),

    /// Manifest is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registry of everything the attachment pass declared.
///
/// Populated once, then shared read-only by the engine.
#[derive(Default)]
pub struct Registry {
    types: HashMap<TypeKey, TypeDef>,
    type_order: Vec<TypeKey>,
    properties: Vec<PropertyDef>,
    operations: HashMap<OperationId, Arc<OperationDef>>,
    operation_order: Vec<OperationId>,
    declarations: HashMap<Scope, Vec<Advice>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type.
    pub fn register_type(&mut self, def: TypeDef) -> Result<()> {
        if self.types.contains_key(&def.key) {
            return Err(RegistryError::Duplicate(format!("type {}", def.key)));
        }
        self.type_order.push(def.key.clone());
        self.types.insert(def.key.clone(), def);
        Ok(())
    }

    /// Register a property of an already registered type.
    pub fn register_property(&mut self, def: PropertyDef) -> Result<()> {
        self.type_def(&def.declaring_type)?;
        if self.property(&def.declaring_type, &def.name).is_some() {
            return Err(RegistryError::Duplicate(format!(
                "property {}.{}",
                def.declaring_type, def.name
            )));
        }
        self.properties.push(def);
        Ok(())
    }

    /// Register an operation of an already registered type.
    pub fn register_operation(&mut self, def: OperationDef) -> Result<Arc<OperationDef>> {
        self.type_def(&def.id.declaring_type)?;
        if self.operations.contains_key(&def.id) {
            return Err(RegistryError::Duplicate(format!("operation {}", def.id)));
        }
        let def = Arc::new(def);
        self.operation_order.push(def.id.clone());
        self.operations.insert(def.id.clone(), def.clone());
        Ok(def)
    }

    /// Attach an advice. The scope's owner must already be registered.
    pub fn declare(&mut self, declaration: AdviceDeclaration) -> Result<()> {
        match &declaration.scope {
            Scope::Module { .. } => {}
            Scope::Type { type_key } => {
                self.type_def(type_key)?;
            }
            Scope::Operation { operation } => {
                self.operation(operation)?;
            }
            Scope::Property {
                declaring_type,
                name,
            } => {
                if self.property(declaring_type, name).is_none() {
                    return Err(RegistryError::UnknownProperty(
                        declaring_type.clone(),
                        name.clone(),
                    ));
                }
            }
            Scope::Parameter { operation, index } => {
                let def = self.operation(operation)?;
                let in_range = match usize::try_from(*index) {
                    Ok(i) => i < def.parameters.len(),
                    Err(_) => *index == weft_core::RETURN_SLOT && def.has_return_slot(),
                };
                if !in_range {
                    return Err(RegistryError::ParameterIndex {
                        operation: operation.clone(),
                        index: *index,
                    });
                }
            }
        }

        tracing::trace!(
            advice = declaration.advice.type_name(),
            scope = ?declaration.scope,
            "Declared advice"
        );
        self.declarations
            .entry(declaration.scope)
            .or_default()
            .push(declaration.advice);
        Ok(())
    }

    /// Shorthand for [`Registry::declare`].
    pub fn attach(&mut self, advice: Advice, scope: Scope) -> Result<()> {
        self.declare(AdviceDeclaration::new(advice, scope))
    }

    /// Get a type by key.
    pub fn type_def(&self, key: &TypeKey) -> Result<&TypeDef> {
        self.types
            .get(key)
            .ok_or_else(|| RegistryError::UnknownType(key.clone()))
    }

    /// Get an operation by identity.
    pub fn operation(&self, id: &OperationId) -> Result<&Arc<OperationDef>> {
        self.operations
            .get(id)
            .ok_or_else(|| RegistryError::UnknownOperation(id.clone()))
    }

    /// Find a property.
    pub fn property(&self, declaring_type: &TypeKey, name: &str) -> Option<&PropertyDef> {
        self.properties
            .iter()
            .find(|p| &p.declaring_type == declaring_type && p.name == name)
    }

    /// Advices attached exactly at `scope`, in declaration order.
    pub fn advices_at(&self, scope: &Scope) -> &[Advice] {
        self.declarations
            .get(scope)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// List all types, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.type_order.iter().filter_map(|k| self.types.get(k))
    }

    /// Types defined by `module`, in registration order.
    pub fn types_in<'a>(&'a self, module: &'a ModuleKey) -> impl Iterator<Item = &'a TypeDef> {
        self.types().filter(move |t| &t.module == module)
    }

    /// List all operations, in registration order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<OperationDef>> {
        self.operation_order
            .iter()
            .filter_map(|id| self.operations.get(id))
    }

    /// Operations declared by `type_key`, in registration order.
    pub fn operations_of<'a>(
        &'a self,
        type_key: &'a TypeKey,
    ) -> impl Iterator<Item = &'a Arc<OperationDef>> {
        self.operations()
            .filter(move |op| &op.id.declaring_type == type_key)
    }

    /// Properties declared by `type_key`, in registration order.
    pub fn properties_of<'a>(&'a self, type_key: &'a TypeKey) -> impl Iterator<Item = &'a PropertyDef> {
        self.properties
            .iter()
            .filter(move |p| &p.declaring_type == type_key)
    }

    /// Number of advice declarations.
    pub fn declaration_count(&self) -> usize {
        self.declarations.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{MethodAdvice, MethodAdviceContext, OperationKind};

    struct Pass;

    impl MethodAdvice for Pass {
        fn advise(&self, context: &mut MethodAdviceContext<'_>) -> weft_core::Result<()> {
            context.proceed()
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_type(TypeDef::new("Cart", "shop")).unwrap();
        registry
            .register_property(PropertyDef::new("Cart", "Total").getter("get_total"))
            .unwrap();
        registry
            .register_operation(
                OperationDef::new(OperationId::new("Cart", "add"))
                    .parameter("item")
                    .parameter("count"),
            )
            .unwrap();
        registry
            .register_operation(
                OperationDef::new(OperationId::new("Cart", "new")).kind(OperationKind::Constructor),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut registry = registry();
        assert!(matches!(
            registry.register_type(TypeDef::new("Cart", "shop")),
            Err(RegistryError::Duplicate(_))
        ));
        assert!(matches!(
            registry.register_operation(OperationDef::new(OperationId::new("Cart", "add"))),
            Err(RegistryError::Duplicate(_))
        ));
    }

    #[test]
    fn test_operation_requires_type() {
        let mut registry = registry();
        let err = registry
            .register_operation(OperationDef::new(OperationId::new("Order", "ship")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownType(_)));
    }

    #[test]
    fn test_parameter_scope_validated() {
        let mut registry = registry();
        let advice = Advice::builder("Pass", Pass).method().build();
        let add = OperationId::new("Cart", "add");
        let ctor = OperationId::new("Cart", "new");

        registry.attach(advice.clone(), Scope::parameter(add.clone(), 1)).unwrap();
        registry.attach(advice.clone(), Scope::return_value(add.clone())).unwrap();
        assert!(matches!(
            registry.attach(advice.clone(), Scope::parameter(add, 2)),
            Err(RegistryError::ParameterIndex { index: 2, .. })
        ));
        assert!(matches!(
            registry.attach(advice, Scope::return_value(ctor)),
            Err(RegistryError::ParameterIndex { index: -1, .. })
        ));
        assert_eq!(registry.declaration_count(), 2);
    }

    #[test]
    fn test_advices_at_keeps_declaration_order() {
        let mut registry = registry();
        let first = Advice::builder("First", Pass).method().build();
        let second = Advice::builder("Second", Pass).method().build();
        registry.attach(first, Scope::type_key("Cart")).unwrap();
        registry.attach(second, Scope::type_key("Cart")).unwrap();

        let names: Vec<&str> = registry
            .advices_at(&Scope::type_key("Cart"))
            .iter()
            .map(|a| a.type_name())
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert!(registry.advices_at(&Scope::module("shop")).is_empty());
    }

    #[test]
    fn test_queries_by_owner() {
        let registry = registry();
        let cart = TypeKey::new("Cart");
        assert_eq!(registry.operations_of(&cart).count(), 2);
        assert_eq!(registry.properties_of(&cart).count(), 1);
        assert_eq!(registry.types_in(&ModuleKey::new("shop")).count(), 1);
        assert!(registry.property(&cart, "Missing").is_none());
    }
}
