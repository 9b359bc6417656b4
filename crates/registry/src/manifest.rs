//! JSON manifests produced by the attachment pass.
//!
//! A manifest names advices and bodies; an [`AdviceCatalog`] supplies the
//! objects behind those names.

use crate::registry::{Registry, RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use weft_core::{
    Advice, AdviceDeclaration, Body, MemberKey, OperationDef, OperationId, OperationKind,
    ParameterDef, PointcutRules, PropertyDef, ReturnShape, Scope, TypeDef, TypeKey,
};

/// An operation as written in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Declaring type
    pub declaring_type: TypeKey,
    /// Member
    pub member: MemberKey,
    /// Member kind
    #[serde(default)]
    pub kind: OperationKind,
    /// Parameter names
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Return shape
    #[serde(default)]
    pub returns: ReturnShape,
    /// Own generic parameter count
    #[serde(default)]
    pub generic_arity: usize,
    /// Local rules over advice type names
    #[serde(default)]
    pub advice_rules: PointcutRules,
    /// Catalog name of the body
    #[serde(default)]
    pub body: Option<String>,
}

/// An advice declaration as written in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationSpec {
    /// Catalog name of the advice
    pub advice: String,
    /// Attachment scope
    #[serde(flatten)]
    pub scope: Scope,
}

/// The attachment pass's output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Types
    #[serde(default)]
    pub types: Vec<TypeDef>,
    /// Properties
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    /// Operations
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
    /// Advice declarations
    #[serde(default)]
    pub advices: Vec<DeclarationSpec>,
}

impl Manifest {
    /// Parse a manifest.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Populate a registry, resolving names through `catalog`.
    pub fn build(self, catalog: &AdviceCatalog) -> Result<Registry> {
        let mut registry = Registry::new();
        for ty in self.types {
            registry.register_type(ty)?;
        }
        for property in self.properties {
            registry.register_property(property)?;
        }
        for spec in self.operations {
            let body = spec
                .body
                .as_deref()
                .map(|name| catalog.body(name))
                .transpose()?;
            registry.register_operation(OperationDef {
                id: OperationId {
                    declaring_type: spec.declaring_type,
                    member: spec.member,
                },
                kind: spec.kind,
                parameters: spec
                    .parameters
                    .into_iter()
                    .map(|name| ParameterDef { name })
                    .collect(),
                returns: spec.returns,
                generic_arity: spec.generic_arity,
                advice_rules: spec.advice_rules,
                body,
            })?;
        }
        for decl in self.advices {
            let advice = catalog.advice(&decl.advice)?;
            registry.declare(AdviceDeclaration::new(advice, decl.scope))?;
        }
        tracing::debug!(
            operations = registry.operations().count(),
            declarations = registry.declaration_count(),
            "Built registry from manifest"
        );
        Ok(registry)
    }
}

/// Named advices and bodies a manifest can refer to.
#[derive(Default)]
pub struct AdviceCatalog {
    advices: HashMap<String, Advice>,
    bodies: HashMap<String, Body>,
}

impl AdviceCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an advice.
    pub fn with_advice(mut self, name: impl Into<String>, advice: Advice) -> Self {
        self.advices.insert(name.into(), advice);
        self
    }

    /// Add a body.
    pub fn with_body(mut self, name: impl Into<String>, body: Body) -> Self {
        self.bodies.insert(name.into(), body);
        self
    }

    /// Get an advice by name.
    pub fn advice(&self, name: &str) -> Result<Advice> {
        self.advices
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownAdvice(name.to_string()))
    }

    /// Get a body by name.
    pub fn body(&self, name: &str) -> Result<Body> {
        self.bodies
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownBody(name.to_string()))
    }

    /// Advice names, sorted.
    pub fn advice_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.advices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
