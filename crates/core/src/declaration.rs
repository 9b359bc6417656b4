//! Advice attachment records produced by the ahead-of-time attachment pass.

use crate::advice::Advice;
use crate::id::{ModuleKey, OperationId, TypeKey};
use serde::{Deserialize, Serialize};

/// Index of the return slot in parameter-scoped declarations.
pub const RETURN_SLOT: i32 = -1;

/// Priority levels.
///
/// Advices are ordered from higher to lower: higher runs first (outermost).
pub struct Priority;

impl Priority {
    /// Level of advices that declare none.
    pub const DEFAULT: i32 = 0;

    /// Reserved marker for abstract properties; not interpreted by the engine.
    pub const ABSTRACT: i32 = i32::MIN + 1;
}

/// Where an advice is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    /// Every operation of every type the module defines
    Module {
        /// Module
        module: ModuleKey,
    },
    /// Every operation of the type, its nested types and subtypes
    Type {
        /// Type
        type_key: TypeKey,
    },
    /// One operation
    Operation {
        /// Operation
        operation: OperationId,
    },
    /// Both accessors of a property
    Property {
        /// Declaring type
        declaring_type: TypeKey,
        /// Property name
        name: String,
    },
    /// One parameter of an operation, or its return slot ([`RETURN_SLOT`])
    Parameter {
        /// Operation
        operation: OperationId,
        /// Parameter position
        index: i32,
    },
}

impl Scope {
    /// Module scope.
    pub fn module(module: impl Into<String>) -> Self {
        Self::Module {
            module: ModuleKey::new(module),
        }
    }

    /// Type scope.
    pub fn type_key(type_key: impl Into<String>) -> Self {
        Self::Type {
            type_key: TypeKey::new(type_key),
        }
    }

    /// Operation scope.
    pub fn operation(operation: OperationId) -> Self {
        Self::Operation { operation }
    }

    /// Property scope.
    pub fn property(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Property {
            declaring_type: TypeKey::new(declaring_type),
            name: name.into(),
        }
    }

    /// Parameter scope.
    pub fn parameter(operation: OperationId, index: i32) -> Self {
        Self::Parameter { operation, index }
    }

    /// Return-slot scope.
    pub fn return_value(operation: OperationId) -> Self {
        Self::Parameter {
            operation,
            index: RETURN_SLOT,
        }
    }
}

/// One advice attached at one scope.
#[derive(Debug, Clone)]
pub struct AdviceDeclaration {
    /// The advice
    pub advice: Advice,
    /// Attachment scope
    pub scope: Scope,
}

impl AdviceDeclaration {
    /// Attach `advice` at `scope`.
    pub fn new(advice: Advice, scope: Scope) -> Self {
        Self { advice, scope }
    }
}

/// Include/exclude name patterns.
///
/// `*` matches within one dotted segment, `**` across segments and `?` one
/// character. No include pattern means everything is included; an exclude
/// match always removes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointcutRules {
    /// Names to keep
    #[serde(default)]
    pub include: Vec<String>,
    /// Names to drop
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl PointcutRules {
    /// Whether no rule is declared.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}
