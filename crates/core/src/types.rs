//! Type and property definitions.

use crate::id::{MemberKey, ModuleKey, TypeKey};
use serde::{Deserialize, Serialize};

/// Definition of a type that owns operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type key
    pub key: TypeKey,
    /// Defining module
    pub module: ModuleKey,
    /// Base type, if any
    #[serde(default)]
    pub base: Option<TypeKey>,
    /// Lexically enclosing type, if nested
    #[serde(default)]
    pub enclosing: Option<TypeKey>,
    /// Implemented interfaces
    #[serde(default)]
    pub interfaces: Vec<TypeKey>,
    /// Number of generic parameters
    #[serde(default)]
    pub generic_arity: usize,
}

impl TypeDef {
    /// A non-generic, top-level type with no base.
    pub fn new(key: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            key: TypeKey::new(key),
            module: ModuleKey::new(module),
            base: None,
            enclosing: None,
            interfaces: Vec::new(),
            generic_arity: 0,
        }
    }

    /// Set the base type.
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(TypeKey::new(base));
        self
    }

    /// Set the enclosing type.
    pub fn nested_in(mut self, enclosing: impl Into<String>) -> Self {
        self.enclosing = Some(TypeKey::new(enclosing));
        self
    }

    /// Add an implemented interface.
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(TypeKey::new(interface));
        self
    }

    /// Declare generic parameters.
    pub fn generic(mut self, arity: usize) -> Self {
        self.generic_arity = arity;
        self
    }
}

/// Definition of a property and its accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Declaring type
    pub declaring_type: TypeKey,
    /// Property name
    pub name: String,
    /// Getter member
    #[serde(default)]
    pub getter: Option<MemberKey>,
    /// Setter member
    #[serde(default)]
    pub setter: Option<MemberKey>,
}

impl PropertyDef {
    /// A property without accessors.
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: TypeKey::new(declaring_type),
            name: name.into(),
            getter: None,
            setter: None,
        }
    }

    /// Set the getter member.
    pub fn getter(mut self, member: impl Into<String>) -> Self {
        self.getter = Some(MemberKey::new(member));
        self
    }

    /// Set the setter member.
    pub fn setter(mut self, member: impl Into<String>) -> Self {
        self.setter = Some(MemberKey::new(member));
        self
    }

    /// Whether `member` is one of this property's accessors, and if so, the setter.
    pub fn accessor_role(&self, member: &MemberKey) -> Option<bool> {
        if self.getter.as_ref() == Some(member) {
            Some(false)
        } else if self.setter.as_ref() == Some(member) {
            Some(true)
        } else {
            None
        }
    }
}

/// A property bound to the accessor being called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyBinding {
    /// The property
    pub property: PropertyDef,
    /// Whether the accessor is the setter
    pub is_setter: bool,
}
