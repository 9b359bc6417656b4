//! Identifiers for modules, types, members and invocations.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Key of a module (the unit that owns program-wide advice declarations).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleKey(String);

impl ModuleKey {
    /// Create a module key.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a type definition (generic definitions are keyed once, without arguments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(String);

impl TypeKey {
    /// Create a type key.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Key of a member within its declaring type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberKey(String);

impl MemberKey {
    /// Create a member key.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an operation definition: declaring type plus member.
///
/// Independent of generic instantiation; type arguments travel separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId {
    /// Declaring type
    pub declaring_type: TypeKey,
    /// Member within the type
    pub member: MemberKey,
}

impl OperationId {
    /// Create an operation identity.
    pub fn new(declaring_type: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            declaring_type: TypeKey::new(declaring_type),
            member: MemberKey::new(member),
        }
    }

    /// Dotted full name, as matched by pointcut selectors.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.member)
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.member)
    }
}

impl std::str::FromStr for OperationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, member) = s
            .rsplit_once("::")
            .ok_or_else(|| format!("expected `Type::member`, got `{s}`"))?;
        if ty.is_empty() || member.is_empty() {
            return Err(format!("expected `Type::member`, got `{s}`"));
        }
        Ok(Self::new(ty, member))
    }
}

/// Unique identifier of one advised call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Ulid);

impl InvocationId {
    /// Generate a new InvocationId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_id_parse() {
        let id: OperationId = "shop::Cart::add".parse().unwrap();
        assert_eq!(id.declaring_type.as_str(), "shop::Cart");
        assert_eq!(id.member.as_str(), "add");
        assert_eq!(id.full_name(), "shop::Cart.add");
        assert_eq!(id.to_string(), "shop::Cart::add");
    }

    #[test]
    fn test_operation_id_parse_rejects_bare_name() {
        assert!("add".parse::<OperationId>().is_err());
        assert!("Cart::".parse::<OperationId>().is_err());
    }

    #[test]
    fn test_invocation_ids_are_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
    }
}
