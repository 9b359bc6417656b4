//! Type-erased values and receivers flowing through advice chains.

use crate::advice::Advice;
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;

/// A parameter or return value.
///
/// Cheap to clone; the payload is shared and immutable. Replace a value to
/// change it.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the payload if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Clone the payload out if it is a `T`.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Check the payload type.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Name of the payload type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both values share the same payload.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value<{}>", self.type_name)
    }
}

/// The receiver of an instance operation.
///
/// Besides the object itself, a target owns the fields advices introduce
/// on it, keyed by (advice type, field name). An auto-implemented interface
/// receiver also carries the advice that implements it.
#[derive(Clone)]
pub struct Target {
    object: Value,
    fields: Arc<DashMap<(String, String), Value>>,
    advice: Option<Advice>,
}

impl Target {
    /// Wrap a receiver object.
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        Self::from_value(Value::new(object))
    }

    /// Wrap an already type-erased receiver.
    pub fn from_value(object: Value) -> Self {
        Self {
            object,
            fields: Arc::new(DashMap::new()),
            advice: None,
        }
    }

    /// A receiver standing for an auto-implemented interface, advised by `advice`.
    pub fn advised_interface(advice: Advice) -> Self {
        Self {
            advice: Some(advice),
            ..Self::new(())
        }
    }

    /// The receiver object.
    pub fn object(&self) -> &Value {
        &self.object
    }

    /// Borrow the receiver object as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    /// The advice implementing this receiver, if it is an advised interface.
    pub fn advice(&self) -> Option<&Advice> {
        self.advice.as_ref()
    }

    /// Materialize an introduced field unless it already exists.
    ///
    /// Returns `true` when this call created the field.
    pub fn introduce(&self, advice_type: &str, field: &str, init: impl FnOnce() -> Value) -> bool {
        let mut created = false;
        self.fields
            .entry((advice_type.to_string(), field.to_string()))
            .or_insert_with(|| {
                created = true;
                init()
            });
        created
    }

    /// Read an introduced field.
    pub fn field(&self, advice_type: &str, field: &str) -> Option<Value> {
        self.fields
            .get(&(advice_type.to_string(), field.to_string()))
            .map(|v| v.value().clone())
    }

    /// Overwrite an introduced field.
    pub fn set_field(&self, advice_type: &str, field: &str, value: Value) {
        self.fields
            .insert((advice_type.to_string(), field.to_string()), value);
    }

    /// Number of introduced fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Whether both handles refer to the same receiver.
    pub fn same_instance(&self, other: &Target) -> bool {
        self.object.ptr_eq(&other.object)
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("object", &self.object)
            .field("fields", &self.fields.len())
            .field("advised_interface", &self.advice.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_downcast() {
        let v = Value::new(42_i32);
        assert_eq!(v.get::<i32>(), Some(42));
        assert!(v.downcast_ref::<String>().is_none());
        assert!(v.is::<i32>());
        assert_eq!(v.type_name(), "i32");
    }

    #[test]
    fn test_target_introduce_is_idempotent() {
        let target = Target::new("receiver".to_string());
        assert!(target.introduce("Counter", "calls", || Value::new(0_u32)));
        target.set_field("Counter", "calls", Value::new(3_u32));
        assert!(!target.introduce("Counter", "calls", || Value::new(0_u32)));
        assert_eq!(target.field("Counter", "calls").and_then(|v| v.get::<u32>()), Some(3));
        assert_eq!(target.field_count(), 1);
    }

    #[test]
    fn test_target_clones_share_identity_and_fields() {
        let a = Target::new(1_u8);
        let b = a.clone();
        a.introduce("Audit", "log", || Value::new(Vec::<String>::new()));
        assert!(a.same_instance(&b));
        assert!(b.field("Audit", "log").is_some());
        assert!(!a.same_instance(&Target::new(1_u8)));
    }
}
