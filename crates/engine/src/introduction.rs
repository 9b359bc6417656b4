//! Introduced fields: per-receiver state owned by advices.

use weft_core::{Advice, Target};

/// Materializes the fields an advice introduces on a receiver.
pub trait FieldIntroducer: Send + Sync {
    /// Ensure every field `advice` introduces exists on `target`.
    ///
    /// Must be idempotent and safe to call concurrently for the same pair.
    fn ensure_introduced(&self, advice: &Advice, target: &Target);
}

/// Stores introduced fields on the [`Target`] itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetFieldIntroducer;

impl FieldIntroducer for TargetFieldIntroducer {
    fn ensure_introduced(&self, advice: &Advice, target: &Target) {
        for field in advice.introduced_fields() {
            if target.introduce(advice.type_name(), &field.name, || field.initial_value()) {
                tracing::trace!(advice = advice.type_name(), field = %field.name, "Introduced field");
            }
        }
    }
}
