//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Materialize introduced fields on receivers before advices run
    pub introduce_fields: bool,
    /// Priority of advices that declare none
    pub default_priority: i32,
    /// Map calls without an inner operation to the declaring type's interface member
    pub interface_pointcuts: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            introduce_fields: true,
            default_priority: weft_core::Priority::DEFAULT,
            interface_pointcuts: true,
        }
    }
}
