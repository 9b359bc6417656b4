//! Priority ordering of selected advices.

use std::cmp::Reverse;
use weft_core::{Advice, AdviceInstance};

/// Effective priority of `advice`.
pub fn priority_of(advice: &Advice, default_priority: i32) -> i32 {
    advice.priority().unwrap_or(default_priority)
}

/// Sort by priority, highest first.
///
/// The sort is stable: equal priorities keep discovery order.
pub fn order(mut advices: Vec<AdviceInstance>, default_priority: i32) -> Vec<AdviceInstance> {
    advices.sort_by_key(|a| Reverse(priority_of(&a.advice, default_priority)));
    advices
}
