//! Weft engine.
//!
//! Resolves intercepted calls to cached aspect descriptors, builds the
//! advice chain for each call and drives it to completion.
//!
//! ```text
//! CallSite → DescriptorResolver (cache) → specialize → ChainBuilder → execute → Returned
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod ordering;
pub mod descriptor;
pub mod cache;
pub mod introduction;
pub mod chain;
pub mod executor;
pub mod info;
pub mod call;
pub mod engine;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use ordering::{order, priority_of};
pub use descriptor::{AspectDescriptor, SpecializedDescriptor};
pub use cache::{DescriptorCache, DescriptorKey, DescriptorResolver};
pub use introduction::{FieldIntroducer, TargetFieldIntroducer};
pub use chain::{plan, ChainBuilder, LayerKind};
pub use executor::{execute, AdvisedFuture, Returned};
pub use call::CallSite;
pub use engine::{Engine, LayerDescription};
