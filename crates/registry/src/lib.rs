//! Advice registry, discovery and selection.
//!
//! The registry is the declarative record handed over by the attachment
//! pass. Discovery walks it for one operation; selection filters what
//! discovery found.

#![warn(missing_docs)]

pub mod registry;
pub mod discovery;
pub mod selector;
pub mod manifest;

pub use registry::{Registry, RegistryError, Result};
pub use discovery::{Discovery, discover, property_binding, type_scope};
pub use selector::{PointcutSelector, SelectorError, select};
pub use manifest::{Manifest, OperationSpec, DeclarationSpec, AdviceCatalog};
