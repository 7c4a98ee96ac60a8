//! Storage layer for taco-operator
//!
//! The resource store interface the controller consumes, plus an in-memory
//! backend and a YAML manifest loader for development and tests.

mod manifest;
mod memory;
mod traits;

pub use manifest::{load_manifests, Manifest, ManifestSummary};
pub use memory::InMemoryStorage;
pub use traits::{OrderStorage, SecretStorage, Storage, StorageResult, WatchEvent};
