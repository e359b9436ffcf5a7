//! Test-suite manifest - incremental index of test files
//!
//! This crate provides:
//! - Git-compatible content fingerprints
//! - Manifest entry types and classification tags
//! - Tree provider and classifier contracts
//! - The incremental update algorithm and reference graph
//! - Portable snapshot and deterministic JSON encoding

pub mod classify;
pub mod error;
pub mod hash;
pub mod item;
pub mod manifest;
pub mod portable;
pub mod provider;

// Re-export main types for convenience
pub use classify::{Classification, Classifier};
pub use error::ManifestError;
pub use hash::Fingerprint;
pub use item::{
    ItemType, ManifestItem, RefTest, RefType, Reference, Role, TestharnessTest, Timeout, UrlItem,
    WdspecTest,
};
pub use manifest::{Manifest, PathRecord};
pub use portable::{load, write, PortableManifest, MANIFEST_VERSION};
pub use provider::{ChangeKind, LocalChange, TreeEntry, TreeProvider};

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;
