//! Tree provider contract
//!
//! A provider supplies the authoritative set of files under the tests root
//! and their content. Filtering (ignore rules, directories, paths outside the
//! root) is the provider's job; the manifest trusts the listing.

use crate::hash::Fingerprint;
use std::collections::BTreeMap;

/// One file in a tree listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Tree-relative path with `/` separators
    pub path: String,
    /// Fingerprint already known to the provider, if any
    ///
    /// Must equal what [`crate::hash::hash_bytes`] would return for the
    /// content `show_file` yields. Providers leave it `None` for paths with
    /// local edits.
    pub hash: Option<Fingerprint>,
}

impl TreeEntry {
    /// Entry whose content must be read to be fingerprinted
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: None,
        }
    }

    /// Entry with a fingerprint known up front
    pub fn with_hash(path: impl Into<String>, hash: Fingerprint) -> Self {
        Self {
            path: path.into(),
            hash: Some(hash),
        }
    }
}

/// Kind of uncommitted change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Added,
    Deleted,
    /// Renamed or copied from another path
    Renamed { from: String },
    Untracked,
}

/// Marker for a path whose working-copy content differs from the committed one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalChange {
    pub kind: ChangeKind,
}

/// Source of the current file set and file content
///
/// Implementations must be `Sync`: content is read from the update's worker
/// pool.
pub trait TreeProvider: Sync {
    /// Every file currently in the tree, files only
    fn list_tree(&self) -> anyhow::Result<Vec<TreeEntry>>;

    /// Paths with uncommitted content, keyed by tree-relative path
    fn local_changes(&self) -> anyhow::Result<BTreeMap<String, LocalChange>>;

    /// Bytes of the version of `path` under consideration
    fn show_file(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}
