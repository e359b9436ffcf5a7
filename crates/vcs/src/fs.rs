//! Tree provider backed by a plain directory walk

use crate::ignore::{IgnoreConfig, IgnoreRules};
use crate::tree_path;
use anyhow::{Context, Result};
use manifest::{LocalChange, TreeEntry, TreeProvider};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Working-copy tree: every non-ignored file under the tests root
///
/// There is no committed state to compare against, so there are never any
/// local changes and every file is read to be fingerprinted.
pub struct FsTree {
    rules: IgnoreRules,
}

impl FsTree {
    /// Create a provider for `root` with the given ignore configuration
    pub fn new(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let rules = IgnoreRules::load(root, config)
            .with_context(|| format!("Failed to load ignore rules for {}", root.display()))?;
        debug!(
            "Filesystem tree at {} ({} ignore sources)",
            root.display(),
            rules.active_sources()
        );
        Ok(Self { rules })
    }

    /// Tests root being walked
    pub fn root(&self) -> &Path {
        self.rules.root()
    }
}

impl TreeProvider for FsTree {
    fn list_tree(&self) -> Result<Vec<TreeEntry>> {
        let root = self.root();
        let mut entries = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| match e.path().strip_prefix(root) {
                Ok(rel) if e.depth() > 0 => !self.rules.should_ignore(rel, e.file_type().is_dir()),
                _ => true,
            })
        {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;

            // Files, and symlinks that resolve to files
            let is_file = entry.file_type().is_file()
                || (entry.file_type().is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let rel_path = entry.path().strip_prefix(root)?;
            match tree_path(rel_path) {
                Some(path) => entries.push(TreeEntry::new(path)),
                None => warn!("Skipping non UTF-8 path {}", entry.path().display()),
            }
        }

        Ok(entries)
    }

    fn local_changes(&self) -> Result<BTreeMap<String, LocalChange>> {
        Ok(BTreeMap::new())
    }

    fn show_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.root().join(path);
        std::fs::read(&full_path).with_context(|| format!("Failed to read {}", full_path.display()))
    }
}
