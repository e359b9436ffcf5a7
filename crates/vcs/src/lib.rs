//! Tree providers for the test-suite manifest
//!
//! This crate provides:
//! - A git-backed provider (committed tree + working copy status)
//! - A filesystem provider (directory walk + ignore rules)
//! - Provider selection with git-then-filesystem fallback

pub mod fs;
pub mod git;
pub mod ignore;

pub use fs::FsTree;
pub use git::GitTree;
pub use ignore::{IgnoreConfig, IgnoreRules};

use anyhow::Result;
use manifest::TreeProvider;
use std::path::{Component, Path};
use tracing::info;

/// Pick the provider for a tests root
///
/// Git is used when the root lives in a repository with at least one commit
/// and `working_copy` is not requested; otherwise the directory is walked.
pub fn select_provider(
    tests_root: &Path,
    working_copy: bool,
    ignore: IgnoreConfig,
) -> Result<Box<dyn TreeProvider>> {
    if !working_copy {
        if let Some(tree) = GitTree::for_path(tests_root) {
            info!("Using git tree at {}", tree.repo_root().display());
            return Ok(Box::new(tree));
        }
        info!("No git repository, walking {}", tests_root.display());
    } else {
        info!("Walking working copy at {}", tests_root.display());
    }

    Ok(Box::new(FsTree::new(tests_root, ignore)?))
}

/// Join normal path components with `/`
///
/// `None` if any component is not valid UTF-8.
pub(crate) fn tree_path(rel: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// Strip a `/`-separated directory prefix from a repository path
///
/// `None` when the path is outside the prefix.
pub(crate) fn strip_tree_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    path.strip_prefix(prefix)?
        .strip_prefix('/')
        .filter(|rest| !rest.is_empty())
}
