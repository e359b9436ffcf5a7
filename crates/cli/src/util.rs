//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default manifest file name, relative to the tests root
pub const MANIFEST_FILE: &str = "MANIFEST.json";

/// Resolve the tests root
///
/// An explicit directory wins; otherwise the top level of the git work tree
/// containing the current directory.
pub fn find_tests_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        let root = dir
            .canonicalize()
            .with_context(|| format!("Tests root {} does not exist", dir.display()))?;
        if !root.is_dir() {
            anyhow::bail!("Tests root {} is not a directory", root.display());
        }
        return Ok(root);
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    vcs::git::toplevel(&cwd)
        .context("Not inside a git repository (pass --tests-root to choose a directory)")
}

/// Manifest path for a tests root, unless one was given explicitly
pub fn manifest_path(tests_root: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| tests_root.join(MANIFEST_FILE))
}
