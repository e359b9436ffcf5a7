//! Ignore rules for the filesystem tree provider
//!
//! Sources, in precedence order:
//! 1. Built-in patterns (`.git/` anywhere - always active)
//! 2. Excluded top-level directories (from config)
//! 3. Root `.gitignore` (optional, enabled by default)
//! 4. Additional gitignore-style patterns from config

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Ignore rule set for one tests root
pub struct IgnoreRules {
    /// Tests root directory
    root: PathBuf,

    /// Root .gitignore patterns (optional)
    gitignore: Option<Gitignore>,

    /// Patterns from config (optional)
    additional: Option<Gitignore>,

    /// Configuration
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for a tests root
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            gitignore: None,
            additional: None,
            config,
        };

        rules.reload_ignore_files()?;
        Ok(rules)
    }

    /// Rebuild matchers from disk and config
    pub fn reload_ignore_files(&mut self) -> Result<()> {
        self.gitignore = None;
        if self.config.use_gitignore {
            let gitignore_path = self.root.join(".gitignore");
            if gitignore_path.exists() {
                let mut builder = GitignoreBuilder::new(&self.root);
                if let Some(err) = builder.add(&gitignore_path) {
                    tracing::warn!("Partially invalid {}: {}", gitignore_path.display(), err);
                }
                self.gitignore = Some(builder.build()?);
            }
        }

        self.additional = None;
        if !self.config.additional_patterns.is_empty() {
            let mut builder = GitignoreBuilder::new(&self.root);
            for pattern in &self.config.additional_patterns {
                builder
                    .add_line(None, pattern)
                    .with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
            }
            self.additional = Some(builder.build()?);
        }

        Ok(())
    }

    /// Check if a root-relative path should be left out of the tree
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        // 1. Built-in patterns
        if path.components().any(|c| c.as_os_str() == ".git") {
            return true;
        }

        // 2. Excluded top-level directories
        if let Some(Component::Normal(first)) = path.components().next() {
            let nested = path.components().nth(1).is_some();
            if (nested || is_dir)
                && self
                    .config
                    .exclude_root_dirs
                    .iter()
                    .any(|dir| first == dir.as_str())
            {
                return true;
            }
        }

        // 3. .gitignore
        if let Some(ref gitignore) = self.gitignore {
            if gitignore.matched_path_or_any_parents(path, is_dir).is_ignore() {
                return true;
            }
        }

        // 4. Additional config patterns
        if let Some(ref additional) = self.additional {
            if additional.matched_path_or_any_parents(path, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        let mut count = 1; // Built-in always active
        if !self.config.exclude_root_dirs.is_empty() {
            count += 1;
        }
        if self.gitignore.is_some() {
            count += 1;
        }
        if self.additional.is_some() {
            count += 1;
        }
        count
    }

    /// Get tests root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use the root .gitignore (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Additional gitignore-style patterns
    #[serde(default)]
    pub additional_patterns: Vec<String>,

    /// Top-level directories never listed (default: tools, resources)
    #[serde(default = "default_exclude_root_dirs")]
    pub exclude_root_dirs: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            additional_patterns: vec![],
            exclude_root_dirs: default_exclude_root_dirs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_exclude_root_dirs() -> Vec<String> {
    vec!["tools".to_string(), "resources".to_string()]
}
