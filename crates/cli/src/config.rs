//! Per-tree configuration
//!
//! Read from `manifest.toml` at the tests root. Every field is optional;
//! command-line flags take precedence.
//!
//! ```toml
//! url_base = "/"
//!
//! [ignore]
//! use_gitignore = true
//! additional_patterns = ["*.swp"]
//! exclude_root_dirs = ["tools", "resources"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use vcs::IgnoreConfig;

/// Configuration file name, looked up at the tests root
pub const CONFIG_FILE: &str = "manifest.toml";

/// Contents of `manifest.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestConfig {
    /// Mount point of the tree in the served url space
    #[serde(default = "default_url_base")]
    pub url_base: String,

    /// Ignore rules used when walking the working copy
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            url_base: default_url_base(),
            ignore: IgnoreConfig::default(),
        }
    }
}

fn default_url_base() -> String {
    "/".to_string()
}

impl ManifestConfig {
    /// Load the configuration for a tests root, defaults when absent
    pub fn load(tests_root: &Path) -> Result<Self> {
        let path = tests_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("Invalid {}", path.display()))?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = ManifestConfig::load(temp_dir.path())?;
        assert_eq!(config, ManifestConfig::default());
        assert_eq!(config.url_base, "/");
        assert!(config.ignore.use_gitignore);
        Ok(())
    }

    #[test]
    fn test_partial_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "url_base = \"/tests/\"\n\n[ignore]\nadditional_patterns = [\"*.swp\"]\n",
        )?;

        let config = ManifestConfig::load(temp_dir.path())?;
        assert_eq!(config.url_base, "/tests/");
        assert_eq!(config.ignore.additional_patterns, vec!["*.swp".to_string()]);
        assert!(config.ignore.use_gitignore);
        assert_eq!(config.ignore.exclude_root_dirs, vec!["tools", "resources"]);
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_an_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "url_bse = \"/\"\n")?;
        assert!(ManifestConfig::load(temp_dir.path()).is_err());
        Ok(())
    }
}
