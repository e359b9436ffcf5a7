//! On-disk test trees

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub const TESTHARNESS: &str = r#"<!doctype html>
<script src="/resources/testharness.js"></script>
<script src="/resources/testharnessreport.js"></script>
"#;

/// Temporary test tree
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    /// Empty tree
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("Failed to create temp dir")?,
        })
    }

    /// Small tree with one of each common kind of file
    pub fn standard() -> Result<Self> {
        let tree = Self::new()?;
        tree.write("dom/a.html", TESTHARNESS)?;
        tree.write("dom/b.html", "<link rel=match href=b-ref.html>")?;
        tree.write("dom/b-ref.html", "<p>green</p>")?;
        tree.write("dom/c-manual.html", "<p>click</p>")?;
        tree.write("dom/worker.any.js", "test(() => {});")?;
        tree.write("dom/resources/helper.js", "")?;
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn root_str(&self) -> &str {
        self.root().to_str().unwrap_or_default()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root().join("MANIFEST.json")
    }

    pub fn write(&self, path: &str, content: &str) -> Result<()> {
        let full = self.root().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content).with_context(|| format!("Failed to write {}", full.display()))
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        fs::remove_file(self.root().join(path)).with_context(|| format!("Failed to remove {}", path))
    }

    /// Parsed manifest file
    pub fn read_manifest(&self) -> Result<Value> {
        let text = fs::read_to_string(self.manifest_path())?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn manifest_bytes(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.manifest_path())?)
    }

    /// Run git in the tree with a fixed identity
    pub fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args([
                "-c",
                "user.name=Manifest Tests",
                "-c",
                "user.email=tests@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .current_dir(self.root())
            .output()
            .context("Failed to run git")?;
        if !output.status.success() {
            anyhow::bail!(
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    /// Turn the tree into a repository with everything committed
    pub fn commit_all(&self) -> Result<()> {
        self.git(&["init", "-q"])?;
        self.git(&["add", "."])?;
        self.git(&["commit", "-q", "-m", "tests"])
    }
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
