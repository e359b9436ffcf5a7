//! Create or refresh a manifest file

use crate::config::ManifestConfig;
use crate::sourcefile::SourceFileClassifier;
use crate::util;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use manifest::{Classifier, LocalChange, Manifest, TreeEntry, TreeProvider};
use owo_colors::OwoColorize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Options for `manifest update`
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub tests_root: Option<PathBuf>,
    pub path: Option<PathBuf>,
    pub rebuild: bool,
    pub work: bool,
    pub url_base: Option<String>,
}

/// What an update did
#[derive(Debug)]
pub struct UpdateOutcome {
    pub manifest: Manifest,
    /// Entries changed relative to the manifest that was loaded
    pub changed: bool,
    /// Started from an empty manifest instead of the file on disk
    pub rebuilt: bool,
    /// The manifest file was (re)written
    pub written: bool,
}

pub fn run(opts: UpdateOptions) -> Result<()> {
    let start = Instant::now();

    let tests_root = util::find_tests_root(opts.tests_root.as_deref())?;
    let config = ManifestConfig::load(&tests_root)?;
    let url_base = opts.url_base.unwrap_or(config.url_base);
    let manifest_path = util::manifest_path(&tests_root, opts.path);

    let tree = vcs::select_provider(&tests_root, opts.work, config.ignore)?;
    let classifier = SourceFileClassifier::new();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Updating {}", manifest_path.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = update_manifest(
        &tests_root,
        &manifest_path,
        tree.as_ref(),
        &classifier,
        &url_base,
        opts.rebuild,
    );
    spinner.finish_and_clear();
    let outcome = outcome?;

    let elapsed = start.elapsed();
    if outcome.written {
        let verb = if outcome.rebuilt { "Rebuilt" } else { "Updated" };
        println!(
            "{} {} ({} paths, {:.2}s)",
            verb.green(),
            manifest_path.display(),
            outcome.manifest.len(),
            elapsed.as_secs_f64()
        );
    } else {
        println!(
            "{} {}",
            "Up to date".dimmed(),
            manifest_path.display().dimmed()
        );
    }

    Ok(())
}

/// Load the manifest at `path`, bring it up to date and write it back if needed
///
/// A missing, unreadable-as-manifest or foreign-version file, or one built
/// for another `url_base`, is replaced by a fresh build. Other I/O errors
/// abort. The manifest file itself is never indexed.
pub fn update_manifest(
    tests_root: &Path,
    path: &Path,
    tree: &dyn TreeProvider,
    classifier: &dyn Classifier,
    url_base: &str,
    rebuild: bool,
) -> Result<UpdateOutcome> {
    let (mut manifest, rebuilt) = if rebuild {
        info!("Rebuilding manifest from scratch");
        (Manifest::new(url_base), true)
    } else {
        match manifest::load(path) {
            Ok(existing) if existing.url_base() == url_base => (existing, false),
            Ok(existing) => {
                info!(
                    "url_base changed from {} to {}, rebuilding",
                    existing.url_base(),
                    url_base
                );
                (Manifest::new(url_base), true)
            }
            Err(e) if e.is_rebuildable() => {
                if path.exists() {
                    warn!("Discarding {}: {}", path.display(), e);
                } else {
                    info!("No manifest at {}, building", path.display());
                }
                (Manifest::new(url_base), true)
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to load {}", path.display()));
            }
        }
    };

    let tree = SkipPaths {
        inner: tree,
        skip: tree_relative(tests_root, path).into_iter().collect(),
    };
    let changed = manifest
        .update(&tree, classifier)
        .context("Failed to update manifest")?;

    let written = changed || rebuilt;
    if written {
        manifest::write(&manifest, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} ({} paths)", path.display(), manifest.len());
    }

    Ok(UpdateOutcome {
        manifest,
        changed,
        rebuilt,
        written,
    })
}

/// Tree with some paths hidden from the listing
struct SkipPaths<'a> {
    inner: &'a dyn TreeProvider,
    skip: Vec<String>,
}

impl TreeProvider for SkipPaths<'_> {
    fn list_tree(&self) -> Result<Vec<TreeEntry>> {
        let mut listing = self.inner.list_tree()?;
        listing.retain(|entry| !self.skip.contains(&entry.path));
        Ok(listing)
    }

    fn local_changes(&self) -> Result<BTreeMap<String, LocalChange>> {
        self.inner.local_changes()
    }

    fn show_file(&self, path: &str) -> Result<Vec<u8>> {
        self.inner.show_file(path)
    }
}

/// Tree path of `path` if it lies under `tests_root`
fn tree_relative(tests_root: &Path, path: &Path) -> Option<String> {
    let root = tests_root.canonicalize().ok()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize().ok()?,
        _ => std::env::current_dir().ok()?,
    };
    let full = parent.join(path.file_name()?);

    let parts = full
        .strip_prefix(&root)
        .ok()?
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
