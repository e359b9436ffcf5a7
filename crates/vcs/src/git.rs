//! Tree provider backed by git
//!
//! The listing is the tree committed at `HEAD`, overlaid with the working
//! copy changes `git status` reports. Committed blob ids double as content
//! fingerprints, so unchanged committed files are never read.

use crate::strip_tree_prefix;
use anyhow::{Context, Result};
use manifest::{ChangeKind, Fingerprint, LocalChange, TreeEntry, TreeProvider};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::debug;

/// Git-backed view of a tests root
///
/// Working copy status is captured on first use and then reused, so one
/// instance describes one point in time; create a new one per update.
pub struct GitTree {
    /// Repository top-level directory
    repo_root: PathBuf,
    /// Tests root inside the repository
    tests_root: PathBuf,
    /// Tests root relative to the repository root, `/`-separated, "" at top level
    prefix: String,
    /// Cached `git status`, keyed by tests-root-relative path
    status: Mutex<Option<Arc<BTreeMap<String, LocalChange>>>>,
}

impl GitTree {
    /// Open the repository containing `tests_root`
    ///
    /// Fails if git is missing, `tests_root` is not inside a work tree, or
    /// the repository has no commits.
    pub fn open(tests_root: &Path) -> Result<Self> {
        let tests_root = tests_root
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", tests_root.display()))?;
        let repo_root = toplevel(&tests_root)?;

        let rel = tests_root
            .strip_prefix(&repo_root)
            .with_context(|| format!("{} is outside {}", tests_root.display(), repo_root.display()))?;
        let prefix = crate::tree_path(rel)
            .ok_or_else(|| anyhow::anyhow!("Non UTF-8 tests root {}", tests_root.display()))?;

        let tree = Self {
            repo_root,
            tests_root,
            prefix,
            status: Mutex::new(None),
        };
        tree.git(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .context("Repository has no commits")?;

        debug!(
            "Git tree at {} (prefix {:?})",
            tree.repo_root.display(),
            tree.prefix
        );
        Ok(tree)
    }

    /// Like [`GitTree::open`], but `None` when git cannot serve this root
    pub fn for_path(tests_root: &Path) -> Option<Self> {
        match Self::open(tests_root) {
            Ok(tree) => Some(tree),
            Err(e) => {
                debug!("No usable git tree at {}: {:#}", tests_root.display(), e);
                None
            }
        }
    }

    /// Repository top-level directory
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn git(&self, args: &[&str]) -> Result<Vec<u8>> {
        run_git(&self.repo_root, args)
    }

    /// Pathspec limiting a command to the tests root
    fn pathspec(&self) -> Vec<&str> {
        if self.prefix.is_empty() {
            vec![]
        } else {
            vec!["--", self.prefix.as_str()]
        }
    }

    fn status(&self) -> Result<Arc<BTreeMap<String, LocalChange>>> {
        let mut cached = self.status.lock();
        if let Some(status) = cached.as_ref() {
            return Ok(Arc::clone(status));
        }

        let mut args = vec![
            "status",
            "--porcelain",
            "-z",
            "--untracked-files=all",
            "--ignore-submodules=all",
        ];
        args.extend(self.pathspec());
        let output = self.git(&args)?;

        let status = Arc::new(parse_status(&output, &self.prefix));
        debug!("git status: {} local changes", status.len());
        *cached = Some(Arc::clone(&status));
        Ok(status)
    }

    fn full_path(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.prefix, path)
        }
    }
}

impl TreeProvider for GitTree {
    fn list_tree(&self) -> Result<Vec<TreeEntry>> {
        let mut args = vec!["ls-tree", "-r", "-z", "--full-tree", "HEAD"];
        args.extend(self.pathspec());
        let output = self.git(&args)?;

        let mut listing: BTreeMap<String, Option<Fingerprint>> = parse_ls_tree(&output, &self.prefix)?
            .into_iter()
            .map(|entry| (entry.path, entry.hash))
            .collect();

        // Overlay uncommitted changes
        for (path, change) in self.status()?.iter() {
            match change.kind {
                ChangeKind::Deleted => {
                    listing.remove(path);
                }
                _ => {
                    listing.insert(path.clone(), None);
                }
            }
        }

        Ok(listing
            .into_iter()
            .filter(|(path, _)| !self.tests_root.join(path).is_dir())
            .map(|(path, hash)| TreeEntry { path, hash })
            .collect())
    }

    fn local_changes(&self) -> Result<BTreeMap<String, LocalChange>> {
        Ok(self.status()?.as_ref().clone())
    }

    fn show_file(&self, path: &str) -> Result<Vec<u8>> {
        let locally_changed = self
            .status()?
            .get(path)
            .is_some_and(|change| change.kind != ChangeKind::Deleted);

        if locally_changed {
            let full_path = self.tests_root.join(path);
            return std::fs::read(&full_path)
                .with_context(|| format!("Failed to read {}", full_path.display()));
        }

        let object = format!("HEAD:{}", self.full_path(path));
        self.git(&["cat-file", "blob", &object])
    }
}

/// Top-level directory of the work tree containing `path`
pub fn toplevel(path: &Path) -> Result<PathBuf> {
    let output = run_git(path, &["rev-parse", "--show-toplevel"])?;
    let toplevel = String::from_utf8(output).context("git returned a non UTF-8 path")?;
    let toplevel = PathBuf::from(toplevel.trim_end_matches(['\n', '\r']));
    toplevel
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", toplevel.display()))
}

fn run_git(cwd: &Path, args: &[&str]) -> Result<Vec<u8>> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .context("Failed to run git")?;

    if !output.status.success() {
        anyhow::bail!(
            "git {} failed ({}): {}",
            args.first().copied().unwrap_or(""),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(output.stdout)
}

/// Parse `git ls-tree -r -z` output into tests-root-relative blob entries
///
/// Records look like `<mode> SP <type> SP <object> TAB <path> NUL`; only
/// blobs are kept (submodules show up as `commit`).
fn parse_ls_tree(output: &[u8], prefix: &str) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for record in output.split(|b| *b == 0).filter(|r| !r.is_empty()) {
        let record = String::from_utf8_lossy(record);
        let (meta, path) = record
            .split_once('\t')
            .ok_or_else(|| anyhow::anyhow!("Unexpected ls-tree record: {:?}", record))?;

        let mut fields = meta.split(' ');
        let (_mode, kind, object) = match (fields.next(), fields.next(), fields.next()) {
            (Some(mode), Some(kind), Some(object)) => (mode, kind, object),
            _ => anyhow::bail!("Unexpected ls-tree record: {:?}", record),
        };
        if kind != "blob" {
            continue;
        }

        if let Some(rel) = strip_tree_prefix(prefix, path) {
            entries.push(TreeEntry::with_hash(rel, Fingerprint::from_hex(object)?));
        }
    }

    Ok(entries)
}

/// Parse `git status --porcelain -z` output
///
/// Records are `XY SP <path> NUL`; renames and copies are followed by a
/// second `<source path> NUL` field. A rename yields a `Renamed` change for
/// the new path and a `Deleted` change for the old one. A path deleted
/// from the working copy is `Deleted` whatever its staged state; paths outside the
/// tests root are dropped, so a file renamed out of the root disappears
/// from it and a file renamed in shows up as new.
fn parse_status(output: &[u8], prefix: &str) -> BTreeMap<String, LocalChange> {
    let mut changes = BTreeMap::new();
    let mut fields = output.split(|b| *b == 0).filter(|f| !f.is_empty());

    while let Some(field) = fields.next() {
        if field.len() < 4 {
            continue;
        }
        let (x, y) = (field[0], field[1]);
        let path = String::from_utf8_lossy(&field[3..]).into_owned();

        let from = match x {
            b'R' | b'C' => fields
                .next()
                .map(|f| String::from_utf8_lossy(f).into_owned()),
            _ => None,
        };
        if x == b'R' {
            if let Some(old) = from.as_deref().and_then(|from| strip_tree_prefix(prefix, from)) {
                changes.entry(old.to_string()).or_insert(LocalChange {
                    kind: ChangeKind::Deleted,
                });
            }
        }

        // A working copy deletion wins over whatever is staged
        let kind = match (x, y) {
            (b'D', _) | (_, b'D') => ChangeKind::Deleted,
            (b'R', _) | (b'C', _) => ChangeKind::Renamed {
                from: from.unwrap_or_default(),
            },
            (b'?', b'?') => ChangeKind::Untracked,
            (b'A', _) => ChangeKind::Added,
            _ => ChangeKind::Modified,
        };

        if let Some(rel) = strip_tree_prefix(prefix, &path) {
            changes.insert(rel.to_string(), LocalChange { kind });
        }
    }

    changes
}
