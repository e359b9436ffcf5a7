//! Show what a manifest file contains

use crate::util;
use anyhow::{Context, Result};
use manifest::{ItemType, Manifest, MANIFEST_VERSION};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Manifest summary
#[derive(Debug, PartialEq, Eq)]
pub struct ManifestInfo {
    pub path: PathBuf,
    pub url_base: String,
    pub path_count: usize,
    /// Entry count per type, in `ItemType::ALL` order, zeros included
    pub type_counts: Vec<(ItemType, usize)>,
    pub reference_nodes: usize,
}

pub fn run(tests_root: Option<PathBuf>, path: Option<PathBuf>) -> Result<()> {
    let manifest_path = match path {
        Some(path) => path,
        None => {
            let tests_root = util::find_tests_root(tests_root.as_deref())?;
            util::manifest_path(&tests_root, None)
        }
    };

    let manifest = manifest::load(&manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;
    let info = gather_info(&manifest_path, &manifest);

    display_info(&info);
    Ok(())
}

pub fn gather_info(path: &Path, manifest: &Manifest) -> ManifestInfo {
    let counts = manifest.type_counts();

    ManifestInfo {
        path: path.to_path_buf(),
        url_base: manifest.url_base().to_string(),
        path_count: manifest.len(),
        type_counts: ItemType::ALL
            .iter()
            .map(|item_type| (*item_type, counts.get(item_type).copied().unwrap_or(0)))
            .collect(),
        reference_nodes: manifest.reference_nodes().count(),
    }
}

fn display_info(info: &ManifestInfo) {
    println!("{}", "Manifest Information".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Manifest:");
    println!("  Location:     {}", info.path.display());
    println!("  Version:      {}", MANIFEST_VERSION);
    println!("  URL base:     {}", info.url_base);
    println!("  Paths:        {}", info.path_count);
    println!();

    println!("Items:");
    for (item_type, count) in &info.type_counts {
        let label = format!("{}:", item_type);
        if *count == 0 {
            println!("  {:<20}{}", label.dimmed(), count.dimmed());
        } else {
            println!("  {:<20}{}", label.cyan(), count);
        }
    }
    println!();

    println!("Reference graph:");
    println!("  Nodes:        {}", info.reference_nodes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sourcefile::SourceFileClassifier;
    use manifest::{ChangeKind, LocalChange, TreeEntry, TreeProvider};
    use std::collections::BTreeMap;

    struct StaticTree(Vec<(&'static str, &'static str)>);

    impl TreeProvider for StaticTree {
        fn list_tree(&self) -> Result<Vec<TreeEntry>> {
            Ok(self.0.iter().map(|(path, _)| TreeEntry::new(*path)).collect())
        }

        fn local_changes(&self) -> Result<BTreeMap<String, LocalChange>> {
            Ok(BTreeMap::from([(
                "a.html".to_string(),
                LocalChange {
                    kind: ChangeKind::Untracked,
                },
            )]))
        }

        fn show_file(&self, path: &str) -> Result<Vec<u8>> {
            self.0
                .iter()
                .find(|(p, _)| *p == path)
                .map(|(_, content)| content.as_bytes().to_vec())
                .ok_or_else(|| anyhow::anyhow!("missing {}", path))
        }
    }

    #[test]
    fn test_gather_info() -> Result<()> {
        let tree = StaticTree(vec![
            ("a.html", "<link rel=match href=b.html>"),
            ("b.html", "<link rel=mismatch href=c.html>"),
            ("c.html", "<p>"),
            ("d.html", "<script src=/resources/testharness.js></script>"),
            ("e-manual.html", ""),
        ]);
        let mut manifest = Manifest::new("/");
        manifest.update(&tree, &SourceFileClassifier::new())?;

        let info = gather_info(Path::new("MANIFEST.json"), &manifest);
        assert_eq!(info.path_count, 5);
        assert_eq!(info.url_base, "/");
        assert_eq!(info.reference_nodes, 1);

        let counts: BTreeMap<_, _> = info.type_counts.iter().copied().collect();
        assert_eq!(counts[&ItemType::Reftest], 2);
        assert_eq!(counts[&ItemType::Testharness], 1);
        assert_eq!(counts[&ItemType::Manual], 1);
        assert_eq!(counts[&ItemType::Support], 1);
        assert_eq!(counts[&ItemType::Wdspec], 0);
        assert_eq!(info.type_counts.len(), ItemType::ALL.len());
        Ok(())
    }
}
