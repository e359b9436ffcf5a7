//! In-memory manifest and the incremental update algorithm

use crate::classify::Classifier;
use crate::hash::{self, Fingerprint};
use crate::item::{ItemType, ManifestItem, RefTest, Role};
use crate::provider::{LocalChange, TreeEntry, TreeProvider};
use crate::Result;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Entries grouped by classification, then by source path
pub(crate) type ItemMap = BTreeMap<ItemType, BTreeMap<String, Vec<ManifestItem>>>;

/// Fingerprint and classification of one known path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRecord {
    /// Content fingerprint at the time the path was classified
    pub hash: Fingerprint,
    /// Bucket holding the path's entries, `None` if it produced none
    pub item_type: Option<ItemType>,
}

/// Complete manifest contents, replaced as a unit by each update pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ManifestState {
    pub(crate) paths: BTreeMap<String, PathRecord>,
    pub(crate) items: ItemMap,
    /// url -> source path of every reftest in the `Node` role
    pub(crate) reference_nodes: BTreeMap<String, String>,
}

/// Index of every test file under a tests root
///
/// Updated in place by [`Manifest::update`], which only re-classifies paths
/// whose fingerprint changed. All reads are side-effect free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    url_base: String,
    state: ManifestState,
}

/// Result of processing one listed path
struct PathOutcome {
    path: String,
    record: PathRecord,
    items: Vec<ManifestItem>,
    /// Classifier ran for this path
    dirty: bool,
}

impl Manifest {
    /// Create an empty manifest mounted at `url_base`
    pub fn new(url_base: impl Into<String>) -> Self {
        Self {
            url_base: url_base.into(),
            state: ManifestState::default(),
        }
    }

    /// Build a manifest from decoded parts, restoring derived state
    pub(crate) fn from_parts(
        url_base: String,
        paths: BTreeMap<String, PathRecord>,
        mut items: ItemMap,
    ) -> Self {
        for (path, entries) in items.values_mut().flat_map(|by_path| by_path.iter_mut()) {
            for item in entries.iter_mut() {
                item.set_path(path);
            }
            entries.sort();
        }
        let reference_nodes = compute_reference_graph(&mut items);

        Self {
            url_base,
            state: ManifestState {
                paths,
                items,
                reference_nodes,
            },
        }
    }

    pub(crate) fn state(&self) -> &ManifestState {
        &self.state
    }

    /// Mount point urls are derived from
    pub fn url_base(&self) -> &str {
        &self.url_base
    }

    /// Number of known paths
    pub fn len(&self) -> usize {
        self.state.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.paths.is_empty()
    }

    /// Fingerprint record of a path
    pub fn path_record(&self, path: &str) -> Option<&PathRecord> {
        self.state.paths.get(path)
    }

    /// All known paths with their records, sorted by path
    pub fn paths(&self) -> impl Iterator<Item = (&str, &PathRecord)> + '_ {
        self.state.paths.iter().map(|(path, record)| (path.as_str(), record))
    }

    /// Entries defined by one source file
    pub fn items_for_path(&self, path: &str) -> &[ManifestItem] {
        self.state
            .paths
            .get(path)
            .and_then(|record| record.item_type)
            .and_then(|item_type| self.state.items.get(&item_type))
            .and_then(|by_path| by_path.get(path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Entries of the requested types, grouped by path
    ///
    /// Types are visited in the order given, paths in sorted order.
    pub fn iter_types<'a>(
        &'a self,
        types: &'a [ItemType],
    ) -> impl Iterator<Item = (ItemType, &'a str, &'a [ManifestItem])> + 'a {
        types.iter().flat_map(move |item_type| {
            self.state
                .items
                .get(item_type)
                .into_iter()
                .flat_map(move |by_path| {
                    by_path
                        .iter()
                        .map(move |(path, items)| (*item_type, path.as_str(), items.as_slice()))
                })
        })
    }

    /// Number of entries per classification
    pub fn type_counts(&self) -> BTreeMap<ItemType, usize> {
        self.state
            .items
            .iter()
            .map(|(item_type, by_path)| (*item_type, by_path.values().map(Vec::len).sum()))
            .collect()
    }

    /// Reftest that some other reftest compares against, by url
    pub fn get_reference(&self, url: &str) -> Option<&RefTest> {
        let path = self.state.reference_nodes.get(url)?;
        self.reftests_at(path).find(|test| test.url == url)
    }

    /// Every reftest in the `Node` role, sorted by url
    pub fn reference_nodes(&self) -> impl Iterator<Item = &RefTest> + '_ {
        self.state
            .reference_nodes
            .iter()
            .filter_map(move |(url, path)| self.reftests_at(path).find(|test| &test.url == url))
    }

    fn reftests_at<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a RefTest> + 'a {
        self.state
            .items
            .get(&ItemType::Reftest)
            .and_then(|by_path| by_path.get(path))
            .into_iter()
            .flatten()
            .filter_map(ManifestItem::as_reftest)
    }

    /// Bring the manifest in line with the tree
    ///
    /// Only new paths and paths whose fingerprint changed are passed to the
    /// classifier. Returns whether anything changed. On error the manifest
    /// is left exactly as it was.
    pub fn update<P, C>(&mut self, tree: &P, classifier: &C) -> Result<bool>
    where
        P: TreeProvider + ?Sized,
        C: Classifier + ?Sized,
    {
        // 1. Current universe of paths
        let mut listing = tree.list_tree()?;
        listing.sort_by(|a, b| a.path.cmp(&b.path));
        listing.dedup_by(|a, b| a.path == b.path);

        // 2. Paths whose listed fingerprint cannot be trusted
        let local_changes = tree.local_changes()?;
        debug!(
            "Updating manifest: {} listed paths, {} local changes",
            listing.len(),
            local_changes.len()
        );

        // 3. Fingerprint and, where needed, classify each path
        let outcomes: Vec<PathOutcome> = listing
            .par_iter()
            .filter_map(|entry| self.process_path(entry, &local_changes, tree, classifier))
            .collect();

        // 4. Merge into fresh tables
        let mut changed = false;
        let mut reftests_touched = false;
        let mut classified = 0usize;
        let mut paths = BTreeMap::new();
        let mut items: ItemMap = BTreeMap::new();

        for outcome in outcomes {
            if outcome.dirty {
                changed = true;
                classified += 1;

                let was_reftest = self
                    .state
                    .paths
                    .get(&outcome.path)
                    .is_some_and(|old| old.item_type == Some(ItemType::Reftest));
                if was_reftest || outcome.record.item_type == Some(ItemType::Reftest) {
                    reftests_touched = true;
                }
            }

            if let Some(item_type) = outcome.record.item_type {
                items
                    .entry(item_type)
                    .or_default()
                    .insert(outcome.path.clone(), outcome.items);
            }
            paths.insert(outcome.path, outcome.record);
        }

        // 5. Paths that disappeared
        let mut removed = 0usize;
        for (path, old) in &self.state.paths {
            if !paths.contains_key(path) {
                removed += 1;
                changed = true;
                if old.item_type == Some(ItemType::Reftest) {
                    reftests_touched = true;
                }
            }
        }

        // 6. Reference graph depends on the whole reftest population
        let reference_nodes = if reftests_touched {
            compute_reference_graph(&mut items)
        } else {
            self.state.reference_nodes.clone()
        };

        info!(
            "Manifest update: {} paths, {} classified, {} removed",
            paths.len(),
            classified,
            removed
        );

        // 7. Swap in the new state
        self.state = ManifestState {
            paths,
            items,
            reference_nodes,
        };

        Ok(changed)
    }

    fn process_path<P, C>(
        &self,
        entry: &TreeEntry,
        local_changes: &BTreeMap<String, LocalChange>,
        tree: &P,
        classifier: &C,
    ) -> Option<PathOutcome>
    where
        P: TreeProvider + ?Sized,
        C: Classifier + ?Sized,
    {
        let path = entry.path.as_str();
        let previous = self.state.paths.get(path);
        let listed_hash = if local_changes.contains_key(path) {
            None
        } else {
            entry.hash
        };

        // Provider vouches for the content and it is what we indexed
        if let (Some(hash), Some(old)) = (listed_hash, previous) {
            if old.hash == hash {
                return Some(self.reuse(path, old));
            }
        }

        let content = match tree.show_file(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {:#}", path, e);
                return previous.map(|old| self.reuse(path, old));
            }
        };

        let hash = listed_hash.unwrap_or_else(|| hash::hash_bytes(&content));
        if let Some(old) = previous {
            if old.hash == hash {
                return Some(self.reuse(path, old));
            }
        }

        let classification = classifier.classify(path, &content, &self.url_base);
        let item_type = classification.item_type;
        let mut items: Vec<ManifestItem> = classification
            .items
            .into_iter()
            .filter(|item| Some(item.item_type()) == item_type)
            .collect();
        for item in &mut items {
            item.set_path(path);
        }
        items.sort();

        Some(PathOutcome {
            path: path.to_string(),
            record: PathRecord { hash, item_type },
            items,
            dirty: true,
        })
    }

    fn reuse(&self, path: &str, old: &PathRecord) -> PathOutcome {
        let items = old
            .item_type
            .and_then(|item_type| self.state.items.get(&item_type))
            .and_then(|by_path| by_path.get(path))
            .cloned()
            .unwrap_or_default();

        PathOutcome {
            path: path.to_string(),
            record: *old,
            items,
            dirty: false,
        }
    }
}

/// Assign every reftest its role and index the `Node`s by url
///
/// A reftest is a `Node` iff its url is the target of at least one
/// reference anywhere in the population, its own list included.
fn compute_reference_graph(items: &mut ItemMap) -> BTreeMap<String, String> {
    let mut nodes = BTreeMap::new();
    let Some(reftests) = items.get_mut(&ItemType::Reftest) else {
        return nodes;
    };

    let has_inbound: HashSet<String> = reftests
        .values()
        .flatten()
        .filter_map(ManifestItem::as_reftest)
        .flat_map(|test| test.references.iter().map(|reference| reference.url.clone()))
        .collect();

    for (path, tests) in reftests.iter_mut() {
        for test in tests.iter_mut().filter_map(ManifestItem::as_reftest_mut) {
            if has_inbound.contains(&test.url) {
                test.role = Role::Node;
                nodes.insert(test.url.clone(), path.clone());
            } else {
                test.role = Role::Leaf;
            }
        }
    }

    debug!("Reference graph: {} nodes", nodes.len());
    nodes
}
