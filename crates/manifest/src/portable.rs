//! Portable snapshot and on-disk encoding
//!
//! The persisted document looks like:
//! ```text
//! {
//!   "items": { "<type>": { "<path>": [ {"type": "<type>", ...}, ... ] } },
//!   "paths": { "<path>": ["<fingerprint>", "<type>" | null] },
//!   "url_base": "/",
//!   "version": 1
//! }
//! ```
//! Keys and entries are sorted, so encoding an unchanged manifest twice
//! yields identical bytes.

use crate::error::ManifestError;
use crate::hash::Fingerprint;
use crate::item::{ItemType, ManifestItem};
use crate::manifest::{Manifest, PathRecord};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Schema version of the persisted document
pub const MANIFEST_VERSION: u64 = 1;

/// Encoding-agnostic snapshot of a manifest
///
/// Fields are declared in key order so encoders that keep declaration order
/// still emit sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableManifest {
    pub items: BTreeMap<ItemType, BTreeMap<String, Vec<ManifestItem>>>,
    pub paths: BTreeMap<String, (Fingerprint, Option<ItemType>)>,
    pub url_base: String,
    pub version: u64,
}

impl Manifest {
    /// Snapshot of the manifest contents
    ///
    /// Entries carry only what the encoding keeps: paths and reference roles
    /// are cleared and restored by [`Manifest::from_portable`].
    pub fn to_portable(&self) -> PortableManifest {
        let state = self.state();

        PortableManifest {
            items: state
                .items
                .iter()
                .map(|(item_type, by_path)| {
                    let by_path: BTreeMap<String, Vec<ManifestItem>> = by_path
                        .iter()
                        .map(|(path, entries)| {
                            (path.clone(), entries.iter().map(ManifestItem::to_persisted).collect())
                        })
                        .collect();
                    (*item_type, by_path)
                })
                .collect(),
            paths: state
                .paths
                .iter()
                .map(|(path, record)| (path.clone(), (record.hash, record.item_type)))
                .collect(),
            url_base: self.url_base().to_string(),
            version: MANIFEST_VERSION,
        }
    }

    /// Rebuild a manifest from a snapshot
    ///
    /// The snapshot must carry the current schema version and be internally
    /// consistent. Reference roles are recomputed, not trusted.
    pub fn from_portable(doc: PortableManifest) -> Result<Self> {
        if doc.version != MANIFEST_VERSION {
            return Err(ManifestError::VersionMismatch {
                expected: MANIFEST_VERSION,
                found: doc.version.to_string(),
            });
        }

        let paths: BTreeMap<String, PathRecord> = doc
            .paths
            .into_iter()
            .map(|(path, (hash, item_type))| (path, PathRecord { hash, item_type }))
            .collect();

        for (item_type, by_path) in &doc.items {
            for (path, items) in by_path {
                match paths.get(path) {
                    Some(record) if record.item_type == Some(*item_type) => {}
                    _ => {
                        return Err(ManifestError::Malformed(format!(
                            "{} entries for {} do not match its path record",
                            item_type, path
                        )))
                    }
                }
                if let Some(item) = items.iter().find(|item| item.item_type() != *item_type) {
                    return Err(ManifestError::Malformed(format!(
                        "{} entry filed under {} for {}",
                        item.item_type(),
                        item_type,
                        path
                    )));
                }
            }
        }

        for (path, record) in &paths {
            if let Some(item_type) = record.item_type {
                let bucketed = doc
                    .items
                    .get(&item_type)
                    .is_some_and(|by_path| by_path.contains_key(path));
                if !bucketed {
                    return Err(ManifestError::Malformed(format!(
                        "{} is classified {} but has no entries",
                        path, item_type
                    )));
                }
            }
        }

        Ok(Manifest::from_parts(doc.url_base, paths, doc.items))
    }

    /// Encode as pretty-printed JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.to_portable())?;
        json.push('\n');
        Ok(json)
    }

    /// Decode a JSON document
    ///
    /// The version is checked before anything else: any document whose
    /// `version` is not exactly the current one, including a missing or
    /// non-integer value, reports [`ManifestError::VersionMismatch`].
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ManifestError::Malformed(format!("invalid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| ManifestError::Malformed("top level is not an object".to_string()))?;

        let version = object.get("version");
        if version.and_then(serde_json::Value::as_u64) != Some(MANIFEST_VERSION) {
            return Err(ManifestError::VersionMismatch {
                expected: MANIFEST_VERSION,
                found: version.map_or_else(|| "missing".to_string(), |v| v.to_string()),
            });
        }

        for field in ["url_base", "paths", "items"] {
            if !object.contains_key(field) {
                return Err(ManifestError::Malformed(format!("missing field `{}`", field)));
            }
        }

        let doc: PortableManifest =
            serde_json::from_value(value).map_err(|e| ManifestError::Malformed(e.to_string()))?;
        Manifest::from_portable(doc)
    }
}

/// Load a manifest file
pub fn load(path: &Path) -> Result<Manifest> {
    debug!("Opening manifest at {}", path.display());
    let json = std::fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
    Manifest::from_json(&json)
}

/// Write a manifest file atomically
///
/// The document is written to a temporary file next to `path`, synced, then
/// renamed over it.
pub fn write(manifest: &Manifest, path: &Path) -> Result<()> {
    let json = manifest.to_json()?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| ManifestError::io(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| ManifestError::io(parent, e))?;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ManifestError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ManifestError::io(path, e.error))?;

    debug!("Wrote manifest to {}", path.display());
    Ok(())
}
