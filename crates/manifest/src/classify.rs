//! Classifier contract

use crate::item::{ItemType, ManifestItem};

/// Result of classifying one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Bucket the file's entries go in; `None` means the file yields no entries
    pub item_type: Option<ItemType>,
    /// One entry per logical test defined by the file
    pub items: Vec<ManifestItem>,
}

impl Classification {
    /// File that produces no manifest entries
    pub fn none() -> Self {
        Self::default()
    }

    /// File producing `items`, all of type `item_type`
    pub fn new(item_type: ItemType, items: Vec<ManifestItem>) -> Self {
        Self {
            item_type: Some(item_type),
            items,
        }
    }
}

/// Turns a file's path and content into manifest entries
///
/// Classification is infallible: content that cannot be understood must
/// degrade to a support file (or no entries) instead of failing the update.
pub trait Classifier: Sync {
    fn classify(&self, path: &str, content: &[u8], url_base: &str) -> Classification;
}
