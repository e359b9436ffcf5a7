//! Manifest entry types
//!
//! Each classified file contributes zero or more entries. The entry record is
//! what gets persisted; the source path is carried by the enclosing map key
//! and the reference role is derived state, so neither is serialized.

use serde::{Deserialize, Serialize};

/// Classification tag of a path, and the bucket its entries live in
///
/// Variants are declared in the order of their tags so maps keyed by type
/// serialize with sorted keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Conformance-checker input document
    ConformanceChecker,
    /// Test needing a human operator
    Manual,
    /// Rendering comparison against reference files
    Reftest,
    /// Placeholder for a test not yet written
    Stub,
    /// Any other tracked file
    Support,
    /// Script-driven behavioral test
    Testharness,
    /// Protocol-level (webdriver) test
    Wdspec,
}

impl ItemType {
    /// All classification tags, tests first
    pub const ALL: [ItemType; 7] = [
        ItemType::Testharness,
        ItemType::Reftest,
        ItemType::Manual,
        ItemType::Wdspec,
        ItemType::ConformanceChecker,
        ItemType::Stub,
        ItemType::Support,
    ];

    /// Tag as it appears in the persisted manifest
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Testharness => "testharness",
            ItemType::Reftest => "reftest",
            ItemType::Manual => "manual",
            ItemType::Wdspec => "wdspec",
            ItemType::ConformanceChecker => "conformancechecker",
            ItemType::Stub => "stub",
            ItemType::Support => "support",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extended timeout marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeout {
    Long,
}

/// Comparison a reference target is checked with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RefType {
    /// Rendering must match the target
    #[serde(rename = "==")]
    Match,
    /// Rendering must differ from the target
    #[serde(rename = "!=")]
    Mismatch,
}

/// One edge of the reference graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    /// Url of the comparison target
    pub url: String,
    /// Kind of comparison
    pub kind: RefType,
}

impl Reference {
    pub fn new(url: impl Into<String>, kind: RefType) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Position of a reftest in the reference graph
///
/// Recomputed over the whole reftest population after every change to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Nothing points at this entry
    #[default]
    Leaf,
    /// At least one entry lists this entry's url as a reference
    Node,
}

/// Entry carrying only a url (manual tests, stubs, checker inputs, support files)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UrlItem {
    #[serde(skip)]
    pub path: String,
    pub url: String,
}

/// Script-driven behavioral test
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestharnessTest {
    #[serde(skip)]
    pub path: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
}

/// Reference-comparison test
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefTest {
    #[serde(skip)]
    pub path: String,
    pub url: String,
    pub references: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
    #[serde(skip)]
    pub role: Role,
}

impl RefTest {
    /// Whether some reftest compares against this one
    pub fn is_node(&self) -> bool {
        self.role == Role::Node
    }
}

/// Protocol-level (webdriver) test
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WdspecTest {
    #[serde(skip)]
    pub path: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
}

/// A single manifest entry
///
/// Persisted as a record tagged with its type, e.g.
/// `{"type": "reftest", "url": "/a.html", "references": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ManifestItem {
    Testharness(TestharnessTest),
    Reftest(RefTest),
    Manual(UrlItem),
    Wdspec(WdspecTest),
    ConformanceChecker(UrlItem),
    Stub(UrlItem),
    Support(UrlItem),
}

impl ManifestItem {
    /// Bucket this entry belongs in
    pub fn item_type(&self) -> ItemType {
        match self {
            ManifestItem::Testharness(_) => ItemType::Testharness,
            ManifestItem::Reftest(_) => ItemType::Reftest,
            ManifestItem::Manual(_) => ItemType::Manual,
            ManifestItem::Wdspec(_) => ItemType::Wdspec,
            ManifestItem::ConformanceChecker(_) => ItemType::ConformanceChecker,
            ManifestItem::Stub(_) => ItemType::Stub,
            ManifestItem::Support(_) => ItemType::Support,
        }
    }

    /// Tree-relative path of the source file
    pub fn path(&self) -> &str {
        match self {
            ManifestItem::Testharness(t) => &t.path,
            ManifestItem::Reftest(t) => &t.path,
            ManifestItem::Wdspec(t) => &t.path,
            ManifestItem::Manual(t)
            | ManifestItem::ConformanceChecker(t)
            | ManifestItem::Stub(t)
            | ManifestItem::Support(t) => &t.path,
        }
    }

    /// Url the entry is served at
    pub fn url(&self) -> &str {
        match self {
            ManifestItem::Testharness(t) => &t.url,
            ManifestItem::Reftest(t) => &t.url,
            ManifestItem::Wdspec(t) => &t.url,
            ManifestItem::Manual(t)
            | ManifestItem::ConformanceChecker(t)
            | ManifestItem::Stub(t)
            | ManifestItem::Support(t) => &t.url,
        }
    }

    pub fn as_reftest(&self) -> Option<&RefTest> {
        match self {
            ManifestItem::Reftest(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_reftest_mut(&mut self) -> Option<&mut RefTest> {
        match self {
            ManifestItem::Reftest(t) => Some(t),
            _ => None,
        }
    }

    /// Attach the source path after decoding a persisted record
    pub(crate) fn set_path(&mut self, path: &str) {
        let slot = match self {
            ManifestItem::Testharness(t) => &mut t.path,
            ManifestItem::Reftest(t) => &mut t.path,
            ManifestItem::Wdspec(t) => &mut t.path,
            ManifestItem::Manual(t)
            | ManifestItem::ConformanceChecker(t)
            | ManifestItem::Stub(t)
            | ManifestItem::Support(t) => &mut t.path,
        };
        *slot = path.to_string();
    }

    /// Copy holding only persisted fields, with path and role cleared
    pub(crate) fn to_persisted(&self) -> ManifestItem {
        let mut item = self.clone();
        item.set_path("");
        if let Some(reftest) = item.as_reftest_mut() {
            reftest.role = Role::default();
        }
        item
    }
}

/// Url of a tree-relative path under a mount point
///
/// `url_base` may or may not end in `/`; the result always has exactly one
/// separator between base and path.
pub fn url_for_path(url_base: &str, path: &str) -> String {
    let base = url_base.trim_end_matches('/');
    format!("{}/{}", base, path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_path() {
        assert_eq!(url_for_path("/", "a/b.html"), "/a/b.html");
        assert_eq!(url_for_path("/tests/", "a/b.html"), "/tests/a/b.html");
        assert_eq!(url_for_path("/tests", "a/b.html"), "/tests/a/b.html");
    }

    #[test]
    fn test_record_is_tagged() {
        let item = ManifestItem::Reftest(RefTest {
            path: "a.html".to_string(),
            url: "/a.html".to_string(),
            references: vec![Reference::new("/a-ref.html", RefType::Match)],
            timeout: Some(Timeout::Long),
            role: Role::Node,
        });

        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(
            json,
            r#"{"type":"reftest","url":"/a.html","references":[{"url":"/a-ref.html","kind":"=="}],"timeout":"long"}"#
        );
    }

    #[test]
    fn test_decoded_record_has_no_path_or_role() {
        let json = r#"{"type":"reftest","url":"/a.html","references":[{"url":"/b.html","kind":"!="}],"timeout":"long"}"#;
        let mut item: ManifestItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.path(), "");
        assert_eq!(item.as_reftest().unwrap().role, Role::Leaf);
        assert_eq!(item.as_reftest().unwrap().timeout, Some(Timeout::Long));

        item.set_path("a.html");
        assert_eq!(item.path(), "a.html");
        assert_eq!(item.item_type(), ItemType::Reftest);
    }

    #[test]
    fn test_persisted_copy_drops_derived_state() {
        let mut item: ManifestItem =
            serde_json::from_str(r#"{"type":"reftest","url":"/a.html","references":[]}"#).unwrap();
        let decoded = item.clone();
        item.set_path("a.html");
        item.as_reftest_mut().unwrap().role = Role::Node;

        let persisted = item.to_persisted();
        assert_eq!(persisted, decoded);
        assert_eq!(item.path(), "a.html");
        assert!(item.as_reftest().unwrap().is_node());
    }

    #[test]
    fn test_type_tags_match_serde_names() {
        for item_type in ItemType::ALL {
            let json = serde_json::to_string(&item_type).unwrap();
            assert_eq!(json, format!("\"{}\"", item_type.as_str()));
        }
    }
}
