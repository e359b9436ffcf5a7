//! Default path-and-markup classifier
//!
//! Decides an item type from the file's path first and only looks at
//! content for markup files. Markup is sniffed with regexes rather than
//! parsed: a `testharness.js` script, `<link rel=match|mismatch>` and
//! `<meta name=timeout content=long>` are all it looks for.

use manifest::item::url_for_path;
use manifest::{
    Classification, Classifier, ItemType, ManifestItem, RefTest, RefType, Reference,
    TestharnessTest, Timeout, UrlItem, WdspecTest,
};
use regex::Regex;

/// Directory names whose contents are never tests
const SUPPORT_DIRS: &[&str] = &["resources", "support", "tools"];

/// File names that describe the tree rather than test it
const META_FILES: &[&str] = &[
    "README",
    "README.md",
    "OWNERS",
    "LICENSE",
    "MANIFEST.json",
    "manifest.toml",
];

const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xhtml", "xht", "svg", "xml"];

/// Classifier used by the command line
pub struct SourceFileClassifier {
    testharness_script: Regex,
    link_tag: Regex,
    meta_tag: Regex,
    attribute: Regex,
}

impl Default for SourceFileClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFileClassifier {
    pub fn new() -> Self {
        Self {
            testharness_script: Regex::new(
                r#"(?i)<script\b[^>]*\bsrc\s*=\s*["']?[^"'\s>]*testharness\.js\b"#,
            )
            .expect("regex for testharness script"),
            link_tag: Regex::new(r"(?is)<link\b[^>]*>").expect("regex for link tags"),
            meta_tag: Regex::new(r"(?is)<meta\b[^>]*>").expect("regex for meta tags"),
            attribute: Regex::new(
                r#"(?i)([a-z][a-z0-9_:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )
            .expect("regex for tag attributes"),
        }
    }

    /// Attribute name/value pairs of one tag, names lowercased
    fn attributes<'t>(&self, tag: &'t str) -> Vec<(String, &'t str)> {
        self.attribute
            .captures_iter(tag)
            .filter_map(|cap| {
                let name = cap.get(1)?.as_str().to_ascii_lowercase();
                let value = cap.get(2).or(cap.get(3)).or(cap.get(4))?.as_str();
                Some((name, value))
            })
            .collect()
    }

    fn references(&self, markup: &str, url: &str) -> Vec<Reference> {
        let mut references = Vec::new();

        for tag in self.link_tag.find_iter(markup) {
            let attrs = self.attributes(tag.as_str());
            let attr = |name: &str| attrs.iter().find(|(n, _)| n == name).map(|(_, v)| *v);

            let kind = match attr("rel").map(str::to_ascii_lowercase).as_deref() {
                Some("match") => RefType::Match,
                Some("mismatch") => RefType::Mismatch,
                _ => continue,
            };
            if let Some(href) = attr("href") {
                references.push(Reference::new(resolve_url(url, href.trim()), kind));
            }
        }

        references
    }

    fn timeout(&self, markup: &str) -> Option<Timeout> {
        let long = self.meta_tag.find_iter(markup).any(|tag| {
            let attrs = self.attributes(tag.as_str());
            let has = |name: &str, value: &str| {
                attrs
                    .iter()
                    .any(|(n, v)| n == name && v.eq_ignore_ascii_case(value))
            };
            has("name", "timeout") && has("content", "long")
        });
        long.then_some(Timeout::Long)
    }

    fn classify_markup(&self, content: &[u8], url: String) -> Classification {
        let markup = String::from_utf8_lossy(content);
        let timeout = self.timeout(&markup);

        if self.testharness_script.is_match(&markup) {
            return Classification::new(
                ItemType::Testharness,
                vec![ManifestItem::Testharness(TestharnessTest {
                    url,
                    timeout,
                    ..Default::default()
                })],
            );
        }

        let references = self.references(&markup, &url);
        if !references.is_empty() {
            return Classification::new(
                ItemType::Reftest,
                vec![ManifestItem::Reftest(RefTest {
                    url,
                    references,
                    timeout,
                    ..Default::default()
                })],
            );
        }

        support(url)
    }
}

impl Classifier for SourceFileClassifier {
    fn classify(&self, path: &str, content: &[u8], url_base: &str) -> Classification {
        let url = url_for_path(url_base, path);
        let (dirs, name) = match path.rsplit_once('/') {
            Some((dirs, name)) => (dirs, name),
            None => ("", path),
        };
        let top_dir = path.split('/').next().filter(|_| !dirs.is_empty());
        let stem = name.split('.').next().unwrap_or(name);
        let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());

        // 1. Support files by location or name
        if dirs.split('/').any(|dir| SUPPORT_DIRS.contains(&dir))
            || name.starts_with('.')
            || META_FILES.contains(&name)
        {
            return support(url);
        }

        // 2-3. Name suffixes
        if stem.ends_with("-manual") {
            return url_only(ItemType::Manual, url);
        }
        if stem.ends_with("-stub") {
            return url_only(ItemType::Stub, url);
        }

        // 4. Protocol tests
        if top_dir == Some("webdriver")
            && extension.as_deref() == Some("py")
            && name != "__init__.py"
            && name != "conftest.py"
        {
            return Classification::new(
                ItemType::Wdspec,
                vec![ManifestItem::Wdspec(WdspecTest {
                    url,
                    ..Default::default()
                })],
            );
        }

        // 5. Script tests wrapped in generated pages
        if let Some(base) = url.strip_suffix(".any.js") {
            return testharness_urls(vec![
                format!("{}.any.html", base),
                format!("{}.any.worker.html", base),
            ]);
        }
        for scope in [".worker", ".window"] {
            let suffix = format!("{}.js", scope);
            if let Some(base) = url.strip_suffix(suffix.as_str()) {
                return testharness_urls(vec![format!("{}{}.html", base, scope)]);
            }
        }

        let is_markup = extension
            .as_deref()
            .is_some_and(|ext| MARKUP_EXTENSIONS.contains(&ext));
        if !is_markup {
            return support(url);
        }

        // 6. Conformance checker inputs
        if top_dir == Some("conformance-checkers") {
            return url_only(ItemType::ConformanceChecker, url);
        }

        // 7-8. Markup content
        self.classify_markup(content, url)
    }
}

fn url_only(item_type: ItemType, url: String) -> Classification {
    let item = UrlItem {
        url,
        ..Default::default()
    };
    let item = match item_type {
        ItemType::Manual => ManifestItem::Manual(item),
        ItemType::Stub => ManifestItem::Stub(item),
        ItemType::ConformanceChecker => ManifestItem::ConformanceChecker(item),
        _ => ManifestItem::Support(item),
    };
    Classification::new(item.item_type(), vec![item])
}

fn support(url: String) -> Classification {
    url_only(ItemType::Support, url)
}

fn testharness_urls(urls: Vec<String>) -> Classification {
    Classification::new(
        ItemType::Testharness,
        urls.into_iter()
            .map(|url| {
                ManifestItem::Testharness(TestharnessTest {
                    url,
                    ..Default::default()
                })
            })
            .collect(),
    )
}

/// Resolve an href against the url of the page it appears in
///
/// Absolute urls and absolute paths are kept; relative ones are joined to
/// the page's directory with `.` and `..` segments collapsed.
fn resolve_url(base: &str, href: &str) -> String {
    if href.contains("://") || href.starts_with('/') {
        return href.to_string();
    }

    let dir = match base.rfind('/') {
        Some(pos) => &base[..pos],
        None => "",
    };

    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    let href_segments: Vec<&str> = href.split('/').collect();
    let last = href_segments.len().saturating_sub(1);
    for (i, segment) in href_segments.into_iter().enumerate() {
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            "" if i != last => {}
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(path: &str, content: &str) -> Classification {
        SourceFileClassifier::new().classify(path, content.as_bytes(), "/")
    }

    fn urls(classification: &Classification) -> Vec<&str> {
        classification.items.iter().map(|i| i.url()).collect()
    }

    const TESTHARNESS: &str = r#"<!doctype html>
<script src="/resources/testharness.js"></script>
<script src="/resources/testharnessreport.js"></script>"#;

    #[test]
    fn test_support_by_location_and_name() {
        for path in [
            "resources/testharness.js",
            "dom/resources/a.html",
            "css/support/ref.html",
            "tools/lint.py",
            ".gitignore",
            "dom/README.md",
            "dom/OWNERS",
            "MANIFEST.json",
        ] {
            let classification = classify(path, TESTHARNESS);
            assert_eq!(classification.item_type, Some(ItemType::Support), "{}", path);
            assert_eq!(urls(&classification), vec![format!("/{}", path).as_str()]);
        }
    }

    #[test]
    fn test_manual_and_stub_by_stem() {
        let manual = classify("dom/click-manual.html", TESTHARNESS);
        assert_eq!(manual.item_type, Some(ItemType::Manual));
        assert!(matches!(manual.items[0], ManifestItem::Manual(_)));

        let secure = classify("dom/click-manual.https.html", "");
        assert_eq!(secure.item_type, Some(ItemType::Manual));

        let stub = classify("dom/api-stub.html", "");
        assert_eq!(stub.item_type, Some(ItemType::Stub));
    }

    #[test]
    fn test_wdspec() {
        let test = classify("webdriver/tests/navigate.py", "");
        assert_eq!(test.item_type, Some(ItemType::Wdspec));
        assert_eq!(urls(&test), vec!["/webdriver/tests/navigate.py"]);

        assert_eq!(
            classify("webdriver/tests/conftest.py", "").item_type,
            Some(ItemType::Support)
        );
        assert_eq!(
            classify("webdriver/__init__.py", "").item_type,
            Some(ItemType::Support)
        );
        assert_eq!(
            classify("dom/webdriver/a.py", "").item_type,
            Some(ItemType::Support)
        );
    }

    #[test]
    fn test_script_tests_expand_to_pages() {
        let any = SourceFileClassifier::new().classify("dom/a.any.js", b"test(...)", "/base/");
        assert_eq!(any.item_type, Some(ItemType::Testharness));
        assert_eq!(
            urls(&any),
            vec!["/base/dom/a.any.html", "/base/dom/a.any.worker.html"]
        );
        assert!(any.items.iter().all(|i| i.path().is_empty()));

        assert_eq!(urls(&classify("a.worker.js", "")), vec!["/a.worker.html"]);
        assert_eq!(urls(&classify("a.window.js", "")), vec!["/a.window.html"]);
        assert_eq!(classify("dom/helper.js", "").item_type, Some(ItemType::Support));
    }

    #[test]
    fn test_conformance_checkers() {
        let checker = classify("conformance-checkers/html/a-novalid.html", TESTHARNESS);
        assert_eq!(checker.item_type, Some(ItemType::ConformanceChecker));

        let other = classify("conformance-checkers/messages.json", "");
        assert_eq!(other.item_type, Some(ItemType::Support));
    }

    #[test]
    fn test_testharness_markup() {
        let test = classify("dom/a.html", TESTHARNESS);
        assert_eq!(test.item_type, Some(ItemType::Testharness));
        match &test.items[0] {
            ManifestItem::Testharness(t) => {
                assert_eq!(t.url, "/dom/a.html");
                assert_eq!(t.timeout, None);
            }
            other => panic!("unexpected {:?}", other),
        }

        let long = classify(
            "dom/b.xhtml",
            &format!("<meta name='timeout' content='long'/>\n{}", TESTHARNESS),
        );
        match &long.items[0] {
            ManifestItem::Testharness(t) => assert_eq!(t.timeout, Some(Timeout::Long)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reftest_markup() {
        let markup = r#"<!doctype html>
<link rel="match" href="a-ref.html">
<LINK REL=mismatch HREF="../other/b-notref.html">
<link rel=stylesheet href="style.css">
<link rel="match" href="/shared/abs-ref.html">
<meta name="timeout" content="long">"#;

        let test = SourceFileClassifier::new().classify("css/box/a.html", markup.as_bytes(), "/");
        assert_eq!(test.item_type, Some(ItemType::Reftest));
        let reftest = test.items[0].as_reftest().unwrap();
        assert_eq!(reftest.url, "/css/box/a.html");
        assert_eq!(reftest.timeout, Some(Timeout::Long));
        assert_eq!(
            reftest.references,
            vec![
                Reference::new("/css/box/a-ref.html", RefType::Match),
                Reference::new("/css/other/b-notref.html", RefType::Mismatch),
                Reference::new("/shared/abs-ref.html", RefType::Match),
            ]
        );
    }

    #[test]
    fn test_reference_files_are_support() {
        let reference = classify("css/box/a-ref.html", "<div>green</div>");
        assert_eq!(reference.item_type, Some(ItemType::Support));
        assert_eq!(classify("img/a.png", "\u{89}PNG").item_type, Some(ItemType::Support));
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("/a/b/c.html", "d.html"), "/a/b/d.html");
        assert_eq!(resolve_url("/a/b/c.html", "./d.html"), "/a/b/d.html");
        assert_eq!(resolve_url("/a/b/c.html", "../../d.html"), "/d.html");
        assert_eq!(resolve_url("/a/b/c.html", "../../../d.html"), "/d.html");
        assert_eq!(resolve_url("/a/b/c.html", "/x/y.html"), "/x/y.html");
        assert_eq!(resolve_url("/a/c.html", "http://x.test/y.html"), "http://x.test/y.html");
        assert_eq!(resolve_url("/tests/c.html", "sub//d.html"), "/tests/sub/d.html");
    }
}
