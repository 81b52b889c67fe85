//! Registry catalog and resource classification
//!
//! The catalog is the static metadata recorded when blocks are registered.
//! It decides which resources are gated behind a pro credential.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Suffix of registry payload files
pub const PAYLOAD_SUFFIX: &str = ".json";

/// Names containing this marker are gated even without catalog metadata
pub const RESERVED_GATED_MARKER: &str = "pro";

/// Kind of file shipped with a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Component,
    Page,
    Utility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFile {
    pub path: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FileKind>,
}

/// Metadata for one registry resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default)]
    pub files: Vec<ResourceFile>,
}

impl ResourceMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            is_pro: false,
            files: Vec::new(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn pro(mut self) -> Self {
        self.is_pro = true;
        self
    }

    pub fn file(mut self, path: impl Into<String>, kind: FileKind) -> Self {
        self.files.push(ResourceFile {
            path: path.into(),
            kind: Some(kind),
        });
        self
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    items: Vec<ResourceMeta>,
}

/// Static per-resource metadata keyed by normalized name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    name: Option<String>,
    entries: BTreeMap<String, ResourceMeta>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `registry.json` document (`{ "name": ..., "items": [...] }`)
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let document: CatalogDocument = serde_json::from_slice(bytes)?;
        let mut catalog = Self {
            name: document.name,
            entries: BTreeMap::new(),
        };
        for item in document.items {
            catalog.register(item);
        }
        Ok(catalog)
    }

    pub fn with_entry(mut self, meta: ResourceMeta) -> Self {
        self.register(meta);
        self
    }

    pub fn register(&mut self, mut meta: ResourceMeta) {
        meta.name = normalize_name(&meta.name).to_string();
        self.entries.insert(meta.name.clone(), meta);
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&ResourceMeta> {
        self.entries.get(normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether fetching `name` requires a pro credential
    ///
    /// Catalog metadata decides first; the reserved marker in the name gates
    /// resources that were registered without the flag.
    pub fn requires_entitlement(&self, name: &str) -> bool {
        let name = normalize_name(name);
        let flagged = self.get(name).is_some_and(|meta| meta.is_pro);
        flagged || name.contains(RESERVED_GATED_MARKER)
    }

    /// Names explicitly flagged as pro in the catalog
    pub fn gated_names(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .filter(|meta| meta.is_pro)
            .map(|meta| meta.name.clone())
            .collect()
    }
}

/// Strip the payload suffix (repeatedly) from a resource name
pub fn normalize_name(name: &str) -> &str {
    let mut name = name;
    while let Some(stripped) = name.strip_suffix(PAYLOAD_SUFFIX) {
        name = stripped;
    }
    name
}

/// Resource names are a single path segment of lowercase ASCII letters,
/// digits, `-` and `_`
///
/// Uppercase is refused so a name can never alias another on a
/// case-insensitive filesystem.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new()
            .with_entry(ResourceMeta::new("auth-1").category("auth"))
            .with_entry(ResourceMeta::new("auth-2").category("auth"))
            .with_entry(
                ResourceMeta::new("auth-3")
                    .category("auth")
                    .pro()
                    .file("registry/blocks/auth/auth-3.tsx", FileKind::Component),
            )
    }

    #[test]
    fn test_flagged_resource_is_gated() {
        let catalog = catalog();
        assert!(catalog.requires_entitlement("auth-3"));
        assert!(catalog.requires_entitlement("auth-3.json"));
        assert!(!catalog.requires_entitlement("auth-1"));
        assert!(!catalog.requires_entitlement("auth-1.json"));
    }

    #[test]
    fn test_marker_gates_unregistered_names() {
        let catalog = catalog();
        assert!(catalog.requires_entitlement("pricing-pro-1"));
        assert!(catalog.requires_entitlement("pro-hero.json"));
        assert!(!catalog.requires_entitlement("hero-1"));
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("auth-3.json"), "auth-3");
        assert_eq!(normalize_name("auth-3.json.json"), "auth-3");
        assert_eq!(normalize_name("auth-3"), "auth-3");
        assert_eq!(normalize_name(".json"), "");
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("auth-3"));
        assert!(is_valid_name("login_form"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("../secrets"));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("auth 3"));
        assert!(!is_valid_name("AUTH-3"));
        assert!(!is_valid_name("Auth-3"));
    }

    #[test]
    fn test_gated_names() {
        let gated = catalog().gated_names();
        assert_eq!(gated.into_iter().collect::<Vec<_>>(), vec!["auth-3".to_string()]);
    }

    #[test]
    fn test_from_json() {
        let json = br#"{
            "name": "tinfin-library",
            "items": [
                { "name": "auth-1", "category": "auth", "files": [{ "path": "a.tsx", "type": "component" }] },
                { "name": "auth-3.json", "category": "auth", "isPro": true }
            ]
        }"#;

        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.name(), Some("tinfin-library"));
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("auth-3").unwrap().is_pro);
        assert_eq!(
            catalog.get("auth-1").unwrap().files[0].kind,
            Some(FileKind::Component)
        );
    }
}
