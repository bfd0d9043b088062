//! Stamp catalog
//!
//! A fixed registry of stamp definitions supplied by the host. Shapes refer
//! to stamps by `stamp_id` and carry a copy of the SVG markup so documents
//! still render if the catalog changes.

use crate::error::AnnotatorResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// SVG markup of the stamp graphic
    pub svg: String,
}

impl StampDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        svg: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), name: name.into(), category: category.into(), svg: svg.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StampCatalog {
    stamps: Vec<StampDefinition>,
}

impl StampCatalog {
    /// Build a catalog; later duplicates of an ID are ignored
    pub fn from_definitions(definitions: impl IntoIterator<Item = StampDefinition>) -> Self {
        let mut stamps: Vec<StampDefinition> = Vec::new();
        for definition in definitions {
            if stamps.iter().any(|existing| existing.id == definition.id) {
                log::warn!("duplicate stamp id `{}` ignored", definition.id);
                continue;
            }
            stamps.push(definition);
        }
        Self { stamps }
    }

    /// Load a JSON array of stamp definitions
    pub fn load(path: &Path) -> AnnotatorResult<Self> {
        let json = fs::read_to_string(path)?;
        let definitions: Vec<StampDefinition> = serde_json::from_str(&json)?;
        Ok(Self::from_definitions(definitions))
    }

    pub fn get(&self, id: &str) -> Option<&StampDefinition> {
        self.stamps.iter().find(|stamp| stamp.id == id)
    }

    /// Stamps in a category, in registration order
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a StampDefinition> {
        self.stamps.iter().filter(move |stamp| stamp.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StampDefinition> {
        self.stamps.iter()
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;

    #[test]
    fn test_lookup_and_categories() {
        let catalog = StampCatalog::from_definitions([
            StampDefinition::new("approved", "Approved", "review", SVG),
            StampDefinition::new("rejected", "Rejected", "review", SVG),
            StampDefinition::new("star", "Star", "symbols", SVG),
        ]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("star").map(|s| s.name.as_str()), Some("Star"));
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.in_category("review").count(), 2);
    }

    #[test]
    fn test_duplicate_ids_ignored() {
        let catalog = StampCatalog::from_definitions([
            StampDefinition::new("a", "First", "", SVG),
            StampDefinition::new("a", "Second", "", SVG),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").unwrap().name, "First");
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("stamps.json");
        std::fs::write(&path, r#"[{"id": "ok", "name": "OK", "svg": "<svg/>"}]"#).unwrap();

        let catalog = StampCatalog::load(&path).unwrap();
        assert_eq!(catalog.get("ok").unwrap().category, "");
    }
}
