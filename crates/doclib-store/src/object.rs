use serde::Serialize;

use doclib_types::DocId;

use crate::catalog::TagCatalog;
use crate::properties::{Properties, Tags};

/// A document as reconstructed from its properties file.
///
/// `tags` has an entry for every category in the catalog the object was
/// opened with (possibly empty), plus any category found in the properties
/// that the catalog does not know about. Unknown categories are kept so a
/// save does not drop them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepoObject {
    /// Content digest; also the storage filename.
    pub id: DocId,
    /// Display name.
    pub name: String,
    pub tags: Tags,
    /// Unrecognized properties, preserved verbatim.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<(String, String)>,
}

impl RepoObject {
    /// Build from decoded properties, seeding every catalog category.
    pub fn from_properties(id: DocId, props: Properties, catalog: &TagCatalog) -> Self {
        let mut tags: Tags = catalog
            .categories()
            .into_iter()
            .map(|c| (c, Default::default()))
            .collect();
        for (category, values) in props.tags {
            tags.entry(category).or_default().extend(values);
        }
        Self {
            id,
            name: props.name,
            tags,
            properties: props.extra,
        }
    }

    /// Properties reflecting the object's current state.
    pub fn to_properties(&self) -> Properties {
        Properties {
            hash: self.id,
            name: self.name.clone(),
            tags: self.tags.clone(),
            extra: self.properties.clone(),
        }
    }

    /// Assign a tag. Returns `false` if it was already assigned.
    pub fn tag(&mut self, category: &str, key: &str) -> bool {
        self.tags
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string())
    }

    /// Remove a tag. Returns `false` if it was not assigned.
    pub fn untag(&mut self, category: &str, key: &str) -> bool {
        self.tags
            .get_mut(category)
            .map(|values| values.remove(key))
            .unwrap_or(false)
    }

    /// Returns `true` if the tag is assigned.
    pub fn is_tagged(&self, category: &str, key: &str) -> bool {
        self.tags
            .get(category)
            .map(|values| values.contains(key))
            .unwrap_or(false)
    }
}

/// Position of the object with `id` in a listing.
pub fn index_of(objects: &[RepoObject], id: &DocId) -> Option<usize> {
    objects.iter().position(|o| o.id == *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RepoLayout;
    use doclib_crypto::ContentHasher;

    fn catalog_with(categories: &[&str]) -> (tempfile::TempDir, TagCatalog) {
        let dir = tempfile::tempdir().unwrap();
        let layout = RepoLayout::new(dir.path());
        layout.create().unwrap();
        for c in categories {
            std::fs::create_dir_all(layout.category_dir(c)).unwrap();
        }
        let catalog = TagCatalog::open(&layout).unwrap();
        (dir, catalog)
    }

    #[test]
    fn every_catalog_category_is_present() {
        let (_dir, catalog) = catalog_with(&["topic", "year"]);
        let id = ContentHasher::hash(b"doc");
        let obj = RepoObject::from_properties(id, Properties::new(id, "doc"), &catalog);
        assert_eq!(obj.tags.len(), 2);
        assert!(obj.tags["topic"].is_empty());
        assert!(obj.tags["year"].is_empty());
    }

    #[test]
    fn categories_unknown_to_catalog_are_kept() {
        let (_dir, catalog) = catalog_with(&["topic"]);
        let id = ContentHasher::hash(b"doc");
        let mut props = Properties::new(id, "doc");
        props
            .tags
            .insert("retired".into(), ["old".to_string()].into_iter().collect());
        let obj = RepoObject::from_properties(id, props, &catalog);
        assert!(obj.is_tagged("retired", "old"));
        assert!(obj.to_properties().tags.contains_key("retired"));
    }

    #[test]
    fn tag_and_untag() {
        let (_dir, catalog) = catalog_with(&["topic"]);
        let id = ContentHasher::hash(b"doc");
        let mut obj = RepoObject::from_properties(id, Properties::new(id, "doc"), &catalog);

        assert!(obj.tag("topic", "rust"));
        assert!(!obj.tag("topic", "rust"));
        assert!(obj.is_tagged("topic", "rust"));

        assert!(obj.untag("topic", "rust"));
        assert!(!obj.untag("topic", "rust"));
        assert!(!obj.is_tagged("topic", "rust"));
        assert!(!obj.untag("missing", "x"));
    }

    #[test]
    fn empty_categories_vanish_from_encoding() {
        let (_dir, catalog) = catalog_with(&["topic", "year"]);
        let id = ContentHasher::hash(b"doc");
        let mut obj = RepoObject::from_properties(id, Properties::new(id, "doc"), &catalog);
        obj.tag("year", "2023");
        let text = obj.to_properties().encode();
        assert!(text.contains("tags.year=2023\n"));
        assert!(!text.contains("tags.topic"));
    }

    #[test]
    fn index_of_finds_object() {
        let (_dir, catalog) = catalog_with(&[]);
        let a = ContentHasher::hash(b"a");
        let b = ContentHasher::hash(b"b");
        let objects = vec![
            RepoObject::from_properties(a, Properties::new(a, "a"), &catalog),
            RepoObject::from_properties(b, Properties::new(b, "b"), &catalog),
        ];
        assert_eq!(index_of(&objects, &b), Some(1));
        assert_eq!(index_of(&objects, &ContentHasher::hash(b"c")), None);
    }
}
