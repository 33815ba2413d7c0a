//! Tag categories and tag values discovered from the repository root.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{io_at, StoreResult};
use crate::layout::RepoLayout;
use crate::names::{validate_category, validate_tag};

/// One tag value of a category.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Tag {
    /// Lowercased directory name; the value stored in properties.
    pub key: String,
    /// Directory name in its original casing.
    pub title: String,
}

/// Snapshot of the tag categories present under a repository root.
///
/// Every top-level directory other than `repo/` and `titles/` is a category;
/// its subdirectories are the category's tag values. The snapshot is taken
/// once by [`TagCatalog::open`] and does not follow later changes on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagCatalog {
    categories: BTreeMap<String, Vec<Tag>>,
}

impl TagCatalog {
    /// Scan the repository root.
    ///
    /// Directories whose names cannot round-trip through a properties file
    /// (see [`validate_category`] and [`validate_tag`]) are skipped with a
    /// warning. Fails if the root or any category directory cannot be listed.
    pub fn open(layout: &RepoLayout) -> StoreResult<Self> {
        let mut categories = BTreeMap::new();
        for category in subdirectories(layout.root())? {
            if RepoLayout::is_reserved(&category) {
                continue;
            }
            if let Err(e) = validate_category(&category) {
                warn!(error = %e, "skipping category directory");
                continue;
            }
            let mut tags: Vec<Tag> = Vec::new();
            for title in subdirectories(&layout.category_dir(&category))? {
                let key = title.to_lowercase();
                match validate_tag(&category, &key) {
                    Ok(()) => tags.push(Tag { key, title }),
                    Err(e) => warn!(error = %e, "skipping tag directory"),
                }
            }
            tags.sort();
            debug!(category = %category, tags = tags.len(), "discovered tag category");
            categories.insert(category, tags);
        }
        Ok(Self { categories })
    }

    /// Category names, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    /// Tags of a category, sorted by key. Empty for unknown categories.
    pub fn tags(&self, category: &str) -> &[Tag] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Look up a tag of a category by key.
    pub fn find_tag(&self, category: &str, key: &str) -> Option<&Tag> {
        self.tags(category).iter().find(|t| t.key == key)
    }

    /// Iterate over `(category, tags)` pairs in category order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Tag])> {
        self.categories
            .iter()
            .map(|(c, tags)| (c.as_str(), tags.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Names of the immediate subdirectories of `dir`.
///
/// Symlinks are not followed; entries with non-UTF-8 names are skipped.
fn subdirectories(dir: &Path) -> StoreResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_at(dir))? {
        let entry = entry.map_err(io_at(dir))?;
        let file_type = entry.file_type().map_err(io_at(entry.path()))?;
        if !file_type.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => warn!(dir = %dir.display(), name = ?raw, "skipping directory with non-UTF-8 name"),
        }
    }
    Ok(names)
}
