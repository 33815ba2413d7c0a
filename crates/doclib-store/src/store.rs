use std::fs;
use std::io::{self, Read, Write};

use doclib_crypto::HashingWriter;
use doclib_types::DocId;
use tracing::{debug, info, warn};

use crate::catalog::TagCatalog;
use crate::error::{io_at, StoreError, StoreResult};
use crate::layout::{EntryKind, RepoLayout, PREFIX_TEMP};
use crate::names::{validate_category, validate_name, validate_tag};
use crate::object::RepoObject;
use crate::properties::Properties;

/// The canonical object store in `<root>/repo/`.
///
/// Content files are written once and never modified. Properties files are
/// rewritten by [`save`](Self::save). Nothing here touches the `titles/` or
/// tag link trees; those converge on the next check.
#[derive(Clone, Debug)]
pub struct ObjectStore {
    layout: RepoLayout,
}

impl ObjectStore {
    pub fn new(layout: RepoLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// Returns `true` if the content file of `id` exists.
    pub fn contains(&self, id: &DocId) -> bool {
        self.layout.object_path(id).is_file()
    }

    // ---------------------------------------------------------------
    // Admission
    // ---------------------------------------------------------------

    /// Copy `reader` into the store under display name `name`.
    ///
    /// The content is streamed into a `temp--` file in `repo/` while being
    /// hashed, then renamed to its digest. Fresh properties without tags are
    /// written next to it.
    ///
    /// Admitting content that is already stored is not an error: the
    /// existing object, with its current name and tags, is returned.
    pub fn acquire<R: Read>(
        &self,
        mut reader: R,
        name: &str,
        catalog: &TagCatalog,
    ) -> StoreResult<RepoObject> {
        validate_name(name)?;

        let repo_dir = self.layout.repo_dir();
        let temp = tempfile::Builder::new()
            .prefix(PREFIX_TEMP)
            .tempfile_in(&repo_dir)
            .map_err(io_at(&repo_dir))?;
        let temp_path = temp.path().to_path_buf();

        let mut writer = HashingWriter::new(temp);
        io::copy(&mut reader, &mut writer).map_err(io_at(&temp_path))?;
        writer.flush().map_err(io_at(&temp_path))?;
        let (temp, id) = writer.finish();
        temp.as_file().sync_all().map_err(io_at(&temp_path))?;
        debug!(id = %id.short_hex(), temp = %temp_path.display(), "content hashed");

        if self.contains(&id) && self.layout.properties_path(&id).is_file() {
            info!(id = %id.short_hex(), "content already stored; keeping existing properties");
            return self.open(&id, catalog);
        }

        if let Some(existing) = self.find_by_name(name, &id)? {
            return Err(StoreError::DuplicateName {
                name: name.to_string(),
                existing,
            });
        }

        let dest = self.layout.object_path(&id);
        temp.persist(&dest).map_err(|e| StoreError::IoAt {
            path: dest.clone(),
            source: e.error,
        })?;
        self.write_properties(&id, &Properties::new(id, name))?;
        info!(id = %id.short_hex(), name, "acquired object");

        self.open(&id, catalog)
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Read and decode the properties of `id`.
    pub fn read_properties(&self, id: &DocId) -> StoreResult<Properties> {
        let path = self.layout.properties_path(id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(*id))
            }
            Err(e) => return Err(io_at(&path)(e)),
        };
        Properties::decode(&text).map_err(|source| StoreError::Properties { id: *id, source })
    }

    /// Open an object by id.
    pub fn open(&self, id: &DocId, catalog: &TagCatalog) -> StoreResult<RepoObject> {
        let props = self.read_properties(id)?;
        Ok(RepoObject::from_properties(*id, props, catalog))
    }

    /// Every object in the store that can be opened, ordered by id.
    ///
    /// Entries that fail to open are logged and skipped. Only a failure to
    /// read `repo/` itself is an error.
    pub fn list(&self, catalog: &TagCatalog) -> StoreResult<Vec<RepoObject>> {
        let mut objects = Vec::new();
        for id in self.object_ids()? {
            match self.open(&id, catalog) {
                Ok(obj) => objects.push(obj),
                Err(e) => warn!(id = %id.short_hex(), error = %e, "skipping object that failed to open"),
            }
        }
        objects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(objects)
    }

    /// Ids of all content files in `repo/`.
    fn object_ids(&self) -> StoreResult<Vec<DocId>> {
        let repo_dir = self.layout.repo_dir();
        let mut ids = Vec::new();
        for entry in fs::read_dir(&repo_dir).map_err(io_at(&repo_dir))? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable repo entry");
                    continue;
                }
            };
            let Ok(filename) = entry.file_name().into_string() else {
                warn!(name = ?entry.file_name(), "skipping repo entry with non-UTF-8 name");
                continue;
            };
            match EntryKind::classify(&filename) {
                EntryKind::Object(id) => ids.push(id),
                EntryKind::Properties(_) => {}
                EntryKind::Temp => debug!(name = %filename, "skipping admission file"),
                EntryKind::Unknown => warn!(name = %filename, "skipping repo entry that is not an object"),
            }
        }
        Ok(ids)
    }

    /// First object other than `exclude` whose properties carry `name`.
    fn find_by_name(&self, name: &str, exclude: &DocId) -> StoreResult<Option<DocId>> {
        for id in self.object_ids()? {
            if id == *exclude {
                continue;
            }
            match self.read_properties(&id) {
                Ok(props) if props.name == name => return Ok(Some(id)),
                Ok(_) => {}
                Err(e) => debug!(id = %id.short_hex(), error = %e, "ignoring unreadable properties"),
            }
        }
        Ok(None)
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Rewrite the properties of `obj` from its current name and tags.
    ///
    /// Links are not updated; run a check to bring them in line.
    pub fn save(&self, obj: &RepoObject) -> StoreResult<()> {
        validate_name(&obj.name)?;
        for (category, keys) in obj.tags.iter().filter(|(_, keys)| !keys.is_empty()) {
            validate_category(category)?;
            for key in keys {
                validate_tag(category, key)?;
            }
        }
        if !self.contains(&obj.id) {
            return Err(StoreError::NotFound(obj.id));
        }
        if let Some(existing) = self.find_by_name(&obj.name, &obj.id)? {
            return Err(StoreError::DuplicateName {
                name: obj.name.clone(),
                existing,
            });
        }
        self.write_properties(&obj.id, &obj.to_properties())?;
        debug!(id = %obj.id.short_hex(), name = %obj.name, "saved properties");
        Ok(())
    }

    /// Remove the content and properties of `id`.
    ///
    /// Failing to remove the properties file is only logged; the next check
    /// deletes it as an orphan.
    pub fn delete(&self, id: &DocId) -> StoreResult<()> {
        let path = self.layout.object_path(id);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(*id),
            _ => io_at(&path)(e),
        })?;
        let props_path = self.layout.properties_path(id);
        if let Err(e) = fs::remove_file(&props_path) {
            warn!(path = %props_path.display(), error = %e, "failed to remove properties file");
        }
        info!(id = %id.short_hex(), "deleted object");
        Ok(())
    }

    fn write_properties(&self, id: &DocId, props: &Properties) -> StoreResult<()> {
        let path = self.layout.properties_path(id);
        fs::write(&path, props.encode()).map_err(io_at(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclib_crypto::ContentHasher;

    fn make_store() -> (tempfile::TempDir, ObjectStore, TagCatalog) {
        let dir = tempfile::tempdir().unwrap();
        let layout = RepoLayout::new(dir.path());
        layout.create().unwrap();
        fs::create_dir_all(layout.tag_dir("topic", "rust")).unwrap();
        let catalog = TagCatalog::open(&layout).unwrap();
        (dir, ObjectStore::new(layout), catalog)
    }

    fn repo_files(store: &ObjectStore) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(store.layout().repo_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn acquire_stores_content_under_digest() {
        let (_dir, store, catalog) = make_store();
        let obj = store.acquire(&b"hello"[..], "doc1", &catalog).unwrap();

        let id = ContentHasher::hash(b"hello");
        assert_eq!(obj.id, id);
        assert_eq!(obj.name, "doc1");
        assert!(obj.tags["topic"].is_empty());
        assert_eq!(fs::read(store.layout().object_path(&id)).unwrap(), b"hello");
        assert_eq!(
            fs::read_to_string(store.layout().properties_path(&id)).unwrap(),
            format!("version=0\nhash=blake2b:{}\nname=doc1\n", id.to_hex())
        );
    }

    #[test]
    fn acquire_leaves_no_temp_files() {
        let (_dir, store, catalog) = make_store();
        let obj = store.acquire(&b"hello"[..], "doc1", &catalog).unwrap();
        let id = obj.id.to_hex();
        assert_eq!(repo_files(&store), vec![id.clone(), format!("{id}.properties")]);
    }

    #[test]
    fn reacquire_identical_content_is_idempotent() {
        let (_dir, store, catalog) = make_store();
        let mut first = store.acquire(&b"same"[..], "original", &catalog).unwrap();
        first.tag("topic", "rust");
        store.save(&first).unwrap();

        let second = store.acquire(&b"same"[..], "other name", &catalog).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "original");
        assert!(second.is_tagged("topic", "rust"));
        assert_eq!(repo_files(&store).len(), 2);
    }

    #[test]
    fn acquire_rejects_taken_name() {
        let (_dir, store, catalog) = make_store();
        let first = store.acquire(&b"one"[..], "doc", &catalog).unwrap();
        let err = store.acquire(&b"two"[..], "doc", &catalog).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { existing, .. } if existing == first.id));
        assert_eq!(repo_files(&store).len(), 2);
    }

    #[test]
    fn acquire_rejects_invalid_name() {
        let (_dir, store, catalog) = make_store();
        let err = store.acquire(&b"x"[..], "a/b", &catalog).unwrap_err();
        assert!(matches!(err, StoreError::InvalidName { .. }));
        assert!(repo_files(&store).is_empty());
    }

    #[test]
    fn failed_copy_leaves_no_object() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "broken pipe"))
            }
        }

        let (_dir, store, catalog) = make_store();
        assert!(store.acquire(FailingReader, "doc", &catalog).is_err());
        assert!(store.list(&catalog).unwrap().is_empty());
    }

    #[test]
    fn open_unknown_id_is_not_found() {
        let (_dir, store, catalog) = make_store();
        let err = store.open(&ContentHasher::hash(b"nope"), &catalog).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn open_reports_parse_errors() {
        let (_dir, store, catalog) = make_store();
        let obj = store.acquire(&b"x"[..], "doc", &catalog).unwrap();
        fs::write(store.layout().properties_path(&obj.id), "garbage line\n").unwrap();
        let err = store.open(&obj.id, &catalog).unwrap_err();
        assert!(matches!(err, StoreError::Properties { .. }));
    }

    #[test]
    fn list_skips_broken_entries() {
        let (_dir, store, catalog) = make_store();
        let good = store.acquire(&b"good"[..], "good", &catalog).unwrap();
        let bad = store.acquire(&b"bad"[..], "bad", &catalog).unwrap();
        fs::write(store.layout().properties_path(&bad.id), "version=9\n").unwrap();
        fs::write(store.layout().repo_dir().join("temp--leftover"), b"partial").unwrap();

        let objects = store.list(&catalog).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, good.id);
    }

    #[test]
    fn save_persists_name_and_tags() {
        let (_dir, store, catalog) = make_store();
        let mut obj = store.acquire(&b"x"[..], "before", &catalog).unwrap();
        obj.name = "after".into();
        obj.tag("topic", "rust");
        store.save(&obj).unwrap();

        let reopened = store.open(&obj.id, &catalog).unwrap();
        assert_eq!(reopened.name, "after");
        assert!(reopened.is_tagged("topic", "rust"));
    }

    #[test]
    fn save_does_not_touch_links() {
        let (_dir, store, catalog) = make_store();
        let obj = store.acquire(&b"x"[..], "doc", &catalog).unwrap();
        store.save(&obj).unwrap();
        assert_eq!(fs::read_dir(store.layout().titles_dir()).unwrap().count(), 0);
    }

    #[test]
    fn save_rejects_duplicate_name() {
        let (_dir, store, catalog) = make_store();
        store.acquire(&b"a"[..], "first", &catalog).unwrap();
        let mut second = store.acquire(&b"b"[..], "second", &catalog).unwrap();
        second.name = "first".into();
        assert!(matches!(
            store.save(&second),
            Err(StoreError::DuplicateName { .. })
        ));
    }

    #[test]
    fn save_rejects_tags_that_break_the_tag_list() {
        let (_dir, store, catalog) = make_store();
        let mut obj = store.acquire(&b"x"[..], "doc", &catalog).unwrap();
        obj.tag("topic", "c,d");
        assert!(matches!(store.save(&obj), Err(StoreError::InvalidTag { .. })));

        obj.untag("topic", "c,d");
        obj.tag("a=b", "x");
        assert!(matches!(
            store.save(&obj),
            Err(StoreError::InvalidCategory { .. })
        ));

        // Nothing was written.
        let reopened = store.open(&obj.id, &catalog).unwrap();
        assert!(!reopened.is_tagged("topic", "c,d"));
        assert!(!reopened.is_tagged("a=b", "x"));
    }

    #[test]
    fn save_of_deleted_object_is_not_found() {
        let (_dir, store, catalog) = make_store();
        let obj = store.acquire(&b"x"[..], "doc", &catalog).unwrap();
        store.delete(&obj.id).unwrap();
        assert!(store.save(&obj).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_removes_content_and_properties() {
        let (_dir, store, catalog) = make_store();
        let obj = store.acquire(&b"x"[..], "doc", &catalog).unwrap();
        store.delete(&obj.id).unwrap();
        assert!(repo_files(&store).is_empty());
        assert!(store.delete(&obj.id).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_tolerates_missing_properties() {
        let (_dir, store, catalog) = make_store();
        let obj = store.acquire(&b"x"[..], "doc", &catalog).unwrap();
        fs::remove_file(store.layout().properties_path(&obj.id)).unwrap();
        store.delete(&obj.id).unwrap();
        assert!(!store.contains(&obj.id));
    }
}
