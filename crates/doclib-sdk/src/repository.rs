use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use doclib_index::{CheckReport, Reconciler};
use doclib_store::{ObjectStore, RepoLayout, RepoObject, StoreError, Tag, TagCatalog};
use doclib_types::DocId;
use tracing::{debug, info};

use crate::config::RepoConfig;
use crate::error::{SdkError, SdkResult};

/// Shortest id prefix accepted by [`Repository::resolve`].
pub const MIN_PREFIX_LEN: usize = 4;

/// A document repository on the local filesystem.
///
/// Holds the object store and a snapshot of the tag catalog taken when the
/// repository was opened. Call [`reload`](Self::reload) to pick up tag
/// directories created since.
///
/// Mutating calls only write properties in `repo/`; the `titles/` and tag
/// links follow on the next [`check`](Self::check). A handle must not be
/// used for mutations while another handle, or a check, works on the same
/// root.
pub struct Repository {
    config: RepoConfig,
    store: ObjectStore,
    catalog: TagCatalog,
}

impl Repository {
    /// Create the directory layout at `root` if needed and open it.
    pub fn create(root: impl Into<PathBuf>) -> SdkResult<Self> {
        let layout = RepoLayout::new(root);
        layout.create().map_err(|source| StoreError::IoAt {
            path: layout.root().to_path_buf(),
            source,
        })?;
        info!(root = %layout.root().display(), "initialized repository");
        Self::open(layout.root())
    }

    /// Open an existing repository with default settings.
    pub fn open(root: impl Into<PathBuf>) -> SdkResult<Self> {
        Self::open_with_config(RepoConfig::new(root))
    }

    /// Open the repository at `config.root`.
    pub fn open_with_config(config: RepoConfig) -> SdkResult<Self> {
        let layout = RepoLayout::new(&config.root);
        if !layout.is_initialized() {
            return Err(SdkError::NotInitialized(config.root.display().to_string()));
        }
        let catalog = TagCatalog::open(&layout)?;
        debug!(
            root = %layout.root().display(),
            categories = catalog.categories().len(),
            "opened repository"
        );
        Ok(Self {
            config,
            store: ObjectStore::new(layout),
            catalog,
        })
    }

    /// Re-scan tag categories and tags from disk.
    pub fn reload(&mut self) -> SdkResult<()> {
        self.catalog = TagCatalog::open(self.store.layout())?;
        Ok(())
    }

    // ---- Accessors ----

    /// The repository root.
    pub fn location(&self) -> &Path {
        self.store.layout().root()
    }

    /// Path of an object's content, for handing to external viewers.
    pub fn object_path(&self, id: &DocId) -> PathBuf {
        self.store.layout().object_path(id)
    }

    pub fn categories(&self) -> Vec<String> {
        self.catalog.categories()
    }

    pub fn tags(&self, category: &str) -> &[Tag] {
        self.catalog.tags(category)
    }

    // ---- Objects ----

    /// All objects that can be opened, ordered by id.
    pub fn list(&self) -> SdkResult<Vec<RepoObject>> {
        Ok(self.store.list(&self.catalog)?)
    }

    /// All objects that can be opened, ordered by display name.
    pub fn list_sorted(&self) -> SdkResult<Vec<RepoObject>> {
        let mut objects = self.list()?;
        objects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(objects)
    }

    pub fn open_object(&self, id: &DocId) -> SdkResult<RepoObject> {
        Ok(self.store.open(id, &self.catalog)?)
    }

    /// Find an object by full id, unique id prefix, or display name.
    pub fn resolve(&self, query: &str) -> SdkResult<DocId> {
        if let Ok(id) = query.parse::<DocId>() {
            return Ok(id);
        }
        let objects = self.list()?;
        if query.len() >= MIN_PREFIX_LEN && query.bytes().all(|b| b.is_ascii_hexdigit()) {
            let query = query.to_ascii_lowercase();
            let matches: Vec<&RepoObject> = objects
                .iter()
                .filter(|o| o.id.to_hex().starts_with(&query))
                .collect();
            match matches.as_slice() {
                [one] => return Ok(one.id),
                [] => {}
                many => {
                    return Err(SdkError::Ambiguous {
                        query,
                        count: many.len(),
                    })
                }
            }
        }
        objects
            .iter()
            .find(|o| o.name == query)
            .map(|o| o.id)
            .ok_or_else(|| SdkError::NoMatch(query.to_string()))
    }

    /// Store the bytes of `reader` as a new object named `name`.
    pub fn acquire<R: Read>(&self, reader: R, name: &str) -> SdkResult<RepoObject> {
        Ok(self.store.acquire(reader, name, &self.catalog)?)
    }

    /// Store a file, named after its filename.
    pub fn acquire_file(&self, path: &Path) -> SdkResult<RepoObject> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::InvalidName {
                name: path.display().to_string(),
                reason: "path has no UTF-8 filename".into(),
            })?;
        let file = File::open(path).map_err(|source| StoreError::IoAt {
            path: path.to_path_buf(),
            source,
        })?;
        self.acquire(file, name)
    }

    /// Persist the object's name and tags.
    pub fn save(&self, obj: &RepoObject) -> SdkResult<()> {
        Ok(self.store.save(obj)?)
    }

    pub fn delete(&self, id: &DocId) -> SdkResult<()> {
        Ok(self.store.delete(id)?)
    }

    /// Assign a tag the catalog knows about. Returns `false` if it was
    /// already assigned. The change is in memory until [`save`](Self::save).
    pub fn tag(&self, obj: &mut RepoObject, category: &str, tag: &str) -> SdkResult<bool> {
        let key = tag.to_lowercase();
        if self.catalog.find_tag(category, &key).is_none() {
            return Err(SdkError::UnknownTag {
                category: category.to_string(),
                tag: tag.to_string(),
            });
        }
        Ok(obj.tag(category, &key))
    }

    /// Remove a tag. Tags of categories no longer on disk can be removed too.
    pub fn untag(&self, obj: &mut RepoObject, category: &str, tag: &str) -> bool {
        obj.untag(category, &tag.to_lowercase())
    }

    // ---- Maintenance ----

    /// Reconcile the link trees with the stored properties.
    pub fn check(&self) -> SdkResult<CheckReport> {
        let report = Reconciler::new(&self.store, self.config.check.clone()).run()?;
        Ok(report)
    }
}
