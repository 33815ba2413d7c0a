use std::path::PathBuf;

use doclib_types::{DocId, TypeError};

/// Errors from decoding a properties file.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PropertiesError {
    /// A non-comment line without a `=` separator.
    #[error("line {line}: expected `key=value`, found {content:?}")]
    Malformed { line: usize, content: String },

    /// The `version` property is not the supported schema version.
    #[error("unsupported properties version: {0:?}")]
    UnsupportedVersion(String),

    /// The `hash` property lacks the `blake2b:` prefix or a valid digest.
    #[error("malformed hash property: {0:?}")]
    MalformedHash(String),

    /// A required property is absent.
    #[error("missing required property: {0}")]
    MissingKey(&'static str),

    /// A recognized key is used in a way the schema does not allow.
    #[error("schema violation: {0}")]
    Schema(String),
}

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No properties exist for the requested object.
    #[error("object not found: {0}")]
    NotFound(DocId),

    /// The object's properties file could not be decoded.
    #[error("invalid properties for {id}: {source}")]
    Properties {
        id: DocId,
        #[source]
        source: PropertiesError,
    },

    /// A string could not be parsed as an object identifier.
    #[error("invalid object id: {0}")]
    InvalidId(#[from] TypeError),

    /// A display name that cannot be used as a link filename.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A tag category that cannot be written as a `tags.` property key.
    #[error("invalid tag category {category:?}: {reason}")]
    InvalidCategory { category: String, reason: String },

    /// A tag key that cannot be written into a category's tag list.
    #[error("invalid tag {tag:?} in category {category:?}: {reason}")]
    InvalidTag {
        category: String,
        tag: String,
        reason: String,
    },

    /// Another object already uses the display name.
    #[error("name {name:?} is already used by {existing}")]
    DuplicateName { name: String, existing: DocId },

    /// I/O error at a known location.
    #[error("I/O error at {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Returns `true` if the error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Wrap an I/O error with the path it happened at.
pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.into();
    move |source| StoreError::IoAt { path, source }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
