//! Content-addressed document storage for doclib.
//!
//! A repository root holds a `repo/` directory with one immutable content
//! file per document, named by the lowercase hex BLAKE2b-512 digest of its
//! bytes, next to a mutable `<digest>.properties` file with the document's
//! display name and tags. Every other top-level directory except `titles/` is
//! a tag category whose subdirectories are the category's tag values.
//!
//! # Components
//!
//! - [`RepoLayout`] -- paths and naming conventions of the on-disk layout
//! - [`properties`] -- the `key=value` property codec
//! - [`TagCatalog`] -- tag categories and values discovered from directories
//! - [`ObjectStore`] -- admission, lookup, listing, update and removal
//! - [`RepoObject`] -- a document as reconstructed from its properties
//!
//! # Design Rules
//!
//! 1. Content files are immutable once admitted; their name is their digest.
//! 2. Admission writes to a `temp--` file and renames it into place.
//! 3. The store only ever writes `repo/`. The `titles/` and tag symlink trees
//!    are derived data owned by the reconciler in `doclib-index`.
//! 4. Callers must serialize mutating operations against one root; there is
//!    no locking.

pub mod catalog;
pub mod error;
pub mod layout;
pub mod names;
pub mod object;
pub mod properties;
pub mod store;

pub use catalog::{Tag, TagCatalog};
pub use error::{PropertiesError, StoreError, StoreResult};
pub use layout::{EntryKind, RepoLayout};
pub use names::{validate_category, validate_name, validate_tag};
pub use object::{index_of, RepoObject};
pub use properties::{Properties, Tags, SCHEMA_VERSION};
pub use store::ObjectStore;
