//! High-level API for doclib.
//!
//! [`Repository`] is the one handle applications need: it opens a repository
//! root, admits and updates documents, and runs the link check. The crates
//! below it are re-exported for callers that need their types.

pub mod config;
pub mod error;
pub mod repository;

pub use config::RepoConfig;
pub use error::{SdkError, SdkResult};
pub use repository::Repository;

// Re-export key types
pub use doclib_index::{CheckOptions, CheckReport, Issue, IssueKind};
pub use doclib_store::{index_of, RepoObject, StoreError, Tag};
pub use doclib_types::DocId;
