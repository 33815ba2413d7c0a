//! Error types for the index crate.

use std::path::PathBuf;

/// Errors that abort a check run.
///
/// Problems with individual entries never surface here; they are repaired
/// or recorded in the report.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A required top-level directory could not be listed.
    #[error("cannot enumerate {}: {source}", path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store operation failed (including tag catalog discovery).
    #[error("store error: {0}")]
    Store(#[from] doclib_store::StoreError),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
