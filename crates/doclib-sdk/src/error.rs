use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("repository not initialized at {0}")]
    NotInitialized(String),

    #[error("unknown tag {tag:?} in category {category:?}")]
    UnknownTag { category: String, tag: String },

    #[error("no object matches {0:?}")]
    NoMatch(String),

    #[error("{query:?} matches {count} objects")]
    Ambiguous { query: String, count: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] doclib_store::StoreError),

    #[error("check failed: {0}")]
    Index(#[from] doclib_index::IndexError),
}

pub type SdkResult<T> = Result<T, SdkError>;
