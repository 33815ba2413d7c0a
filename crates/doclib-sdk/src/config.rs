use std::fs;
use std::path::{Path, PathBuf};

use doclib_index::CheckOptions;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Settings for opening and checking a repository.
///
/// ```toml
/// root = "/home/me/library"
///
/// [check]
/// verify_digests = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Repository root directory.
    pub root: PathBuf,
    pub check: CheckOptions,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            check: CheckOptions::default(),
        }
    }
}

impl RepoConfig {
    /// Default settings for the repository at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Read a TOML config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
