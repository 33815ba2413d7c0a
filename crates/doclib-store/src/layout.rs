//! On-disk layout of a repository root.
//!
//! ```text
//! <root>/
//!   repo/
//!     <hex-digest>              immutable content
//!     <hex-digest>.properties   key=value text
//!     temp--*                   transient admission files
//!   titles/
//!     <Name> -> ../repo/<hex-digest>
//!   <category>/
//!     <tag-value>/
//!       <Name> -> ../../repo/<hex-digest>
//! ```

use std::io;
use std::path::{Path, PathBuf};

use doclib_types::DocId;

/// Directory holding the canonical objects.
pub const SUBDIR_REPO: &str = "repo";
/// Directory holding the name index.
pub const SUBDIR_TITLES: &str = "titles";
/// Prefix of transient admission files inside `repo/`.
pub const PREFIX_TEMP: &str = "temp--";
/// Suffix of property files inside `repo/`.
pub const SUFFIX_PROPERTIES: &str = ".properties";

/// Top-level directory names that are never tag categories.
pub const RESERVED: [&str; 2] = [SUBDIR_REPO, SUBDIR_TITLES];

/// What a filename inside `repo/` denotes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// A content file named by its digest.
    Object(DocId),
    /// A properties file; carries the filename without the suffix.
    Properties(String),
    /// A leftover admission file.
    Temp,
    /// Anything else.
    Unknown,
}

impl EntryKind {
    /// Classify a filename found in `repo/`.
    pub fn classify(filename: &str) -> Self {
        if let Some(stem) = filename.strip_suffix(SUFFIX_PROPERTIES) {
            return Self::Properties(stem.to_string());
        }
        if filename.starts_with(PREFIX_TEMP) {
            return Self::Temp;
        }
        match DocId::from_hex(filename) {
            Ok(id) => Self::Object(id),
            Err(_) => Self::Unknown,
        }
    }
}

/// Paths of a repository rooted at a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.root.join(SUBDIR_REPO)
    }

    pub fn titles_dir(&self) -> PathBuf {
        self.root.join(SUBDIR_TITLES)
    }

    /// Path of an object's content file.
    pub fn object_path(&self, id: &DocId) -> PathBuf {
        self.repo_dir().join(id.to_hex())
    }

    /// Path of an object's properties file.
    pub fn properties_path(&self, id: &DocId) -> PathBuf {
        self.repo_dir()
            .join(format!("{}{SUFFIX_PROPERTIES}", id.to_hex()))
    }

    /// Path of the name-index link for a display name.
    pub fn title_link(&self, name: &str) -> PathBuf {
        self.titles_dir().join(name)
    }

    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.root.join(category)
    }

    /// Directory of one tag value; `tag_dir_name` is the on-disk spelling.
    pub fn tag_dir(&self, category: &str, tag_dir_name: &str) -> PathBuf {
        self.category_dir(category).join(tag_dir_name)
    }

    /// Returns `true` if both `repo/` and `titles/` exist as directories.
    pub fn is_initialized(&self) -> bool {
        self.repo_dir().is_dir() && self.titles_dir().is_dir()
    }

    /// Create `repo/` and `titles/` (and the root) if missing.
    pub fn create(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.repo_dir())?;
        std::fs::create_dir_all(self.titles_dir())
    }

    /// Returns `true` for the reserved top-level names.
    pub fn is_reserved(name: &str) -> bool {
        RESERVED.contains(&name)
    }

    /// Relative target of a link in `titles/`.
    pub fn title_target(id: &DocId) -> PathBuf {
        Path::new("..").join(SUBDIR_REPO).join(id.to_hex())
    }

    /// Relative target of a link in `<category>/<tag>/`.
    pub fn tag_target(id: &DocId) -> PathBuf {
        Path::new("..").join("..").join(SUBDIR_REPO).join(id.to_hex())
    }
}

/// The object a link target names, judged by its final path component.
pub fn link_target_id(target: &Path) -> Option<DocId> {
    let name = target.file_name()?.to_str()?;
    DocId::from_hex(name).ok()
}

/// Create a symbolic link at `link` pointing to `target`.
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Create a symbolic link at `link` pointing to `target`.
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclib_crypto::ContentHasher;

    #[test]
    fn classify_entries() {
        let id = ContentHasher::hash(b"x");
        assert_eq!(EntryKind::classify(&id.to_hex()), EntryKind::Object(id));
        assert_eq!(
            EntryKind::classify(&format!("{}.properties", id.to_hex())),
            EntryKind::Properties(id.to_hex())
        );
        assert_eq!(EntryKind::classify("temp--12345"), EntryKind::Temp);
        assert_eq!(EntryKind::classify("notes.txt"), EntryKind::Unknown);
    }

    #[test]
    fn paths_under_root() {
        let layout = RepoLayout::new("/lib");
        let id = ContentHasher::hash(b"x");
        assert_eq!(layout.repo_dir(), PathBuf::from("/lib/repo"));
        assert_eq!(layout.titles_dir(), PathBuf::from("/lib/titles"));
        assert_eq!(
            layout.object_path(&id),
            PathBuf::from(format!("/lib/repo/{}", id.to_hex()))
        );
        assert_eq!(
            layout.properties_path(&id),
            PathBuf::from(format!("/lib/repo/{}.properties", id.to_hex()))
        );
        assert_eq!(layout.title_link("doc1"), PathBuf::from("/lib/titles/doc1"));
        assert_eq!(
            layout.tag_dir("topic", "Rust"),
            PathBuf::from("/lib/topic/Rust")
        );
    }

    #[test]
    fn link_targets_are_relative() {
        let id = ContentHasher::hash(b"x");
        assert_eq!(
            RepoLayout::title_target(&id),
            PathBuf::from(format!("../repo/{}", id.to_hex()))
        );
        assert_eq!(
            RepoLayout::tag_target(&id),
            PathBuf::from(format!("../../repo/{}", id.to_hex()))
        );
        assert_eq!(link_target_id(&RepoLayout::tag_target(&id)), Some(id));
        assert_eq!(link_target_id(Path::new("../repo/garbage")), None);
    }

    #[test]
    fn reserved_names() {
        assert!(RepoLayout::is_reserved("repo"));
        assert!(RepoLayout::is_reserved("titles"));
        assert!(!RepoLayout::is_reserved("topic"));
    }

    #[test]
    fn create_initializes_layout() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RepoLayout::new(dir.path().join("lib"));
        assert!(!layout.is_initialized());
        layout.create().unwrap();
        assert!(layout.is_initialized());
        // Idempotent.
        layout.create().unwrap();
    }
}
