//! Check results and options.
//!
//! A check both repairs and reports. Repairs are counted; anything it finds
//! but deliberately leaves alone is recorded as an [`Issue`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tunables for a check run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    /// Re-hash every content file and compare with its name.
    pub verify_digests: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            verify_digests: true,
        }
    }
}

/// Outcome of a check run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Content files examined in `repo/`.
    pub objects_checked: usize,
    /// Links created in `titles/` or tag directories.
    pub links_created: usize,
    /// Stale or broken links removed.
    pub links_removed: usize,
    /// Properties files without content removed.
    pub orphans_removed: usize,
    /// Leftover admission files removed.
    pub temp_files_removed: usize,
    /// Problems found and left in place.
    pub issues: Vec<Issue>,
}

impl CheckReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of changes made on disk.
    pub fn repairs(&self) -> usize {
        self.links_created + self.links_removed + self.orphans_removed + self.temp_files_removed
    }

    /// Returns `true` if nothing was repaired and nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.repairs() == 0 && self.issues.is_empty()
    }

    /// Number of issues of one kind.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Content files whose digest does not match their name.
    pub fn corruption_count(&self) -> usize {
        self.count(IssueKind::DigestMismatch)
    }

    /// Record an issue and log it.
    pub(crate) fn issue(&mut self, kind: IssueKind, path: &Path, detail: impl Into<String>) {
        let issue = Issue {
            kind,
            path: path.to_path_buf(),
            detail: detail.into(),
        };
        warn!(kind = %issue.kind, path = %issue.path.display(), detail = %issue.detail, "check issue");
        self.issues.push(issue);
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} objects checked, {} links created, {} links removed, {} orphans removed, {} temp files removed, {} issues",
            self.objects_checked,
            self.links_created,
            self.links_removed,
            self.orphans_removed,
            self.temp_files_removed,
            self.issues.len()
        )
    }
}

/// A problem the check found but did not repair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// The entry the issue is about.
    pub path: PathBuf,
    pub detail: String,
}

/// The kind of problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    /// Something other than a regular file in `repo/`.
    NotRegularFile,
    /// Content does not hash to its filename.
    DigestMismatch,
    /// A file in `repo/` whose name is not a digest.
    InvalidId,
    /// Content without a usable properties file.
    MissingProperties,
    /// Properties that fail to decode.
    InvalidProperties,
    /// The `hash` property names a different digest.
    HashPropertyMismatch,
    /// A display name that cannot be a link filename.
    InvalidName,
    /// `titles/<Name>` links to another object.
    TitleConflict,
    /// `<category>/<tag>/<Name>` links to another object.
    TagConflict,
    /// A non-link entry where a link belongs.
    NotASymlink,
    /// A link whose target cannot be read.
    UnreadableLink,
    /// An entry or directory that cannot be read.
    Unreadable,
    /// Removing a stale entry failed.
    RemovalFailed,
    /// Creating a missing link failed.
    CreationFailed,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotRegularFile => "not a regular file",
            Self::DigestMismatch => "digest mismatch",
            Self::InvalidId => "invalid object id",
            Self::MissingProperties => "missing properties",
            Self::InvalidProperties => "invalid properties",
            Self::HashPropertyMismatch => "hash property mismatch",
            Self::InvalidName => "invalid name",
            Self::TitleConflict => "title conflict",
            Self::TagConflict => "tag conflict",
            Self::NotASymlink => "not a symlink",
            Self::UnreadableLink => "unreadable link",
            Self::Unreadable => "unreadable",
            Self::RemovalFailed => "removal failed",
            Self::CreationFailed => "creation failed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_clean() {
        let report = CheckReport::new();
        assert!(report.is_clean());
        assert_eq!(report.repairs(), 0);
        assert_eq!(report.corruption_count(), 0);
    }

    #[test]
    fn repairs_make_report_unclean() {
        let mut report = CheckReport::new();
        report.links_created = 2;
        report.orphans_removed = 1;
        assert_eq!(report.repairs(), 3);
        assert!(!report.is_clean());
    }

    #[test]
    fn issues_are_counted_by_kind() {
        let mut report = CheckReport::new();
        report.issue(IssueKind::DigestMismatch, Path::new("repo/a"), "x");
        report.issue(IssueKind::TitleConflict, Path::new("titles/b"), "y");
        report.issue(IssueKind::DigestMismatch, Path::new("repo/c"), "z");
        assert_eq!(report.corruption_count(), 2);
        assert_eq!(report.count(IssueKind::TitleConflict), 1);
        assert_eq!(report.count(IssueKind::InvalidName), 0);
        assert!(!report.is_clean());
        assert_eq!(report.repairs(), 0);
    }

    #[test]
    fn options_default_to_verifying() {
        assert!(CheckOptions::default().verify_digests);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = CheckReport::new();
        report.links_created = 1;
        report.issue(IssueKind::NotASymlink, Path::new("titles/x"), "regular file");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["links_created"], 1);
        assert_eq!(json["issues"][0]["kind"], "NotASymlink");
    }
}
