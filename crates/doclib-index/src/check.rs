//! The three-sweep check that reconciles link trees with properties.
//!
//! 1. Objects: walk `repo/`, drop orphans and admission leftovers, verify
//!    digests, and make sure every object has its title link and exactly the
//!    tag links its properties ask for.
//! 2. Titles: remove dangling or broken links in `titles/`, and links named
//!    after a name their object no longer has.
//! 3. Tags: the same for every `<category>/<tag>/` directory.
//!
//! Categories and tags are listed from disk at the start of every run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use doclib_crypto::ContentHasher;
use doclib_store::layout::{create_symlink, link_target_id};
use doclib_store::{validate_name, EntryKind, ObjectStore, Properties, RepoLayout, TagCatalog};
use doclib_types::DocId;
use tracing::{debug, info};

use crate::error::{IndexError, IndexResult};
use crate::report::{CheckOptions, CheckReport, IssueKind};

/// What is found at the place a link should be.
enum LinkState {
    Missing,
    /// A link to the object in question, with the expected target.
    Ours,
    /// A link naming the object in question that does not resolve through
    /// the expected relative target.
    Misdirected,
    /// A link to something else.
    Foreign(PathBuf),
    NotALink,
    Unreadable(io::Error),
}

fn link_state(link: &Path, id: &DocId, expected: &Path) -> LinkState {
    match fs::symlink_metadata(link) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => LinkState::Missing,
        Err(e) => LinkState::Unreadable(e),
        Ok(meta) if !meta.file_type().is_symlink() => LinkState::NotALink,
        Ok(_) => match fs::read_link(link) {
            Ok(target) if target == expected => LinkState::Ours,
            Ok(target) if link_target_id(&target) == Some(*id) => LinkState::Misdirected,
            Ok(target) => LinkState::Foreign(target),
            Err(e) => LinkState::Unreadable(e),
        },
    }
}

fn enumerate(path: &Path) -> IndexResult<fs::ReadDir> {
    fs::read_dir(path).map_err(|source| IndexError::Enumerate {
        path: path.to_path_buf(),
        source,
    })
}

/// Check and repair pass over one repository.
///
/// The caller must make sure no other operation mutates the repository
/// while a run is in progress.
pub struct Reconciler<'a> {
    store: &'a ObjectStore,
    options: CheckOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a ObjectStore, options: CheckOptions) -> Self {
        Self { store, options }
    }

    fn layout(&self) -> &RepoLayout {
        self.store.layout()
    }

    /// Run all three sweeps.
    ///
    /// Fails only if `repo/`, `titles/` or a category directory cannot be
    /// listed.
    pub fn run(&self) -> IndexResult<CheckReport> {
        let mut report = CheckReport::new();
        let catalog = TagCatalog::open(self.layout())?;

        self.sweep_objects(&catalog, &mut report)?;
        self.sweep_titles(&mut report)?;
        self.sweep_tags(&catalog, &mut report);

        info!(
            objects = report.objects_checked,
            repairs = report.repairs(),
            issues = report.issues.len(),
            "check complete"
        );
        Ok(report)
    }

    // ---------------------------------------------------------------
    // Objects
    // ---------------------------------------------------------------

    fn sweep_objects(&self, catalog: &TagCatalog, report: &mut CheckReport) -> IndexResult<()> {
        let repo_dir = self.layout().repo_dir();
        for entry in enumerate(&repo_dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.issue(IssueKind::Unreadable, &repo_dir, e.to_string());
                    continue;
                }
            };
            let path = entry.path();
            debug!(path = %path.display(), "checking repo entry");

            let is_file = match entry.file_type() {
                Ok(file_type) => file_type.is_file(),
                Err(e) => {
                    report.issue(IssueKind::Unreadable, &path, e.to_string());
                    continue;
                }
            };
            if !is_file {
                report.issue(IssueKind::NotRegularFile, &path, "left in place");
                continue;
            }
            let Ok(filename) = entry.file_name().into_string() else {
                report.issue(IssueKind::InvalidId, &path, "name is not UTF-8");
                continue;
            };

            match EntryKind::classify(&filename) {
                EntryKind::Properties(stem) => self.check_orphan(&repo_dir.join(stem), &path, report),
                EntryKind::Temp => match fs::remove_file(&path) {
                    Ok(()) => {
                        info!(path = %path.display(), "removed leftover admission file");
                        report.temp_files_removed += 1;
                    }
                    Err(e) => report.issue(IssueKind::RemovalFailed, &path, e.to_string()),
                },
                EntryKind::Unknown => {
                    report.issue(IssueKind::InvalidId, &path, "name is not a content digest")
                }
                EntryKind::Object(id) => self.check_object(&id, &path, catalog, report),
            }
        }
        Ok(())
    }

    /// Remove a properties file whose content file is gone.
    fn check_orphan(&self, content: &Path, props: &Path, report: &mut CheckReport) {
        match fs::symlink_metadata(content) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => match fs::remove_file(props) {
                Ok(()) => {
                    info!(path = %props.display(), "removed orphaned properties");
                    report.orphans_removed += 1;
                }
                Err(e) => report.issue(IssueKind::RemovalFailed, props, e.to_string()),
            },
            Err(e) => report.issue(IssueKind::Unreadable, content, e.to_string()),
            Ok(_) => {}
        }
    }

    fn check_object(&self, id: &DocId, path: &Path, catalog: &TagCatalog, report: &mut CheckReport) {
        report.objects_checked += 1;

        if self.options.verify_digests {
            match ContentHasher::hash_file(path) {
                Ok(actual) if actual != *id => report.issue(
                    IssueKind::DigestMismatch,
                    path,
                    format!("content hashes to {actual}; possible corruption"),
                ),
                Ok(_) => {}
                Err(e) => report.issue(IssueKind::Unreadable, path, e.to_string()),
            }
        }

        let props_path = self.layout().properties_path(id);
        match fs::symlink_metadata(&props_path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                report.issue(IssueKind::MissingProperties, &props_path, "not a regular file");
                return;
            }
            Err(e) => {
                report.issue(IssueKind::MissingProperties, &props_path, e.to_string());
                return;
            }
        }
        let props = match self.store.read_properties(id) {
            Ok(props) => props,
            Err(e) => {
                report.issue(IssueKind::InvalidProperties, &props_path, e.to_string());
                return;
            }
        };

        if props.hash != *id {
            report.issue(
                IssueKind::HashPropertyMismatch,
                &props_path,
                format!("hash property names {}", props.hash),
            );
        }
        if let Err(e) = validate_name(&props.name) {
            report.issue(IssueKind::InvalidName, &props_path, e.to_string());
            return;
        }

        self.reconcile_title(id, &props.name, report);
        self.reconcile_tags(id, &props, catalog, report);
    }

    fn reconcile_title(&self, id: &DocId, name: &str, report: &mut CheckReport) {
        let link = self.layout().title_link(name);
        let target = RepoLayout::title_target(id);
        match link_state(&link, id, &target) {
            LinkState::Ours => {}
            LinkState::Missing => self.create_link(&target, &link, report),
            LinkState::Misdirected => self.replace_link(&target, &link, report),
            LinkState::Foreign(other) => report.issue(
                IssueKind::TitleConflict,
                &link,
                format!("{id} wants this name; link points to {}", other.display()),
            ),
            LinkState::NotALink => report.issue(IssueKind::NotASymlink, &link, "conflicts with title"),
            LinkState::Unreadable(e) => report.issue(IssueKind::UnreadableLink, &link, e.to_string()),
        }
    }

    /// Bring the object's tag links in line with its properties, over every
    /// category and tag directory on disk.
    fn reconcile_tags(
        &self,
        id: &DocId,
        props: &Properties,
        catalog: &TagCatalog,
        report: &mut CheckReport,
    ) {
        let target = RepoLayout::tag_target(id);
        for (category, tags) in catalog.iter() {
            let assigned = props.tags.get(category);
            for tag in tags {
                let wanted = assigned.map_or(false, |values| values.contains(&tag.key));
                let link = self.layout().tag_dir(category, &tag.title).join(&props.name);
                match (wanted, link_state(&link, id, &target)) {
                    (true, LinkState::Ours) | (false, LinkState::Missing) => {}
                    (true, LinkState::Missing) => self.create_link(&target, &link, report),
                    (true, LinkState::Misdirected) => self.replace_link(&target, &link, report),
                    (false, LinkState::Ours | LinkState::Misdirected) => {
                        self.remove_link(&link, "tag no longer assigned", report);
                    }
                    // A link of another object with the same name is left to
                    // that object; the tag sweep removes it once it is broken.
                    (false, _) => {}
                    (true, LinkState::Foreign(other)) => report.issue(
                        IssueKind::TagConflict,
                        &link,
                        format!("{id} wants this tag; link points to {}", other.display()),
                    ),
                    (true, LinkState::NotALink) => {
                        report.issue(IssueKind::NotASymlink, &link, "conflicts with tag link")
                    }
                    (true, LinkState::Unreadable(e)) => {
                        report.issue(IssueKind::UnreadableLink, &link, e.to_string())
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Link directories
    // ---------------------------------------------------------------

    fn sweep_titles(&self, report: &mut CheckReport) -> IndexResult<()> {
        let dir = self.layout().titles_dir();
        let entries = enumerate(&dir)?;
        self.sweep_links(&dir, entries, false, report);
        Ok(())
    }

    fn sweep_tags(&self, catalog: &TagCatalog, report: &mut CheckReport) {
        for (category, tags) in catalog.iter() {
            for tag in tags {
                let dir = self.layout().tag_dir(category, &tag.title);
                match fs::read_dir(&dir) {
                    Ok(entries) => self.sweep_links(&dir, entries, true, report),
                    Err(e) => report.issue(IssueKind::Unreadable, &dir, e.to_string()),
                }
            }
        }
    }

    /// Remove dangling or broken links and links whose filename is not their
    /// object's current name. Unreadable links are removed only if
    /// `remove_unreadable` is set.
    fn sweep_links(
        &self,
        dir: &Path,
        entries: fs::ReadDir,
        remove_unreadable: bool,
        report: &mut CheckReport,
    ) {
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.issue(IssueKind::Unreadable, dir, e.to_string());
                    continue;
                }
            };
            let path = entry.path();
            debug!(path = %path.display(), "checking link");

            match entry.file_type() {
                Ok(file_type) if file_type.is_symlink() => {}
                Ok(_) => {
                    report.issue(IssueKind::NotASymlink, &path, "left in place");
                    continue;
                }
                Err(e) => {
                    report.issue(IssueKind::Unreadable, &path, e.to_string());
                    continue;
                }
            }

            let target = match fs::read_link(&path) {
                Ok(target) => target,
                Err(e) if remove_unreadable => {
                    self.remove_link(&path, &format!("unreadable: {e}"), report);
                    continue;
                }
                Err(e) => {
                    report.issue(IssueKind::UnreadableLink, &path, e.to_string());
                    continue;
                }
            };
            if fs::metadata(&path).is_err() {
                self.remove_link(&path, "dangling", report);
                continue;
            }
            let Some(id) = link_target_id(&target) else {
                self.remove_link(&path, "target is not an object", report);
                continue;
            };
            match self.store.read_properties(&id) {
                Err(e) => {
                    self.remove_link(&path, &format!("broken: {e}"), report);
                }
                Ok(props) if entry.file_name().to_str() != Some(props.name.as_str()) => {
                    self.remove_link(&path, "object was renamed", report);
                }
                Ok(_) => {}
            }
        }
    }

    fn create_link(&self, target: &Path, link: &Path, report: &mut CheckReport) {
        match create_symlink(target, link) {
            Ok(()) => {
                info!(link = %link.display(), target = %target.display(), "created link");
                report.links_created += 1;
            }
            Err(e) => report.issue(IssueKind::CreationFailed, link, e.to_string()),
        }
    }

    /// Swap a link with the wrong target for a correct one.
    fn replace_link(&self, target: &Path, link: &Path, report: &mut CheckReport) {
        if self.remove_link(link, "wrong link target", report) {
            self.create_link(target, link, report);
        }
    }

    /// Remove a link. Returns `false` if removal failed (and was reported).
    fn remove_link(&self, link: &Path, reason: &str, report: &mut CheckReport) -> bool {
        match fs::remove_file(link) {
            Ok(()) => {
                info!(link = %link.display(), reason, "removed link");
                report.links_removed += 1;
                true
            }
            Err(e) => {
                report.issue(IssueKind::RemovalFailed, link, e.to_string());
                false
            }
        }
    }
}
