//! Link index reconciliation for doclib.
//!
//! The `titles/` name index and the per-category tag directories are derived
//! from the properties in `repo/`. Mutating operations only write properties;
//! the [`Reconciler`] is the single writer of the link trees. It runs three
//! sweeps (objects, titles, tags), creates missing links, removes stale and
//! broken ones, and returns a [`CheckReport`] of what it found and did.
//!
//! A run is idempotent and may be interrupted at any point: the state left
//! behind only ever needs another run, never manual repair.
//!
//! # Key Types
//!
//! - [`Reconciler`] -- the check pass over one repository root
//! - [`CheckReport`] -- repair counts plus reported [`Issue`]s
//! - [`CheckOptions`] -- tunables for a run

pub mod check;
pub mod error;
pub mod report;

pub use check::Reconciler;
pub use error::{IndexError, IndexResult};
pub use report::{CheckOptions, CheckReport, Issue, IssueKind};
