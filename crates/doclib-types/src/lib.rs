//! Foundation types for doclib.
//!
//! Every other doclib crate depends on `doclib-types`. The central type is
//! [`DocId`], the content digest that names an object in the repository's
//! `repo/` directory and doubles as its integrity witness.

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{DocId, DIGEST_LEN};
