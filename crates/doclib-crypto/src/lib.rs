//! Content hashing for doclib.
//!
//! Provides streaming BLAKE2b-512 hashing of byte slices, readers and files,
//! and a [`HashingWriter`] that digests bytes while they are written
//! elsewhere. The resulting [`DocId`](doclib_types::DocId) names an object in
//! the repository and is used to verify its stored content.
//!
//! Hashing is delegated to the `blake2` crate.

pub mod hasher;

pub use hasher::{hash_spec, ContentHasher, HashingWriter, ALGORITHM, BUFFER_SIZE};
