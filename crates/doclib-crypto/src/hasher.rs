use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use blake2::{Blake2b512, Digest};
use doclib_types::{DocId, DIGEST_LEN};

/// Algorithm tag recorded in the `hash` property of every object.
pub const ALGORITHM: &str = "blake2b";

/// Size of the fixed read buffer used for streaming.
pub const BUFFER_SIZE: usize = 4096;

/// Format the `hash` property value for an object: `blake2b:<hex>`.
pub fn hash_spec(id: &DocId) -> String {
    format!("{ALGORITHM}:{}", id.to_hex())
}

/// Incremental BLAKE2b-512 content hasher.
///
/// Inputs are fed in with [`update`](Self::update) and the digest is taken
/// once with [`finalize`](Self::finalize). The one-shot helpers cover the
/// common cases of hashing a slice, a reader or a file; none of them holds
/// more than [`BUFFER_SIZE`] bytes of input in memory at a time.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Blake2b512,
}

impl ContentHasher {
    /// Create a hasher with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    /// Consume the hasher and produce the identifier.
    pub fn finalize(self) -> DocId {
        let digest = self.inner.finalize();
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&digest);
        DocId::from_digest(out)
    }

    /// Hash a byte slice.
    pub fn hash(data: &[u8]) -> DocId {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Hash everything a reader yields, using a fixed-size buffer.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<DocId> {
        let mut hasher = Self::new();
        let mut buf = [0u8; BUFFER_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(hasher.finalize())
    }

    /// Hash the content of the file at `path`.
    pub fn hash_file(path: &Path) -> io::Result<DocId> {
        Self::hash_reader(File::open(path)?)
    }
}

/// A writer that digests every byte it passes through to `inner`.
///
/// Used during admission so content is copied and hashed in a single pass.
pub struct HashingWriter<W> {
    inner: W,
    hasher: ContentHasher,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: ContentHasher::new(),
        }
    }

    /// Return the wrapped writer and the digest of everything written.
    pub fn finish(self) -> (W, DocId) {
        (self.inner, self.hasher.finalize())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        // Only what the inner writer accepted is part of the content.
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
