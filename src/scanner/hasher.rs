//! Dual-digest file hasher with streaming support.
//!
//! # Overview
//!
//! Every tracked file gets two independent digests:
//!
//! - a **strong** digest (BLAKE3, 64 hex characters) that detects any
//!   bit-level change with negligible collision probability, and
//! - a **fast** checksum (XXH3-64, 16 hex characters) used as a cheap
//!   cross-check and as the secondary key when grouping duplicates.
//!
//! Both are fed from the same read loop over [`CHUNK_SIZE`] buffers, so a
//! file is read exactly once and memory use does not grow with file size.
//!
//! # Example
//!
//! ```no_run
//! use fixity::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.hash_file(Path::new("photo.jpg")).unwrap();
//! println!("{} {}", digest.strong, digest.fast);
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use xxhash_rust::xxh3::Xxh3;

use super::HashError;

/// Read buffer size used for streaming (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// The pair of digests recorded for one observation of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileDigest {
    /// BLAKE3 digest, lowercase hex
    pub strong: String,
    /// XXH3-64 checksum, lowercase hex
    pub fast: String,
}

/// Incremental state for both digests.
struct DigestState {
    strong: blake3::Hasher,
    fast: Xxh3,
}

impl DigestState {
    fn new() -> Self {
        Self {
            strong: blake3::Hasher::new(),
            fast: Xxh3::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.strong.update(data);
        self.fast.update(data);
    }

    fn finish(self) -> FileDigest {
        FileDigest {
            strong: self.strong.finalize().to_hex().to_string(),
            fast: format!("{:016x}", self.fast.digest()),
        }
    }
}

/// File hasher computing a [`FileDigest`] per file.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher using the default [`CHUNK_SIZE`] buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: CHUNK_SIZE,
        }
    }

    /// Create a hasher with a custom read buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Hash the full contents of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read (deleted
    /// mid-scan, permission denied, I/O failure).
    pub fn hash_file(&self, path: &Path) -> Result<FileDigest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Hash everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates read errors other than `Interrupted`, which is retried.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> std::io::Result<FileDigest> {
        let mut state = DigestState::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(state.finish())
    }

    /// Hash an in-memory byte slice.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> FileDigest {
        let mut state = DigestState::new();
        state.update(data);
        state.finish()
    }
}
