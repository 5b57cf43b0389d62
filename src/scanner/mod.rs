//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Directory walking using jwalk with extension filtering
//! - Dual content hashing (BLAKE3 + XXH3) streamed over fixed-size chunks
//! - Exact `(directory, filename)` store keys taken from the walked path
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Strong digest and fast checksum computation
//!
//! # Example
//!
//! ```no_run
//! use fixity::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::with_ignored_extensions(["xmp", "ini"]);
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{} [{}]", file.path.display(), file.extension),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::collections::BTreeSet;
use std::path::PathBuf;

// Re-export main types
pub use hasher::{FileDigest, Hasher, CHUNK_SIZE};
pub use walker::{Walker, OS_METADATA_FILENAME};

/// A file discovered by the walker.
///
/// `directory` and `filename` together form the identity key of a tracked
/// file in the integrity store. They are the exact components of `path`, so
/// joining them gives back the path the file was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Containing directory, exactly as walked
    pub directory: String,
    /// File name without directory, exactly as walked
    pub filename: String,
    /// Upper-cased extension without the leading dot, empty if none
    pub extension: String,
    /// Full path used for reading the file
    pub path: PathBuf,
}

impl FileDescriptor {
    /// Build a descriptor from a full file path.
    ///
    /// Names are never rewritten: two files whose names differ only in
    /// Unicode normalization stay two records.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnsupportedName`] when the path has no file name
    /// component (e.g. `/`) or is not valid UTF-8, since neither can be
    /// stored as an exact key.
    pub fn from_path(path: PathBuf) -> Result<Self, ScanError> {
        let (Some(filename), Some(directory)) = (
            path.file_name().and_then(std::ffi::OsStr::to_str),
            path.parent().and_then(std::path::Path::to_str),
        ) else {
            return Err(ScanError::UnsupportedName(path));
        };
        let filename = filename.to_owned();
        let directory = directory.to_owned();
        let extension = extension_of(&filename);

        Ok(Self {
            directory,
            filename,
            extension,
            path,
        })
    }
}

/// Extract the comparison form of a file's extension.
///
/// The text after the last `.` is upper-cased. A leading dot alone (as in
/// `.bashrc`) does not start an extension.
///
/// ```
/// use fixity::scanner::extension_of;
///
/// assert_eq!(extension_of("photo.jpeg"), "JPEG");
/// assert_eq!(extension_of("archive.tar.gz"), "GZ");
/// assert_eq!(extension_of("README"), "");
/// assert_eq!(extension_of(".bashrc"), "");
/// ```
#[must_use]
pub fn extension_of(filename: &str) -> String {
    match filename.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => filename[idx + 1..].to_uppercase(),
    }
}

/// Normalize one configured extension into comparison form.
///
/// Whitespace is trimmed, a single leading dot is dropped and the result is
/// upper-cased, so `" .xmp"` and `"XMP"` compare equal.
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    trimmed
        .strip_prefix('.')
        .unwrap_or(trimmed)
        .to_uppercase()
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Extensions to skip, already in normalized (upper-case, no dot) form.
    pub ignore_extensions: BTreeSet<String>,
}

impl WalkerConfig {
    /// Create a configuration ignoring the given extensions.
    ///
    /// Entries are normalized with [`normalize_extension`]; empty entries are
    /// dropped.
    #[must_use]
    pub fn with_ignored_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ignore_extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();

        Self {
            follow_symlinks: false,
            ignore_extensions,
        }
    }

    /// Enable or disable following symlinks.
    #[must_use]
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Whether a normalized extension is excluded.
    #[must_use]
    pub fn is_ignored_extension(&self, extension: &str) -> bool {
        !extension.is_empty() && self.ignore_extensions.contains(extension)
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A file name that cannot be tracked (not valid UTF-8).
    #[error("Unsupported file name: {}", .0.display())]
    UnsupportedName(PathBuf),

    /// A file could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl ScanError {
    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::PermissionDenied(p)
            | Self::NotFound(p)
            | Self::NotADirectory(p)
            | Self::UnsupportedName(p) => p,
            Self::Io { path, .. } => path,
            Self::Hash(e) => e.path(),
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
