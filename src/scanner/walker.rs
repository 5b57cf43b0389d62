//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a monitored
//! directory and producing a [`FileDescriptor`] for every file that should
//! be tracked.
//!
//! # Filtering
//!
//! - Files whose extension is in [`WalkerConfig::ignore_extensions`]
//!   (exact, case-insensitive match) are skipped.
//! - The macOS metadata file [`OS_METADATA_FILENAME`] is always skipped.
//! - A symlink to a file is tracked under the link's own location and hashed
//!   through it. Symlinked directories are only descended into when
//!   `follow_symlinks` is set.
//!
//! Unreadable entries, dangling links and names that cannot be stored as
//! exact keys are yielded as [`ScanError`] values rather than stopping
//! iteration.
//!
//! # Example
//!
//! ```no_run
//! use fixity::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/srv/photos"), WalkerConfig::default());
//! println!("{} files to check", walker.count());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jwalk::WalkDir;

use super::{FileDescriptor, HashError, ScanError, WalkerConfig};

/// File name that is never tracked (Finder metadata on macOS).
pub const OS_METADATA_FILENAME: &str = ".DS_Store";

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Whether a descriptor passes the extension and metadata-file filters.
    #[must_use]
    pub fn accepts(&self, descriptor: &FileDescriptor) -> bool {
        descriptor.filename != OS_METADATA_FILENAME
            && !self.config.is_ignored_extension(&descriptor.extension)
    }

    /// Count the files a [`walk`](Self::walk) would yield successfully.
    ///
    /// Used for progress estimation ahead of the processing pass.
    #[must_use]
    pub fn count(&self) -> usize {
        self.walk().filter(Result::is_ok).count()
    }

    /// Walk the directory tree, yielding file descriptors.
    ///
    /// Children are sorted by name within each directory so progress output
    /// is stable between runs; nothing downstream depends on the order.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileDescriptor, ScanError>> + '_ {
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(false)
            .sort(true);

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();

                    if file_type.is_dir() {
                        return None;
                    }

                    let path = entry.path();

                    if !file_type.is_file() && !file_type.is_symlink() {
                        log::trace!("Skipping special file: {}", path.display());
                        return None;
                    }

                    let descriptor = match FileDescriptor::from_path(path) {
                        Ok(descriptor) => descriptor,
                        Err(e) => {
                            log::warn!("{}", e);
                            return Some(Err(e));
                        }
                    };
                    if !self.accepts(&descriptor) {
                        log::trace!("Ignoring file: {}", descriptor.path.display());
                        return None;
                    }

                    if file_type.is_symlink() {
                        match std::fs::metadata(&descriptor.path) {
                            Ok(target) if target.is_file() => {}
                            Ok(_) => {
                                log::trace!("Skipping symlink: {}", descriptor.path.display());
                                return None;
                            }
                            Err(e) => {
                                log::warn!("Dangling symlink {}: {}", descriptor.path.display(), e);
                                return Some(Err(HashError::from_io(&descriptor.path, e).into()));
                            }
                        }
                    }

                    Some(Ok(descriptor))
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    Some(Err(Self::convert_jwalk_error(path, e)))
                }
            }
        })
    }

    /// Convert a jwalk error into a [`ScanError`], keeping the I/O kind.
    fn convert_jwalk_error(path: PathBuf, error: jwalk::Error) -> ScanError {
        use std::io::ErrorKind;

        log::warn!("Walker error for {}: {}", path.display(), error);
        match error.io_error().map(std::io::Error::kind) {
            Some(ErrorKind::PermissionDenied) => ScanError::PermissionDenied(path),
            Some(ErrorKind::NotFound) => ScanError::NotFound(path),
            _ => ScanError::Io {
                path,
                source: std::io::Error::other(error.to_string()),
            },
        }
    }
}
