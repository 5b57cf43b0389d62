use fixity::integrity::{IntegrityScanner, ScanConfig};
use fixity::progress::ProgressCallback;
use fixity::scanner::{HashError, Hasher, ScanError};
use fixity::store::IntegrityStore;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Deletes a file as soon as the first file of the processing pass starts,
/// after the walker has already listed it.
struct DeleteOnFirstFile {
    victim: PathBuf,
}

impl ProgressCallback for DeleteOnFirstFile {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, current: usize, _path: &str) {
        if current == 1 {
            let _ = fs::remove_file(&self.victim);
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_hash_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = Hasher::new()
        .hash_file(&dir.path().join("absent.bin"))
        .unwrap_err();
    assert!(matches!(err, HashError::NotFound(_)));
}

#[test]
fn test_scan_continues_after_file_vanishes() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::write(root.join("b.txt"), "b").unwrap();
    fs::write(root.join("c.txt"), "c").unwrap();

    let callback = Arc::new(DeleteOnFirstFile {
        victim: root.join("b.txt"),
    });
    let store = IntegrityStore::open_in_memory().unwrap();
    let summary = IntegrityScanner::new(ScanConfig::default().with_progress_callback(callback))
        .scan(&root, &store)
        .unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.error_count(), 1);
    assert!(matches!(
        &summary.errors[0],
        ScanError::Hash(HashError::NotFound(p)) if p.ends_with("b.txt")
    ));

    let root_key = root.to_string_lossy().into_owned();
    assert!(store.get(&root_key, "a.txt").unwrap().is_some());
    assert!(store.get(&root_key, "b.txt").unwrap().is_none());
    assert!(store.get(&root_key, "c.txt").unwrap().is_some());
}

#[cfg(unix)]
#[test]
fn test_scan_continues_past_unreadable_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let locked = root.join("locked.txt");
    fs::write(root.join("open.txt"), "open").unwrap();
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through the mode bits; nothing to test then.
    if fs::read(&locked).is_ok() {
        return;
    }

    let store = IntegrityStore::open_in_memory().unwrap();
    let summary = IntegrityScanner::new(ScanConfig::default())
        .scan(&root, &store)
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.error_count(), 1);
    assert!(matches!(
        &summary.errors[0],
        ScanError::Hash(HashError::PermissionDenied(_))
    ));
}
