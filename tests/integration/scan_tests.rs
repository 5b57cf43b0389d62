use fixity::integrity::{Analyzer, IntegrityScanner, ScanConfig};
use fixity::scanner::{Hasher, WalkerConfig};
use fixity::store::IntegrityStore;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn scanner(ignored: &[&str]) -> IntegrityScanner {
    IntegrityScanner::new(
        ScanConfig::default().with_walker_config(WalkerConfig::with_ignored_extensions(ignored)),
    )
}

fn dir_key(path: &Path) -> String {
    path.canonicalize().unwrap().to_string_lossy().into_owned()
}

#[test]
fn test_scan_nested_tree() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("2023/summer")).unwrap();
    fs::write(root.join("top.jpg"), "top").unwrap();
    fs::write(root.join("2023/a.jpg"), "a").unwrap();
    fs::write(root.join("2023/summer/b.jpg"), "b").unwrap();
    fs::write(root.join("2023/summer/b.xmp"), "sidecar").unwrap();

    let store = IntegrityStore::open_in_memory().unwrap();
    let summary = scanner(&["XMP"]).scan(&root, &store).unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.inserted, 3);

    let record = store
        .get(&dir_key(&root.join("2023/summer")), "b.jpg")
        .unwrap()
        .expect("nested file tracked");
    assert_eq!(record.extension, "JPG");
    assert!(store
        .get(&dir_key(&root.join("2023/summer")), "b.xmp")
        .unwrap()
        .is_none());
}

#[test]
fn test_scan_records_expected_digests() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("data.bin"), b"payload").unwrap();

    let store = IntegrityStore::open_in_memory().unwrap();
    scanner(&[]).scan(&root, &store).unwrap();

    let expected = Hasher::new().hash_bytes(b"payload");
    let record = store.get(&dir_key(&root), "data.bin").unwrap().unwrap();
    assert_eq!(record.base_hash_strong, expected.strong);
    assert_eq!(record.base_hash_fast, expected.fast);
    assert_eq!(record.latest_hash_strong, expected.strong);
    assert_eq!(record.base_hash_strong.len(), 64);
    assert_eq!(record.base_hash_fast.len(), 16);
}

#[test]
fn test_rescan_refreshes_latest_only() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let file = root.join("doc.txt");
    fs::write(&file, "v1").unwrap();

    let store = IntegrityStore::open_in_memory().unwrap();
    scanner(&[]).scan(&root, &store).unwrap();
    let before = store.get(&dir_key(&root), "doc.txt").unwrap().unwrap();

    fs::write(&file, "v2").unwrap();
    let summary = scanner(&[]).scan(&root, &store).unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.inserted, 0);

    let after = store.get(&dir_key(&root), "doc.txt").unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.base_hash_strong, before.base_hash_strong);
    assert_eq!(after.base_hash_fast, before.base_hash_fast);
    assert_eq!(after.date_added, before.date_added);
    assert_ne!(after.latest_hash_strong, before.latest_hash_strong);
    assert!(after.date_updated >= before.date_updated);
    assert!(after.is_drifted());

    // Restoring the original content clears the drift.
    fs::write(&file, "v1").unwrap();
    scanner(&[]).scan(&root, &store).unwrap();
    assert!(Analyzer::new(&store).drifted().unwrap().is_empty());
}

#[test]
fn test_new_file_added_between_runs() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("one.txt"), "1").unwrap();

    let store = IntegrityStore::open_in_memory().unwrap();
    scanner(&[]).scan(&root, &store).unwrap();

    fs::write(root.join("two.txt"), "2").unwrap();
    let summary = scanner(&[]).scan(&root, &store).unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(store.total_rows().unwrap(), 2);
}

#[test]
fn test_scan_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    let db = dir.path().join("checksums.db");

    {
        let store = IntegrityStore::open(&db).unwrap();
        scanner(&[]).scan(&root, &store).unwrap();
    }

    let store = IntegrityStore::open(&db).unwrap();
    assert_eq!(store.total_rows().unwrap(), 1);
    let summary = scanner(&[]).scan(&root, &store).unwrap();
    assert_eq!(summary.updated, 1);
}

#[test]
fn test_parallel_scan_counts() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    for i in 0..50 {
        fs::write(root.join(format!("f{i:02}.dat")), format!("content {}", i % 10)).unwrap();
    }

    let store = IntegrityStore::open_in_memory().unwrap();
    let summary = IntegrityScanner::new(ScanConfig::default().with_io_threads(3).with_batch_size(8))
        .scan(&root, &store)
        .unwrap();

    assert_eq!(summary.processed, 50);
    assert_eq!(summary.inserted, 50);
    let groups = Analyzer::new(&store).duplicates().unwrap();
    assert_eq!(groups.len(), 10);
    assert!(groups.iter().all(|g| g.member_count() == 5));
}
