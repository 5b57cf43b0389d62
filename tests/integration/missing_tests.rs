use fixity::integrity::{purge_records, Analyzer, IntegrityScanner, ScanConfig};
use fixity::store::IntegrityStore;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_deleted_file_is_kept_but_flagged() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("keep.txt"), "keep").unwrap();
    fs::write(root.join("sub/gone.txt"), "gone").unwrap();

    let store = IntegrityStore::open_in_memory().unwrap();
    let scanner = IntegrityScanner::new(ScanConfig::default());
    scanner.scan(&root, &store).unwrap();

    fs::remove_file(root.join("sub/gone.txt")).unwrap();
    scanner.scan(&root, &store).unwrap();

    // Scans never delete.
    assert_eq!(store.total_rows().unwrap(), 2);

    let missing = Analyzer::new(&store).missing().unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].filename, "gone.txt");
    assert_eq!(missing[0].full_path(), root.join("sub/gone.txt"));
}

#[test]
fn test_removed_directory_flags_all_children() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir(root.join("album")).unwrap();
    for i in 0..3 {
        fs::write(root.join(format!("album/{i}.jpg")), format!("{i}")).unwrap();
    }

    let store = IntegrityStore::open_in_memory().unwrap();
    IntegrityScanner::new(ScanConfig::default())
        .scan(&root, &store)
        .unwrap();
    fs::remove_dir_all(root.join("album")).unwrap();

    let analyzer = Analyzer::new(&store);
    let missing = analyzer.missing().unwrap();
    assert_eq!(missing.len(), 3);

    assert_eq!(purge_records(&store, &missing).unwrap(), 3);
    assert_eq!(store.total_rows().unwrap(), 0);

    // Purging the same records again is a no-op.
    assert_eq!(purge_records(&store, &missing).unwrap(), 0);
}

#[test]
fn test_purged_file_returns_with_new_baseline() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let file = root.join("doc.txt");
    fs::write(&file, "first").unwrap();

    let store = IntegrityStore::open_in_memory().unwrap();
    let scanner = IntegrityScanner::new(ScanConfig::default());
    scanner.scan(&root, &store).unwrap();
    let root_key = root.to_string_lossy().into_owned();
    let original = store.get(&root_key, "doc.txt").unwrap().unwrap();

    fs::remove_file(&file).unwrap();
    let missing = Analyzer::new(&store).missing().unwrap();
    purge_records(&store, &missing).unwrap();

    fs::write(&file, "second").unwrap();
    let summary = scanner.scan(&root, &store).unwrap();
    assert_eq!(summary.inserted, 1);

    let fresh = store.get(&root_key, "doc.txt").unwrap().unwrap();
    assert_ne!(fresh.base_hash_strong, original.base_hash_strong);
    assert!(!fresh.is_drifted());
}

#[test]
fn test_existing_decomposed_name_is_not_missing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("re\u{301}sume\u{301}.pdf"), "cv").unwrap();

    let store = IntegrityStore::open_in_memory().unwrap();
    IntegrityScanner::new(ScanConfig::default())
        .scan(&root, &store)
        .unwrap();
    assert_eq!(store.total_rows().unwrap(), 1);

    let analyzer = Analyzer::new(&store);
    assert!(analyzer.missing().unwrap().is_empty());
    assert_eq!(purge_records(&store, &analyzer.missing().unwrap()).unwrap(), 0);
    assert_eq!(store.total_rows().unwrap(), 1);
}
