use dupelink::scanner::{traverse, AcceptAll, IdentityKey, ScanError};
use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();

    assert_eq!(index.stats.regular_files, 0);
    assert_eq!(index.stats.eligible_files, 0);
    assert!(index.size_classes.is_empty());
    assert_eq!(index.store.len(), 1);
}

#[test]
fn test_every_path_reconstructs() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
    fs::create_dir_all(dir.path().join("d")).unwrap();
    fs::write(dir.path().join("top"), b"1").unwrap();
    fs::write(dir.path().join("a/one"), b"22").unwrap();
    fs::write(dir.path().join("a/b/c/deep"), b"333").unwrap();
    fs::write(dir.path().join("d/with space"), b"4444").unwrap();

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();

    let found: BTreeSet<PathBuf> = index
        .store
        .ids()
        .map(|id| index.store.path(id))
        .collect();
    for expected in [
        "",
        "top",
        "a",
        "a/one",
        "a/b",
        "a/b/c",
        "a/b/c/deep",
        "d",
        "d/with space",
    ] {
        let path = if expected.is_empty() {
            dir.path().to_path_buf()
        } else {
            dir.path().join(expected)
        };
        assert!(found.contains(&path), "missing {}", path.display());
        assert!(fs::symlink_metadata(&path).is_ok());
    }
    assert_eq!(index.stats.directories, 5);
    assert_eq!(index.stats.regular_files, 4);
}

#[test]
fn test_preexisting_hard_link_is_known() {
    let dir = tempdir().unwrap();
    let f1 = dir.path().join("f1");
    let f2 = dir.path().join("f2");
    fs::write(&f1, vec![7u8; 200]).unwrap();
    fs::hard_link(&f1, &f2).unwrap();

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();

    assert_eq!(index.stats.known_links, 1);
    assert_eq!(index.stats.eligible_files, 1);

    let meta = fs::metadata(&f1).unwrap();
    let key = IdentityKey::new(meta.dev(), meta.ino());
    let paths = index.identities.paths(&key, &index.store);
    assert_eq!(paths, vec![f1, f2]);
}

#[test]
fn test_files_below_minimum_are_not_candidates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("small1"), vec![1u8; 10]).unwrap();
    fs::write(dir.path().join("small2"), vec![1u8; 10]).unwrap();
    fs::write(dir.path().join("big"), vec![1u8; 100]).unwrap();

    let index = traverse(dir.path(), 60, &AcceptAll).unwrap();

    assert_eq!(index.stats.regular_files, 3);
    assert_eq!(index.stats.small_files, 2);
    assert_eq!(index.stats.eligible_files, 1);
    assert_eq!(index.stats.eligible_bytes, 100);
    assert_eq!(index.candidate_classes(), 0);
}

#[test]
fn test_unreadable_subtree_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden"), b"secret").unwrap();
    fs::write(dir.path().join("visible"), b"public").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&locked).is_ok() {
        // Running with privileges that ignore permission bits
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = traverse(dir.path(), 1, &AcceptAll);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let index = result.unwrap();
    assert_eq!(index.stats.regular_files, 1);
    assert!(index.stats.errors >= 1);
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let result = traverse(&dir.path().join("nope"), 1, &AcceptAll);
    assert!(matches!(result, Err(ScanError::NotFound(_))));
}

#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("file"), vec![3u8; 100]).unwrap();
    std::os::unix::fs::symlink(&sub, dir.path().join("loop")).unwrap();
    std::os::unix::fs::symlink(sub.join("file"), dir.path().join("alias")).unwrap();

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();

    assert_eq!(index.stats.regular_files, 1);
    assert_eq!(index.stats.other_entries, 2);
    assert_eq!(index.stats.eligible_files, 1);
}
