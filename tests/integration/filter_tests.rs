use dupelink::duplicates::{resolve, ResolveConfig};
use dupelink::scanner::{traverse, DirectoryFilter, GlobFilter};
use std::ffi::OsStr;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_ignored_directories_are_not_descended() {
    let dir = tempdir().unwrap();
    for sub in [".git", "cache-1", "keep"] {
        fs::create_dir(dir.path().join(sub)).unwrap();
        fs::write(dir.path().join(sub).join("blob"), vec![6u8; 100]).unwrap();
    }

    let filter = GlobFilter::new(&[".git".to_string(), "cache-*".to_string()]).unwrap();
    let index = traverse(dir.path(), 1, &filter).unwrap();

    assert_eq!(index.stats.ignored_dirs, 2);
    assert_eq!(index.stats.regular_files, 1);
    assert!(resolve(&index, &ResolveConfig::default()).registry.is_empty());
}

#[test]
fn test_filter_applies_to_base_names_only() {
    let filter = GlobFilter::new(&["build".to_string()]).unwrap();
    assert!(!filter.accept(OsStr::new("build")));
    assert!(filter.accept(OsStr::new("builder")));
    assert!(filter.accept(OsStr::new("src")));
}

#[test]
fn test_ignored_name_at_root_is_still_scanned() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("cache");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a"), vec![1u8; 10]).unwrap();
    fs::write(root.join("b"), vec![1u8; 10]).unwrap();

    let filter = GlobFilter::new(&["cache".to_string()]).unwrap();
    let index = traverse(&root, 1, &filter).unwrap();

    assert_eq!(index.stats.regular_files, 2);
    assert_eq!(resolve(&index, &ResolveConfig::default()).registry.len(), 1);
}

#[test]
fn test_invalid_pattern_is_rejected() {
    assert!(GlobFilter::new(&["a[".to_string()]).is_err());
}
