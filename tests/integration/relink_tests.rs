use dupelink::actions::{relink, LinkFs, RelinkError, Relinker, StdFs};
use dupelink::duplicates::{resolve, ResolveConfig};
use dupelink::scanner::{traverse, AcceptAll};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(root: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn ino(path: &Path) -> u64 {
    fs::symlink_metadata(path).unwrap().ino()
}

fn names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

/// Real filesystem that refuses to rename one particular path.
struct RefuseRename {
    path: PathBuf,
}

impl LinkFs for RefuseRename {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if from == self.path {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        StdFs.rename(from, to)
    }

    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        StdFs.hard_link(original, link)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        StdFs.remove_file(path)
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        StdFs.exists(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        StdFs.set_mode(path, mode)
    }
}

#[test]
fn test_relink_then_rescan_is_idempotent() {
    let dir = tempdir().unwrap();
    let x = vec![b'x'; 100];
    let f1 = write(dir.path(), "f1", &x);
    let f2 = write(dir.path(), "f2", &x);
    write(dir.path(), "f3", &[b'y'; 100]);

    let index = traverse(dir.path(), 60, &AcceptAll).unwrap();
    let resolution = resolve(&index, &ResolveConfig::default());
    let report = relink(&index, &resolution.registry, 0o222);

    assert!(report.is_complete());
    assert_eq!(report.linked_files(), 1);
    assert_eq!(report.bytes_reclaimed(), 100);
    assert_eq!(ino(&f1), ino(&f2));
    assert_eq!(fs::read(&f2).unwrap(), x);
    assert_eq!(names(dir.path()), BTreeSet::from(["f1".into(), "f2".into(), "f3".into()]));

    let rescanned = traverse(dir.path(), 60, &AcceptAll).unwrap();
    assert_eq!(rescanned.stats.known_links, 1);
    let again = resolve(&rescanned, &ResolveConfig::default());
    assert_eq!(again.registry.reclaimable_bytes(), 0);
    assert!(again.registry.is_empty());
}

#[test]
fn test_scenario_b_relink_keeps_existing_link() {
    let dir = tempdir().unwrap();
    let content = vec![5u8; 300];
    let f1 = write(dir.path(), "f1", &content);
    let f2 = dir.path().join("f2");
    fs::hard_link(&f1, &f2).unwrap();
    let f3 = write(dir.path(), "f3", &content);
    let before = ino(&f1);

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    let resolution = resolve(&index, &ResolveConfig::default());
    let report = relink(&index, &resolution.registry, 0);

    assert!(report.is_complete());
    assert_eq!(report.linked_files(), 1);
    assert_eq!(ino(&f1), before);
    assert_eq!(ino(&f2), before);
    assert_eq!(ino(&f3), before);
    assert_eq!(fs::metadata(&f1).unwrap().nlink(), 3);
}

#[test]
fn test_target_with_several_names_is_fully_replaced() {
    let dir = tempdir().unwrap();
    let content = vec![8u8; 128];
    let rep = write(dir.path(), "a", &content);
    let target = write(dir.path(), "b", &content);
    let target_alias = dir.path().join("c");
    fs::hard_link(&target, &target_alias).unwrap();

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    let resolution = resolve(&index, &ResolveConfig::default());
    let report = relink(&index, &resolution.registry, 0);

    assert_eq!(report.linked_files(), 2);
    assert_eq!(report.bytes_reclaimed(), 128);
    assert_eq!(ino(&target), ino(&rep));
    assert_eq!(ino(&target_alias), ino(&rep));
}

#[test]
fn test_quarantine_failure_rolls_back_group_only() {
    let dir = tempdir().unwrap();
    let a1 = write(dir.path(), "a1", &[1u8; 10]);
    let a2 = write(dir.path(), "a2", &[1u8; 10]);
    let a3 = write(dir.path(), "a3", &[1u8; 10]);
    let b1 = write(dir.path(), "b1", &[2u8; 20]);
    let b2 = write(dir.path(), "b2", &[2u8; 20]);
    let before: Vec<u64> = [&a1, &a2, &a3].iter().map(|p| ino(p)).collect();
    let listing = names(dir.path());

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    let resolution = resolve(&index, &ResolveConfig::default());
    assert_eq!(resolution.registry.len(), 2);

    let fs_seam = RefuseRename { path: a3.clone() };
    let report = Relinker::new(&index)
        .with_fs(&fs_seam)
        .with_clear_bits(0)
        .run(&resolution.registry);

    assert_eq!(report.abandoned_groups(), 1);
    assert!(report.groups[0].abandoned);
    assert!(matches!(
        report.groups[0].errors[0],
        RelinkError::Quarantine { .. }
    ));
    let after: Vec<u64> = [&a1, &a2, &a3].iter().map(|p| ino(p)).collect();
    assert_eq!(before, after);
    assert_eq!(names(dir.path()), listing);

    assert!(report.groups[1].is_complete());
    assert_eq!(ino(&b1), ino(&b2));
    assert!(!report.is_complete());
}

#[test]
fn test_permission_bits_cleared_on_representative() {
    let dir = tempdir().unwrap();
    let rep = write(dir.path(), "a", &[4u8; 64]);
    let other = write(dir.path(), "b", &[4u8; 64]);
    fs::set_permissions(&rep, fs::Permissions::from_mode(0o664)).unwrap();

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    let resolution = resolve(&index, &ResolveConfig::default());
    let report = relink(&index, &resolution.registry, 0o222);

    assert!(report.is_complete());
    let mode = fs::metadata(&other).unwrap().permissions().mode() & 0o7777;
    assert_eq!(mode, 0o444);
}
