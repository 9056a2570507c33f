use dupelink::duplicates::{checksum_bytes, reclaimable_bytes, resolve, ResolveConfig};
use dupelink::scanner::{traverse, AcceptAll, ScanIndex};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn group_paths(index: &ScanIndex, config: &ResolveConfig) -> Vec<BTreeSet<PathBuf>> {
    resolve(index, config)
        .registry
        .groups()
        .iter()
        .map(|g| g.members.iter().map(|&m| index.path(m)).collect())
        .collect()
}

fn write(root: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_scenario_a() {
    let dir = tempdir().unwrap();
    let x = vec![b'x'; 100];
    let f1 = write(dir.path(), "f1", &x);
    let f2 = write(dir.path(), "f2", &x);
    write(dir.path(), "f3", &[b'y'; 100]);
    write(dir.path(), "f4", &x[..50]);

    let index = traverse(dir.path(), 60, &AcceptAll).unwrap();
    let resolution = resolve(&index, &ResolveConfig::default());

    let groups: Vec<BTreeSet<PathBuf>> = resolution
        .registry
        .groups()
        .iter()
        .map(|g| g.members.iter().map(|&m| index.path(m)).collect())
        .collect();
    assert_eq!(groups, vec![BTreeSet::from([f1, f2])]);
    assert_eq!(reclaimable_bytes(&resolution.registry), 100);
}

#[test]
fn test_scenario_b_resolution() {
    let dir = tempdir().unwrap();
    let content = vec![9u8; 500];
    let f1 = write(dir.path(), "f1", &content);
    let f2 = dir.path().join("f2");
    fs::hard_link(&f1, &f2).unwrap();
    let f3 = write(dir.path(), "f3", &content);

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    assert_eq!(index.stats.known_links, 1);

    let resolution = resolve(&index, &ResolveConfig::default());
    let groups = resolution.registry.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(index.path(groups[0].representative()), f1);
    assert_eq!(index.path(groups[0].others()[0]), f3);
    assert_eq!(resolution.registry.reclaimable_bytes(), 500);
}

#[test]
fn test_engineered_checksum_collision_is_not_a_duplicate() {
    // A single step whose first five words are zero checksums to
    // w5.rotate_right(11) + w5 - w6.
    let zeros = [0u8; 56];
    let mut twin = [0u8; 56];
    twin[40..48].copy_from_slice(&1u64.to_le_bytes());
    twin[48..56].copy_from_slice(&((1u64 << 53) + 1).to_le_bytes());
    assert_eq!(checksum_bytes(&zeros), checksum_bytes(&twin));
    assert_ne!(zeros, twin);

    let mut other = [0u8; 56];
    other[0] = 1;
    assert_ne!(checksum_bytes(&other), checksum_bytes(&zeros));

    let dir = tempdir().unwrap();
    write(dir.path(), "a", &zeros);
    write(dir.path(), "b", &twin);
    write(dir.path(), "c", &other);

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    for exact in [true, false] {
        let config = ResolveConfig::default().with_exact(exact);
        let resolution = resolve(&index, &config);
        assert!(resolution.registry.is_empty());
        assert_eq!(resolution.stats.checksummed_files, 3);
        assert!(resolution.stats.disk_compares >= 1);
    }
}

#[test]
fn test_collision_pair_with_a_real_duplicate() {
    let zeros = [0u8; 56];
    let mut twin = [0u8; 56];
    twin[40..48].copy_from_slice(&1u64.to_le_bytes());
    twin[48..56].copy_from_slice(&((1u64 << 53) + 1).to_le_bytes());

    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", &zeros);
    write(dir.path(), "b", &twin);
    let c = write(dir.path(), "c", &zeros);

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    let groups = group_paths(&index, &ResolveConfig::default());
    assert_eq!(groups, vec![BTreeSet::from([a, c])]);
}

#[test]
fn test_rounds_zero_pair_is_compared() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"same bytes");
    write(dir.path(), "b", b"same bytes");
    write(dir.path(), "c", b"diff bytes");
    write(dir.path(), "d", b"other size!");
    write(dir.path(), "e", b"other size?");

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    let config = ResolveConfig::default().with_checksum_rounds(0);
    let resolution = resolve(&index, &config);

    // Size 10 has three members and is only reported, size 11 is a pair
    assert!(resolution.registry.is_empty());
    assert_eq!(resolution.registry.collisions().len(), 1);
    assert_eq!(resolution.registry.collisions()[0].members.len(), 3);
    assert!(resolution.registry.collisions()[0].checksum.is_none());
    assert_eq!(resolution.stats.checksummed_files, 0);
}

#[test]
fn test_groups_follow_size_order() {
    let dir = tempdir().unwrap();
    for name in ["big1", "big2"] {
        write(dir.path(), name, &[1u8; 300]);
    }
    for name in ["small1", "small2", "small3"] {
        write(dir.path(), name, &[2u8; 30]);
    }

    let index = traverse(dir.path(), 1, &AcceptAll).unwrap();
    let resolution = resolve(&index, &ResolveConfig::default().with_io_threads(2));

    let sizes: Vec<u64> = resolution
        .registry
        .groups()
        .iter()
        .map(|g| g.class.size)
        .collect();
    assert_eq!(sizes, vec![30, 300]);
    assert_eq!(resolution.registry.duplicate_count(), 5);
    assert_eq!(resolution.registry.reclaimable_bytes(), 2 * 30 + 300);
}
