//! Filesystem object identity and size-class keys.
//!
//! # Overview
//!
//! Hard links are multiple directory entries pointing to the same inode.
//! They are the same object, not duplicates of each other. The traverser
//! records every object under its [`IdentityKey`] (device, inode) so that:
//!
//! - the second and later names of an object are recognised as known hard
//!   links and never traversed or resolved again, and
//! - the hard-linker can later find *every* name of an object it replaces.
//!
//! The [`SizeClass`] key (size, device) buckets regular files that could
//! possibly be duplicates. Files on different devices never share a bucket
//! because hard links cannot cross filesystems.

use std::collections::HashMap;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

use super::arena::NameHandle;
use super::tree::{NodeId, NodeStore};

/// Unique identifier of one filesystem object: `(st_dev, st_ino)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    /// Device id
    pub dev: u64,
    /// Object (inode) id
    pub ino: u64,
}

impl IdentityKey {
    /// Create an identity key from its parts.
    #[must_use]
    pub const fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    /// Read the identity of an object from (non-following) metadata.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }
}

/// Coarse duplicate-candidate bucket: files of one size on one device.
///
/// Ordering is by size first, then device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SizeClass {
    /// File size in bytes
    pub size: u64,
    /// Device id
    pub dev: u64,
}

impl SizeClass {
    /// Create a size class.
    #[must_use]
    pub const fn new(size: u64, dev: u64) -> Self {
        Self { size, dev }
    }

    /// Identity key of a member of this class.
    #[must_use]
    pub const fn identity_of(self, ino: u64) -> IdentityKey {
        IdentityKey::new(self.dev, ino)
    }
}

/// A further name of an already known object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    /// Directory holding the name
    pub parent: NodeId,
    /// The name itself
    pub name: NameHandle,
}

/// Everything known about one object: its node and its other names.
#[derive(Debug, Clone)]
pub struct IdentityEntry {
    /// Node created at first encounter
    pub node: NodeId,
    /// Names discovered afterwards, in discovery order
    pub aliases: Vec<Alias>,
}

/// Index from identity key to the object's node and names.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    entries: HashMap<IdentityKey, IdentityEntry>,
}

impl IdentityIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Node owning `key`, if the object has been seen.
    #[must_use]
    pub fn node_of(&self, key: &IdentityKey) -> Option<NodeId> {
        self.entries.get(key).map(|e| e.node)
    }

    /// Full entry for `key`.
    #[must_use]
    pub fn get(&self, key: &IdentityKey) -> Option<&IdentityEntry> {
        self.entries.get(key)
    }

    /// Register the node created for a newly seen object.
    ///
    /// Returns `false` (and changes nothing) if the key was already known.
    pub fn insert(&mut self, key: IdentityKey, node: NodeId) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            IdentityEntry {
                node,
                aliases: Vec::new(),
            },
        );
        true
    }

    /// Record another name of a known object. Returns the owning node.
    pub fn add_alias(&mut self, key: &IdentityKey, alias: Alias) -> Option<NodeId> {
        let entry = self.entries.get_mut(key)?;
        entry.aliases.push(alias);
        Some(entry.node)
    }

    /// Every known path of the object: the node's path, then its aliases.
    #[must_use]
    pub fn paths(&self, key: &IdentityKey, store: &NodeStore) -> Vec<PathBuf> {
        let Some(entry) = self.entries.get(key) else {
            return Vec::new();
        };
        let mut paths = Vec::with_capacity(1 + entry.aliases.len());
        paths.push(store.path(entry.node));
        paths.extend(
            entry
                .aliases
                .iter()
                .map(|a| store.child_path(a.parent, a.name)),
        );
        paths
    }

    /// Number of distinct objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no objects are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
