//! Confirmed duplicate groups and their running totals.
//!
//! The registry is write-once: groups are appended in resolution order and
//! never removed. That order is what reports and the hard-linker see.

use crate::scanner::{NodeId, SizeClass};

/// A set of byte-identical files of one size class.
///
/// The first member is the representative every other member is linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Shared size class
    pub class: SizeClass,
    /// Members in discovery order, at least two
    pub members: Vec<NodeId>,
}

impl DuplicateGroup {
    /// Create a group.
    ///
    /// # Panics
    ///
    /// Debug assertion fails for fewer than two members.
    #[must_use]
    pub fn new(class: SizeClass, members: Vec<NodeId>) -> Self {
        debug_assert!(members.len() >= 2, "a duplicate group needs two members");
        Self { class, members }
    }

    /// The member kept as link source.
    #[must_use]
    pub fn representative(&self) -> NodeId {
        self.members[0]
    }

    /// Members replaced by links to the representative.
    #[must_use]
    pub fn others(&self) -> &[NodeId] {
        &self.members[1..]
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a registered group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Combined size of all members.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.class.size * self.members.len() as u64
    }

    /// Bytes freed by linking all but the representative.
    #[must_use]
    pub fn reclaimable(&self) -> u64 {
        self.class.size * (self.members.len() as u64).saturating_sub(1)
    }
}

/// A bucket that was not verified and is reported as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionNotice {
    /// Shared size class
    pub class: SizeClass,
    /// Checksum shared by the members, if one was computed
    pub checksum: Option<u64>,
    /// Unverified members
    pub members: Vec<NodeId>,
}

/// Accumulator of confirmed duplicate groups.
#[derive(Debug, Default)]
pub struct DuplicateRegistry {
    groups: Vec<DuplicateGroup>,
    collisions: Vec<CollisionNotice>,
    duplicate_count: usize,
    reclaimable: u64,
}

impl DuplicateRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a confirmed group and update totals.
    pub fn register(&mut self, group: DuplicateGroup) {
        self.duplicate_count += group.len();
        self.reclaimable += group.reclaimable();
        log::trace!(
            "Registered {} duplicates of {} bytes",
            group.len(),
            group.class.size
        );
        self.groups.push(group);
    }

    /// Record an unresolved collision.
    pub fn record_collision(&mut self, notice: CollisionNotice) {
        self.collisions.push(notice);
    }

    /// Groups in registration order.
    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Unresolved collisions in the order they were found.
    #[must_use]
    pub fn collisions(&self) -> &[CollisionNotice] {
        &self.collisions
    }

    /// Files in all groups, representatives included.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.duplicate_count
    }

    /// Sum over groups of `(members - 1) * size`.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.reclaimable
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if no group was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Bytes that linking every registered group would free.
#[must_use]
pub fn reclaimable_bytes(registry: &DuplicateRegistry) -> u64 {
    registry.reclaimable_bytes()
}
