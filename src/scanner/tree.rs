//! Tree node store with lazy path reconstruction.
//!
//! Each distinct filesystem object found during traversal gets exactly one
//! [`TreeNode`]. Nodes refer to their parent directory by [`NodeId`], an index
//! into the store, so a full path is only materialised when somebody asks
//! for it (reporting, checksumming, linking).
//!
//! The store owns the [`NameArena`] holding every base name, so handles and
//! node ids stay valid for as long as the store does.

use std::ffi::OsStr;
use std::path::PathBuf;

use super::arena::{NameArena, NameHandle};

/// Index of a node inside a [`NodeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in discovery order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One filesystem object as first discovered.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Base name (the traversal root stores the root path as given)
    pub name: NameHandle,
    /// Permission and type bits (`st_mode`)
    pub mode: u32,
    /// Object id (`st_ino`)
    pub ino: u64,
    /// Parent directory, `None` for the traversal root
    pub parent: Option<NodeId>,
    /// Further names resolving to this object seen after the first
    known_links: u32,
}

impl TreeNode {
    /// Number of additional names that resolved to this object.
    #[must_use]
    pub fn known_links(&self) -> u32 {
        self.known_links
    }
}

/// Arena of tree nodes plus the names they reference.
#[derive(Debug, Default)]
pub struct NodeStore {
    names: NameArena,
    nodes: Vec<TreeNode>,
}

impl NodeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name without creating a node (used for extra hard-link names).
    pub fn intern(&mut self, name: &OsStr) -> NameHandle {
        self.names.intern(name)
    }

    /// Append a node and return its id.
    ///
    /// A parent must already exist in this store.
    pub fn push(&mut self, name: &OsStr, mode: u32, ino: u64, parent: Option<NodeId>) -> NodeId {
        debug_assert!(parent.is_none_or(|p| p.0 < self.nodes.len()));
        let name = self.names.intern(name);
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            name,
            mode,
            ino,
            parent,
            known_links: 0,
        });
        id
    }

    /// Bump the known hard-link counter of an existing node.
    pub fn record_known_link(&mut self, id: NodeId) {
        self.nodes[id.0].known_links += 1;
    }

    /// Look up a node.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// Base name of a node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> &OsStr {
        self.names.get(self.nodes[id.0].name)
    }

    /// Resolve a name handle from this store's arena.
    #[must_use]
    pub fn resolve_name(&self, handle: NameHandle) -> &OsStr {
        self.names.get(handle)
    }

    /// Rebuild the full path of a node by walking its parent chain.
    #[must_use]
    pub fn path(&self, id: NodeId) -> PathBuf {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.nodes[node.0].parent;
        }

        let mut path = PathBuf::new();
        for node in chain.into_iter().rev() {
            path.push(self.name(node));
        }
        path
    }

    /// Path of a name living directly inside directory `parent`.
    #[must_use]
    pub fn child_path(&self, parent: NodeId, name: NameHandle) -> PathBuf {
        let mut path = self.path(parent);
        path.push(self.names.get(name));
        path
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the store holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate node ids in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
}
