//! Scanner module for directory traversal and identity tracking.
//!
//! This module provides functionality for:
//! - Compact storage of path component names
//! - A node store with one node per filesystem object
//! - Hard link detection by (device, inode)
//! - Size-class bucketing of duplicate candidates
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`arena`]: Append-only name storage
//! - [`tree`]: Node store and lazy path reconstruction
//! - [`identity`]: Identity keys, size classes and the identity index
//! - [`filter`]: Directory filters
//! - [`walker`]: Single-pass depth-first traversal
//!
//! # Example
//!
//! ```no_run
//! use dupelink::scanner::{traverse, GlobFilter};
//! use std::path::Path;
//!
//! let filter = GlobFilter::new(&[".git".to_string()]).unwrap();
//! let index = traverse(Path::new("."), 4096, &filter).unwrap();
//!
//! for (class, members) in &index.size_classes {
//!     println!("{} bytes: {} file(s)", class.size, members.len());
//! }
//! ```

pub mod arena;
pub mod filter;
pub mod identity;
pub mod tree;
pub mod walker;

use std::path::{Path, PathBuf};

// Re-export main types
pub use arena::{NameArena, NameHandle};
pub use filter::{AcceptAll, DirectoryFilter, FilterError, GlobFilter};
pub use identity::{Alias, IdentityIndex, IdentityKey, SizeClass};
pub use tree::{NodeId, NodeStore, TreeNode};
pub use walker::{traverse, ScanIndex, TraversalStats, Traverser};

/// Errors that end a traversal.
///
/// Problems below the root are logged and counted instead.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing the root.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root could not be enumerated.
    #[error("Cannot read directory {path}: {source}")]
    RootUnreadable {
        /// Root path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred while accessing the root.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error on `path`.
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
