//! Append-only storage for path component names.
//!
//! Every directory entry discovered during traversal contributes one base
//! name. Storing each as its own `OsString` costs an allocation per entry,
//! which adds up on trees with millions of files. The [`NameArena`] packs all
//! names into one growable byte buffer and hands out small [`NameHandle`]s.
//!
//! Names are never removed: the arena lives for the whole run and is only
//! read after traversal finishes.
//!
//! # Example
//!
//! ```
//! use dupelink::scanner::arena::NameArena;
//! use std::ffi::OsStr;
//!
//! let mut arena = NameArena::new();
//! let a = arena.intern(OsStr::new("photos"));
//! let b = arena.intern(OsStr::new("2019"));
//!
//! assert_eq!(arena.get(a), OsStr::new("photos"));
//! assert_eq!(arena.get(b), OsStr::new("2019"));
//! assert_eq!(arena.len(), 2);
//! ```

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

/// Handle to a name stored in a [`NameArena`].
///
/// Handles are only meaningful for the arena that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameHandle {
    start: usize,
    len: usize,
}

impl NameHandle {
    /// Length of the referenced name in bytes.
    #[must_use]
    pub fn byte_len(self) -> usize {
        self.len
    }
}

/// Append-only byte pool of path component names.
#[derive(Debug, Default)]
pub struct NameArena {
    bytes: Vec<u8>,
    count: usize,
}

impl NameArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena with room for `bytes` bytes of names.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            count: 0,
        }
    }

    /// Store a name and return its handle.
    pub fn intern(&mut self, name: &OsStr) -> NameHandle {
        let raw = name.as_bytes();
        let start = self.bytes.len();
        self.bytes.extend_from_slice(raw);
        self.count += 1;
        NameHandle {
            start,
            len: raw.len(),
        }
    }

    /// Resolve a handle back to the stored name.
    #[must_use]
    pub fn get(&self, handle: NameHandle) -> &OsStr {
        OsStr::from_bytes(&self.bytes[handle.start..handle.start + handle.len])
    }

    /// Number of names stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if no names have been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total bytes held by the pool.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}
