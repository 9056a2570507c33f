//! Directory traverser building the node store and candidate indexes.
//!
//! # Overview
//!
//! The [`Traverser`] walks a tree once, depth-first and pre-order, without
//! following symbolic links. Siblings are visited sorted by file name so the
//! first-discovered member of a duplicate group is reproducible.
//!
//! Every directory and regular file gets exactly one [`TreeNode`] per
//! [`IdentityKey`]. Later names of an already known object only bump its
//! hard-link counter and are remembered as aliases. A directory reached
//! through such a name is never descended again.
//!
//! Regular files of at least `min_size` bytes are bucketed by [`SizeClass`],
//! in discovery order, for the resolver.
//!
//! # Errors
//!
//! Only a root that cannot be enumerated is fatal. Unreadable entries and
//! subdirectories are logged, counted in [`TraversalStats::errors`] and
//! skipped; their siblings are still visited.
//!
//! # Example
//!
//! ```no_run
//! use dupelink::scanner::{traverse, AcceptAll};
//! use std::path::Path;
//!
//! let index = traverse(Path::new("/srv/backup"), 100_000, &AcceptAll).unwrap();
//! println!(
//!     "{} eligible files in {} size classes",
//!     index.stats.eligible_files,
//!     index.size_classes.len()
//! );
//! ```
//!
//! [`TreeNode`]: super::tree::TreeNode

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::filter::{AcceptAll, DirectoryFilter};
use super::identity::{Alias, IdentityIndex, IdentityKey, SizeClass};
use super::tree::{NodeId, NodeStore};
use super::ScanError;
use crate::progress::{ProgressSink, PHASE_WALKING};

/// Counters gathered while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TraversalStats {
    /// Entries below the root whose metadata could be read
    pub entries: usize,
    /// Directories descended into, root included
    pub directories: usize,
    /// Regular files seen for the first time
    pub regular_files: usize,
    /// Entries that are neither directory nor regular file (symlinks, fifos, ...)
    pub other_entries: usize,
    /// Directories rejected by the filter
    pub ignored_dirs: usize,
    /// Names resolving to an already known object
    pub known_links: usize,
    /// Regular files inserted into the size-class index
    pub eligible_files: usize,
    /// Total size of eligible files
    pub eligible_bytes: u64,
    /// Regular files below the minimum size
    pub small_files: usize,
    /// Entries or subtrees skipped because of an I/O error
    pub errors: usize,
}

/// Everything the traversal produced.
#[derive(Debug, Default)]
pub struct ScanIndex {
    /// Node store with all names
    pub store: NodeStore,
    /// Identity key to node and alias names
    pub identities: IdentityIndex,
    /// Eligible files per size class, each list in discovery order
    pub size_classes: BTreeMap<SizeClass, Vec<NodeId>>,
    /// Walk counters
    pub stats: TraversalStats,
}

impl ScanIndex {
    /// Identity key of a node in the given size class.
    #[must_use]
    pub fn identity_of(&self, class: SizeClass, node: NodeId) -> IdentityKey {
        class.identity_of(self.store.get(node).ino)
    }

    /// Full path of a node.
    #[must_use]
    pub fn path(&self, node: NodeId) -> PathBuf {
        self.store.path(node)
    }

    /// Number of size classes holding at least two files.
    #[must_use]
    pub fn candidate_classes(&self) -> usize {
        self.size_classes.values().filter(|v| v.len() > 1).count()
    }
}

/// Single-pass directory traverser.
pub struct Traverser<'a> {
    root: PathBuf,
    min_size: u64,
    filter: &'a dyn DirectoryFilter,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl<'a> Traverser<'a> {
    /// Create a traverser accepting every directory.
    #[must_use]
    pub fn new(root: &Path, min_size: u64) -> Self {
        Self {
            root: root.to_path_buf(),
            min_size,
            filter: &AcceptAll,
            progress: None,
        }
    }

    /// Use a directory filter for every directory below the root.
    #[must_use]
    pub fn with_filter(mut self, filter: &'a dyn DirectoryFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Report the size of every regular file found.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Check that the root exists, is a directory and can be listed.
    ///
    /// A root given as a symbolic link is followed, and the metadata
    /// returned is that of the directory it points to.
    fn check_root(&self) -> Result<Metadata, ScanError> {
        let metadata =
            std::fs::metadata(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        std::fs::read_dir(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        Ok(metadata)
    }

    /// Walk the tree and build the index.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the root cannot be enumerated.
    pub fn run(self) -> Result<ScanIndex, ScanError> {
        let mut root_metadata = Some(self.check_root()?);
        log::debug!(
            "Walking {} (minimum size {} bytes)",
            self.root.display(),
            self.min_size
        );

        if let Some(ref p) = self.progress {
            p.on_phase_start(PHASE_WALKING, 0);
        }

        let mut index = ScanIndex::default();
        let mut dir_stack: Vec<NodeId> = Vec::new();

        let mut walk = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walk.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    if err.depth() == 0 && err.path() == Some(self.root.as_path()) {
                        return Err(ScanError::RootUnreadable {
                            path: self.root.clone(),
                            source: io::Error::other(err.to_string()),
                        });
                    }
                    log::warn!("Skipping unreadable entry: {}", err);
                    index.stats.errors += 1;
                    continue;
                }
            };

            let depth = entry.depth();
            let is_dir_entry = entry.file_type().is_dir();

            // walkdir reports a symlinked root unfollowed, so the root keeps
            // the metadata checked above
            let stat = match root_metadata.take() {
                Some(m) if depth == 0 => Ok(m),
                _ => entry.metadata(),
            };
            let metadata = match stat {
                Ok(m) => m,
                Err(err) => {
                    if depth == 0 {
                        return Err(ScanError::RootUnreadable {
                            path: self.root.clone(),
                            source: io::Error::other(err.to_string()),
                        });
                    }
                    log::warn!("Cannot stat '{}': {}", entry.path().display(), err);
                    index.stats.errors += 1;
                    if is_dir_entry {
                        walk.skip_current_dir();
                    }
                    continue;
                }
            };

            dir_stack.truncate(depth);
            let parent = if depth == 0 {
                None
            } else {
                debug_assert_eq!(dir_stack.len(), depth);
                dir_stack.last().copied()
            };
            if depth > 0 {
                index.stats.entries += 1;
            }

            let file_type = metadata.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                index.stats.other_entries += 1;
                continue;
            }

            let key = IdentityKey::from_metadata(&metadata);
            if let (Some(owner), Some(parent)) = (index.identities.node_of(&key), parent) {
                index.store.record_known_link(owner);
                let name = index.store.intern(entry.file_name());
                index.identities.add_alias(&key, Alias { parent, name });
                index.stats.known_links += 1;
                log::trace!("Known hard link: {}", entry.path().display());
                if file_type.is_dir() {
                    walk.skip_current_dir();
                }
                continue;
            }

            let name = if depth == 0 {
                self.root.as_os_str()
            } else {
                entry.file_name()
            };
            let node = index
                .store
                .push(name, metadata.mode(), metadata.ino(), parent);
            index.identities.insert(key, node);

            if file_type.is_dir() {
                if depth > 0 && !self.filter.accept(entry.file_name()) {
                    index.stats.ignored_dirs += 1;
                    log::debug!("Ignoring {}", entry.path().display());
                    walk.skip_current_dir();
                    continue;
                }
                index.stats.directories += 1;
                dir_stack.push(node);
                continue;
            }

            index.stats.regular_files += 1;
            let size = metadata.len();
            if let Some(ref p) = self.progress {
                p.tick(size);
            }
            if size < self.min_size {
                index.stats.small_files += 1;
                continue;
            }

            index
                .size_classes
                .entry(SizeClass::new(size, metadata.dev()))
                .or_default()
                .push(node);
            index.stats.eligible_files += 1;
            index.stats.eligible_bytes += size;
        }

        if let Some(ref p) = self.progress {
            p.on_phase_end(PHASE_WALKING);
        }

        log::debug!(
            "Walk complete: {} entries, {} eligible files in {} size classes",
            index.stats.entries,
            index.stats.eligible_files,
            index.size_classes.len()
        );
        Ok(index)
    }
}

/// Walk `root` once and build the scan index.
///
/// Regular files smaller than `min_size` are recorded but not eligible for
/// resolution. Directories below the root are only descended into if
/// `filter` accepts their base name.
///
/// # Errors
///
/// Returns [`ScanError`] if the root is missing, not a directory or cannot
/// be listed.
pub fn traverse(
    root: &Path,
    min_size: u64,
    filter: &dyn DirectoryFilter,
) -> Result<ScanIndex, ScanError> {
    Traverser::new(root, min_size).with_filter(filter).run()
}
