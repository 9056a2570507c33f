//! Replace duplicate files by hard links to one representative.
//!
//! # Protocol
//!
//! Each [`DuplicateGroup`] is handled on its own. The targets are every
//! known name of every non-representative member, hard links found during
//! traversal included.
//!
//! 1. **Quarantine**: each target is renamed to a fresh backup name in its
//!    own directory. If any rename fails, the targets already moved are
//!    renamed back in reverse order and the group is abandoned.
//! 2. **Link**: the representative is hard-linked to each original target
//!    path and the backup is removed. If linking fails the backup is
//!    renamed back, and the remaining targets are still attempted.
//! 3. **Permission clear**: the representative's mode loses `clear_bits`.
//!
//! Between any two filesystem calls each target path holds its original
//! content, a link to the representative, or (only while quarantined) is
//! absent with its content kept under a unique backup name.
//!
//! Filesystem calls go through [`LinkFs`] so failures can be injected.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::backup::BackupNamer;
use crate::duplicates::{DuplicateGroup, DuplicateRegistry};
use crate::progress::{NoProgress, ProgressSink, PHASE_RELINKING};
use crate::scanner::ScanIndex;

/// Filesystem operations the hard-linker needs.
pub trait LinkFs {
    /// Rename `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Create `link` as a new name of `original`.
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()>;
    /// Remove one name.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    /// Check whether anything exists under `path`, without following symlinks.
    fn exists(&self, path: &Path) -> io::Result<bool>;
    /// Set permission bits.
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// [`LinkFs`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl LinkFs for StdFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        fs::hard_link(original, link)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }
}

/// Error type for relink operations.
#[derive(Debug, Error)]
pub enum RelinkError {
    /// No free backup name was found.
    #[error("can't find backup name for '{0}'")]
    NoBackupName(PathBuf),

    /// Checking a backup candidate failed.
    #[error("can't check '{path}': {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Moving a target into quarantine failed.
    #[error("can't rename '{from}' to '{to}': {source}")]
    Quarantine {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Moving a quarantined target back during rollback failed.
    #[error("can't roll back '{from}' to '{to}': {source}")]
    Rollback {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Creating the hard link failed.
    #[error("can't link '{original}' to '{target}': {source}")]
    Link {
        original: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Restoring a target from its backup failed.
    #[error("can't restore '{from}' to '{to}': {source}")]
    Restore {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Removing the backup after linking failed.
    #[error("can't remove '{path}': {source}")]
    RemoveBackup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Clearing permission bits failed.
    #[error("can't chmod '{path}': {source}")]
    Chmod {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RelinkError {
    /// Get the path the error is about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NoBackupName(p)
            | Self::Probe { path: p, .. }
            | Self::RemoveBackup { path: p, .. }
            | Self::Chmod { path: p, .. } => p,
            Self::Quarantine { from: p, .. } | Self::Rollback { to: p, .. } => p,
            Self::Restore { to: p, .. } => p,
            Self::Link { target: p, .. } => p,
        }
    }
}

/// Result of relinking one group.
#[derive(Debug, Default)]
pub struct GroupReport {
    /// Representative path
    pub representative: PathBuf,
    /// Target paths now linked to the representative
    pub linked: Vec<PathBuf>,
    /// Target paths left with their original content
    pub kept: Vec<PathBuf>,
    /// Warnings raised for this group
    pub errors: Vec<RelinkError>,
    /// Quarantine failed and the group was rolled back
    pub abandoned: bool,
    /// Bytes freed by members whose every name was linked
    pub bytes_reclaimed: u64,
}

impl GroupReport {
    /// Check if every target was linked without any warning.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.abandoned && self.kept.is_empty() && self.errors.is_empty()
    }
}

/// Results of relinking a whole registry.
#[derive(Debug, Default)]
pub struct RelinkReport {
    /// Per-group outcome in registry order
    pub groups: Vec<GroupReport>,
}

impl RelinkReport {
    /// Number of names replaced by links.
    #[must_use]
    pub fn linked_files(&self) -> usize {
        self.groups.iter().map(|g| g.linked.len()).sum()
    }

    /// Number of groups rolled back.
    #[must_use]
    pub fn abandoned_groups(&self) -> usize {
        self.groups.iter().filter(|g| g.abandoned).count()
    }

    /// Number of warnings over all groups.
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.groups.iter().map(|g| g.errors.len()).sum()
    }

    /// Total bytes freed.
    #[must_use]
    pub fn bytes_reclaimed(&self) -> u64 {
        self.groups.iter().map(|g| g.bytes_reclaimed).sum()
    }

    /// Check if every group was fully linked.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.groups.iter().all(GroupReport::is_complete)
    }
}

/// Hard-linker over one scan index.
pub struct Relinker<'a> {
    index: &'a ScanIndex,
    fs: &'a dyn LinkFs,
    clear_bits: u32,
    namer: BackupNamer,
    progress: Arc<dyn ProgressSink>,
}

impl<'a> Relinker<'a> {
    /// Create a relinker using real filesystem calls.
    #[must_use]
    pub fn new(index: &'a ScanIndex) -> Self {
        Self {
            index,
            fs: &StdFs,
            clear_bits: 0,
            namer: BackupNamer::new(),
            progress: Arc::new(NoProgress),
        }
    }

    /// Use another filesystem implementation.
    #[must_use]
    pub fn with_fs(mut self, fs: &'a dyn LinkFs) -> Self {
        self.fs = fs;
        self
    }

    /// Permission bits cleared on each representative (`0` keeps the mode).
    #[must_use]
    pub fn with_clear_bits(mut self, bits: u32) -> Self {
        self.clear_bits = bits & 0o7777;
        self
    }

    /// Use a fixed backup name generator.
    #[must_use]
    pub fn with_namer(mut self, namer: BackupNamer) -> Self {
        self.namer = namer;
        self
    }

    /// Report reclaimed bytes to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Relink every group of `registry` in order.
    pub fn run(&mut self, registry: &DuplicateRegistry) -> RelinkReport {
        self.progress
            .on_phase_start(PHASE_RELINKING, registry.reclaimable_bytes());

        let mut report = RelinkReport::default();
        for group in registry.groups() {
            let group_report = self.relink_group(group);
            self.progress.tick(group.reclaimable());
            report.groups.push(group_report);
        }

        self.progress.on_phase_end(PHASE_RELINKING);
        log::debug!(
            "Relinked {} files, {} groups abandoned, {} warnings",
            report.linked_files(),
            report.abandoned_groups(),
            report.warnings()
        );
        report
    }

    /// Replace every other member of `group` by a link to its representative.
    pub fn relink_group(&mut self, group: &DuplicateGroup) -> GroupReport {
        let source = self.index.path(group.representative());
        let mut report = GroupReport {
            representative: source.clone(),
            ..GroupReport::default()
        };

        // (target, owning member slot)
        let mut targets: Vec<(PathBuf, usize)> = Vec::new();
        for (slot, &member) in group.others().iter().enumerate() {
            let key = self.index.identity_of(group.class, member);
            for path in self.index.identities.paths(&key, &self.index.store) {
                targets.push((path, slot));
            }
        }
        log::trace!(
            "Linking {} target(s) to '{}'",
            targets.len(),
            source.display()
        );

        let Some(backups) = self.quarantine(&targets, &mut report) else {
            report.abandoned = true;
            report.kept = targets.into_iter().map(|(p, _)| p).collect();
            return report;
        };

        let mut fully_linked = vec![true; group.others().len()];
        for ((target, slot), backup) in targets.into_iter().zip(backups) {
            match self.fs.hard_link(&source, &target) {
                Ok(()) => {
                    if let Err(e) = self.fs.remove_file(&backup) {
                        let err = RelinkError::RemoveBackup {
                            path: backup,
                            source: e,
                        };
                        log::warn!("Warning: {}", err);
                        report.errors.push(err);
                    }
                    report.linked.push(target);
                }
                Err(e) => {
                    let err = RelinkError::Link {
                        original: source.clone(),
                        target: target.clone(),
                        source: e,
                    };
                    log::warn!("Warning: {}", err);
                    report.errors.push(err);

                    if let Err(e) = self.fs.rename(&backup, &target) {
                        let err = RelinkError::Restore {
                            from: backup,
                            to: target.clone(),
                            source: e,
                        };
                        log::warn!("Warning: {}", err);
                        report.errors.push(err);
                    }
                    fully_linked[slot] = false;
                    report.kept.push(target);
                }
            }
        }

        let linked_members = fully_linked.iter().filter(|&&ok| ok).count() as u64;
        report.bytes_reclaimed = linked_members * group.class.size;

        if self.clear_bits != 0 {
            let mode = self.index.store.get(group.representative()).mode & 0o7777 & !self.clear_bits;
            if let Err(e) = self.fs.set_mode(&source, mode) {
                let err = RelinkError::Chmod {
                    path: source.clone(),
                    source: e,
                };
                log::warn!("Warning: {}", err);
                report.errors.push(err);
            }
        }

        report
    }

    /// Move every target aside. On failure, undo and return `None`.
    fn quarantine(
        &mut self,
        targets: &[(PathBuf, usize)],
        report: &mut GroupReport,
    ) -> Option<Vec<PathBuf>> {
        let mut backups: Vec<PathBuf> = Vec::with_capacity(targets.len());

        for (target, _) in targets {
            let moved = self
                .namer
                .backup_name(target, self.fs)
                .and_then(|backup| match self.fs.rename(target, &backup) {
                    Ok(()) => Ok(backup),
                    Err(source) => Err(RelinkError::Quarantine {
                        from: target.clone(),
                        to: backup,
                        source,
                    }),
                });

            match moved {
                Ok(backup) => backups.push(backup),
                Err(err) => {
                    log::warn!("Skipping: {}", err);
                    report.errors.push(err);
                    self.roll_back(targets, backups, report);
                    return None;
                }
            }
        }

        Some(backups)
    }

    fn roll_back(
        &self,
        targets: &[(PathBuf, usize)],
        backups: Vec<PathBuf>,
        report: &mut GroupReport,
    ) {
        for (backup, (target, _)) in backups.into_iter().zip(targets).rev() {
            if let Err(source) = self.fs.rename(&backup, target) {
                let err = RelinkError::Rollback {
                    from: backup,
                    to: target.clone(),
                    source,
                };
                log::warn!("Furthermore, {}", err);
                report.errors.push(err);
            }
        }
    }
}

/// Relink every group of `registry` with real filesystem calls.
///
/// `clear_bits` are removed from each representative's mode afterwards;
/// pass `0` to leave modes alone.
#[must_use]
pub fn relink(index: &ScanIndex, registry: &DuplicateRegistry, clear_bits: u32) -> RelinkReport {
    Relinker::new(index).with_clear_bits(clear_bits).run(registry)
}
