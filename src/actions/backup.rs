//! Quarantine (backup) name generation.
//!
//! A target is moved aside to `<dir>/<base>.bak.<token>` before being
//! replaced. The base name is truncated so the result fits in one path
//! component, and the 8-hex-digit token is drawn from a seeded [`StdRng`].
//! A candidate is only used if nothing exists under that name yet.

use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::relink::{LinkFs, RelinkError};

/// Longest base name kept in a backup name (255 minus `.bak.xxxxxxxx`).
pub const BACKUP_MAX_BASE: usize = 242;

/// Candidates tried before giving up on a path.
pub const BACKUP_MAX_ATTEMPTS: u32 = 1024;

/// Generator of collision-checked backup names.
#[derive(Debug, Clone)]
pub struct BackupNamer {
    rng: StdRng,
}

impl Default for BackupNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupNamer {
    /// Create a namer seeded from the operating system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a namer with a fixed seed, producing a reproducible sequence.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn next_token(&mut self) -> u32 {
        self.rng.gen()
    }

    /// Candidate backup path for `path` with a given token.
    #[must_use]
    pub fn candidate(path: &Path, token: u32) -> PathBuf {
        let base = path.file_name().map(OsStrExt::as_bytes).unwrap_or_default();
        let mut name = base[..base.len().min(BACKUP_MAX_BASE)].to_vec();
        name.extend_from_slice(format!(".bak.{token:08x}").as_bytes());
        path.with_file_name(OsString::from_vec(name))
    }

    /// Find a backup path for `path` under which nothing exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`RelinkError::Probe`] if a candidate cannot be checked and
    /// [`RelinkError::NoBackupName`] if every attempt was taken.
    pub fn backup_name(&mut self, path: &Path, fs: &dyn LinkFs) -> Result<PathBuf, RelinkError> {
        for _ in 0..BACKUP_MAX_ATTEMPTS {
            let candidate = Self::candidate(path, self.next_token());
            match fs.exists(&candidate) {
                Ok(false) => return Ok(candidate),
                Ok(true) => {
                    log::trace!("Backup name taken: {}", candidate.display());
                }
                Err(source) => {
                    return Err(RelinkError::Probe {
                        path: candidate,
                        source,
                    })
                }
            }
        }
        Err(RelinkError::NoBackupName(path.to_path_buf()))
    }
}
