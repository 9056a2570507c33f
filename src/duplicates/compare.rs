//! Streaming byte comparison and its memoizing cache.
//!
//! [`compare_files`] defines a total order over file contents: the common
//! prefix is compared lexicographically and, if equal, the shorter file sorts
//! first. Equal means byte-identical.
//!
//! [`ComparatorCache`] remembers the result for every unordered pair of
//! bucket members so that each pair is read from disk at most once, however
//! often sorting asks about it.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::read_full;
use crate::progress::ProgressSink;

/// Buffer size used for each side of a comparison.
pub const COMPARE_BUFFER_SIZE: usize = 512 * 1024;

/// Which of the two compared files failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The left-hand file
    First,
    /// The right-hand file
    Second,
}

/// A read failure while comparing two files.
#[derive(thiserror::Error, Debug)]
#[error("Cannot read '{path}': {source}")]
pub struct CompareError {
    /// Side that failed
    pub side: Side,
    /// Path of the failing file
    pub path: PathBuf,
    /// The underlying I/O error
    #[source]
    pub source: std::io::Error,
}

fn open(path: &Path, side: Side) -> Result<File, CompareError> {
    File::open(path).map_err(|source| CompareError {
        side,
        path: path.to_path_buf(),
        source,
    })
}

/// Compare two readers by content.
///
/// # Errors
///
/// Returns the first read error as `(side, error)`.
pub fn compare_readers<A: Read, B: Read>(
    first: &mut A,
    second: &mut B,
    progress: &dyn ProgressSink,
) -> Result<Ordering, (Side, std::io::Error)> {
    let mut buf1 = vec![0u8; COMPARE_BUFFER_SIZE];
    let mut buf2 = vec![0u8; COMPARE_BUFFER_SIZE];

    loop {
        let m1 = read_full(first, &mut buf1).map_err(|e| (Side::First, e))?;
        progress.tick(m1 as u64);
        let m2 = read_full(second, &mut buf2).map_err(|e| (Side::Second, e))?;
        progress.tick(m2 as u64);

        let common = m1.min(m2);
        match buf1[..common].cmp(&buf2[..common]) {
            Ordering::Equal => {}
            other => return Ok(other),
        }
        if m1 != m2 {
            return Ok(m1.cmp(&m2));
        }
        if m1 < COMPARE_BUFFER_SIZE {
            return Ok(Ordering::Equal);
        }
    }
}

/// Compare two files by content.
///
/// # Errors
///
/// Returns [`CompareError`] naming the file that could not be read.
pub fn compare_files(
    first: &Path,
    second: &Path,
    progress: &dyn ProgressSink,
) -> Result<Ordering, CompareError> {
    let mut f1 = open(first, Side::First)?;
    let mut f2 = open(second, Side::Second)?;

    compare_readers(&mut f1, &mut f2, progress).map_err(|(side, source)| CompareError {
        side,
        path: match side {
            Side::First => first.to_path_buf(),
            Side::Second => second.to_path_buf(),
        },
        source,
    })
}

/// A read failure attributed to one bucket member.
#[derive(Debug)]
pub struct FailedMember {
    /// Index of the member that could not be read
    pub member: usize,
    /// The comparison error
    pub error: CompareError,
}

/// Memoized content order over the members of one bucket.
///
/// Members are addressed by their index into the path slice.
pub struct ComparatorCache<'a> {
    paths: &'a [PathBuf],
    results: HashMap<(usize, usize), Ordering>,
    progress: &'a dyn ProgressSink,
    disk_compares: usize,
}

impl<'a> ComparatorCache<'a> {
    /// Create an empty cache for `paths`.
    #[must_use]
    pub fn new(paths: &'a [PathBuf], progress: &'a dyn ProgressSink) -> Self {
        Self {
            paths,
            results: HashMap::new(),
            progress,
            disk_compares: 0,
        }
    }

    /// Compare members `i` and `j`, reading from disk only on first request.
    ///
    /// # Errors
    ///
    /// Returns the failing member if either file cannot be read. Failures
    /// are not memoized.
    pub fn compare(&mut self, i: usize, j: usize) -> Result<Ordering, FailedMember> {
        if i == j {
            return Ok(Ordering::Equal);
        }
        if i > j {
            return self.compare(j, i).map(Ordering::reverse);
        }
        if let Some(&known) = self.results.get(&(i, j)) {
            return Ok(known);
        }

        self.disk_compares += 1;
        let result = compare_files(&self.paths[i], &self.paths[j], self.progress).map_err(
            |error| FailedMember {
                member: match error.side {
                    Side::First => i,
                    Side::Second => j,
                },
                error,
            },
        )?;
        self.results.insert((i, j), result);
        Ok(result)
    }

    /// Path of a member.
    #[must_use]
    pub fn path(&self, member: usize) -> &Path {
        &self.paths[member]
    }

    /// Number of comparisons that read from disk.
    #[must_use]
    pub fn disk_compares(&self) -> usize {
        self.disk_compares
    }
}
