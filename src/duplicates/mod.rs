//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Whole-file checksums as a cheap candidate filter
//! - Memoized full-content comparison
//! - Congruence partitioning of candidate buckets
//! - Per size-class resolution into verified duplicate groups

pub mod checksum;
pub mod compare;
pub mod partition;
pub mod registry;
pub mod resolver;

use std::io::{ErrorKind, Read};

pub use checksum::{checksum_bytes, checksum_file, ChecksumError};
pub use compare::{compare_files, ComparatorCache, CompareError};
pub use registry::{reclaimable_bytes, CollisionNotice, DuplicateGroup, DuplicateRegistry};
pub use resolver::{resolve, ResolveConfig, ResolveStats, Resolution, Resolver};

/// Fill `buf` as far as the reader allows, retrying interrupted reads.
///
/// Returns fewer bytes than `buf.len()` only at end of input.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
