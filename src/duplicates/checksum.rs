//! Fast non-cryptographic whole-file fingerprint.
//!
//! Files are streamed in blocks of [`BLOCK_STEPS`] steps. Each step folds
//! [`STEP_WORDS`] little-endian 64-bit words into three accumulators by
//! alternating add, xor and subtract on `a`, rotating `a` into `b` after
//! every word, and adding `b` into `c` at the end of the step. The final
//! partial step is zero-padded. The fingerprint is `c`.
//!
//! Collisions between different contents are expected now and then. The
//! value only narrows down candidates and is never taken as proof of
//! equality. Files with the same content but different trailing zero
//! padding collide by construction; they never share a size class.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::read_full;
use crate::progress::ProgressSink;

/// 64-bit words folded per step.
pub const STEP_WORDS: usize = 7;
/// Steps per read block.
pub const BLOCK_STEPS: usize = 256;

const STEP_BYTES: usize = STEP_WORDS * 8;
const BLOCK_BYTES: usize = BLOCK_STEPS * STEP_BYTES;

/// Errors computing a file checksum.
#[derive(thiserror::Error, Debug)]
pub enum ChecksumError {
    /// The file could not be opened.
    #[error("Cannot open '{path}': {source}")]
    Open {
        /// File path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading the file failed.
    #[error("Cannot read '{path}': {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Mixing state carried across steps.
#[derive(Debug, Clone, Copy, Default)]
struct State {
    a: u64,
    b: u64,
    c: u64,
}

impl State {
    #[inline]
    fn fold(&mut self) {
        self.b = self.b.rotate_right(11).wrapping_add(self.a);
    }

    #[inline]
    fn step(&mut self, w: &[u64; STEP_WORDS]) {
        self.a = self.a.wrapping_add(self.c);

        self.a = self.a.wrapping_add(w[0]);
        self.fold();
        self.a ^= w[1];
        self.fold();
        self.a = self.a.wrapping_sub(w[2]);
        self.fold();
        self.a ^= w[3];
        self.fold();
        self.a = self.a.wrapping_add(w[4]);
        self.fold();
        self.a ^= w[5];
        self.fold();
        self.a = self.a.wrapping_sub(w[6]);
        self.fold();

        self.c = self.c.wrapping_add(self.b);
    }

    fn block(&mut self, bytes: &[u8]) {
        let mut words = [0u64; STEP_WORDS];
        for step in bytes.chunks_exact(STEP_BYTES) {
            for (word, raw) in words.iter_mut().zip(step.chunks_exact(8)) {
                let mut le = [0u8; 8];
                le.copy_from_slice(raw);
                *word = u64::from_le_bytes(le);
            }
            self.step(&words);
        }
    }
}

/// Checksum everything `reader` yields, reporting bytes read to `progress`.
///
/// # Errors
///
/// Returns any read error other than `Interrupted`.
pub fn checksum_reader<R: Read>(
    reader: &mut R,
    progress: &dyn ProgressSink,
) -> std::io::Result<u64> {
    let mut buffer = vec![0u8; BLOCK_BYTES];
    let mut state = State::default();

    loop {
        let n = read_full(reader, &mut buffer)?;
        if n == 0 {
            break;
        }
        progress.tick(n as u64);

        let steps = n.div_ceil(STEP_BYTES);
        let used = steps * STEP_BYTES;
        buffer[n..used].fill(0);
        state.block(&buffer[..used]);

        if n < BLOCK_BYTES {
            break;
        }
    }

    Ok(state.c)
}

/// Checksum an in-memory buffer.
#[must_use]
pub fn checksum_bytes(bytes: &[u8]) -> u64 {
    let mut reader = bytes;
    // Reading from a slice cannot fail
    checksum_reader(&mut reader, &crate::progress::NoProgress).unwrap_or_default()
}

/// Checksum a file.
///
/// # Errors
///
/// Returns [`ChecksumError`] if the file cannot be opened or read.
pub fn checksum_file(path: &Path, progress: &dyn ProgressSink) -> Result<u64, ChecksumError> {
    let mut file = File::open(path).map_err(|source| ChecksumError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    checksum_reader(&mut file, progress).map_err(|source| ChecksumError::Read {
        path: path.to_path_buf(),
        source,
    })
}
