//! JSON output formatter for duplicate scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     { "size": 1024, "total_bytes": 2048, "files": ["/data/a", "/data/b"] }
//!   ],
//!   "collisions": [],
//!   "summary": {
//!     "root": "/data",
//!     "eligible_files": 100,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 2,
//!     "reclaimable_bytes": 1024,
//!     "exit_code": 0,
//!     "exit_code_name": "DL000"
//!   }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::actions::RelinkReport;
use crate::duplicates::{DuplicateRegistry, ResolveStats};
use crate::error::ExitCode;
use crate::scanner::{NodeId, ScanIndex, TraversalStats};

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// File size in bytes
    pub size: u64,
    /// Combined size of all members
    pub total_bytes: u64,
    /// Member paths, representative first
    pub files: Vec<String>,
}

/// An unverified collision in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCollision {
    /// Shared checksum as `0x`-prefixed hex, if one was computed
    pub checksum: Option<String>,
    /// File size in bytes
    pub size: u64,
    /// Member paths
    pub files: Vec<String>,
}

/// Outcome of the hard-linking step.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRelink {
    /// Names replaced by links
    pub linked_files: usize,
    /// Groups rolled back after a quarantine failure
    pub abandoned_groups: usize,
    /// Warnings raised
    pub warnings: usize,
    /// Bytes actually freed
    pub bytes_reclaimed: u64,
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Scanned root
    pub root: String,
    /// Traversal counters
    pub traversal: TraversalStats,
    /// Resolution counters
    pub resolution: ResolveStats,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Files in all groups
    pub duplicate_files: usize,
    /// Bytes linking would free
    pub reclaimable_bytes: u64,
    /// Hard-linking outcome, if it ran
    pub relink: Option<JsonRelink>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DL000")
    pub exit_code_name: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Unresolved collisions
    pub collisions: Vec<JsonCollision>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

fn paths(index: &ScanIndex, members: &[NodeId]) -> Vec<String> {
    members
        .iter()
        .map(|&m| index.path(m).to_string_lossy().into_owned())
        .collect()
}

impl JsonOutput {
    /// Build the JSON view of a run.
    #[must_use]
    pub fn new(
        root: &Path,
        index: &ScanIndex,
        registry: &DuplicateRegistry,
        resolve_stats: ResolveStats,
        relink: Option<&RelinkReport>,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            duplicates: registry
                .groups()
                .iter()
                .map(|g| JsonDuplicateGroup {
                    size: g.class.size,
                    total_bytes: g.total_bytes(),
                    files: paths(index, &g.members),
                })
                .collect(),
            collisions: registry
                .collisions()
                .iter()
                .map(|c| JsonCollision {
                    checksum: c.checksum.map(|sum| format!("0x{sum:016x}")),
                    size: c.class.size,
                    files: paths(index, &c.members),
                })
                .collect(),
            summary: JsonSummary {
                root: root.to_string_lossy().into_owned(),
                traversal: index.stats,
                resolution: resolve_stats,
                duplicate_groups: registry.len(),
                duplicate_files: registry.duplicate_count(),
                reclaimable_bytes: registry.reclaimable_bytes(),
                relink: relink.map(|r| JsonRelink {
                    linked_files: r.linked_files(),
                    abandoned_groups: r.abandoned_groups(),
                    warnings: r.warnings(),
                    bytes_reclaimed: r.bytes_reclaimed(),
                }),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Arguments
    ///
    /// * `writer` - The writer to output to (e.g., stdout)
    /// * `pretty` - Whether to pretty-print the output
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
