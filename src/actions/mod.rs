//! File actions module.
//!
//! This module replaces duplicates by hard links:
//! - Quarantine of every target under a unique backup name
//! - Rollback of a whole group when quarantine fails
//! - Per-target restore when linking fails
//! - Optional permission clearing on the kept file
//!
//! ```no_run
//! use dupelink::actions::relink;
//! use dupelink::duplicates::{resolve, ResolveConfig};
//! use dupelink::scanner::{traverse, AcceptAll};
//! use std::path::Path;
//!
//! let index = traverse(Path::new("/srv/media"), 100_000, &AcceptAll).unwrap();
//! let resolution = resolve(&index, &ResolveConfig::default());
//! let report = relink(&index, &resolution.registry, 0o222);
//! println!("{} files linked", report.linked_files());
//! ```

pub mod backup;
pub mod relink;

// Re-export commonly used types
pub use backup::BackupNamer;
pub use relink::{relink, GroupReport, LinkFs, RelinkError, RelinkReport, Relinker, StdFs};
