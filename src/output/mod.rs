//! Output formatters for duplicate scan results.
//!
//! This module provides different output formats for the duplicate dump:
//! - Text, one shell-quoted line per group
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dupelink::duplicates::{resolve, ResolveConfig};
//! use dupelink::output::TextOutput;
//! use dupelink::scanner::{traverse, AcceptAll};
//! use std::path::Path;
//!
//! let index = traverse(Path::new("."), 1, &AcceptAll).unwrap();
//! let resolution = resolve(&index, &ResolveConfig::default());
//!
//! TextOutput::new(&index, &resolution.registry)
//!     .write_to(&mut std::io::stdout())
//!     .unwrap();
//! ```

pub mod json;
pub mod text;

// Re-export main types
pub use json::{JsonOutput, JsonOutputError};
pub use text::{escape_posix, TextOutput};
