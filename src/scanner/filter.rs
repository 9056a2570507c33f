//! Directory filters consulted before descending into a subdirectory.
//!
//! The traverser asks a [`DirectoryFilter`] about the base name of every new
//! directory below the root. A rejected directory is counted as ignored and
//! its contents are never read.
//!
//! # Example
//!
//! ```
//! use dupelink::scanner::filter::{DirectoryFilter, GlobFilter};
//! use std::ffi::OsStr;
//!
//! let filter = GlobFilter::new(&["*.cache".to_string(), "node_modules".to_string()]).unwrap();
//!
//! assert!(!filter.accept(OsStr::new("thumbs.cache")));
//! assert!(!filter.accept(OsStr::new("node_modules")));
//! assert!(filter.accept(OsStr::new("photos")));
//! ```

use std::ffi::OsStr;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Predicate deciding whether a directory is descended into.
pub trait DirectoryFilter {
    /// Return `true` to descend into a directory with this base name.
    fn accept(&self, name: &OsStr) -> bool;
}

/// Filter accepting every directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl DirectoryFilter for AcceptAll {
    fn accept(&self, _name: &OsStr) -> bool {
        true
    }
}

/// Errors building a glob filter.
#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    /// A pattern could not be parsed.
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Offending pattern
        pattern: String,
        /// Parser error
        #[source]
        source: ignore::Error,
    },

    /// The compiled matcher could not be built.
    #[error("Failed to build ignore patterns: {0}")]
    Build(#[source] ignore::Error),
}

/// Filter rejecting directories whose name matches any glob pattern.
///
/// Patterns use gitignore glob syntax and are matched against the base name
/// only (`*.cache`, `node_modules`, `.git`).
#[derive(Debug, Clone)]
pub struct GlobFilter {
    matcher: Gitignore,
    patterns: Vec<String>,
}

impl GlobFilter {
    /// Compile a filter from patterns.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if a pattern is malformed.
    pub fn new(patterns: &[String]) -> Result<Self, FilterError> {
        let mut builder = GitignoreBuilder::new(".");
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|source| FilterError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
        }
        let matcher = builder.build().map_err(FilterError::Build)?;
        log::debug!("Directory filter compiled from {} pattern(s)", patterns.len());
        Ok(Self {
            matcher,
            patterns: patterns.to_vec(),
        })
    }

    /// Patterns this filter was built from.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl DirectoryFilter for GlobFilter {
    fn accept(&self, name: &OsStr) -> bool {
        !self.matcher.matched(name, true).is_ignore()
    }
}
