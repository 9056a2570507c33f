//! Size-class resolver driving checksum bucketing and partitioning.
//!
//! # Overview
//!
//! Each size class with `m` members is handled on its own:
//!
//! - `m == 1`: nothing to do.
//! - **Terminal branch**, taken when no checksum round is available or when
//!   exact mode meets a pair: a pair gets one full comparison and is
//!   registered if equal. Larger buckets are recorded as an unresolved
//!   [`CollisionNotice`] without any comparison.
//! - **Checksum branch**: buckets of more than two files are split by
//!   checksum (computed in parallel on a bounded pool), pairs skip the
//!   checksum. Every checksum bucket with two or more files is partitioned
//!   into byte-identical classes and each class of two or more files is
//!   registered.
//!
//! Unreadable files are logged, counted in [`ResolveStats::failed_files`]
//! and excluded from their bucket only.
//!
//! # Example
//!
//! ```no_run
//! use dupelink::duplicates::{resolve, ResolveConfig};
//! use dupelink::scanner::{traverse, AcceptAll};
//! use std::path::Path;
//!
//! let index = traverse(Path::new("."), 1, &AcceptAll).unwrap();
//! let resolution = resolve(&index, &ResolveConfig::default().with_io_threads(2));
//!
//! println!("{} bytes reclaimable", resolution.registry.reclaimable_bytes());
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use super::checksum::{checksum_file, ChecksumError};
use super::compare::ComparatorCache;
use super::partition::partition_members;
use super::registry::{CollisionNotice, DuplicateGroup, DuplicateRegistry};
use crate::progress::{NoProgress, ProgressSink, PHASE_RESOLVING};
use crate::scanner::{NodeId, ScanIndex, SizeClass};

/// Configuration for duplicate resolution.
#[derive(Clone)]
pub struct ResolveConfig {
    /// Checksum rounds available; `0` goes straight to the terminal branch.
    pub checksum_rounds: u32,
    /// Verified-exact mode: pairs are compared directly.
    pub exact: bool,
    /// Number of I/O threads for parallel checksumming.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Optional progress sink.
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for ResolveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveConfig")
            .field("checksum_rounds", &self.checksum_rounds)
            .field("exact", &self.exact)
            .field("io_threads", &self.io_threads)
            .field("progress", &self.progress.as_ref().map(|_| "<progress>"))
            .finish()
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            checksum_rounds: 1,
            exact: true,
            io_threads: 4,
            progress: None,
        }
    }
}

impl ResolveConfig {
    /// Set the checksum round budget.
    #[must_use]
    pub fn with_checksum_rounds(mut self, rounds: u32) -> Self {
        self.checksum_rounds = rounds;
        self
    }

    /// Enable or disable verified-exact mode.
    #[must_use]
    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Set the I/O thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Counters gathered while resolving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResolveStats {
    /// Size classes with at least two members
    pub candidate_classes: usize,
    /// Files whose checksum was computed
    pub checksummed_files: usize,
    /// Full comparisons that read from disk
    pub disk_compares: usize,
    /// Files excluded after a read error
    pub failed_files: usize,
    /// Buckets reported as unresolved collisions
    pub collisions: usize,
}

/// Registry plus resolution counters.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Confirmed groups
    pub registry: DuplicateRegistry,
    /// Counters
    pub stats: ResolveStats,
}

/// Resolver over one scan index.
pub struct Resolver<'a> {
    index: &'a ScanIndex,
    config: ResolveConfig,
    progress: Arc<dyn ProgressSink>,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver. Checksumming runs on a pool of `io_threads`.
    #[must_use]
    pub fn new(index: &'a ScanIndex, config: ResolveConfig) -> Self {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(config.io_threads.max(1))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Failed to create I/O thread pool, checksumming sequentially: {}", e);
                None
            }
        };
        let progress = config
            .progress
            .clone()
            .unwrap_or_else(|| Arc::new(NoProgress));
        Self {
            index,
            config,
            progress,
            pool,
        }
    }

    /// Resolve every size class in order.
    #[must_use]
    pub fn run(self) -> Resolution {
        let mut resolution = Resolution::default();

        let candidate_bytes: u64 = self
            .index
            .size_classes
            .iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(class, members)| class.size * members.len() as u64)
            .sum();
        self.progress.on_phase_start(PHASE_RESOLVING, candidate_bytes);

        for (class, members) in &self.index.size_classes {
            if members.len() < 2 {
                continue;
            }
            resolution.stats.candidate_classes += 1;
            self.resolve_class(*class, members, &mut resolution);
        }

        self.progress.on_phase_end(PHASE_RESOLVING);
        resolution.stats.collisions = resolution.registry.collisions().len();

        log::debug!(
            "Resolution complete: {} groups, {} disk compares, {} failed files",
            resolution.registry.len(),
            resolution.stats.disk_compares,
            resolution.stats.failed_files
        );
        resolution
    }

    fn checksums(&self, paths: &[PathBuf]) -> Vec<Result<u64, ChecksumError>> {
        let progress: &dyn ProgressSink = self.progress.as_ref();
        let compute = |path: &PathBuf| checksum_file(path, progress);
        match self.pool {
            Some(ref pool) => pool.install(|| paths.par_iter().map(compute).collect()),
            None => paths.iter().map(compute).collect(),
        }
    }

    fn resolve_class(&self, class: SizeClass, members: &[NodeId], resolution: &mut Resolution) {
        let m = members.len();
        log::debug!("Resolving size class of {} files of {} bytes", m, class.size);

        let paths: Vec<PathBuf> = members.iter().map(|&n| self.index.path(n)).collect();
        let mut cache = ComparatorCache::new(&paths, self.progress.as_ref());

        if self.config.checksum_rounds == 0 || (self.config.exact && m == 2) {
            if m == 2 {
                match cache.compare(0, 1) {
                    Ok(Ordering::Equal) => resolution
                        .registry
                        .register(DuplicateGroup::new(class, members.to_vec())),
                    Ok(_) => {}
                    Err(failed) => {
                        log::warn!("{}", failed.error);
                        resolution.stats.failed_files += 1;
                    }
                }
            } else {
                log::debug!(
                    "Unresolved collision of {} files of {} bytes",
                    m,
                    class.size
                );
                resolution.registry.record_collision(CollisionNotice {
                    class,
                    checksum: None,
                    members: members.to_vec(),
                });
            }
            resolution.stats.disk_compares += cache.disk_compares();
            return;
        }

        let mut buckets: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        if m <= 2 {
            buckets.insert(0, (0..m).collect());
        } else {
            for (i, result) in self.checksums(&paths).into_iter().enumerate() {
                match result {
                    Ok(sum) => {
                        log::debug!("Checksum 0x{:016x} '{}'", sum, paths[i].display());
                        buckets.entry(sum).or_default().push(i);
                        resolution.stats.checksummed_files += 1;
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        resolution.stats.failed_files += 1;
                    }
                }
            }
        }

        for bucket in buckets.values() {
            if bucket.len() < 2 {
                continue;
            }
            let outcome = partition_members(bucket, &mut cache);
            resolution.stats.failed_files += outcome.failed.len();
            for congruent in outcome.classes {
                if congruent.len() < 2 {
                    continue;
                }
                let group = congruent.iter().map(|&i| members[i]).collect();
                resolution
                    .registry
                    .register(DuplicateGroup::new(class, group));
            }
        }
        resolution.stats.disk_compares += cache.disk_compares();
    }
}

/// Resolve all size classes of `index` into verified duplicate groups.
#[must_use]
pub fn resolve(index: &ScanIndex, config: &ResolveConfig) -> Resolution {
    Resolver::new(index, config.clone()).run()
}
