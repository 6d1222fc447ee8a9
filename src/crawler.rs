use dashmap::DashMap;
use jwalk::WalkDir;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::error::{TreeError, TreeResult};

const PROGRESS_EMIT_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub skip_hidden: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub total_files: u64,
    pub total_dirs: u64,
    pub total_size: u64,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Discovering,
    Processing,
}

#[derive(Debug, Clone)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub discovered_entries: u64,
    pub processed_entries: u64,
    pub total_size: u64,
}

impl ScanProgress {
    pub fn fraction(&self) -> Option<f32> {
        match self.phase {
            ScanPhase::Discovering => None,
            ScanPhase::Processing if self.discovered_entries == 0 => Some(1.0),
            ScanPhase::Processing => Some(
                (self.processed_entries as f32 / self.discovered_entries as f32).clamp(0.0, 1.0),
            ),
        }
    }
}

pub type ProgressReporter = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Snapshot of a directory hierarchy: file sizes and sorted directory
/// listings, keyed by absolute path.
#[derive(Debug, Default)]
pub struct ScanIndex {
    pub root: PathBuf,
    pub files: DashMap<PathBuf, u64>,
    pub dirs: DashMap<PathBuf, Vec<PathBuf>>,
}

/// High-performance parallel file system crawler
pub struct FileCrawler {
    file_count: Arc<AtomicU64>,
    dir_count: Arc<AtomicU64>,
    total_size: Arc<AtomicU64>,
}

impl FileCrawler {
    pub fn new() -> Self {
        Self {
            file_count: Arc::new(AtomicU64::new(0)),
            dir_count: Arc::new(AtomicU64::new(0)),
            total_size: Arc::new(AtomicU64::new(0)),
        }
    }

    fn should_emit_progress(last_emit_ms: &AtomicU64, elapsed_ms: u64) -> bool {
        let previous = last_emit_ms.load(Ordering::Relaxed);
        if elapsed_ms.saturating_sub(previous) < PROGRESS_EMIT_INTERVAL_MS {
            return false;
        }

        last_emit_ms
            .compare_exchange(previous, elapsed_ms, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    fn processing_parallelism() -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        (cores * 2).clamp(4, 64)
    }

    /// Walk `root` and index every entry below it.
    #[instrument(level = "debug", skip(self, reporter))]
    pub fn scan<P: AsRef<Path> + std::fmt::Debug>(
        &mut self,
        root: P,
        options: ScanOptions,
        reporter: Option<ProgressReporter>,
    ) -> TreeResult<(ScanIndex, ScanStats)> {
        let start = Instant::now();
        let root_path = std::fs::canonicalize(root.as_ref())
            .map_err(|e| TreeError::io(root.as_ref(), e))?;

        self.file_count.store(0, Ordering::Relaxed);
        self.dir_count.store(0, Ordering::Relaxed);
        self.total_size.store(0, Ordering::Relaxed);

        let scan_threads = Self::processing_parallelism();
        let walker = WalkDir::new(&root_path)
            .skip_hidden(options.skip_hidden)
            .sort(true)
            .parallelism(jwalk::Parallelism::RayonNewPool(scan_threads));

        let mut entries = Vec::new();
        let mut discovery_last_emit = Instant::now();
        for entry in walker {
            match entry {
                Ok(entry) if entry.path().to_str().is_some() => entries.push(entry),
                Ok(entry) => debug!(path = ?entry.path(), "skipping non UTF-8 path"),
                Err(e) => debug!(error = %e, "skipping unreadable entry"),
            }

            if let Some(cb) = reporter.as_ref() {
                if discovery_last_emit.elapsed().as_millis() as u64 >= PROGRESS_EMIT_INTERVAL_MS {
                    discovery_last_emit = Instant::now();
                    cb(ScanProgress {
                        phase: ScanPhase::Discovering,
                        discovered_entries: entries.len() as u64,
                        processed_entries: 0,
                        total_size: 0,
                    });
                }
            }
        }

        let discovered = entries.len() as u64;
        let index = ScanIndex {
            root: root_path.clone(),
            ..ScanIndex::default()
        };
        let processed = AtomicU64::new(0);
        let last_emit_ms = AtomicU64::new(0);
        let processing_started = Instant::now();

        let process_entries = || {
            entries.par_iter().for_each(|entry| {
                let processed_now = processed.fetch_add(1, Ordering::Relaxed) + 1;
                let path = entry.path();
                let Ok(metadata) = entry.metadata() else {
                    return;
                };

                if metadata.is_dir() {
                    self.dir_count.fetch_add(1, Ordering::Relaxed);
                    index.dirs.entry(path.clone()).or_default();
                } else {
                    let size = metadata.len();
                    self.file_count.fetch_add(1, Ordering::Relaxed);
                    self.total_size.fetch_add(size, Ordering::Relaxed);
                    index.files.insert(path.clone(), size);
                }

                if entry.depth > 0 {
                    if let Some(parent) = path.parent() {
                        index
                            .dirs
                            .entry(parent.to_path_buf())
                            .or_default()
                            .push(path.clone());
                    }
                }

                if let Some(cb) = reporter.as_ref() {
                    let elapsed_ms = processing_started.elapsed().as_millis() as u64;
                    if processed_now == discovered
                        || Self::should_emit_progress(&last_emit_ms, elapsed_ms)
                    {
                        cb(ScanProgress {
                            phase: ScanPhase::Processing,
                            discovered_entries: discovered,
                            processed_entries: processed_now,
                            total_size: self.total_size.load(Ordering::Relaxed),
                        });
                    }
                }
            })
        };

        match ThreadPoolBuilder::new().num_threads(scan_threads).build() {
            Ok(pool) => pool.install(process_entries),
            Err(_) => process_entries(),
        }

        index
            .dirs
            .iter_mut()
            .for_each(|mut listing| listing.value_mut().sort());

        let stats = ScanStats {
            total_files: self.file_count.load(Ordering::Relaxed),
            total_dirs: self.dir_count.load(Ordering::Relaxed),
            total_size: self.total_size.load(Ordering::Relaxed),
            duration_ms: start.elapsed().as_millis(),
        };
        debug!(?stats, "scan finished");

        Ok((index, stats))
    }
}

impl Default for FileCrawler {
    fn default() -> Self {
        Self::new()
    }
}
