//! Cache instrumentation: per-wrapper hit/miss counters and timing
//! aggregates over a shared versioned-graph cache.

use crate::cache::{CacheResult, ResultType, VersionedGraphCache};
use crate::executor::DepsAwareExecutor;
use crate::graph::TargetGraphAndRoots;
use crate::version::VersionUniverses;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Running aggregates for one instrumented cache instance.  Timing fields
/// stay `None` until the first call is recorded.
#[derive(Clone, Debug, Default)]
pub struct CacheStats {
    pub hit_count: u64,
    /// Calls that had to resolve: EMPTY plus MISMATCH.
    pub miss_count: u64,
    /// MISMATCH only: a prior entry existed but its key differed.
    pub mismatch_count: u64,
    /// Total wall-clock time of all calls.
    pub total_load_time: Option<Duration>,
    /// Time spent on key comparison and retrieval.
    pub retrieval_time: Option<Duration>,
    /// Time spent inside recomputation; zero contribution on hits.
    pub total_miss_time: Option<Duration>,
}

fn accumulate(slot: &mut Option<Duration>, d: Duration) {
    *slot = Some(slot.unwrap_or_default() + d);
}

/// Interior-mutable counter block.  Shared by `Arc` so a caller can keep a
/// handle for reporting while the instrumented cache records into it; its
/// lifetime is tied to the wrapper's, never global.
#[derive(Default)]
pub struct CacheStatsTracker {
    stats: Mutex<CacheStats>,
}

impl CacheStatsTracker {
    pub fn new() -> CacheStatsTracker {
        CacheStatsTracker::default()
    }

    fn record(&self, result_type: ResultType, total: Duration, compute: Duration) {
        let mut stats = self.stats.lock().unwrap();
        match result_type {
            ResultType::Hit => stats.hit_count += 1,
            ResultType::Empty => stats.miss_count += 1,
            ResultType::Mismatch => {
                stats.miss_count += 1;
                stats.mismatch_count += 1;
            }
        }
        accumulate(&mut stats.total_load_time, total);
        accumulate(
            &mut stats.retrieval_time,
            total.checked_sub(compute).unwrap_or_default(),
        );
        accumulate(&mut stats.total_miss_time, compute);
    }

    pub fn snapshot(&self) -> CacheStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Decorates a `VersionedGraphCache` with statistics without changing any
/// outcome.  Wrappers over the same base cache share the cached entry but
/// never the counters.
pub struct InstrumentedVersionedGraphCache {
    cache: Arc<VersionedGraphCache>,
    tracker: Arc<CacheStatsTracker>,
}

impl InstrumentedVersionedGraphCache {
    pub fn new(
        cache: Arc<VersionedGraphCache>,
        tracker: Arc<CacheStatsTracker>,
    ) -> InstrumentedVersionedGraphCache {
        InstrumentedVersionedGraphCache { cache, tracker }
    }

    /// Delegate to the underlying cache, recording the result type, the
    /// whole-call time, and the retrieval/compute split.  Failed calls
    /// propagate the error and record nothing.
    pub fn get_versioned_graph(
        &self,
        executor: &DepsAwareExecutor,
        input: &TargetGraphAndRoots,
        universes: &VersionUniverses,
    ) -> anyhow::Result<CacheResult> {
        let start = Instant::now();
        let result = self.cache.get_versioned_graph(executor, input, universes)?;
        let total = start.elapsed();
        self.tracker
            .record(result.result_type, total, result.compute_time);
        Ok(result)
    }

    pub fn stats(&self) -> CacheStats {
        self.tracker.snapshot()
    }
}
