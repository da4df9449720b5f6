//! Single-slot memoization of version resolution, keyed on input-graph
//! identity and the version-universe configuration.

use crate::executor::DepsAwareExecutor;
use crate::graph::{NodeId, ResolvedGraphAndRoots, TargetGraph, TargetGraphAndRoots};
use crate::resolve::resolve;
use crate::trace;
use crate::version::VersionUniverses;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How a cache request was satisfied.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResultType {
    /// No prior entry existed; this call performed the first resolution.
    Empty,
    /// The prior entry's key matched; its graph was returned unchanged.
    Hit,
    /// A prior entry existed under a different key; recomputed and replaced.
    Mismatch,
}

/// The outcome of one `get_versioned_graph` call.
#[derive(Debug)]
pub struct CacheResult {
    pub result_type: ResultType,
    pub resolved: ResolvedGraphAndRoots,
    /// Time spent inside recomputation; zero on a hit.  Lets an
    /// instrumenting wrapper split retrieval time from compute time.
    pub compute_time: Duration,
}

struct CacheEntry {
    graph: Arc<TargetGraph>,
    roots: Vec<NodeId>,
    universes: VersionUniverses,
    resolved: ResolvedGraphAndRoots,
}

/// A single-slot memo of the most recent resolution.  The key is the input
/// graph's identity (Arc pointer plus roots) and the universe configuration;
/// the executor's pool size is deliberately excluded -- parallelism is a
/// cost knob, never a correctness input.
pub struct VersionedGraphCache {
    // Key and value live under one lock so compare-and-replace is a single
    // critical section; concurrent callers serialize here.
    slot: Mutex<Option<CacheEntry>>,
}

impl VersionedGraphCache {
    pub fn new() -> VersionedGraphCache {
        VersionedGraphCache {
            slot: Mutex::new(None),
        }
    }

    fn matches(
        entry: &CacheEntry,
        input: &TargetGraphAndRoots,
        universes: &VersionUniverses,
    ) -> bool {
        Arc::ptr_eq(&entry.graph, &input.graph)
            && entry.roots == input.roots
            && entry.universes == *universes
    }

    /// Return the resolved form of `input` under `universes`, reusing the
    /// cached graph when the key matches.  On resolution failure nothing is
    /// written and the previous entry, if any, stays in place.
    pub fn get_versioned_graph(
        &self,
        executor: &DepsAwareExecutor,
        input: &TargetGraphAndRoots,
        universes: &VersionUniverses,
    ) -> anyhow::Result<CacheResult> {
        trace::scope("cache.lookup", || {
            let mut slot = self.slot.lock().unwrap();
            let had_entry = match slot.as_ref() {
                Some(entry) if Self::matches(entry, input, universes) => {
                    return Ok(CacheResult {
                        result_type: ResultType::Hit,
                        resolved: entry.resolved.clone(),
                        compute_time: Duration::ZERO,
                    });
                }
                Some(_) => true,
                None => false,
            };

            let start = Instant::now();
            let resolved = resolve(executor, input, universes)?;
            let compute_time = start.elapsed();
            *slot = Some(CacheEntry {
                graph: Arc::clone(&input.graph),
                roots: input.roots.clone(),
                universes: universes.clone(),
                resolved: resolved.clone(),
            });
            Ok(CacheResult {
                result_type: if had_entry {
                    ResultType::Mismatch
                } else {
                    ResultType::Empty
                },
                resolved,
                compute_time,
            })
        })
    }
}

impl Default for VersionedGraphCache {
    fn default() -> Self {
        VersionedGraphCache::new()
    }
}
