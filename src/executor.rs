//! Deps-aware execution: runs a per-node computation across a dependency
//! graph such that a node's computation starts only once the results of all
//! of its dependencies exist, bounded by a fixed-size worker pool.

use crate::densemap::DenseMap;
use crate::graph::NodeId;
use crate::thread_pool;
use anyhow::{anyhow, bail};
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::mpsc;

/// A dependency graph as the executor sees it: a dense node id space plus
/// each node's direct dependencies.
pub trait DepsSource {
    fn node_count(&self) -> usize;
    fn deps(&self, id: NodeId) -> &[NodeId];
}

type FxDashMap<K, V> = DashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Read access to already-completed results, handed to the transformation
/// of each node for looking up its dependencies.
pub struct DepResults<'a, R> {
    map: &'a FxDashMap<NodeId, R>,
}

impl<'a, R> DepResults<'a, R> {
    /// The result of a direct dependency.  Scheduling guarantees it exists;
    /// a missing entry means the readiness invariant was violated, which is
    /// a programming error, not a recoverable condition.
    pub fn get(
        &self,
        id: NodeId,
    ) -> dashmap::mapref::one::Ref<'a, NodeId, R, BuildHasherDefault<FxHasher>> {
        self.map
            .get(&id)
            .unwrap_or_else(|| panic!("result for {:?} read before it was computed", id))
    }
}

struct Finished {
    id: NodeId,
    err: Option<anyhow::Error>,
}

/// Runs node transformations in dependency order on a worker pool of a
/// caller-chosen size.  The size bounds parallelism only; the computed
/// results are identical for any size.
pub struct DepsAwareExecutor {
    pool_size: usize,
}

impl DepsAwareExecutor {
    pub fn of(pool_size: usize) -> DepsAwareExecutor {
        DepsAwareExecutor {
            pool_size: pool_size.max(1),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Invoke `transform` exactly once per node, never before all of the
    /// node's dependency results are available.  Nodes with no dependency
    /// relationship may run concurrently.  Returns every node's result, or
    /// the first error any transformation reported; after an error no
    /// further nodes are started and in-flight results are discarded.
    pub fn run<G, R, F>(&self, graph: &G, transform: F) -> anyhow::Result<DenseMap<NodeId, R>>
    where
        G: DepsSource,
        R: Send + Sync,
        F: Fn(NodeId, &DepResults<R>) -> anyhow::Result<R> + Sync,
    {
        let n = graph.node_count();
        let results: FxDashMap<NodeId, R> =
            DashMap::with_capacity_and_hasher(n, Default::default());

        // Readiness bookkeeping: how many deps each node still waits on,
        // and who to notify when a node finishes.
        let mut pending: DenseMap<NodeId, usize> = DenseMap::new_filled(n, 0);
        let mut dependents: DenseMap<NodeId, Vec<NodeId>> = DenseMap::new_filled(n, Vec::new());
        for id in (0..n).map(NodeId::from) {
            for &dep in graph.deps(id) {
                pending[id] += 1;
                dependents[dep].push(id);
            }
        }
        let mut ready: Vec<NodeId> = (0..n)
            .map(NodeId::from)
            .filter(|&id| pending[id] == 0)
            .collect();

        let (tx, rx) = mpsc::channel::<Finished>();
        let results = &results;
        let transform = &transform;

        thread_pool::scoped(self.pool_size, |pool| {
            let mut running = 0usize;
            let mut done = 0usize;
            let mut failed: Option<anyhow::Error> = None;

            loop {
                if failed.is_none() {
                    for id in ready.drain(..) {
                        let tx = tx.clone();
                        running += 1;
                        pool.execute(move || {
                            let err = match transform(id, &DepResults { map: results }) {
                                Ok(result) => {
                                    results.insert(id, result);
                                    None
                                }
                                Err(err) => Some(err),
                            };
                            // Fails only if the coordinator already bailed.
                            let _ = tx.send(Finished { id, err });
                        });
                    }
                } else {
                    ready.clear();
                }

                if running == 0 {
                    break;
                }
                let fin = rx.recv().expect("executor worker channel closed");
                running -= 1;
                match fin.err {
                    Some(err) => {
                        // The first failure wins; later ones are dropped
                        // along with their subtrees.
                        failed.get_or_insert(err);
                    }
                    None => {
                        done += 1;
                        for &dependent in &dependents[fin.id] {
                            pending[dependent] -= 1;
                            if pending[dependent] == 0 {
                                ready.push(dependent);
                            }
                        }
                    }
                }
            }

            if let Some(err) = failed {
                return Err(err);
            }
            if done != n {
                bail!("{} nodes never became ready (dependency cycle?)", n - done);
            }

            let mut out: DenseMap<NodeId, R> = DenseMap::with_capacity(n);
            for id in (0..n).map(NodeId::from) {
                let (_, result) = results
                    .remove(&id)
                    .ok_or_else(|| anyhow!("missing result for {:?}", id))?;
                out.push(result);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Adjacency-list graph for driving the executor directly.
    struct TestGraph {
        deps: Vec<Vec<NodeId>>,
    }

    impl TestGraph {
        fn new(deps: Vec<Vec<usize>>) -> TestGraph {
            TestGraph {
                deps: deps
                    .into_iter()
                    .map(|ds| ds.into_iter().map(NodeId::from).collect())
                    .collect(),
            }
        }
    }

    impl DepsSource for TestGraph {
        fn node_count(&self) -> usize {
            self.deps.len()
        }
        fn deps(&self, id: NodeId) -> &[NodeId] {
            &self.deps[crate::densemap::Index::index(&id)]
        }
    }

    // Diamond: 3 depends on 1 and 2, which both depend on 0.
    fn diamond() -> TestGraph {
        TestGraph::new(vec![vec![], vec![0], vec![0], vec![1, 2]])
    }

    #[test]
    fn results_observe_dependencies() {
        for pool_size in [1, 4] {
            let graph = diamond();
            let executor = DepsAwareExecutor::of(pool_size);
            // Each node computes 1 + sum of its deps' results.
            let results = executor
                .run(&graph, |id, deps| {
                    let sum: u64 = graph.deps(id).iter().map(|&d| *deps.get(d)).sum();
                    Ok(sum + 1)
                })
                .unwrap();
            let vals: Vec<u64> = results.values().copied().collect();
            assert_eq!(vals, vec![1, 2, 2, 5]);
        }
    }

    #[test]
    fn completion_respects_dependency_order() {
        let graph = diamond();
        let order = Mutex::new(Vec::new());
        let executor = DepsAwareExecutor::of(4);
        executor
            .run(&graph, |id, _| {
                order.lock().unwrap().push(id);
                Ok(())
            })
            .unwrap();
        let order = order.into_inner().unwrap();
        assert_eq!(order.len(), 4);
        for (i, &id) in order.iter().enumerate() {
            for dep in graph.deps(id) {
                assert!(
                    order[..i].contains(dep),
                    "{:?} started before its dep {:?}",
                    id,
                    dep
                );
            }
        }
    }

    #[test]
    fn transform_runs_exactly_once_per_node() {
        let graph = diamond();
        let seen = Mutex::new(vec![0u32; 4]);
        DepsAwareExecutor::of(2)
            .run(&graph, |id, _| {
                seen.lock().unwrap()[crate::densemap::Index::index(&id)] += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(seen.into_inner().unwrap(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn first_failure_aborts_run() {
        let graph = diamond();
        let executor = DepsAwareExecutor::of(1);
        let err = executor
            .run(&graph, |id, _| {
                if crate::densemap::Index::index(&id) == 1 {
                    anyhow::bail!("node 1 exploded");
                }
                Ok(())
            })
            .unwrap_err();
        assert!(err.to_string().contains("node 1 exploded"));
    }

    #[test]
    fn dependents_of_failed_node_never_run() {
        let graph = TestGraph::new(vec![vec![], vec![0]]);
        let ran_child = Mutex::new(false);
        let err = DepsAwareExecutor::of(2)
            .run(&graph, |id, _| {
                if crate::densemap::Index::index(&id) == 0 {
                    anyhow::bail!("root failed");
                }
                *ran_child.lock().unwrap() = true;
                Ok(())
            })
            .unwrap_err();
        assert!(err.to_string().contains("root failed"));
        assert!(!ran_child.into_inner().unwrap());
    }

    #[test]
    fn cycle_is_reported() {
        let graph = TestGraph::new(vec![vec![1], vec![0]]);
        let err = DepsAwareExecutor::of(2)
            .run(&graph, |_, _| Ok(()))
            .unwrap_err();
        assert!(err.to_string().contains("never became ready"));
    }

    #[test]
    fn empty_graph() {
        let graph = TestGraph::new(vec![]);
        let results = DepsAwareExecutor::of(2)
            .run(&graph, |_, _| Ok(0u8))
            .unwrap();
        assert_eq!(results.len(), 0);
    }
}
