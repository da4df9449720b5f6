//! Version resolution: rewrites a target graph containing versioned aliases
//! into a concrete graph in which every alias has been replaced by the
//! backing node of its chosen version.

use crate::densemap::DenseMap;
use crate::executor::{DepsAwareExecutor, DepsSource};
use crate::graph::{
    NodeId, NodeKind, ResolvedGraph, ResolvedGraphAndRoots, ResolvedId, TargetGraph,
    TargetGraphAndRoots,
};
use crate::trace;
use crate::version::{Version, VersionUniverses};
use std::sync::Arc;
use thiserror::Error;

/// Failure to choose or apply a version for a versioned alias.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("no version selected for alias {alias}: no universe names it and it declares no default")]
    NoVersionSelected { alias: String },
    #[error("universes {first:?} and {second:?} disagree on alias {alias}: {first_version} vs {second_version}")]
    ConflictingUniverses {
        alias: String,
        first: String,
        first_version: Version,
        second: String,
        second_version: Version,
    },
    #[error("alias {alias} has no backing target for version {version}")]
    UnknownVersion { alias: String, version: Version },
}

/// Pick the version for one alias: an explicit universe choice beats the
/// alias's declared default; no choice at all is an error.  Universes are
/// scanned in name order so both the winner and any conflict report are
/// deterministic regardless of map iteration order.
fn select_version(
    alias: &str,
    default: Option<&Version>,
    universes: &VersionUniverses,
) -> Result<Version, VersionError> {
    let mut names: Vec<&String> = universes.keys().collect();
    names.sort();

    let mut choice: Option<(&String, &Version)> = None;
    for name in names {
        let version = match universes[name].get(alias) {
            Some(v) => v,
            None => continue,
        };
        match choice {
            None => choice = Some((name, version)),
            Some((first, first_version)) => {
                if first_version != version {
                    return Err(VersionError::ConflictingUniverses {
                        alias: alias.to_string(),
                        first: first.clone(),
                        first_version: first_version.clone(),
                        second: name.clone(),
                        second_version: version.clone(),
                    });
                }
            }
        }
    }

    if let Some((_, version)) = choice {
        return Ok(version.clone());
    }
    match default {
        Some(version) => Ok(version.clone()),
        None => Err(VersionError::NoVersionSelected {
            alias: alias.to_string(),
        }),
    }
}

/// Resolve all versioned aliases in `input` under `universes` and return
/// the concrete graph reachable from its roots.  Pure in (graph, universes);
/// the executor's pool size never affects the output.
pub fn resolve(
    executor: &DepsAwareExecutor,
    input: &TargetGraphAndRoots,
    universes: &VersionUniverses,
) -> anyhow::Result<ResolvedGraphAndRoots> {
    trace::scope("resolve", || {
        let graph = &*input.graph;
        // Each node's computed value is its substitution: the concrete
        // input node it denotes once versions are chosen.  A plain node
        // denotes itself; an alias denotes whatever its chosen backing
        // denotes, so chains of aliases collapse transitively.
        let subst = executor.run(graph, |id, deps| {
            let node = graph.node(id);
            match &node.kind {
                NodeKind::Plain => Ok(id),
                NodeKind::VersionedAlias { versions, default } => {
                    let version = select_version(&node.label, default.as_ref(), universes)?;
                    let backing = *versions.get(&version).ok_or_else(|| {
                        VersionError::UnknownVersion {
                            alias: node.label.clone(),
                            version: version.clone(),
                        }
                    })?;
                    Ok(*deps.get(backing))
                }
            }
        })?;
        Ok(build_closure(graph, &input.roots, &subst))
    })
}

/// Build the output graph: the transitive closure reachable from the
/// substituted roots, visited depth-first in declaration order so the
/// result is bit-identical across runs.
fn build_closure(
    graph: &TargetGraph,
    roots: &[NodeId],
    subst: &DenseMap<NodeId, NodeId>,
) -> ResolvedGraphAndRoots {
    let mut out = ResolvedGraph::default();
    let mut visited: DenseMap<NodeId, Option<ResolvedId>> =
        DenseMap::new_filled(graph.node_count(), None);
    let roots = roots
        .iter()
        .map(|&root| visit(graph, subst, &mut out, &mut visited, subst[root]))
        .collect();
    ResolvedGraphAndRoots {
        graph: Arc::new(out),
        roots,
    }
}

// `id` is always concrete here: aliases are substituted away before the
// recursive call, so no alias identity ever reaches the output.
fn visit(
    graph: &TargetGraph,
    subst: &DenseMap<NodeId, NodeId>,
    out: &mut ResolvedGraph,
    visited: &mut DenseMap<NodeId, Option<ResolvedId>>,
    id: NodeId,
) -> ResolvedId {
    if let Some(rid) = visited[id] {
        return rid;
    }
    let node = graph.node(id);
    let mut deps: Vec<ResolvedId> = Vec::with_capacity(node.deps.len());
    for &dep in &node.deps {
        let rid = visit(graph, subst, out, visited, subst[dep]);
        // Two declared deps may substitute to the same concrete node.
        if !deps.contains(&rid) {
            deps.push(rid);
        }
    }
    let rid = out.add_node(node.label.clone(), deps);
    visited[id] = Some(rid);
    rid
}
