//! The target graph: build units and their declared dependencies, some of
//! which are versioned aliases standing in for concrete alternatives.

use crate::densemap::{self, DenseMap, Index};
use crate::executor::DepsSource;
use crate::smallmap::SmallMap;
use crate::version::Version;
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId(u32);
impl From<usize> for NodeId {
    fn from(n: usize) -> NodeId {
        NodeId(n as u32)
    }
}
impl densemap::Index for NodeId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}

/// How a node participates in version resolution.
#[derive(Debug)]
pub enum NodeKind {
    /// An ordinary build unit.
    Plain,
    /// A placeholder standing in for one of several concrete alternatives,
    /// selected per build by version.
    VersionedAlias {
        /// Version label to the node backing that version.
        versions: SmallMap<Version, NodeId>,
        /// Version used when no universe names this alias.
        default: Option<Version>,
    },
}

#[derive(Debug)]
pub struct TargetNode {
    pub label: String,
    pub deps: Vec<NodeId>,
    pub kind: NodeKind,
}

impl TargetNode {
    pub fn is_alias(&self) -> bool {
        matches!(self.kind, NodeKind::VersionedAlias { .. })
    }
}

/// The input dependency graph.  Append-only while loading; immutable and
/// shared as `Arc<TargetGraph>` afterwards.  Dependencies may only refer to
/// nodes already added, so the graph is acyclic by construction.
pub struct TargetGraph {
    nodes: DenseMap<NodeId, TargetNode>,
    label_to_id: FxHashMap<String, NodeId>,
}

impl TargetGraph {
    pub fn new() -> TargetGraph {
        TargetGraph {
            nodes: DenseMap::default(),
            label_to_id: FxHashMap::default(),
        }
    }

    fn add_node(&mut self, node: TargetNode) -> NodeId {
        for &dep in &node.deps {
            if dep.index() >= self.nodes.len() {
                panic!("dep of {:?} added out of order", node.label);
            }
        }
        let label = node.label.clone();
        let id = self.nodes.push(node);
        match self.label_to_id.insert(label, id) {
            None => id,
            Some(_) => panic!("duplicate target {:?}", self.nodes[id].label),
        }
    }

    pub fn add_plain(&mut self, label: &str, deps: Vec<NodeId>) -> NodeId {
        self.add_node(TargetNode {
            label: label.to_string(),
            deps,
            kind: NodeKind::Plain,
        })
    }

    /// Add a versioned alias.  Its dependency list is its backing nodes, so
    /// a deps-ordered traversal resolves every backing before the alias.
    pub fn add_alias(
        &mut self,
        label: &str,
        versions: SmallMap<Version, NodeId>,
        default: Option<Version>,
    ) -> NodeId {
        let deps = versions.values().copied().collect();
        self.add_node(TargetNode {
            label: label.to_string(),
            deps,
            kind: NodeKind::VersionedAlias { versions, default },
        })
    }

    pub fn node(&self, id: NodeId) -> &TargetNode {
        &self.nodes[id]
    }

    pub fn lookup(&self, label: &str) -> Option<NodeId> {
        self.label_to_id.get(label).copied()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.nodes.all_ids()
    }
}

impl DepsSource for TargetGraph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn deps(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].deps
    }
}

/// A target graph plus the root targets the caller actually wants.  The
/// graph is compared by `Arc` pointer identity for cache keying.
#[derive(Clone)]
pub struct TargetGraphAndRoots {
    pub graph: Arc<TargetGraph>,
    pub roots: Vec<NodeId>,
}

impl TargetGraphAndRoots {
    pub fn new(graph: TargetGraph, roots: Vec<NodeId>) -> TargetGraphAndRoots {
        TargetGraphAndRoots {
            graph: Arc::new(graph),
            roots,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedId(u32);
impl From<usize> for ResolvedId {
    fn from(n: usize) -> ResolvedId {
        ResolvedId(n as u32)
    }
}
impl densemap::Index for ResolvedId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub label: String,
    pub deps: Vec<ResolvedId>,
}

/// The output of version resolution: a concrete dependency graph in which
/// no node is a versioned alias and every edge points at a concrete node.
#[derive(Debug, Default)]
pub struct ResolvedGraph {
    nodes: DenseMap<ResolvedId, ResolvedNode>,
    label_to_id: FxHashMap<String, ResolvedId>,
}

impl ResolvedGraph {
    pub(crate) fn add_node(&mut self, label: String, deps: Vec<ResolvedId>) -> ResolvedId {
        let id = self.nodes.push(ResolvedNode {
            label: label.clone(),
            deps,
        });
        self.label_to_id.insert(label, id);
        id
    }

    pub fn node(&self, id: ResolvedId) -> &ResolvedNode {
        &self.nodes[id]
    }

    pub fn lookup(&self, label: &str) -> Option<ResolvedId> {
        self.label_to_id.get(label).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = ResolvedId> {
        self.nodes.all_ids()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResolvedNode> {
        self.nodes.values()
    }
}

// label_to_id is derived from nodes, so content equality is node equality.
impl PartialEq for ResolvedGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}
impl Eq for ResolvedGraph {}

/// A resolved graph plus the resolved forms of the requested roots.
#[derive(Debug, Clone)]
pub struct ResolvedGraphAndRoots {
    pub graph: Arc<ResolvedGraph>,
    pub roots: Vec<ResolvedId>,
}

impl PartialEq for ResolvedGraphAndRoots {
    fn eq(&self, other: &Self) -> bool {
        self.graph == other.graph && self.roots == other.roots
    }
}
impl Eq for ResolvedGraphAndRoots {}
