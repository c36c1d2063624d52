// devstrap-core/src/graph/mod.rs

//! Typed dependency multigraph.
//!
//! Storage is an arena: nodes live in an id-keyed map, edges in a flat
//! vector, and each node carries index lists into that vector. Cycles are
//! data (edge types), never pointer cycles. The graph is read-mostly after
//! construction; the detector and resolver clone it before touching derived
//! state.

pub mod cycles;
pub mod edge;
pub mod node;
pub mod traverse;

use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};
use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::debug;

use devstrap_common::{
    Architecture, DependencyType, Platform, ToolCategory, ToolManifest,
};

pub use cycles::CycleReport;
pub use edge::{DependencyGraphEdge, EdgeResolution};
pub use node::{DependencyGraphNode, InstallationStatus, NodeVersionState, TraversalState};
pub use traverse::{TraversalAlgorithm, TraversalOptions, TraversalResult};

/// Which edges an operation follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeFilter {
    pub include_optional: bool,
    pub include_suggested: bool,
    /// When set, edges restricted to other platforms are skipped.
    pub platform: Option<Platform>,
    /// When true, deferred and excluded edges are not followed.
    pub respect_resolution: bool,
}

impl Default for EdgeFilter {
    fn default() -> Self {
        Self {
            include_optional: true,
            include_suggested: false,
            platform: None,
            respect_resolution: true,
        }
    }
}

impl EdgeFilter {
    pub fn required_only() -> Self {
        Self {
            include_optional: false,
            include_suggested: false,
            ..Self::default()
        }
    }

    pub fn admits(&self, edge: &DependencyGraphEdge) -> bool {
        match edge.dependency.dep_type {
            DependencyType::Required => {}
            DependencyType::Optional if self.include_optional => {}
            DependencyType::Suggests if self.include_suggested => {}
            _ => return false,
        }
        if let Some(platform) = self.platform {
            if !edge.platforms.contains_platform(platform) {
                return false;
            }
        }
        if self.respect_resolution && !edge.constrains_order() {
            return false;
        }
        true
    }
}

/// Outcome of a topological sort attempt.
#[derive(Debug, Clone, Default)]
pub struct TopoResult {
    /// Dependencies first, dependents last.
    pub order: Vec<String>,
    /// Nodes left on a cycle; empty on success.
    pub cyclic: Vec<String>,
}

impl TopoResult {
    pub fn is_total(&self) -> bool {
        self.cyclic.is_empty()
    }
}

/// Aggregate numbers over the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub max_depth: usize,
    pub category_distribution: BTreeMap<ToolCategory, usize>,
    pub edge_type_distribution: BTreeMap<DependencyType, usize>,
    pub strongly_connected_components: usize,
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    target_platform: Platform,
    target_architecture: Architecture,
    nodes: BTreeMap<String, DependencyGraphNode>,
    edges: Vec<DependencyGraphEdge>,
    outgoing: BTreeMap<String, Vec<usize>>,
    incoming: BTreeMap<String, Vec<usize>>,
    /// `conflicts`-typed manifest entries. Never dependency edges; the
    /// mutual-exclusion analyzer consumes them.
    declared_conflicts: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new(target_platform: Platform, target_architecture: Architecture) -> Self {
        Self {
            target_platform,
            target_architecture,
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
            declared_conflicts: BTreeMap::new(),
        }
    }

    pub fn target_platform(&self) -> Platform {
        self.target_platform
    }

    pub fn target_architecture(&self) -> Architecture {
        self.target_architecture
    }

    // ---- construction ------------------------------------------------------

    /// Insert a node. Returns false when the id is already present.
    pub fn insert_node(&mut self, manifest: ToolManifest) -> bool {
        let id = manifest.tool_id.clone();
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id.clone(), DependencyGraphNode::new(manifest));
        self.outgoing.entry(id.clone()).or_default();
        self.incoming.entry(id).or_default();
        true
    }

    /// Insert an edge. Both endpoints must exist, and at most one edge is
    /// kept per (from, to, platform-restriction) triple.
    pub fn insert_edge(&mut self, edge: DependencyGraphEdge) -> bool {
        if !self.nodes.contains_key(&edge.from) || !self.nodes.contains_key(&edge.to) {
            return false;
        }
        let duplicate = self.outgoing[&edge.from].iter().any(|&i| {
            let existing = &self.edges[i];
            existing.to == edge.to && existing.platforms == edge.platforms
        });
        if duplicate {
            debug!(from = %edge.from, to = %edge.to, "duplicate edge skipped");
            return false;
        }
        let index = self.edges.len();
        self.outgoing.get_mut(&edge.from).expect("endpoint exists").push(index);
        self.incoming.get_mut(&edge.to).expect("endpoint exists").push(index);
        if let Some(node) = self.nodes.get_mut(&edge.to) {
            node.dependent_count += 1;
        }
        self.edges.push(edge);
        true
    }

    /// Remove a node and every edge touching it. Returns false when absent.
    pub fn remove_node(&mut self, tool_id: &str) -> bool {
        if self.nodes.remove(tool_id).is_none() {
            return false;
        }
        self.outgoing.remove(tool_id);
        self.incoming.remove(tool_id);
        self.declared_conflicts.remove(tool_id);
        for partners in self.declared_conflicts.values_mut() {
            partners.retain(|p| p != tool_id);
        }
        self.edges.retain(|e| e.from != tool_id && e.to != tool_id);
        self.reindex();
        true
    }

    /// Rebuild edge index lists and dependent counts after edge removal.
    fn reindex(&mut self) {
        for list in self.outgoing.values_mut() {
            list.clear();
        }
        for list in self.incoming.values_mut() {
            list.clear();
        }
        for node in self.nodes.values_mut() {
            node.dependent_count = 0;
        }
        for (index, edge) in self.edges.iter().enumerate() {
            self.outgoing.entry(edge.from.clone()).or_default().push(index);
            self.incoming.entry(edge.to.clone()).or_default().push(index);
            if let Some(node) = self.nodes.get_mut(&edge.to) {
                node.dependent_count += 1;
            }
        }
    }

    pub fn record_declared_conflict(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.declared_conflicts
            .entry(from.into())
            .or_default()
            .push(to.into());
    }

    pub fn declared_conflicts(&self) -> &BTreeMap<String, Vec<String>> {
        &self.declared_conflicts
    }

    // ---- queries -----------------------------------------------------------

    pub fn contains(&self, tool_id: &str) -> bool {
        self.nodes.contains_key(tool_id)
    }

    pub fn node(&self, tool_id: &str) -> Option<&DependencyGraphNode> {
        self.nodes.get(tool_id)
    }

    pub fn node_mut(&mut self, tool_id: &str) -> Option<&mut DependencyGraphNode> {
        self.nodes.get_mut(tool_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node ids in lexicographic order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyGraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[DependencyGraphEdge] {
        &self.edges
    }

    pub fn edge_between(&self, from: &str, to: &str) -> Option<&DependencyGraphEdge> {
        self.outgoing
            .get(from)?
            .iter()
            .map(|&i| &self.edges[i])
            .find(|e| e.to == to)
    }

    pub fn edge_between_mut(&mut self, from: &str, to: &str) -> Option<&mut DependencyGraphEdge> {
        let index = self
            .outgoing
            .get(from)?
            .iter()
            .copied()
            .find(|&i| self.edges[i].to == to)?;
        Some(&mut self.edges[index])
    }

    pub fn outgoing_edges(&self, tool_id: &str) -> Vec<&DependencyGraphEdge> {
        self.outgoing
            .get(tool_id)
            .map(|list| list.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    pub fn incoming_edges(&self, tool_id: &str) -> Vec<&DependencyGraphEdge> {
        self.incoming
            .get(tool_id)
            .map(|list| list.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// True when a directed path exists over non-excluded edges.
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        if from == to {
            return true;
        }
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for &index in self.outgoing.get(current).into_iter().flatten() {
                let edge = &self.edges[index];
                if edge.resolution == EdgeResolution::Unsatisfied {
                    continue;
                }
                if edge.to == to {
                    return true;
                }
                if seen.insert(&edge.to) {
                    queue.push_back(&edge.to);
                }
            }
        }
        false
    }

    /// Closure of `targets` under admitted outgoing edges. Deterministic for
    /// a given filter: expansion is breadth-first over sorted ids.
    pub fn reachable_from(&self, targets: &[String], filter: &EdgeFilter) -> BTreeSet<String> {
        let mut reachable: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        for target in targets {
            if self.contains(target) && reachable.insert(target.clone()) {
                queue.push_back(target.clone());
            }
        }
        while let Some(current) = queue.pop_front() {
            for &index in self.outgoing.get(&current).into_iter().flatten() {
                let edge = &self.edges[index];
                if !filter.admits(edge) {
                    continue;
                }
                if reachable.insert(edge.to.clone()) {
                    queue.push_back(edge.to.clone());
                }
            }
        }
        reachable
    }

    // ---- ordering ----------------------------------------------------------

    /// Kahn's algorithm, dependencies first. Ties break on
    /// (category priority, tool id), which makes the order fully
    /// deterministic. Nodes still holding unplaced dependencies when the
    /// ready heap drains are on a cycle and come back in `cyclic`.
    pub fn topological_order(
        &self,
        filter: &EdgeFilter,
        within: Option<&BTreeSet<String>>,
    ) -> TopoResult {
        let in_scope = |id: &str| within.map(|set| set.contains(id)).unwrap_or(true);

        // Remaining admitted dependencies per node.
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        for id in self.nodes.keys().filter(|id| in_scope(id.as_str())) {
            let count = self.outgoing[id.as_str()]
                .iter()
                .map(|&i| &self.edges[i])
                .filter(|e| filter.admits(e) && in_scope(&e.to))
                .count();
            pending.insert(id.as_str(), count);
        }

        let mut ready: BinaryHeap<Reverse<(u8, &str)>> = pending
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&id, _)| Reverse((self.nodes[id].manifest.category.priority(), id)))
            .collect();

        let mut order = Vec::with_capacity(pending.len());
        while let Some(Reverse((_, id))) = ready.pop() {
            order.push(id.to_string());
            for &index in self.incoming.get(id).into_iter().flatten() {
                let edge = &self.edges[index];
                if !filter.admits(edge) || !in_scope(&edge.from) {
                    continue;
                }
                let remaining = pending.get_mut(edge.from.as_str()).expect("in scope");
                *remaining -= 1;
                if *remaining == 0 {
                    ready.push(Reverse((
                        self.nodes[&edge.from].manifest.category.priority(),
                        edge.from.as_str(),
                    )));
                }
            }
        }

        let cyclic: Vec<String> = pending
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&id, _)| id.to_string())
            .collect();
        TopoResult { order, cyclic }
    }

    /// Run a full-graph sort and write `topo_order` and `depth` back onto the
    /// nodes. Cyclic nodes keep `topo_order = None`.
    pub fn annotate_order(&mut self, filter: &EdgeFilter) {
        let result = self.topological_order(filter, None);
        for node in self.nodes.values_mut() {
            node.topo_order = None;
            node.depth = 0;
        }
        // Depth = longest admitted path from a dependent; walk dependencies
        // in reverse placement order so dependents are already final.
        let mut depths: BTreeMap<String, usize> = BTreeMap::new();
        for id in result.order.iter().rev() {
            let depth = self
                .incoming
                .get(id)
                .into_iter()
                .flatten()
                .map(|&i| &self.edges[i])
                .filter(|e| filter.admits(e))
                .filter_map(|e| depths.get(&e.from).map(|d| d + 1))
                .max()
                .unwrap_or(0);
            depths.insert(id.clone(), depth);
        }
        for (position, id) in result.order.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.topo_order = Some(position);
                node.depth = depths.get(id).copied().unwrap_or(0);
            }
        }
    }

    /// Reset per-analysis traversal bookkeeping.
    pub fn reset_traversal_state(&mut self) {
        for node in self.nodes.values_mut() {
            node.traversal_state = TraversalState::Unvisited;
        }
    }

    // ---- statistics --------------------------------------------------------

    pub fn statistics(&self) -> GraphStatistics {
        let mut category_distribution: BTreeMap<ToolCategory, usize> = BTreeMap::new();
        for node in self.nodes.values() {
            *category_distribution.entry(node.manifest.category).or_default() += 1;
        }
        let mut edge_type_distribution: BTreeMap<DependencyType, usize> = BTreeMap::new();
        for edge in &self.edges {
            *edge_type_distribution.entry(edge.dependency.dep_type).or_default() += 1;
        }
        let filter = EdgeFilter {
            include_optional: true,
            include_suggested: true,
            platform: None,
            respect_resolution: false,
        };
        let mut scratch = self.clone();
        scratch.annotate_order(&filter);
        let max_depth = scratch.nodes.values().map(|n| n.depth).max().unwrap_or(0);

        GraphStatistics {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            max_depth,
            category_distribution,
            edge_type_distribution,
            strongly_connected_components: cycles::strongly_connected_components(self),
        }
    }

    pub fn detect_cycles(&self) -> CycleReport {
        cycles::detect_cycles(self)
    }

    pub fn traverse(&self, options: &TraversalOptions) -> TraversalResult {
        traverse::run(self, options)
    }
}
