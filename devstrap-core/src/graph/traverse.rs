// devstrap-core/src/graph/traverse.rs

//! Traversal algorithms over the dependency graph, behind one options
//! record so callers pick a strategy without caring about the mechanics.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use serde::{Deserialize, Serialize};

use super::{cycles, DependencyGraph, EdgeFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalAlgorithm {
    DepthFirst,
    BreadthFirst,
    Topological,
    Dijkstra,
    DependencyFirst,
    CategoryFirst,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitOrder {
    #[default]
    Pre,
    Post,
}

#[derive(Debug, Clone)]
pub struct TraversalOptions {
    pub algorithm: TraversalAlgorithm,
    /// Roots of the walk; empty means every node.
    pub start: Vec<String>,
    pub visit_order: VisitOrder,
    pub include_optional: bool,
    pub include_suggested: bool,
    pub detect_cycles: bool,
    /// Abort after visiting this many nodes.
    pub max_visits: Option<usize>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            algorithm: TraversalAlgorithm::DepthFirst,
            start: Vec::new(),
            visit_order: VisitOrder::default(),
            include_optional: true,
            include_suggested: false,
            detect_cycles: false,
            max_visits: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalResult {
    pub order: Vec<String>,
    pub cycles: Vec<Vec<String>>,
    /// False when `max_visits` stopped the walk early.
    pub completed: bool,
}

pub fn run(graph: &DependencyGraph, options: &TraversalOptions) -> TraversalResult {
    let filter = EdgeFilter {
        include_optional: options.include_optional,
        include_suggested: options.include_suggested,
        platform: None,
        respect_resolution: true,
    };
    let starts: Vec<String> = if options.start.is_empty() {
        graph.node_ids().map(str::to_string).collect()
    } else {
        options.start.clone()
    };
    let budget = options.max_visits.unwrap_or(usize::MAX);

    let (order, completed) = match options.algorithm {
        TraversalAlgorithm::DepthFirst => {
            depth_first(graph, &filter, &starts, options.visit_order, budget)
        }
        TraversalAlgorithm::DependencyFirst => {
            depth_first(graph, &filter, &starts, VisitOrder::Post, budget)
        }
        TraversalAlgorithm::BreadthFirst => breadth_first(graph, &filter, &starts, budget),
        TraversalAlgorithm::Topological => {
            let scope = graph.reachable_from(&starts, &filter);
            let result = graph.topological_order(&filter, Some(&scope));
            let complete = result.is_total() && result.order.len() <= budget;
            let mut order = result.order;
            order.truncate(budget);
            (order, complete)
        }
        TraversalAlgorithm::Dijkstra => dijkstra(graph, &filter, &starts, budget),
        TraversalAlgorithm::CategoryFirst => {
            let scope = graph.reachable_from(&starts, &filter);
            let mut order: Vec<String> = scope.into_iter().collect();
            order.sort_by_key(|id| {
                let priority = graph
                    .node(id)
                    .map(|n| n.manifest.category.priority())
                    .unwrap_or(u8::MAX);
                (priority, id.clone())
            });
            let complete = order.len() <= budget;
            order.truncate(budget);
            (order, complete)
        }
    };

    let cycles = if options.detect_cycles {
        let scope: BTreeSet<String> = order.iter().cloned().collect();
        cycles::detect_cycles(graph)
            .cycles
            .into_iter()
            .filter(|cycle| cycle.iter().all(|n| scope.contains(n)))
            .collect()
    } else {
        Vec::new()
    };

    TraversalResult {
        order,
        cycles,
        completed,
    }
}

fn depth_first(
    graph: &DependencyGraph,
    filter: &EdgeFilter,
    starts: &[String],
    visit_order: VisitOrder,
    budget: usize,
) -> (Vec<String>, bool) {
    let mut order = Vec::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();

    for start in starts {
        if !graph.contains(start) || visited.contains(start) {
            continue;
        }
        let mut stack: Vec<(String, usize)> = vec![(start.clone(), 0)];
        visited.insert(start.clone());
        if visit_order == VisitOrder::Pre {
            order.push(start.clone());
            if order.len() >= budget {
                return (order, false);
            }
        }
        while let Some((node, cursor)) = stack.last().cloned() {
            let mut neighbors: Vec<&str> = graph
                .outgoing_edges(&node)
                .into_iter()
                .filter(|e| filter.admits(e))
                .map(|e| e.to.as_str())
                .collect();
            neighbors.sort_unstable();
            neighbors.dedup();
            if cursor >= neighbors.len() {
                stack.pop();
                if visit_order == VisitOrder::Post {
                    order.push(node);
                    if order.len() >= budget {
                        return (order, false);
                    }
                }
                continue;
            }
            stack.last_mut().expect("nonempty").1 += 1;
            let next = neighbors[cursor];
            if visited.insert(next.to_string()) {
                stack.push((next.to_string(), 0));
                if visit_order == VisitOrder::Pre {
                    order.push(next.to_string());
                    if order.len() >= budget {
                        return (order, false);
                    }
                }
            }
        }
    }
    (order, true)
}

fn breadth_first(
    graph: &DependencyGraph,
    filter: &EdgeFilter,
    starts: &[String],
    budget: usize,
) -> (Vec<String>, bool) {
    let mut order = Vec::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for start in starts {
        if graph.contains(start) && visited.insert(start.clone()) {
            queue.push_back(start.clone());
        }
    }
    while let Some(node) = queue.pop_front() {
        order.push(node.clone());
        if order.len() >= budget {
            return (order, false);
        }
        let mut neighbors: Vec<&str> = graph
            .outgoing_edges(&node)
            .into_iter()
            .filter(|e| filter.admits(e))
            .map(|e| e.to.as_str())
            .collect();
        neighbors.sort_unstable();
        for next in neighbors {
            if visited.insert(next.to_string()) {
                queue.push_back(next.to_string());
            }
        }
    }
    (order, true)
}

/// Settle nodes by cheapest accumulated edge weight; ties break on id.
fn dijkstra(
    graph: &DependencyGraph,
    filter: &EdgeFilter,
    starts: &[String],
    budget: usize,
) -> (Vec<String>, bool) {
    let mut order = Vec::new();
    let mut best: BTreeMap<String, u64> = BTreeMap::new();
    let mut heap: BinaryHeap<Reverse<(u64, String)>> = BinaryHeap::new();

    for start in starts {
        if graph.contains(start) {
            best.insert(start.clone(), 0);
            heap.push(Reverse((0, start.clone())));
        }
    }
    let mut settled: BTreeSet<String> = BTreeSet::new();
    while let Some(Reverse((distance, node))) = heap.pop() {
        if !settled.insert(node.clone()) {
            continue;
        }
        order.push(node.clone());
        if order.len() >= budget {
            return (order, false);
        }
        for edge in graph.outgoing_edges(&node) {
            if !filter.admits(edge) {
                continue;
            }
            let candidate = distance + u64::from(edge.weight);
            let improved = best
                .get(&edge.to)
                .map(|&current| candidate < current)
                .unwrap_or(true);
            if improved {
                best.insert(edge.to.clone(), candidate);
                heap.push(Reverse((candidate, edge.to.clone())));
            }
        }
    }
    (order, true)
}
