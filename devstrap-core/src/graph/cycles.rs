// devstrap-core/src/graph/cycles.rs

//! Cycle enumeration and strongly-connected-component counting.
//!
//! Cycles are reported in canonical rotation (smallest node id first) and
//! deduplicated, so repeated detection runs yield identical reports.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::{DependencyGraph, EdgeFilter, EdgeResolution};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub has_cycles: bool,
    pub cycles: Vec<Vec<String>>,
}

/// Rotate a cycle so its smallest node id comes first.
pub(crate) fn canonicalize(mut cycle: Vec<String>) -> Vec<String> {
    if cycle.is_empty() {
        return cycle;
    }
    let min_index = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle.rotate_left(min_index);
    cycle
}

/// Enumerate cycles via iterative DFS with an explicit recursion stack.
/// Every back edge yields the cycle from the first on-stack occurrence to
/// the current node. Deferred and excluded edges no longer participate.
pub fn detect_cycles(graph: &DependencyGraph) -> CycleReport {
    let filter = EdgeFilter {
        include_optional: true,
        include_suggested: true,
        platform: None,
        respect_resolution: true,
    };

    let mut found: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();

    for start in graph.node_ids() {
        if visited.contains(start) {
            continue;
        }
        // Frame: (node, next outgoing edge position).
        let mut stack: Vec<(String, usize)> = vec![(start.to_string(), 0)];
        let mut path: Vec<String> = vec![start.to_string()];
        let mut on_path: BTreeSet<String> = BTreeSet::from([start.to_string()]);
        visited.insert(start.to_string());

        while let Some((node, cursor)) = stack.last().cloned() {
            let outgoing = graph.outgoing_edges(&node);
            if cursor >= outgoing.len() {
                stack.pop();
                path.pop();
                on_path.remove(&node);
                continue;
            }
            stack.last_mut().expect("nonempty").1 += 1;

            let edge = outgoing[cursor];
            if !filter.admits(edge) {
                continue;
            }
            if on_path.contains(&edge.to) {
                let from_index = path.iter().position(|n| *n == edge.to).expect("on path");
                found.insert(canonicalize(path[from_index..].to_vec()));
                continue;
            }
            if visited.insert(edge.to.clone()) {
                stack.push((edge.to.clone(), 0));
                path.push(edge.to.clone());
                on_path.insert(edge.to.clone());
            }
        }
    }

    let cycles: Vec<Vec<String>> = found.into_iter().collect();
    CycleReport {
        has_cycles: !cycles.is_empty(),
        cycles,
    }
}

/// Count strongly connected components (Kosaraju, iterative). Singletons
/// count; the number equals the node count exactly when the graph is
/// acyclic.
pub fn strongly_connected_components(graph: &DependencyGraph) -> usize {
    let ids: Vec<&str> = graph.node_ids().collect();
    let index: BTreeMap<&str, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    let mut reverse: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    for edge in graph.edges() {
        if edge.resolution == EdgeResolution::Unsatisfied {
            continue;
        }
        let (Some(&f), Some(&t)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            continue;
        };
        forward[f].push(t);
        reverse[t].push(f);
    }

    // Pass 1: finish order on the forward graph.
    let mut finish: Vec<usize> = Vec::with_capacity(ids.len());
    let mut visited = vec![false; ids.len()];
    for root in 0..ids.len() {
        if visited[root] {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        visited[root] = true;
        while let Some(&(node, cursor)) = stack.last() {
            if cursor >= forward[node].len() {
                stack.pop();
                finish.push(node);
                continue;
            }
            stack.last_mut().expect("nonempty").1 += 1;
            let next = forward[node][cursor];
            if !visited[next] {
                visited[next] = true;
                stack.push((next, 0));
            }
        }
    }

    // Pass 2: sweep the reverse graph in reverse finish order.
    let mut component = vec![false; ids.len()];
    let mut count = 0;
    for &root in finish.iter().rev() {
        if component[root] {
            continue;
        }
        count += 1;
        let mut queue = VecDeque::from([root]);
        component[root] = true;
        while let Some(node) = queue.pop_front() {
            for &next in &reverse[node] {
                if !component[next] {
                    component[next] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    count
}
