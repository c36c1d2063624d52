// devstrap-core/src/detect/circular.rs

//! Circular dependency analysis. Cycles are enumerated by iterative DFS
//! from each target, then scored for break-points: soft edges (optional,
//! suggests) can be deferred or dropped to dissolve the cycle; a cycle of
//! only required edges cannot be broken automatically.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use devstrap_common::{DependencyType, ResolutionAction, Result};

use crate::graph::{cycles::canonicalize, DependencyGraph, EdgeFilter};

use super::{
    Conflict, ConflictKind, ConflictSeverity, DetectionMetadata, DetectionOptions, PlatformImpact,
    SuggestedResolution,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakStrategy {
    /// Keep the edge but postpone it: the dependency installs after its
    /// dependents.
    Defer,
    /// Downgrade a `suggests` edge out of the plan entirely.
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleImpact {
    Low,
    Moderate,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakPoint {
    pub from: String,
    pub to: String,
    pub dep_type: DependencyType,
    pub strategy: BreakStrategy,
    /// 0-100; lower is cheaper to break.
    pub impact: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularConflict {
    /// Canonical rotation, smallest id first.
    pub cycle: Vec<String>,
    pub breakable: bool,
    pub break_points: Vec<BreakPoint>,
    pub impact: CycleImpact,
}

/// Numeric cost of breaking an edge of the given type.
pub(crate) fn break_impact(dep_type: DependencyType) -> u8 {
    let mut impact: i32 = 50;
    match dep_type {
        DependencyType::Required => impact += 40,
        DependencyType::Optional => impact -= 20,
        DependencyType::Suggests => impact -= 30,
        DependencyType::Conflicts => {}
    }
    impact.clamp(0, 100) as u8
}

pub(super) fn analyze(
    graph: &DependencyGraph,
    reachable: &BTreeSet<String>,
    targets: &[String],
    options: &DetectionOptions,
) -> Result<Vec<Conflict>> {
    let filter = EdgeFilter {
        include_optional: options.include_optional,
        include_suggested: options.include_suggested,
        platform: Some(graph.target_platform()),
        respect_resolution: true,
    };

    let mut found: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();

    // Thorough analysis sweeps every reachable node, catching cycles that
    // no DFS tree rooted at a target happens to enter first.
    let mut starts: Vec<String> = targets.to_vec();
    if options.thorough_analysis {
        starts.extend(reachable.iter().cloned());
    }

    for start in &starts {
        if !graph.contains(start) || visited.contains(start) {
            continue;
        }
        let mut stack: Vec<(String, usize)> = vec![(start.clone(), 0)];
        let mut path: Vec<String> = vec![start.clone()];
        let mut on_path: BTreeSet<String> = BTreeSet::from([start.clone()]);
        visited.insert(start.clone());

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
            if !filter.admits(edge) || !reachable.contains(&edge.to) {
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

    let conflicts = found
        .into_iter()
        .map(|cycle| conflict_for_cycle(graph, cycle))
        .collect();
    Ok(conflicts)
}

fn conflict_for_cycle(graph: &DependencyGraph, cycle: Vec<String>) -> Conflict {
    let mut break_points = Vec::new();
    let mut required_edges = 0usize;
    let len = cycle.len();

    for i in 0..len {
        let from = &cycle[i];
        let to = &cycle[(i + 1) % len];
        let Some(edge) = graph.edge_between(from, to) else {
            continue;
        };
        match edge.dependency.dep_type {
            DependencyType::Required => required_edges += 1,
            DependencyType::Optional => break_points.push(BreakPoint {
                from: from.clone(),
                to: to.clone(),
                dep_type: DependencyType::Optional,
                strategy: BreakStrategy::Defer,
                impact: break_impact(DependencyType::Optional),
            }),
            DependencyType::Suggests => break_points.push(BreakPoint {
                from: from.clone(),
                to: to.clone(),
                dep_type: DependencyType::Suggests,
                strategy: BreakStrategy::Optional,
                impact: break_impact(DependencyType::Suggests),
            }),
            DependencyType::Conflicts => {}
        }
    }
    break_points.sort_by(|a, b| a.impact.cmp(&b.impact).then(a.from.cmp(&b.from)));

    let breakable = !break_points.is_empty();
    let impact = if required_edges == len {
        CycleImpact::Critical
    } else if required_edges * 2 > len {
        CycleImpact::Moderate
    } else {
        CycleImpact::Low
    };
    let severity = match impact {
        CycleImpact::Critical => ConflictSeverity::Critical,
        CycleImpact::Moderate => ConflictSeverity::Major,
        CycleImpact::Low => ConflictSeverity::Minor,
    };

    let suggested_resolutions = break_points
        .first()
        .map(|bp| {
            vec![SuggestedResolution {
                action: match bp.strategy {
                    BreakStrategy::Defer => ResolutionAction::Defer,
                    BreakStrategy::Optional => ResolutionAction::Configure,
                },
                tool_id: Some(bp.to.clone()),
                description: format!(
                    "break the cycle at {} -> {} ({} edge)",
                    bp.from, bp.to, bp.dep_type
                ),
            }]
        })
        .unwrap_or_default();

    let display = cycle.join(" -> ");
    Conflict {
        id: format!("circular-{}", cycle.join("-")),
        severity,
        tools: cycle.clone(),
        root_cause: format!("dependency cycle: {display} -> {}", cycle[0]),
        suggested_resolutions,
        platform_impact: vec![PlatformImpact {
            platform: graph.target_platform(),
            description: format!("cycle {display} blocks ordering"),
        }],
        blocking: !breakable,
        metadata: DetectionMetadata::new("dfs-back-edge", 100),
        kind: ConflictKind::Circular(CircularConflict {
            cycle,
            breakable,
            break_points,
            impact,
        }),
    }
}
