// devstrap-core/src/detect/version.rs

//! Version conflict analysis: for every reachable node, intersect the
//! version requirements arriving over reachable edges. An empty
//! intersection (no published version satisfies them all) is a conflict;
//! a compromise version satisfying at least the configured share of
//! requirements is reported when one exists.

use std::collections::BTreeSet;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::warn;

use devstrap_common::version::{parse_lenient, VersionConstraint};
use devstrap_common::{DependencyType, PlatformSet, ResolutionAction, Result};

use crate::graph::{DependencyGraph, EdgeFilter};

use super::{
    Conflict, ConflictKind, ConflictSeverity, DetectionMetadata, DetectionOptions, PlatformImpact,
    SuggestedResolution,
};

/// One tool's requirement on a version-conflicted node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRequirement {
    pub required_by: String,
    pub constraint: String,
    /// True when the requiring edge is `required`.
    pub strict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<PlatformSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionConflict {
    pub tool_id: String,
    pub requirements: Vec<VersionRequirement>,
    /// Best version satisfying at least the compromise threshold, if any.
    pub compromise_version: Option<String>,
}

pub(super) fn analyze(
    graph: &DependencyGraph,
    reachable: &BTreeSet<String>,
    _targets: &[String],
    options: &DetectionOptions,
) -> Result<Vec<Conflict>> {
    let filter = EdgeFilter {
        include_optional: options.include_optional,
        include_suggested: options.include_suggested,
        platform: Some(graph.target_platform()),
        respect_resolution: true,
    };

    let mut conflicts = Vec::new();
    for tool_id in reachable {
        let Some(node) = graph.node(tool_id) else {
            continue;
        };

        let mut requirements: Vec<(VersionRequirement, VersionConstraint)> = Vec::new();
        for edge in graph.incoming_edges(tool_id) {
            if !reachable.contains(&edge.from) || !filter.admits(edge) {
                continue;
            }
            match VersionConstraint::from_dependency(&edge.dependency) {
                Ok(Some(constraint)) => {
                    requirements.push((
                        VersionRequirement {
                            required_by: edge.from.clone(),
                            constraint: constraint.to_string(),
                            strict: edge.dependency.dep_type == DependencyType::Required,
                            platforms: edge.dependency.platforms,
                        },
                        constraint,
                    ));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(from = %edge.from, to = %tool_id, "skipping malformed constraint: {e}");
                }
            }
        }
        if requirements.is_empty() {
            continue;
        }

        let candidates: Vec<(String, Version)> = node
            .manifest
            .version_info
            .all_versions()
            .into_iter()
            .filter_map(|raw| parse_lenient(&raw).ok().map(|v| (raw, v)))
            .collect();

        let satisfies_all = candidates
            .iter()
            .any(|(_, v)| requirements.iter().all(|(_, c)| c.satisfied_by(v)));
        if satisfies_all {
            continue;
        }

        let compromise = best_compromise(&candidates, &requirements, options.compromise_threshold);
        let blocking = requirements.iter().any(|(r, _)| r.strict);
        let requirements: Vec<VersionRequirement> =
            requirements.into_iter().map(|(r, _)| r).collect();

        let root_cause = format!(
            "no published version of '{tool_id}' satisfies all {} requirements ({})",
            requirements.len(),
            requirements
                .iter()
                .map(|r| format!("{}: {}", r.required_by, r.constraint))
                .collect::<Vec<_>>()
                .join("; ")
        );
        let suggested_resolutions = suggest(tool_id, node.effective_version(), compromise.as_deref());

        conflicts.push(Conflict {
            id: format!("version-{tool_id}"),
            kind: ConflictKind::Version(VersionConflict {
                tool_id: tool_id.clone(),
                requirements,
                compromise_version: compromise,
            }),
            severity: ConflictSeverity::Major,
            tools: {
                let mut tools = vec![tool_id.clone()];
                tools.extend(
                    conflicts_requiring(graph, tool_id, reachable, &filter),
                );
                tools
            },
            root_cause,
            suggested_resolutions,
            platform_impact: vec![PlatformImpact {
                platform: graph.target_platform(),
                description: format!("'{tool_id}' cannot be pinned to a single version"),
            }],
            blocking,
            metadata: DetectionMetadata::new("constraint-intersection", 95),
        });
    }
    Ok(conflicts)
}

fn conflicts_requiring(
    graph: &DependencyGraph,
    tool_id: &str,
    reachable: &BTreeSet<String>,
    filter: &EdgeFilter,
) -> Vec<String> {
    graph
        .incoming_edges(tool_id)
        .into_iter()
        .filter(|e| reachable.contains(&e.from) && filter.admits(e))
        .filter(|e| e.dependency.has_version_constraint())
        .map(|e| e.from.clone())
        .collect()
}

/// The candidate satisfying the largest share of requirements, provided it
/// reaches the threshold. Ties go to the highest version.
fn best_compromise(
    candidates: &[(String, Version)],
    requirements: &[(VersionRequirement, VersionConstraint)],
    threshold: f64,
) -> Option<String> {
    let total = requirements.len();
    if total == 0 {
        return None;
    }
    candidates
        .iter()
        .map(|(raw, v)| {
            let satisfied = requirements.iter().filter(|(_, c)| c.satisfied_by(v)).count();
            (raw, v, satisfied)
        })
        .filter(|(_, _, satisfied)| (*satisfied as f64) / (total as f64) >= threshold)
        .max_by(|(_, va, sa), (_, vb, sb)| sa.cmp(sb).then(va.cmp(vb)))
        .map(|(raw, _, _)| raw.clone())
}

fn suggest(
    tool_id: &str,
    current: &str,
    compromise: Option<&str>,
) -> Vec<SuggestedResolution> {
    match compromise {
        Some(version) => {
            let action = match devstrap_common::version::compare(version, current) {
                Ok(std::cmp::Ordering::Less) => ResolutionAction::Downgrade,
                _ => ResolutionAction::Upgrade,
            };
            vec![SuggestedResolution {
                action,
                tool_id: Some(tool_id.to_string()),
                description: format!("pin '{tool_id}' to {version}"),
            }]
        }
        None => vec![SuggestedResolution {
            action: ResolutionAction::Remove,
            tool_id: Some(tool_id.to_string()),
            description: format!(
                "drop one of the tools constraining '{tool_id}' so the rest can agree"
            ),
        }],
    }
}
