// devstrap-core/src/detect/exclusion.rs

//! Mutual exclusion analysis. Two sources: a built-in table of known
//! incompatible combinations, and `conflicts` entries declared in the
//! manifests themselves (collected into the graph's declared-conflicts
//! map at build time).

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use devstrap_common::{ResolutionAction, Result};

use crate::graph::DependencyGraph;

use super::{
    Conflict, ConflictKind, ConflictSeverity, DetectionMetadata, DetectionOptions, PlatformImpact,
    SuggestedResolution,
};

struct ExclusionRule {
    name: &'static str,
    members: &'static [&'static str],
    reason: &'static str,
}

static EXCLUSION_RULES: Lazy<Vec<ExclusionRule>> = Lazy::new(|| {
    vec![
        ExclusionRule {
            name: "container-runtime",
            members: &["docker", "podman"],
            reason: "competing container runtimes fight over the socket and CLI name",
        },
        ExclusionRule {
            name: "node-package-manager",
            members: &["yarn", "pnpm"],
            reason: "competing Node package managers corrupt each other's lockfiles",
        },
        ExclusionRule {
            name: "mysql-server",
            members: &["mysql", "mariadb"],
            reason: "drop-in MySQL forks install over the same data directory",
        },
        ExclusionRule {
            name: "python-major",
            members: &["python2", "python3"],
            reason: "incompatible Python major versions shadow each other on PATH",
        },
        ExclusionRule {
            name: "java-lts",
            members: &["openjdk-11", "openjdk-17", "openjdk-21"],
            reason: "multiple default JDKs leave JAVA_HOME ambiguous",
        },
    ]
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionConflict {
    /// Rule name, or `"declared"` for manifest-declared conflicts.
    pub rule: String,
    pub members_present: Vec<String>,
    pub reason: String,
}

pub(super) fn analyze(
    graph: &DependencyGraph,
    reachable: &BTreeSet<String>,
    _targets: &[String],
    _options: &DetectionOptions,
) -> Result<Vec<Conflict>> {
    let mut conflicts = Vec::new();

    for rule in EXCLUSION_RULES.iter() {
        let present: Vec<String> = rule
            .members
            .iter()
            .filter(|m| reachable.contains(**m))
            .map(|m| m.to_string())
            .collect();
        if present.len() >= 2 {
            conflicts.push(make_conflict(
                graph,
                format!("exclusion-{}", rule.name),
                rule.name.to_string(),
                present,
                rule.reason.to_string(),
            ));
        }
    }

    // Manifest-declared conflicts, deduplicated as unordered pairs.
    let mut seen_pairs: BTreeSet<(String, String)> = BTreeSet::new();
    for (tool, partners) in graph.declared_conflicts() {
        if !reachable.contains(tool) {
            continue;
        }
        for partner in partners {
            if !reachable.contains(partner) {
                continue;
            }
            let pair = if tool < partner {
                (tool.clone(), partner.clone())
            } else {
                (partner.clone(), tool.clone())
            };
            if !seen_pairs.insert(pair.clone()) {
                continue;
            }
            conflicts.push(make_conflict(
                graph,
                format!("exclusion-{}-{}", pair.0, pair.1),
                "declared".to_string(),
                vec![pair.0.clone(), pair.1.clone()],
                format!("'{}' declares a conflict with '{}'", tool, partner),
            ));
        }
    }

    Ok(conflicts)
}

fn make_conflict(
    graph: &DependencyGraph,
    id: String,
    rule: String,
    members_present: Vec<String>,
    reason: String,
) -> Conflict {
    let keep = suggest_keeper(graph, &members_present);
    let suggested_resolutions = members_present
        .iter()
        .filter(|m| **m != keep)
        .map(|m| SuggestedResolution {
            action: ResolutionAction::Remove,
            tool_id: Some(m.clone()),
            description: format!("keep '{keep}' and drop '{m}'"),
        })
        .collect();

    Conflict {
        id,
        severity: ConflictSeverity::Major,
        tools: members_present.clone(),
        root_cause: reason.clone(),
        suggested_resolutions,
        platform_impact: vec![PlatformImpact {
            platform: graph.target_platform(),
            description: format!("{} cannot coexist", members_present.join(" and ")),
        }],
        blocking: true,
        metadata: DetectionMetadata::new("exclusion-table", 90),
        kind: ConflictKind::MutualExclusion(ExclusionConflict {
            rule,
            members_present,
            reason,
        }),
    }
}

/// The member worth keeping: most depended-upon wins, ties go to the
/// lexicographically first.
pub(crate) fn suggest_keeper(graph: &DependencyGraph, members: &[String]) -> String {
    members
        .iter()
        .max_by(|a, b| {
            let da = graph.node(a).map(|n| n.dependent_count).unwrap_or(0);
            let db = graph.node(b).map(|n| n.dependent_count).unwrap_or(0);
            da.cmp(&db).then(b.cmp(a))
        })
        .cloned()
        .unwrap_or_default()
}
