// devstrap-core/src/detect/resource.rs

//! Resource conflict analysis: well-known exclusive resources (default TCP
//! ports, mostly) claimed by more than one reachable tool.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use devstrap_common::{ResolutionAction, Result};

use crate::graph::DependencyGraph;

use super::{
    Conflict, ConflictKind, ConflictSeverity, DetectionMetadata, DetectionOptions, PlatformImpact,
    SuggestedResolution,
};

/// Default exclusive resources per tool id.
static RESOURCE_CLAIMS: Lazy<BTreeMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    BTreeMap::from([
        ("postgres", &["tcp:5432"] as &[&str]),
        ("mysql", &["tcp:3306"]),
        ("mariadb", &["tcp:3306"]),
        ("redis", &["tcp:6379"]),
        ("mongodb", &["tcp:27017"]),
        ("elasticsearch", &["tcp:9200"]),
        ("nginx", &["tcp:80", "tcp:443"]),
        ("apache", &["tcp:80", "tcp:443"]),
        ("jenkins", &["tcp:8080"]),
    ])
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConflict {
    /// E.g. `"tcp:3306"`.
    pub resource: String,
    pub claimants: Vec<String>,
}

pub(super) fn analyze(
    graph: &DependencyGraph,
    reachable: &BTreeSet<String>,
    _targets: &[String],
    _options: &DetectionOptions,
) -> Result<Vec<Conflict>> {
    let mut claims: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for tool_id in reachable {
        if let Some(resources) = RESOURCE_CLAIMS.get(tool_id.as_str()) {
            for &resource in *resources {
                claims.entry(resource).or_default().push(tool_id.clone());
            }
        }
    }

    let mut conflicts = Vec::new();
    for (resource, claimants) in claims {
        if claimants.len() < 2 {
            continue;
        }
        let keep = super::exclusion::suggest_keeper(graph, &claimants);
        let suggested_resolutions = claimants
            .iter()
            .map(|claimant| {
                if *claimant == keep {
                    SuggestedResolution {
                        action: ResolutionAction::Configure,
                        tool_id: Some(claimant.clone()),
                        description: format!("move '{claimant}' off {resource}"),
                    }
                } else {
                    SuggestedResolution {
                        action: ResolutionAction::Remove,
                        tool_id: Some(claimant.clone()),
                        description: format!("drop '{claimant}' to free {resource}"),
                    }
                }
            })
            .collect();

        conflicts.push(Conflict {
            id: format!("resource-{resource}"),
            severity: ConflictSeverity::Major,
            tools: claimants.clone(),
            root_cause: format!("{} all claim {resource}", claimants.join(", ")),
            suggested_resolutions,
            platform_impact: vec![PlatformImpact {
                platform: graph.target_platform(),
                description: format!("{resource} can only be bound once"),
            }],
            blocking: true,
            metadata: DetectionMetadata::new("resource-table", 85),
            kind: ConflictKind::Resource(ResourceConflict {
                resource: resource.to_string(),
                claimants,
            }),
        });
    }
    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use devstrap_common::{
        Architecture, Platform, ToolCategory, ToolManifest, VersionInfo,
    };
    use pretty_assertions::assert_eq;

    use crate::builder::GraphBuilder;
    use crate::detect::{ConflictDetector, ConflictKind, DetectionOptions};

    fn db(id: &str) -> ToolManifest {
        ToolManifest::new(id, id, ToolCategory::Database).with_versions(VersionInfo::stable("1.0.0"))
    }

    #[test]
    fn shared_default_port_conflicts() {
        let manifests = vec![db("mysql"), db("mariadb")];
        let result = GraphBuilder::new(Platform::Linux, Architecture::X64).build(&manifests);
        let mut detector = ConflictDetector::new(DetectionOptions::default());
        let report = detector.detect(&result.graph, &["mysql".to_string(), "mariadb".to_string()]);

        // Both the exclusion rule and the port clash fire for this pair.
        let resource = report
            .conflicts
            .iter()
            .find_map(|c| match &c.kind {
                ConflictKind::Resource(r) => Some(r),
                _ => None,
            })
            .expect("resource conflict");
        assert_eq!(resource.resource, "tcp:3306");
        assert_eq!(resource.claimants, vec!["mariadb", "mysql"]);
    }

    #[test]
    fn distinct_ports_coexist() {
        let manifests = vec![db("postgres"), db("redis")];
        let result = GraphBuilder::new(Platform::Linux, Architecture::X64).build(&manifests);
        let mut detector = ConflictDetector::new(DetectionOptions::default());
        let report =
            detector.detect(&result.graph, &["postgres".to_string(), "redis".to_string()]);
        assert!(report.conflicts.is_empty());
        assert!(report.can_proceed);
    }
}
