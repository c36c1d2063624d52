// devstrap-core/src/detect/platform.rs

//! Platform incompatibility analysis: every reachable tool must support
//! the target platform and architecture. Alternatives come from the same
//! category elsewhere in the catalog.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use devstrap_common::{Architecture, Platform, ResolutionAction, Result};

use crate::graph::DependencyGraph;

use super::{
    Conflict, ConflictKind, ConflictSeverity, DetectionMetadata, DetectionOptions, PlatformImpact,
    SuggestedResolution,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConflict {
    pub tool_id: String,
    pub platform: Platform,
    pub architecture: Architecture,
    /// Same-category tools in the catalog that do support the target.
    pub alternatives: Vec<String>,
    pub workarounds: Vec<String>,
}

pub(super) fn analyze(
    graph: &DependencyGraph,
    reachable: &BTreeSet<String>,
    _targets: &[String],
    _options: &DetectionOptions,
) -> Result<Vec<Conflict>> {
    let platform = graph.target_platform();
    let architecture = graph.target_architecture();

    let mut conflicts = Vec::new();
    for tool_id in reachable {
        let Some(node) = graph.node(tool_id) else {
            continue;
        };
        let requirements = &node.manifest.system_requirements;
        let platform_ok = requirements.platforms.contains_platform(platform);
        let arch_ok = requirements.architectures.contains_architecture(architecture);
        if platform_ok && arch_ok {
            continue;
        }

        let alternatives: Vec<String> = graph
            .nodes()
            .filter(|candidate| candidate.tool_id() != tool_id)
            .filter(|candidate| candidate.manifest.category == node.manifest.category)
            .filter(|candidate| candidate.manifest.supports(platform, architecture))
            .map(|candidate| candidate.tool_id().to_string())
            .collect();

        let workarounds = if alternatives.is_empty() {
            vec![
                format!("run '{tool_id}' in a container or virtual machine"),
                format!("use a remote environment that supports '{tool_id}'"),
            ]
        } else {
            alternatives
                .iter()
                .map(|alt| format!("install '{alt}' instead of '{tool_id}'"))
                .collect()
        };

        let gap = if !platform_ok {
            format!("does not support {platform}")
        } else {
            format!("does not support {architecture} on {platform}")
        };

        let suggested_resolutions = match alternatives.first() {
            Some(alt) => vec![SuggestedResolution {
                action: ResolutionAction::Substitute,
                tool_id: Some(alt.clone()),
                description: format!("substitute '{alt}' for '{tool_id}'"),
            }],
            None => vec![SuggestedResolution {
                action: ResolutionAction::Remove,
                tool_id: Some(tool_id.clone()),
                description: format!("remove '{tool_id}' from the selection"),
            }],
        };

        conflicts.push(Conflict {
            id: format!("platform-{tool_id}"),
            severity: ConflictSeverity::Critical,
            tools: vec![tool_id.clone()],
            root_cause: format!("'{tool_id}' {gap}"),
            suggested_resolutions,
            platform_impact: vec![PlatformImpact {
                platform,
                description: format!("'{tool_id}' cannot be installed"),
            }],
            blocking: true,
            metadata: DetectionMetadata::new("system-requirements", 100),
            kind: ConflictKind::Platform(PlatformConflict {
                tool_id: tool_id.clone(),
                platform,
                architecture,
                alternatives,
                workarounds,
            }),
        });
    }
    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use devstrap_common::{
        ArchSet, PlatformSet, SystemRequirements, ToolCategory, ToolManifest, VersionInfo,
    };
    use pretty_assertions::assert_eq;

    use crate::builder::GraphBuilder;
    use crate::detect::{ConflictDetector, DetectionOptions};

    use super::*;

    fn windows_only(id: &str, category: ToolCategory) -> ToolManifest {
        ToolManifest::new(id, id, category)
            .with_versions(VersionInfo::stable("1.0.0"))
            .with_requirements(SystemRequirements {
                platforms: PlatformSet::WINDOWS,
                architectures: ArchSet::all(),
            })
    }

    #[test]
    fn unsupported_platform_is_critical_and_blocking() {
        let manifests = vec![windows_only("windows-tool", ToolCategory::Productivity)];
        let result = GraphBuilder::new(Platform::Linux, Architecture::X64).build(&manifests);
        let mut detector = ConflictDetector::new(DetectionOptions::default());
        let report = detector.detect(&result.graph, &["windows-tool".to_string()]);

        let incompatibilities = report.platform_incompatibilities();
        assert_eq!(incompatibilities.len(), 1);
        assert_eq!(incompatibilities[0].tool_id, "windows-tool");
        assert!(incompatibilities[0].alternatives.is_empty());
        assert!(!report.can_proceed);
        assert_eq!(
            report.conflicts[0].severity,
            crate::detect::ConflictSeverity::Critical
        );
    }

    #[test]
    fn alternatives_come_from_same_category() {
        let manifests = vec![
            windows_only("windows-editor", ToolCategory::Productivity),
            ToolManifest::new("cross-editor", "Cross Editor", ToolCategory::Productivity)
                .with_versions(VersionInfo::stable("2.0.0")),
            ToolManifest::new("postgres", "PostgreSQL", ToolCategory::Database)
                .with_versions(VersionInfo::stable("15.0.0")),
        ];
        let result = GraphBuilder::new(Platform::Linux, Architecture::X64).build(&manifests);
        let mut detector = ConflictDetector::new(DetectionOptions::default());
        let report = detector.detect(&result.graph, &["windows-editor".to_string()]);

        let incompatibilities = report.platform_incompatibilities();
        assert_eq!(incompatibilities[0].alternatives, vec!["cross-editor"]);
        assert_eq!(
            report.conflicts[0].suggested_resolutions[0].action,
            ResolutionAction::Substitute
        );
    }
}
