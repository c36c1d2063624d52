// devstrap-core/src/builder.rs

//! Manifest ingestion. Validation is best-effort: every violation becomes a
//! coded diagnostic and construction keeps going, so one broken manifest
//! never hides the rest of the catalog from the caller.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use devstrap_common::version::VersionConstraint;
use devstrap_common::{
    codes, Architecture, DependencyType, Diagnostic, Platform, ToolManifest,
};

use crate::graph::{DependencyGraph, DependencyGraphEdge, EdgeFilter, InstallationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub include_optional: bool,
    pub include_suggested: bool,
    pub max_nodes: Option<usize>,
    pub validate_during_construction: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            include_optional: true,
            include_suggested: false,
            max_nodes: None,
            validate_during_construction: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatistics {
    pub manifests_processed: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub dependencies_resolved: usize,
    pub construction_time: Duration,
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub graph: DependencyGraph,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub statistics: BuildStatistics,
}

impl BuildResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct GraphBuilder {
    target_platform: Platform,
    target_architecture: Architecture,
    options: BuildOptions,
}

impl GraphBuilder {
    pub fn new(target_platform: Platform, target_architecture: Architecture) -> Self {
        Self {
            target_platform,
            target_architecture,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Does the edge survive the include flags? `conflicts` entries never
    /// become dependency edges; they land in the declared-conflicts map.
    fn admits_dependency(&self, dep_type: DependencyType) -> bool {
        match dep_type {
            DependencyType::Required => true,
            DependencyType::Optional => self.options.include_optional,
            DependencyType::Suggests => self.options.include_suggested,
            DependencyType::Conflicts => false,
        }
    }

    pub fn build(&self, manifests: &[ToolManifest]) -> BuildResult {
        let started = Instant::now();
        let mut graph = DependencyGraph::new(self.target_platform, self.target_architecture);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut statistics = BuildStatistics {
            manifests_processed: manifests.len(),
            ..BuildStatistics::default()
        };

        // Pass 1: nodes.
        for (index, manifest) in manifests.iter().enumerate() {
            let path = format!("manifests[{index}]");
            if self.options.validate_during_construction
                && !self.validate_manifest(manifest, &path, &mut errors, &mut warnings)
            {
                continue;
            }
            if let Some(max) = self.options.max_nodes {
                if graph.node_count() >= max {
                    errors.push(Diagnostic::error(
                        codes::MAX_NODES_EXCEEDED,
                        format!("node budget of {max} exhausted"),
                        path,
                    ));
                    break;
                }
            }
            if !graph.insert_node(manifest.clone()) {
                errors.push(Diagnostic::error(
                    codes::DUPLICATE_TOOL,
                    format!("tool id '{}' appears more than once", manifest.tool_id),
                    path,
                ));
                continue;
            }
            statistics.nodes_created += 1;
        }

        // Pass 2: edges, now that every endpoint that can exist does.
        for manifest in manifests {
            if graph.node(&manifest.tool_id).is_none() {
                continue;
            }
            self.wire_dependencies(&mut graph, manifest, &mut errors, &mut warnings, &mut statistics);
        }

        self.accumulate_constraints(&mut graph);
        graph.annotate_order(&EdgeFilter {
            include_optional: self.options.include_optional,
            include_suggested: self.options.include_suggested,
            platform: Some(self.target_platform),
            respect_resolution: true,
        });

        statistics.construction_time = started.elapsed();
        debug!(
            nodes = statistics.nodes_created,
            edges = statistics.edges_created,
            errors = errors.len(),
            warnings = warnings.len(),
            "graph constructed"
        );
        BuildResult {
            graph,
            errors,
            warnings,
            statistics,
        }
    }

    /// Returns false when the manifest is too broken to become a node.
    fn validate_manifest(
        &self,
        manifest: &ToolManifest,
        path: &str,
        errors: &mut Vec<Diagnostic>,
        warnings: &mut Vec<Diagnostic>,
    ) -> bool {
        let mut ok = true;
        if manifest.tool_id.trim().is_empty() {
            errors.push(Diagnostic::error(
                codes::MISSING_TOOL_ID,
                "manifest has no tool id",
                path,
            ));
            ok = false;
        }
        if manifest.name.trim().is_empty() {
            errors.push(Diagnostic::error(
                codes::MISSING_TOOL_NAME,
                format!("tool '{}' has no display name", manifest.tool_id),
                path,
            ));
            ok = false;
        }
        if manifest.system_requirements.platforms.is_empty() {
            errors.push(Diagnostic::error(
                codes::EMPTY_PLATFORM_SET,
                format!("tool '{}' supports no platforms", manifest.tool_id),
                path,
            ));
            ok = false;
        }
        if manifest.system_requirements.architectures.is_empty() {
            errors.push(Diagnostic::error(
                codes::EMPTY_ARCH_SET,
                format!("tool '{}' supports no architectures", manifest.tool_id),
                path,
            ));
            ok = false;
        }
        if ok
            && !manifest
                .system_requirements
                .platforms
                .contains_platform(self.target_platform)
        {
            warnings.push(Diagnostic::warning(
                codes::PLATFORM_INCOMPATIBLE,
                format!(
                    "tool '{}' does not support {}",
                    manifest.tool_id, self.target_platform
                ),
                path,
            ));
        }
        ok
    }

    fn wire_dependencies(
        &self,
        graph: &mut DependencyGraph,
        manifest: &ToolManifest,
        errors: &mut Vec<Diagnostic>,
        warnings: &mut Vec<Diagnostic>,
        statistics: &mut BuildStatistics,
    ) {
        for (index, dep) in manifest.dependencies.iter().enumerate() {
            let path = format!("{}.dependencies[{index}]", manifest.tool_id);
            if dep.tool_id.trim().is_empty() {
                errors.push(Diagnostic::error(
                    codes::INVALID_DEPENDENCY,
                    format!("tool '{}' declares a dependency with no target", manifest.tool_id),
                    path,
                ));
                continue;
            }
            if dep.dep_type == DependencyType::Conflicts {
                graph.record_declared_conflict(manifest.tool_id.clone(), dep.tool_id.clone());
                continue;
            }
            if dep.tool_id == manifest.tool_id {
                errors.push(Diagnostic::error(
                    codes::CIRCULAR_DEPENDENCIES,
                    format!("tool '{}' depends on itself", manifest.tool_id),
                    path,
                ));
                continue;
            }
            if !self.admits_dependency(dep.dep_type) {
                continue;
            }
            if !graph.contains(&dep.tool_id) {
                if dep.dep_type == DependencyType::Required {
                    errors.push(Diagnostic::error(
                        codes::MISSING_REQUIRED_DEPENDENCY,
                        format!(
                            "tool '{}' requires unknown tool '{}'",
                            manifest.tool_id, dep.tool_id
                        ),
                        path,
                    ));
                } else {
                    warnings.push(Diagnostic::warning(
                        codes::MISSING_DEPENDENCY,
                        format!(
                            "tool '{}' references unknown tool '{}'; edge skipped",
                            manifest.tool_id, dep.tool_id
                        ),
                        path,
                    ));
                }
                continue;
            }
            if graph.insert_edge(DependencyGraphEdge::new(manifest.tool_id.clone(), dep.clone())) {
                statistics.edges_created += 1;
                statistics.dependencies_resolved += 1;
            }
        }
    }

    /// Fold each admitted edge's version requirement onto its target node.
    /// Rebuilt from scratch so incremental adds stay idempotent.
    fn accumulate_constraints(&self, graph: &mut DependencyGraph) {
        let ids: Vec<String> = graph.node_ids().map(str::to_string).collect();
        for id in &ids {
            if let Some(node) = graph.node_mut(id) {
                node.version_state.constraints.clear();
            }
        }
        let mut parsed: Vec<(String, VersionConstraint)> = Vec::new();
        for edge in graph.edges() {
            match VersionConstraint::from_dependency(&edge.dependency) {
                Ok(Some(constraint)) => parsed.push((edge.to.clone(), constraint)),
                Ok(None) => {}
                Err(e) => warn!(
                    from = %edge.from,
                    to = %edge.to,
                    "unparseable version constraint ignored: {e}"
                ),
            }
        }
        for (to, constraint) in parsed {
            if let Some(node) = graph.node_mut(&to) {
                node.version_state.constraints.push(constraint);
            }
        }
    }

    /// Incrementally add one manifest to an existing graph. Edges from
    /// already-present manifests that pointed at this id are wired up too.
    /// Returns false (leaving the graph untouched) when validation fails or
    /// the id already exists.
    pub fn add(&self, graph: &mut DependencyGraph, manifest: &ToolManifest) -> bool {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        if self.options.validate_during_construction
            && !self.validate_manifest(manifest, &manifest.tool_id, &mut errors, &mut warnings)
        {
            return false;
        }
        if !graph.insert_node(manifest.clone()) {
            return false;
        }

        let mut statistics = BuildStatistics::default();
        self.wire_dependencies(graph, manifest, &mut errors, &mut warnings, &mut statistics);

        // Dangling references from existing nodes now have a target.
        let dependents: Vec<ToolManifest> = graph
            .nodes()
            .filter(|n| n.manifest.tool_id != manifest.tool_id)
            .filter(|n| {
                n.manifest
                    .dependencies
                    .iter()
                    .any(|d| d.tool_id == manifest.tool_id && d.dep_type != DependencyType::Conflicts)
            })
            .map(|n| n.manifest.clone())
            .collect();
        for dependent in dependents {
            for dep in &dependent.dependencies {
                if dep.tool_id == manifest.tool_id
                    && self.admits_dependency(dep.dep_type)
                    && dep.dep_type != DependencyType::Conflicts
                {
                    graph.insert_edge(DependencyGraphEdge::new(
                        dependent.tool_id.clone(),
                        dep.clone(),
                    ));
                }
            }
        }
        self.accumulate_constraints(graph);
        true
    }

    /// Remove a tool and its edges from an existing graph.
    pub fn remove(&self, graph: &mut DependencyGraph, tool_id: &str) -> bool {
        graph.remove_node(tool_id)
    }

    /// Mark already-present tools so planners can skip them.
    pub fn apply_installed(&self, graph: &mut DependencyGraph, installed: &BTreeSet<String>) {
        for id in installed {
            if let Some(node) = graph.node_mut(id) {
                node.installation_status = InstallationStatus::Installed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use devstrap_common::{
        ArchSet, PlatformSet, SystemRequirements, ToolCategory, ToolDependency, VersionInfo,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    fn tool(id: &str, category: ToolCategory) -> ToolManifest {
        ToolManifest::new(id, id, category).with_versions(VersionInfo::stable("1.0.0"))
    }

    fn builder() -> GraphBuilder {
        GraphBuilder::new(Platform::Linux, Architecture::X64)
    }

    #[test]
    fn clean_catalog_builds_without_diagnostics() {
        let manifests = vec![
            tool("node", ToolCategory::Language),
            tool("npm", ToolCategory::Language)
                .with_dependency(ToolDependency::required("node")),
        ];
        let result = builder().build(&manifests);
        assert!(result.success());
        assert!(result.warnings.is_empty());
        assert_eq!(result.statistics.nodes_created, 2);
        assert_eq!(result.statistics.edges_created, 1);
        assert_eq!(result.graph.node("node").unwrap().dependent_count, 1);
    }

    #[test]
    fn missing_id_and_name_are_errors() {
        let mut nameless = tool("", ToolCategory::Language);
        nameless.name = String::new();
        let result = builder().build(&[nameless]);
        assert!(!result.success());
        let got: Vec<&str> = result.errors.iter().map(|e| e.code.as_str()).collect();
        assert!(got.contains(&codes::MISSING_TOOL_ID));
        assert!(got.contains(&codes::MISSING_TOOL_NAME));
    }

    #[test]
    fn empty_platform_set_is_an_error() {
        let broken = tool("ghost", ToolCategory::Backend).with_requirements(SystemRequirements {
            platforms: PlatformSet::empty(),
            architectures: ArchSet::all(),
        });
        let result = builder().build(&[broken]);
        assert_eq!(result.errors[0].code, codes::EMPTY_PLATFORM_SET);
    }

    #[test]
    fn foreign_platform_warns_but_builds() {
        let windows_only = tool("windows-tool", ToolCategory::Productivity).with_requirements(
            SystemRequirements {
                platforms: PlatformSet::WINDOWS,
                architectures: ArchSet::all(),
            },
        );
        let result = builder().build(&[windows_only]);
        assert!(result.success());
        assert_eq!(result.warnings[0].code, codes::PLATFORM_INCOMPATIBLE);
        assert!(result.graph.contains("windows-tool"));
    }

    #[test]
    fn unknown_optional_dependency_warns_and_skips_edge() {
        let manifests = vec![
            tool("app", ToolCategory::Frontend).with_dependency(ToolDependency::optional("ghost")),
        ];
        let result = builder().build(&manifests);
        assert!(result.success());
        assert_eq!(result.warnings[0].code, codes::MISSING_DEPENDENCY);
        assert_eq!(result.graph.edge_count(), 0);
    }

    #[test]
    fn unknown_required_dependency_is_an_error_but_graph_survives() {
        let manifests = vec![
            tool("app", ToolCategory::Frontend).with_dependency(ToolDependency::required("ghost")),
        ];
        let result = builder().build(&manifests);
        assert!(!result.success());
        assert_eq!(result.errors[0].code, codes::MISSING_REQUIRED_DEPENDENCY);
        assert!(result.graph.contains("app"));
    }

    #[test]
    fn duplicate_tool_id_is_an_error() {
        let result = builder().build(&[
            tool("node", ToolCategory::Language),
            tool("node", ToolCategory::Language),
        ]);
        assert!(!result.success());
        assert_eq!(result.errors[0].code, codes::DUPLICATE_TOOL);
    }

    #[test]
    fn self_loop_is_a_circular_error() {
        let manifests =
            vec![tool("ouroboros", ToolCategory::Backend)
                .with_dependency(ToolDependency::required("ouroboros"))];
        let result = builder().build(&manifests);
        assert!(!result.success());
        assert_eq!(result.errors[0].code, codes::CIRCULAR_DEPENDENCIES);
        assert_eq!(result.graph.edge_count(), 0);
    }

    #[test]
    fn conflicts_entries_never_become_edges() {
        let manifests = vec![
            tool("mysql", ToolCategory::Database).with_dependency(ToolDependency::conflicts("mariadb")),
            tool("mariadb", ToolCategory::Database),
        ];
        let result = builder().build(&manifests);
        assert!(result.success());
        assert_eq!(result.graph.edge_count(), 0);
        assert_eq!(result.graph.declared_conflicts()["mysql"], vec!["mariadb"]);
    }

    #[test]
    fn suggested_edges_admitted_only_on_request() {
        let manifests = vec![
            tool("app", ToolCategory::Frontend).with_dependency(ToolDependency::suggests("eslint")),
            tool("eslint", ToolCategory::Testing),
        ];
        let default_build = builder().build(&manifests);
        assert_eq!(default_build.graph.edge_count(), 0);

        let eager = builder()
            .with_options(BuildOptions {
                include_suggested: true,
                ..BuildOptions::default()
            })
            .build(&manifests);
        assert_eq!(eager.graph.edge_count(), 1);
    }

    #[test]
    fn max_nodes_budget_stops_construction() {
        let manifests: Vec<ToolManifest> = (0..5)
            .map(|i| tool(&format!("tool-{i}"), ToolCategory::Backend))
            .collect();
        let result = builder()
            .with_options(BuildOptions {
                max_nodes: Some(3),
                ..BuildOptions::default()
            })
            .build(&manifests);
        assert!(!result.success());
        assert_eq!(result.graph.node_count(), 3);
        assert_eq!(result.errors[0].code, codes::MAX_NODES_EXCEEDED);
    }

    #[test]
    fn incremental_add_wires_dangling_dependents() {
        let manifests = vec![
            tool("app", ToolCategory::Frontend).with_dependency(ToolDependency::optional("docker")),
        ];
        let b = builder();
        let mut result = b.build(&manifests);
        assert_eq!(result.graph.edge_count(), 0);

        assert!(b.add(&mut result.graph, &tool("docker", ToolCategory::Infrastructure)));
        assert_eq!(result.graph.edge_count(), 1);
        assert!(result.graph.edge_between("app", "docker").is_some());

        assert!(b.remove(&mut result.graph, "docker"));
        assert_eq!(result.graph.edge_count(), 0);
    }

    #[test]
    fn version_constraints_accumulate_on_target_nodes() {
        let manifests = vec![
            tool("node", ToolCategory::Language),
            tool("react-app", ToolCategory::Frontend)
                .with_dependency(ToolDependency::required("node").with_min_version("16.0.0")),
            tool("legacy-tool", ToolCategory::Backend).with_dependency(
                ToolDependency::required("node")
                    .with_min_version("12.0.0")
                    .with_max_version("14.0.0"),
            ),
        ];
        let result = builder().build(&manifests);
        let node = result.graph.node("node").unwrap();
        assert_eq!(node.version_state.constraints.len(), 2);
    }
}
