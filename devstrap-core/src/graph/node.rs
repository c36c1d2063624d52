// devstrap-core/src/graph/node.rs

use serde::{Deserialize, Serialize};

use devstrap_common::version::VersionConstraint;
use devstrap_common::ToolManifest;

/// Where a tool stands relative to the host system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallationStatus {
    #[default]
    NotInstalled,
    Installed,
    Pending,
    Failed,
}

/// Traversal bookkeeping. Reset between analyses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalState {
    #[default]
    Unvisited,
    Visiting,
    Visited,
    Resolved,
    Failed,
}

/// Version constraints accumulated from incoming edges, plus the pin the
/// resolver eventually chooses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeVersionState {
    pub constraints: Vec<VersionConstraint>,
    pub resolved_version: Option<String>,
}

/// One tool in the dependency graph. The manifest is immutable after
/// construction; everything else is derived state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraphNode {
    pub manifest: ToolManifest,
    pub installation_status: InstallationStatus,
    pub version_state: NodeVersionState,
    /// Position assigned by the last successful topological sort.
    pub topo_order: Option<usize>,
    /// Longest admitted-edge distance from any root dependent.
    pub depth: usize,
    pub dependent_count: usize,
    pub traversal_state: TraversalState,
}

impl DependencyGraphNode {
    pub fn new(manifest: ToolManifest) -> Self {
        Self {
            manifest,
            installation_status: InstallationStatus::default(),
            version_state: NodeVersionState::default(),
            topo_order: None,
            depth: 0,
            dependent_count: 0,
            traversal_state: TraversalState::default(),
        }
    }

    pub fn tool_id(&self) -> &str {
        &self.manifest.tool_id
    }

    /// The version the plan will install: the resolver's pin when present,
    /// the catalog stable otherwise.
    pub fn effective_version(&self) -> &str {
        self.version_state
            .resolved_version
            .as_deref()
            .unwrap_or(&self.manifest.version_info.stable)
    }
}

#[cfg(test)]
mod tests {
    use devstrap_common::{ToolCategory, ToolManifest, VersionInfo};

    use super::*;

    #[test]
    fn effective_version_prefers_pin() {
        let manifest = ToolManifest::new("node", "Node.js", ToolCategory::Language)
            .with_versions(VersionInfo::stable("18.0.0"));
        let mut node = DependencyGraphNode::new(manifest);
        assert_eq!(node.effective_version(), "18.0.0");
        node.version_state.resolved_version = Some("20.1.0".into());
        assert_eq!(node.effective_version(), "20.1.0");
    }
}
