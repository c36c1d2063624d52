// devstrap-core/src/graph/edge.rs

use serde::{Deserialize, Serialize};

use devstrap_common::{PlatformSet, ToolDependency};

/// Resolution state of one dependency edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeResolution {
    #[default]
    Pending,
    Satisfied,
    Unsatisfied,
    Conflicted,
    /// The dependency installs after its dependents; the edge no longer
    /// constrains ordering.
    Deferred,
    Failed,
}

/// A directed edge from a dependent tool to its dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraphEdge {
    pub from: String,
    pub to: String,
    pub dependency: ToolDependency,
    /// Priority tie-break weight; hard edges are cheapest.
    pub weight: u32,
    /// Platforms on which the edge applies.
    pub platforms: PlatformSet,
    pub resolution: EdgeResolution,
}

impl DependencyGraphEdge {
    pub fn new(from: impl Into<String>, dependency: ToolDependency) -> Self {
        let platforms = dependency.platforms.unwrap_or(PlatformSet::all());
        let weight = dependency.dep_type.weight();
        Self {
            from: from.into(),
            to: dependency.tool_id.clone(),
            dependency,
            weight,
            platforms,
            resolution: EdgeResolution::default(),
        }
    }

    /// Ordering constraints ignore deferred and excluded edges.
    pub fn constrains_order(&self) -> bool {
        !matches!(
            self.resolution,
            EdgeResolution::Deferred | EdgeResolution::Unsatisfied
        )
    }
}
