// devstrap-common/src/dependency.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::platform::PlatformSet;

/// How a dependent relates to its dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Required,
    Optional,
    Suggests,
    Conflicts,
}

impl DependencyType {
    /// Edge weight used for priority tie-breaks in weighted traversals.
    /// Hard edges are cheapest so they are honored first.
    pub fn weight(&self) -> u32 {
        match self {
            DependencyType::Required => 1,
            DependencyType::Optional => 2,
            DependencyType::Suggests => 3,
            DependencyType::Conflicts => u32::MAX,
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyType::Required => "required",
            DependencyType::Optional => "optional",
            DependencyType::Suggests => "suggests",
            DependencyType::Conflicts => "conflicts",
        };
        f.write_str(s)
    }
}

/// A typed dependency edge as declared in a tool manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDependency {
    pub tool_id: String,
    #[serde(rename = "type")]
    pub dep_type: DependencyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<String>,
    /// Platforms on which this edge applies. `None` means everywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<PlatformSet>,
}

impl ToolDependency {
    pub fn required(tool_id: impl Into<String>) -> Self {
        Self::new(tool_id, DependencyType::Required)
    }

    pub fn optional(tool_id: impl Into<String>) -> Self {
        Self::new(tool_id, DependencyType::Optional)
    }

    pub fn suggests(tool_id: impl Into<String>) -> Self {
        Self::new(tool_id, DependencyType::Suggests)
    }

    pub fn conflicts(tool_id: impl Into<String>) -> Self {
        Self::new(tool_id, DependencyType::Conflicts)
    }

    pub fn new(tool_id: impl Into<String>, dep_type: DependencyType) -> Self {
        Self {
            tool_id: tool_id.into(),
            dep_type,
            min_version: None,
            max_version: None,
            version_range: None,
            platforms: None,
        }
    }

    pub fn with_min_version(mut self, min: impl Into<String>) -> Self {
        self.min_version = Some(min.into());
        self
    }

    pub fn with_max_version(mut self, max: impl Into<String>) -> Self {
        self.max_version = Some(max.into());
        self
    }

    pub fn with_version_range(mut self, range: impl Into<String>) -> Self {
        self.version_range = Some(range.into());
        self
    }

    pub fn with_platforms(mut self, platforms: PlatformSet) -> Self {
        self.platforms = Some(platforms);
        self
    }

    /// True when the edge carries any version requirement at all.
    pub fn has_version_constraint(&self) -> bool {
        self.min_version.is_some() || self.max_version.is_some() || self.version_range.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::platform::Platform;

    #[test]
    fn builder_helpers_set_type() {
        assert_eq!(
            ToolDependency::required("node").dep_type,
            DependencyType::Required
        );
        assert_eq!(
            ToolDependency::suggests("eslint").dep_type,
            DependencyType::Suggests
        );
    }

    #[test]
    fn platform_restriction_round_trips() {
        let dep = ToolDependency::optional("docker")
            .with_platforms(PlatformSet::from_platforms(&[Platform::Linux]));
        let json = serde_json::to_string(&dep).unwrap();
        let back: ToolDependency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dep);
    }

    #[test]
    fn constraint_presence() {
        assert!(!ToolDependency::required("node").has_version_constraint());
        assert!(ToolDependency::required("node")
            .with_min_version("16.0.0")
            .has_version_constraint());
    }
}
