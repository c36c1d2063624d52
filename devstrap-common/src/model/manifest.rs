// devstrap-common/src/model/manifest.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dependency::ToolDependency;
use crate::model::category::ToolCategory;
use crate::model::platform::{ArchSet, Platform, PlatformSet};

/// Version metadata published for a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub stable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended: Option<String>,
    /// Ordered oldest-first, as published by the catalog.
    #[serde(default)]
    pub available_versions: Vec<String>,
}

impl VersionInfo {
    pub fn stable(version: impl Into<String>) -> Self {
        let stable = version.into();
        Self {
            available_versions: vec![stable.clone()],
            stable,
            latest: None,
            recommended: None,
        }
    }

    /// Every version the catalog knows about, deduplicated, including the
    /// named stable/latest/recommended entries.
    pub fn all_versions(&self) -> Vec<String> {
        let mut out = self.available_versions.clone();
        for named in [Some(&self.stable), self.latest.as_ref(), self.recommended.as_ref()]
            .into_iter()
            .flatten()
        {
            if !out.iter().any(|v| v == named) {
                out.push(named.clone());
            }
        }
        out
    }
}

/// Platform and architecture support declared by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRequirements {
    pub platforms: PlatformSet,
    pub architectures: ArchSet,
}

impl SystemRequirements {
    pub fn supports(&self, platform: Platform, arch: crate::model::platform::Architecture) -> bool {
        self.platforms.contains_platform(platform) && self.architectures.contains_architecture(arch)
    }
}

/// Structured metadata for one installable tool.
///
/// Installation recipes are opaque to the resolver core; they are handed
/// unchanged to the platform installers, so the payload stays a raw JSON
/// value keyed by platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    pub tool_id: String,
    pub name: String,
    pub category: ToolCategory,
    #[serde(default)]
    pub system_requirements: SystemRequirements,
    #[serde(default)]
    pub version_info: VersionInfo,
    #[serde(default)]
    pub installation_recipes: BTreeMap<Platform, serde_json::Value>,
    #[serde(default)]
    pub dependencies: Vec<ToolDependency>,
}

impl ToolManifest {
    pub fn new(
        tool_id: impl Into<String>,
        name: impl Into<String>,
        category: ToolCategory,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            category,
            system_requirements: SystemRequirements::default(),
            version_info: VersionInfo::default(),
            installation_recipes: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_versions(mut self, info: VersionInfo) -> Self {
        self.version_info = info;
        self
    }

    pub fn with_requirements(mut self, requirements: SystemRequirements) -> Self {
        self.system_requirements = requirements;
        self
    }

    pub fn with_dependency(mut self, dependency: ToolDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_recipe(mut self, platform: Platform, recipe: serde_json::Value) -> Self {
        self.installation_recipes.insert(platform, recipe);
        self
    }

    pub fn supports(&self, platform: Platform, arch: crate::model::platform::Architecture) -> bool {
        self.system_requirements.supports(platform, arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::platform::Architecture;

    #[test]
    fn all_versions_merges_named_entries() {
        let info = VersionInfo {
            stable: "18.0.0".into(),
            latest: Some("20.1.0".into()),
            recommended: Some("18.0.0".into()),
            available_versions: vec!["16.0.0".into(), "18.0.0".into()],
        };
        let all = info.all_versions();
        assert_eq!(all, vec!["16.0.0", "18.0.0", "20.1.0"]);
    }

    #[test]
    fn default_requirements_support_everything() {
        let manifest = ToolManifest::new("node", "Node.js", ToolCategory::Language);
        assert!(manifest.supports(Platform::Linux, Architecture::X64));
        assert!(manifest.supports(Platform::Windows, Architecture::Arm64));
    }

    #[test]
    fn manifest_serde_round_trip() {
        let manifest = ToolManifest::new("docker", "Docker", ToolCategory::Infrastructure)
            .with_versions(VersionInfo::stable("24.0.0"))
            .with_dependency(crate::dependency::ToolDependency::optional("containerd"))
            .with_recipe(
                Platform::Linux,
                serde_json::json!({"method": "apt", "package": "docker.io"}),
            );
        let json = serde_json::to_string(&manifest).unwrap();
        let back: ToolManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
    }
}
