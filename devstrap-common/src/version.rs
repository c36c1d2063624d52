// devstrap-common/src/version.rs

//! Version parsing and constraint checks, in one place so the detector,
//! resolver, and planner all agree on the rules.
//!
//! Catalog data is messy: manifests publish `"16"` or `"16.4"` as often as
//! full semver strings. Parsing is therefore lenient, padding missing
//! components with zeros before handing the string to `semver`. Pre-release
//! and build metadata are preserved and ordered by semver's rules.

use std::fmt;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::dependency::ToolDependency;
use crate::error::{DevstrapError, Result};

/// Parse a version string, padding partial versions (`"16"`, `"16.4"`) to
/// full semver form.
pub fn parse_lenient(input: &str) -> Result<Version> {
    let trimmed = input.trim().trim_start_matches(['v', 'V']);
    if trimmed.is_empty() {
        return Err(DevstrapError::Version("empty version string".to_string()));
    }

    if let Ok(version) = Version::parse(trimmed) {
        return Ok(version);
    }

    // Split off any pre-release/build suffix before padding.
    let split_at = trimmed
        .find(['-', '+'])
        .unwrap_or(trimmed.len());
    let (numeric, suffix) = trimmed.split_at(split_at);

    let padded = match numeric.split('.').count() {
        1 => format!("{numeric}.0.0{suffix}"),
        2 => format!("{numeric}.0{suffix}"),
        _ => trimmed.to_string(),
    };

    Version::parse(&padded).map_err(|e| {
        DevstrapError::Version(format!("cannot parse version '{input}': {e}"))
    })
}

/// Compare two version strings leniently.
pub fn compare(a: &str, b: &str) -> Result<std::cmp::Ordering> {
    Ok(parse_lenient(a)?.cmp(&parse_lenient(b)?))
}

/// The parsed form of one dependency edge's version requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req: Option<VersionReq>,
}

impl VersionConstraint {
    /// Extract the constraint carried by a dependency edge, if any.
    /// A malformed constraint is an error; the caller decides whether that
    /// is fatal or a diagnostic.
    pub fn from_dependency(dep: &ToolDependency) -> Result<Option<Self>> {
        if !dep.has_version_constraint() {
            return Ok(None);
        }
        let min = dep.min_version.as_deref().map(parse_lenient).transpose()?;
        let max = dep.max_version.as_deref().map(parse_lenient).transpose()?;
        let req = dep
            .version_range
            .as_deref()
            .map(|r| {
                VersionReq::parse(r).map_err(|e| {
                    DevstrapError::Version(format!("cannot parse version range '{r}': {e}"))
                })
            })
            .transpose()?;
        Ok(Some(Self { min, max, req }))
    }

    pub fn satisfied_by(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            if version < min {
                return false;
            }
        }
        if let Some(max) = &self.max {
            if version > max {
                return false;
            }
        }
        if let Some(req) = &self.req {
            if !req.matches(version) {
                return false;
            }
        }
        true
    }

    /// Convenience wrapper over a raw version string.
    pub fn satisfied_by_str(&self, version: &str) -> bool {
        match parse_lenient(version) {
            Ok(v) => self.satisfied_by(&v),
            Err(_) => false,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(min) = &self.min {
            parts.push(format!(">={min}"));
        }
        if let Some(max) = &self.max {
            parts.push(format!("<={max}"));
        }
        if let Some(req) = &self.req {
            parts.push(req.to_string());
        }
        if parts.is_empty() {
            f.write_str("*")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lenient_parse_pads_partial_versions() {
        assert_eq!(parse_lenient("16").unwrap(), Version::new(16, 0, 0));
        assert_eq!(parse_lenient("16.4").unwrap(), Version::new(16, 4, 0));
        assert_eq!(parse_lenient("v1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn lenient_parse_keeps_prerelease() {
        let v = parse_lenient("18-beta.1").unwrap();
        assert_eq!(v.major, 18);
        assert_eq!(v.pre.as_str(), "beta.1");
        // Pre-releases order below the release per semver.
        assert_eq!(compare("18.0.0-beta.1", "18.0.0").unwrap(), Ordering::Less);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_lenient("").is_err());
        assert!(parse_lenient("not-a-version").is_err());
    }

    #[test]
    fn min_max_bounds() {
        let dep = ToolDependency::required("node")
            .with_min_version("12.0.0")
            .with_max_version("14.0.0");
        let constraint = VersionConstraint::from_dependency(&dep).unwrap().unwrap();
        assert!(constraint.satisfied_by_str("12.0.0"));
        assert!(constraint.satisfied_by_str("13.2.0"));
        assert!(!constraint.satisfied_by_str("14.0.1"));
        assert!(!constraint.satisfied_by_str("11.9.0"));
        assert_eq!(constraint.to_string(), ">=12.0.0, <=14.0.0");
    }

    #[test]
    fn range_expression() {
        let dep = ToolDependency::required("python").with_version_range("^3.10");
        let constraint = VersionConstraint::from_dependency(&dep).unwrap().unwrap();
        assert!(constraint.satisfied_by_str("3.11.4"));
        assert!(!constraint.satisfied_by_str("4.0.0"));
    }

    #[test]
    fn unconstrained_edge_yields_none() {
        let dep = ToolDependency::required("node");
        assert!(VersionConstraint::from_dependency(&dep).unwrap().is_none());
    }

    #[test]
    fn malformed_constraint_is_an_error() {
        let dep = ToolDependency::required("node").with_min_version("oops");
        assert!(VersionConstraint::from_dependency(&dep).is_err());
    }
}
