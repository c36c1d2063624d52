// devstrap-core/src/detect/mod.rs

//! Conflict detection. Five fixed analyzers run over the reachable
//! subgraph; their findings are unioned into one report. Detection is
//! best-effort: an analyzer blowing up does not abort the others, it
//! surfaces as a single synthetic detection-failure conflict.

pub mod circular;
pub mod exclusion;
pub mod platform;
pub mod resource;
pub mod version;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use devstrap_common::{Architecture, Platform, ResolutionAction};

use crate::graph::{DependencyGraph, EdgeFilter};

pub use circular::{BreakPoint, BreakStrategy, CircularConflict, CycleImpact};
pub use exclusion::ExclusionConflict;
pub use platform::PlatformConflict;
pub use resource::ResourceConflict;
pub use version::{VersionConflict, VersionRequirement};

/// Conflict severity; later variants rank higher.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Warning,
    Minor,
    Major,
    Critical,
}

/// Closed sum of conflict kinds; the payloads carry the analyzer-specific
/// detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ConflictKind {
    Version(VersionConflict),
    Circular(CircularConflict),
    Platform(PlatformConflict),
    MutualExclusion(ExclusionConflict),
    Resource(ResourceConflict),
    DetectionFailure { message: String },
}

impl ConflictKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConflictKind::Version(_) => "version",
            ConflictKind::Circular(_) => "circular",
            ConflictKind::Platform(_) => "platform",
            ConflictKind::MutualExclusion(_) => "mutual-exclusion",
            ConflictKind::Resource(_) => "resource",
            ConflictKind::DetectionFailure { .. } => "detection-failure",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionMetadata {
    pub detected_at: DateTime<Utc>,
    pub method: String,
    /// 0-100.
    pub confidence: u8,
}

/// Equality ignores the timestamp: repeated detection over the same inputs
/// must compare identical.
impl PartialEq for DetectionMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.confidence == other.confidence
    }
}

impl DetectionMetadata {
    pub fn new(method: impl Into<String>, confidence: u8) -> Self {
        Self {
            detected_at: Utc::now(),
            method: method.into(),
            confidence: confidence.min(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedResolution {
    pub action: ResolutionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformImpact {
    pub platform: Platform,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Stable, content-derived id, e.g. `"version-node"`.
    pub id: String,
    #[serde(flatten)]
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub tools: Vec<String>,
    pub root_cause: String,
    pub suggested_resolutions: Vec<SuggestedResolution>,
    pub platform_impact: Vec<PlatformImpact>,
    pub blocking: bool,
    pub metadata: DetectionMetadata,
}

/// The §4.4 priority order: severity desc, blocking desc, id lex.
pub(crate) fn priority_sort(conflicts: &mut [Conflict]) {
    conflicts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.blocking.cmp(&a.blocking))
            .then(a.id.cmp(&b.id))
    });
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStatistics {
    pub targets: usize,
    pub reachable_nodes: usize,
    pub edges_analyzed: usize,
    pub conflicts_by_kind: BTreeMap<String, usize>,
    pub detection_time: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    /// `None` when the report is clean.
    pub overall_severity: Option<ConflictSeverity>,
    /// True iff no blocking conflict was found.
    pub can_proceed: bool,
    pub statistics: DetectionStatistics,
    pub recommendations: Vec<String>,
}

impl ConflictReport {
    pub fn clean(statistics: DetectionStatistics) -> Self {
        Self {
            conflicts: Vec::new(),
            overall_severity: None,
            can_proceed: true,
            statistics,
            recommendations: Vec::new(),
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn blocking_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| c.blocking)
    }

    pub fn version_conflicts(&self) -> Vec<&VersionConflict> {
        self.conflicts
            .iter()
            .filter_map(|c| match &c.kind {
                ConflictKind::Version(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn circular_conflicts(&self) -> Vec<&CircularConflict> {
        self.conflicts
            .iter()
            .filter_map(|c| match &c.kind {
                ConflictKind::Circular(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn platform_incompatibilities(&self) -> Vec<&PlatformConflict> {
        self.conflicts
            .iter()
            .filter_map(|c| match &c.kind {
                ConflictKind::Platform(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOptions {
    pub enable_caching: bool,
    pub thorough_analysis: bool,
    pub include_optional: bool,
    pub include_suggested: bool,
    /// Fraction of requirements a compromise version must satisfy.
    pub compromise_threshold: f64,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            enable_caching: true,
            thorough_analysis: false,
            include_optional: true,
            include_suggested: false,
            compromise_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    targets: Vec<String>,
    platform: Platform,
    architecture: Architecture,
    thorough: bool,
    include_optional: bool,
    include_suggested: bool,
    threshold_permille: u32,
}

pub struct ConflictDetector {
    options: DetectionOptions,
    cache: HashMap<CacheKey, ConflictReport>,
}

impl ConflictDetector {
    pub fn new(options: DetectionOptions) -> Self {
        Self {
            options,
            cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &DetectionOptions {
        &self.options
    }

    fn cache_key(&self, graph: &DependencyGraph, targets: &[String]) -> CacheKey {
        let mut sorted: Vec<String> = targets.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        CacheKey {
            targets: sorted,
            platform: graph.target_platform(),
            architecture: graph.target_architecture(),
            thorough: self.options.thorough_analysis,
            include_optional: self.options.include_optional,
            include_suggested: self.options.include_suggested,
            threshold_permille: (self.options.compromise_threshold * 1000.0) as u32,
        }
    }

    fn edge_filter(&self, graph: &DependencyGraph) -> EdgeFilter {
        EdgeFilter {
            include_optional: self.options.include_optional,
            include_suggested: self.options.include_suggested,
            platform: Some(graph.target_platform()),
            respect_resolution: true,
        }
    }

    /// Analyze the reachable closure of `targets` for all five conflict
    /// kinds. Idempotent for identical inputs.
    pub fn detect(&mut self, graph: &DependencyGraph, targets: &[String]) -> ConflictReport {
        let key = self.cache_key(graph, targets);
        if self.options.enable_caching {
            if let Some(hit) = self.cache.get(&key) {
                debug!(targets = targets.len(), "conflict report served from cache");
                return hit.clone();
            }
        }

        let started = Instant::now();
        let filter = self.edge_filter(graph);
        let reachable = graph.reachable_from(targets, &filter);

        let mut conflicts: Vec<Conflict> = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        let analyzers: [(&str, AnalyzerFn); 5] = [
            ("version", version::analyze),
            ("circular", circular::analyze),
            ("platform", platform::analyze),
            ("mutual-exclusion", exclusion::analyze),
            ("resource", resource::analyze),
        ];
        for (name, analyze) in analyzers {
            match analyze(graph, &reachable, targets, &self.options) {
                Ok(mut found) => conflicts.append(&mut found),
                Err(e) => {
                    error!(analyzer = name, "conflict analyzer failed: {e}");
                    failures.push(format!("{name}: {e}"));
                }
            }
        }

        if !failures.is_empty() {
            let message = failures.join("; ");
            conflicts.push(Conflict {
                id: "detection-failure".to_string(),
                kind: ConflictKind::DetectionFailure {
                    message: message.clone(),
                },
                severity: ConflictSeverity::Critical,
                tools: targets.to_vec(),
                root_cause: message,
                suggested_resolutions: Vec::new(),
                platform_impact: Vec::new(),
                blocking: true,
                metadata: DetectionMetadata::new("analyzer-failure", 100),
            });
        }

        priority_sort(&mut conflicts);

        let mut conflicts_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for conflict in &conflicts {
            *conflicts_by_kind.entry(conflict.kind.name().to_string()).or_default() += 1;
        }
        let statistics = DetectionStatistics {
            targets: targets.len(),
            reachable_nodes: reachable.len(),
            edges_analyzed: graph.edge_count(),
            conflicts_by_kind,
            detection_time: started.elapsed(),
        };

        let report = ConflictReport {
            overall_severity: conflicts.iter().map(|c| c.severity).max(),
            can_proceed: !conflicts.iter().any(|c| c.blocking),
            recommendations: recommendations(&conflicts),
            conflicts,
            statistics,
        };

        if self.options.enable_caching {
            self.cache.insert(key, report.clone());
        }
        report
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

type AnalyzerFn = fn(
    &DependencyGraph,
    &BTreeSet<String>,
    &[String],
    &DetectionOptions,
) -> devstrap_common::Result<Vec<Conflict>>;

fn recommendations(conflicts: &[Conflict]) -> Vec<String> {
    let mut out = Vec::new();
    for conflict in conflicts {
        match &conflict.kind {
            ConflictKind::Version(v) => {
                if let Some(compromise) = &v.compromise_version {
                    out.push(format!(
                        "Pin '{}' to {compromise}, which satisfies most requirements.",
                        v.tool_id
                    ));
                } else {
                    out.push(format!(
                        "Review the version requirements on '{}'; no published version satisfies them all.",
                        v.tool_id
                    ));
                }
            }
            ConflictKind::Circular(c) if c.breakable => out.push(format!(
                "The cycle {} can be broken by deferring a soft dependency.",
                c.cycle.join(" -> ")
            )),
            ConflictKind::Circular(c) => out.push(format!(
                "The cycle {} has only required edges and needs manual untangling.",
                c.cycle.join(" -> ")
            )),
            ConflictKind::Platform(p) if !p.alternatives.is_empty() => out.push(format!(
                "'{}' is unavailable here; consider '{}' instead.",
                p.tool_id, p.alternatives[0]
            )),
            ConflictKind::Platform(p) => out.push(format!(
                "'{}' is unavailable on this platform and has no known alternative.",
                p.tool_id
            )),
            ConflictKind::MutualExclusion(m) => out.push(format!(
                "Install only one of: {}.",
                m.members_present.join(", ")
            )),
            ConflictKind::Resource(r) => out.push(format!(
                "{} all claim {}; reconfigure or drop all but one.",
                r.claimants.join(", "),
                r.resource
            )),
            ConflictKind::DetectionFailure { .. } => {
                out.push("Detection partially failed; re-run with verbose logging.".to_string())
            }
        }
    }
    out
}
