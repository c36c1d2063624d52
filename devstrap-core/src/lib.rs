// devstrap-core/src/lib.rs

//! Dependency resolution and conflict management core for the devstrap
//! bootstrapper. Pure in-memory pipeline: manifests go in, a validated
//! graph, conflict report, and ordered installation plan come out. No I/O,
//! no host mutation; installers and system detection live behind the
//! interfaces in `devstrap-common`.

pub mod builder;
pub mod detect;
pub mod graph;
pub mod plan;
pub mod resolve;

use tracing::{debug, warn};

use devstrap_common::{
    codes, Architecture, Diagnostic, ManifestSource, Platform, ResolutionPolicy, SystemInspector,
    ToolManifest, UserPrompt,
};

// Re-export key types
pub use builder::{BuildOptions, BuildResult, BuildStatistics, GraphBuilder};
pub use detect::{
    Conflict, ConflictDetector, ConflictKind, ConflictReport, ConflictSeverity, DetectionOptions,
};
pub use graph::{
    DependencyGraph, DependencyGraphEdge, DependencyGraphNode, EdgeFilter, EdgeResolution,
    GraphStatistics, InstallationStatus, TraversalAlgorithm, TraversalOptions, TraversalResult,
};
pub use plan::{
    DeferredDependency, InstallStrategy, InstallationOrder, InstallationPlanner, PlanAlgorithm,
    PlanOptions,
};
pub use resolve::{ConflictResolver, ResolutionResult, ResolutionStep, StepResult};

/// Build a validated dependency graph from a manifest catalog.
pub fn build_graph(
    manifests: &[ToolManifest],
    platform: Platform,
    architecture: Architecture,
    options: BuildOptions,
) -> BuildResult {
    GraphBuilder::new(platform, architecture)
        .with_options(options)
        .build(manifests)
}

/// Build a graph straight from the consumed interfaces: the catalog comes
/// from a [`ManifestSource`], the target environment and the set of tools
/// already present from a [`SystemInspector`].
pub fn build_graph_for_system(
    source: &dyn ManifestSource,
    inspector: &dyn SystemInspector,
    options: BuildOptions,
) -> devstrap_common::Result<BuildResult> {
    let manifests = source.manifests()?;
    let builder =
        GraphBuilder::new(inspector.platform(), inspector.architecture()).with_options(options);
    let mut result = builder.build(&manifests);
    builder.apply_installed(&mut result.graph, &inspector.installed());
    Ok(result)
}

/// Analyze the reachable closure of `targets` for conflicts.
pub fn detect_conflicts(
    graph: &DependencyGraph,
    targets: &[String],
    options: DetectionOptions,
) -> ConflictReport {
    ConflictDetector::new(options).detect(graph, targets)
}

/// Apply policy-driven remediation to `conflicts`. The input graph is
/// cloned; the result carries the modified working graph.
pub fn resolve_conflicts(
    graph: &DependencyGraph,
    conflicts: &[Conflict],
    targets: &[String],
    policy: ResolutionPolicy,
    prompt: Option<&dyn UserPrompt>,
) -> ResolutionResult {
    ConflictResolver::new(policy).resolve(graph, conflicts, targets, prompt)
}

/// Compute an installation order without conflict handling.
pub fn plan_installation(
    graph: &DependencyGraph,
    targets: &[String],
    options: &PlanOptions,
) -> InstallationOrder {
    InstallationPlanner::new().plan(graph, targets, options)
}

/// Detect, resolve, re-plan. Retries tighten the options step by step:
/// first optional and suggested dependencies are dropped, then the
/// strategy falls back to lazy, then parallelism is disabled. When every
/// retry fails, the latest blocking conflicts come back as plan errors.
pub fn plan_with_conflict_resolution(
    graph: &DependencyGraph,
    targets: &[String],
    policy: &ResolutionPolicy,
    options: &PlanOptions,
    prompt: Option<&dyn UserPrompt>,
) -> InstallationOrder {
    let mut planner = InstallationPlanner::new();
    let resolver = ConflictResolver::new(policy.clone());

    let mut working_graph = graph.clone();
    let mut working_targets = targets.to_vec();
    let mut attempt_options = options.clone();
    let mut last_report: Option<ConflictReport> = None;
    let mut last_order: Option<InstallationOrder> = None;

    let attempts = options.max_retries.max(1);
    for attempt in 0..attempts {
        // Fresh detector per attempt: the working graph changes between
        // rounds and the memo cache must not bridge that.
        let (include_optional, include_suggested) = attempt_options.effective_includes();
        let mut detector = ConflictDetector::new(DetectionOptions {
            include_optional,
            include_suggested,
            ..DetectionOptions::default()
        });
        let report = detector.detect(&working_graph, &working_targets);
        if report.has_conflicts() {
            debug!(
                attempt,
                conflicts = report.conflicts.len(),
                "conflicts found; invoking resolver"
            );
            let resolution =
                resolver.resolve(&working_graph, &report.conflicts, &working_targets, prompt);
            working_graph = resolution.graph;
            working_targets = resolution.targets;
            last_report = Some(report);
        }

        let order = planner.plan(&working_graph, &working_targets, &attempt_options);
        if order.success {
            return order;
        }
        last_order = Some(order);

        // Progressively more restrictive retries.
        match attempt {
            0 => {
                attempt_options.include_optional = false;
                attempt_options.include_suggested = false;
                attempt_options.strategy = InstallStrategy::Optimal;
            }
            1 => attempt_options.strategy = InstallStrategy::Lazy,
            _ => attempt_options.enable_parallel = false,
        }
        warn!(attempt, "plan attempt failed; retrying with tighter options");
    }

    // Out of retries: surface the latest conflict report (or plan errors).
    let mut errors: Vec<Diagnostic> = Vec::new();
    if let Some(report) = &last_report {
        for conflict in report.blocking_conflicts() {
            errors.push(Diagnostic::error(
                match conflict.kind {
                    ConflictKind::Circular(_) => codes::CIRCULAR_DEPENDENCIES,
                    ConflictKind::DetectionFailure { .. } => codes::DETECTION_FAILURE,
                    _ => codes::RESOLUTION_EXHAUSTED,
                },
                conflict.root_cause.clone(),
                conflict.id.clone(),
            ));
        }
    }
    if let Some(order) = last_order {
        errors.extend(order.errors);
    }
    if errors.is_empty() {
        errors.push(Diagnostic::error(
            codes::RESOLUTION_EXHAUSTED,
            "no plan could be produced within the retry budget",
            "planner",
        ));
    }
    InstallationOrder {
        success: false,
        errors,
        ..InstallationOrder::default()
    }
}
