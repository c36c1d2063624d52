// devstrap-core/tests/scenarios.rs

//! End-to-end scenarios over the full pipeline: build, detect, resolve,
//! plan.

use std::collections::BTreeSet;

use devstrap_common::{
    codes, ArchSet, Architecture, Platform, PlatformSet, ResolutionPolicy, SystemRequirements,
    ToolCategory, ToolDependency, ToolManifest, VersionInfo,
};
use devstrap_core::{
    build_graph, detect_conflicts, plan_installation, plan_with_conflict_resolution, BuildOptions,
    DetectionOptions, PlanOptions,
};
use pretty_assertions::assert_eq;

fn tool(id: &str, name: &str, category: ToolCategory) -> ToolManifest {
    ToolManifest::new(id, name, category).with_versions(VersionInfo::stable("1.0.0"))
}

fn node_manifest() -> ToolManifest {
    ToolManifest::new("node", "Node.js", ToolCategory::Language).with_versions(VersionInfo {
        stable: "18.0.0".into(),
        latest: Some("20.0.0".into()),
        recommended: Some("18.0.0".into()),
        available_versions: vec![
            "12.0.0".into(),
            "14.0.0".into(),
            "16.0.0".into(),
            "18.0.0".into(),
            "20.0.0".into(),
        ],
    })
}

fn full_stack() -> Vec<ToolManifest> {
    vec![
        node_manifest(),
        tool("npm", "npm", ToolCategory::Language)
            .with_dependency(ToolDependency::required("node")),
        tool("react-app", "React App", ToolCategory::Frontend)
            .with_dependency(ToolDependency::required("node").with_min_version("16.0.0"))
            .with_dependency(ToolDependency::required("npm")),
        tool("express-api", "Express API", ToolCategory::Backend)
            .with_dependency(ToolDependency::required("node").with_min_version("14.0.0"))
            .with_dependency(ToolDependency::required("npm")),
        tool("postgres", "PostgreSQL", ToolCategory::Database),
    ]
}

fn ids(targets: &[&str]) -> Vec<String> {
    targets.iter().map(|s| s.to_string()).collect()
}

#[test]
fn full_stack_without_conflicts() {
    let built = build_graph(
        &full_stack(),
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    assert!(built.success());

    let targets = ids(&["react-app", "express-api", "postgres"]);
    let report = detect_conflicts(&built.graph, &targets, DetectionOptions::default());
    assert!(report.can_proceed);
    assert!(report.conflicts.is_empty());

    let order = plan_installation(&built.graph, &targets, &PlanOptions::default());
    assert!(order.success);
    let pos = |id: &str| order.position(id).unwrap();
    assert!(pos("node") < pos("react-app"));
    assert!(pos("node") < pos("express-api"));
    assert!(pos("npm") < pos("react-app"));
    assert!(pos("npm") < pos("express-api"));
    assert!(order.position("postgres").is_some());
}

#[test]
fn version_conflict_reports_both_requirements() {
    let mut manifests = full_stack();
    manifests.push(
        tool("legacy-tool", "Legacy Tool", ToolCategory::Backend).with_dependency(
            ToolDependency::required("node")
                .with_min_version("12.0.0")
                .with_max_version("14.0.0"),
        ),
    );
    let built = build_graph(
        &manifests,
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["react-app", "legacy-tool"]);
    let report = detect_conflicts(&built.graph, &targets, DetectionOptions::default());

    let version_conflicts = report.version_conflicts();
    assert_eq!(version_conflicts.len(), 1);
    let conflict = version_conflicts[0];
    assert_eq!(conflict.tool_id, "node");
    let requirers: BTreeSet<&str> = conflict
        .requirements
        .iter()
        .map(|r| r.required_by.as_str())
        .collect();
    assert_eq!(requirers, BTreeSet::from(["react-app", "legacy-tool"]));
    assert!(!report.can_proceed);
}

#[test]
fn breakable_cycle_defers_the_soft_edge() {
    let manifests = vec![
        tool("tool-a", "Tool A", ToolCategory::Backend)
            .with_dependency(ToolDependency::required("tool-b")),
        tool("tool-b", "Tool B", ToolCategory::Backend)
            .with_dependency(ToolDependency::optional("tool-a")),
    ];
    let built = build_graph(
        &manifests,
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["tool-a", "tool-b"]);

    let report = detect_conflicts(&built.graph, &targets, DetectionOptions::default());
    let circular = report.circular_conflicts();
    assert_eq!(circular.len(), 1);
    assert!(circular[0].breakable);
    let bp = &circular[0].break_points[0];
    assert_eq!((bp.from.as_str(), bp.to.as_str()), ("tool-b", "tool-a"));

    let order = plan_with_conflict_resolution(
        &built.graph,
        &targets,
        &ResolutionPolicy::default(),
        &PlanOptions::default(),
        None,
    );
    assert!(order.success);
    assert_eq!(order.installation_sequence.len(), 2);
    // The required edge tool-a -> tool-b still orders tool-b first; the
    // deferred dependency tool-a installs after its dependent tool-b.
    let pos = |id: &str| order.position(id).unwrap();
    assert!(pos("tool-b") < pos("tool-a"));
    assert_eq!(order.deferred_dependencies.len(), 1);
    assert_eq!(order.deferred_dependencies[0].from, "tool-b");
    assert_eq!(order.deferred_dependencies[0].to, "tool-a");
}

#[test]
fn platform_incompatibility_proposes_substitution() {
    let manifests = vec![
        tool("windows-tool", "Windows Tool", ToolCategory::Productivity).with_requirements(
            SystemRequirements {
                platforms: PlatformSet::WINDOWS,
                architectures: ArchSet::all(),
            },
        ),
        tool("linux-tool", "Linux Tool", ToolCategory::Productivity),
    ];
    let built = build_graph(
        &manifests,
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["windows-tool"]);
    let report = detect_conflicts(&built.graph, &targets, DetectionOptions::default());

    let incompatibilities = report.platform_incompatibilities();
    assert_eq!(incompatibilities.len(), 1);
    assert!(!report.can_proceed);
    assert_eq!(incompatibilities[0].alternatives, vec!["linux-tool"]);

    let order = plan_with_conflict_resolution(
        &built.graph,
        &targets,
        &ResolutionPolicy::default(),
        &PlanOptions::default(),
        None,
    );
    assert!(order.success);
    assert_eq!(order.installation_sequence, vec!["linux-tool"]);
}

#[test]
fn microservices_batch_in_parallel() {
    let mut manifests = vec![
        tool("docker", "Docker", ToolCategory::Infrastructure),
        tool("redis", "Redis", ToolCategory::Database),
        node_manifest(),
    ];
    let services = [
        "auth-service",
        "user-service",
        "payment-service",
        "notification-service",
    ];
    for service in services {
        manifests.push(
            tool(service, service, ToolCategory::Backend)
                .with_dependency(ToolDependency::required("docker"))
                .with_dependency(ToolDependency::required("node"))
                .with_dependency(ToolDependency::required("redis")),
        );
    }
    let built = build_graph(
        &manifests,
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&services);
    let order = plan_installation(&built.graph, &targets, &PlanOptions::default());
    assert!(order.success);

    let pos = |id: &str| order.position(id).unwrap();
    for service in services {
        assert!(pos("docker") < pos(service));
        assert!(pos("node") < pos(service));
        assert!(pos("redis") < pos(service));
    }
    let service_batch = order
        .batches
        .iter()
        .find(|b| b.contains(&"auth-service".to_string()))
        .expect("service batch");
    assert_eq!(service_batch.len(), 4);
}

#[test]
fn missing_dependency_warns_but_plans() {
    let manifests = vec![
        tool("app", "App", ToolCategory::Frontend)
            .with_dependency(ToolDependency::optional("nonexistent-tool")),
    ];
    let built = build_graph(
        &manifests,
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    assert!(built.success());
    assert!(built
        .warnings
        .iter()
        .any(|w| w.code == codes::MISSING_DEPENDENCY));

    let order = plan_installation(&built.graph, &ids(&["app"]), &PlanOptions::default());
    assert!(order.success);
    assert_eq!(order.installation_sequence, vec!["app"]);
    assert!(order
        .warnings
        .iter()
        .any(|w| w.code == codes::MISSING_DEPENDENCY));
}

// ---- universal invariants --------------------------------------------------

#[test]
fn required_edges_always_order_dependency_first() {
    let built = build_graph(
        &full_stack(),
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["react-app", "express-api", "postgres"]);
    let order = plan_installation(&built.graph, &targets, &PlanOptions::default());
    for edge in built.graph.edges() {
        if edge.dependency.dep_type == devstrap_common::DependencyType::Required {
            if let (Some(u), Some(v)) = (order.position(&edge.from), order.position(&edge.to)) {
                assert!(v < u, "{} must precede {}", edge.to, edge.from);
            }
        }
    }
}

#[test]
fn batches_never_contain_dependent_pairs() {
    let built = build_graph(
        &full_stack(),
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["react-app", "express-api", "postgres"]);
    let order = plan_installation(&built.graph, &targets, &PlanOptions::default());
    for batch in &order.batches {
        for a in batch {
            for b in batch {
                if a != b {
                    assert!(!built.graph.has_path(a, b));
                    assert!(!built.graph.has_path(b, a));
                }
            }
        }
    }
}

#[test]
fn detection_is_idempotent_across_calls() {
    let mut manifests = full_stack();
    manifests.push(
        tool("legacy-tool", "Legacy Tool", ToolCategory::Backend).with_dependency(
            ToolDependency::required("node")
                .with_min_version("12.0.0")
                .with_max_version("14.0.0"),
        ),
    );
    let built = build_graph(
        &manifests,
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["react-app", "legacy-tool"]);
    let first = detect_conflicts(&built.graph, &targets, DetectionOptions::default());
    let second = detect_conflicts(&built.graph, &targets, DetectionOptions::default());
    assert_eq!(first.conflicts, second.conflicts);
    assert_eq!(first.overall_severity, second.overall_severity);
    assert_eq!(first.can_proceed, second.can_proceed);
}

#[test]
fn plan_covers_targets_within_reachable_closure() {
    let built = build_graph(
        &full_stack(),
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["react-app", "postgres"]);
    let order = plan_installation(&built.graph, &targets, &PlanOptions::default());

    let planned: BTreeSet<String> = order.installation_sequence.iter().cloned().collect();
    for target in &targets {
        assert!(planned.contains(target));
    }
    let reachable = built.graph.reachable_from(
        &targets,
        &devstrap_core::EdgeFilter {
            platform: Some(Platform::Linux),
            ..devstrap_core::EdgeFilter::default()
        },
    );
    for tool in &planned {
        assert!(reachable.contains(tool), "{tool} planned but not reachable");
    }
}

#[test]
fn compromise_version_meets_the_threshold() {
    let mut manifests = vec![node_manifest()];
    for (i, min) in ["14.0.0", "16.0.0", "16.0.0", "16.0.0"].iter().enumerate() {
        manifests.push(
            tool(&format!("svc-{i}"), &format!("svc-{i}"), ToolCategory::Backend)
                .with_dependency(ToolDependency::required("node").with_min_version(*min)),
        );
    }
    manifests.push(
        tool("old-svc", "old-svc", ToolCategory::Backend)
            .with_dependency(ToolDependency::required("node").with_max_version("12.0.0")),
    );
    let built = build_graph(
        &manifests,
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["svc-0", "svc-1", "svc-2", "svc-3", "old-svc"]);
    let report = detect_conflicts(&built.graph, &targets, DetectionOptions::default());
    let conflict = report.version_conflicts()[0];
    // Whatever compromise is offered satisfies >= 80% of the requirements.
    if let Some(compromise) = &conflict.compromise_version {
        let satisfied = conflict
            .requirements
            .iter()
            .filter(|r| {
                // Reconstruct each constraint from its source edge.
                built
                    .graph
                    .edge_between(&r.required_by, "node")
                    .and_then(|e| {
                        devstrap_common::version::VersionConstraint::from_dependency(&e.dependency)
                            .ok()
                            .flatten()
                    })
                    .map(|c| c.satisfied_by_str(compromise))
                    .unwrap_or(false)
            })
            .count();
        let ratio = satisfied as f64 / conflict.requirements.len() as f64;
        assert!(ratio >= 0.8, "compromise ratio {ratio}");
    }
}

#[test]
fn cycle_breakability_matches_edge_types() {
    let hard = vec![
        tool("a", "a", ToolCategory::Backend).with_dependency(ToolDependency::required("b")),
        tool("b", "b", ToolCategory::Backend).with_dependency(ToolDependency::required("a")),
    ];
    let soft = vec![
        tool("c", "c", ToolCategory::Backend).with_dependency(ToolDependency::required("d")),
        tool("d", "d", ToolCategory::Backend).with_dependency(ToolDependency::suggests("c")),
    ];
    let built_hard = build_graph(&hard, Platform::Linux, Architecture::X64, BuildOptions::default());
    let report = detect_conflicts(
        &built_hard.graph,
        &ids(&["a", "b"]),
        DetectionOptions::default(),
    );
    assert!(!report.circular_conflicts()[0].breakable);

    let built_soft = build_graph(
        &soft,
        Platform::Linux,
        Architecture::X64,
        BuildOptions {
            include_suggested: true,
            ..BuildOptions::default()
        },
    );
    let report = detect_conflicts(
        &built_soft.graph,
        &ids(&["c", "d"]),
        DetectionOptions {
            include_suggested: true,
            ..DetectionOptions::default()
        },
    );
    assert!(report.circular_conflicts()[0].breakable);
}

#[test]
fn resolver_step_count_is_monotone_on_conflicts() {
    let manifests = vec![
        tool("docker", "Docker", ToolCategory::Infrastructure),
        tool("podman", "Podman", ToolCategory::Infrastructure),
        tool("mysql", "MySQL", ToolCategory::Database),
        tool("mariadb", "MariaDB", ToolCategory::Database),
    ];
    let built = build_graph(
        &manifests,
        Platform::Linux,
        Architecture::X64,
        BuildOptions::default(),
    );
    let targets = ids(&["docker", "podman", "mysql", "mariadb"]);
    let report = detect_conflicts(&built.graph, &targets, DetectionOptions::default());
    let before = report.conflicts.len();

    let mut policy = ResolutionPolicy::default();
    policy
        .automatic
        .allowed_actions
        .insert(devstrap_common::ResolutionAction::Remove);
    let result =
        devstrap_core::resolve_conflicts(&built.graph, &report.conflicts, &targets, policy, None);
    assert!(result.unresolved.len() <= before);
    assert_eq!(
        result.summary.conflicts_resolved + result.unresolved.len(),
        before
    );
}
