// devstrap-core/src/plan/mod.rs

//! Installation planning: turn a (possibly resolver-modified) graph and a
//! target set into an ordered sequence and parallel batches. Planning never
//! returns partial results; a failure comes back as `success = false` with
//! an empty sequence and coded errors.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use devstrap_common::{
    codes, Architecture, CancellationToken, Diagnostic, Platform, ToolCategory,
};

use crate::graph::{DependencyGraph, EdgeFilter, EdgeResolution};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStrategy {
    /// Everything: optional and suggested dependencies included.
    Eager,
    /// Required edges only.
    Lazy,
    /// Required only, stable versions.
    Conservative,
    /// Optional included, latest versions.
    Aggressive,
    /// Smallest reachable set that satisfies the targets.
    Minimal,
    /// Balanced default; honors the caller's include flags.
    #[default]
    Optimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAlgorithm {
    #[default]
    Topological,
    Dfs,
    Bfs,
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub strategy: InstallStrategy,
    pub algorithm: PlanAlgorithm,
    pub include_optional: bool,
    pub include_suggested: bool,
    pub enable_parallel: bool,
    pub enable_caching: bool,
    pub max_retries: usize,
    pub max_execution_time_ms: Option<u64>,
    /// Tools already present on the host; they satisfy edges but are not
    /// re-installed.
    pub installed: BTreeSet<String>,
    pub cancellation: Option<CancellationToken>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            strategy: InstallStrategy::default(),
            algorithm: PlanAlgorithm::default(),
            include_optional: true,
            include_suggested: false,
            enable_parallel: true,
            enable_caching: true,
            max_retries: 3,
            max_execution_time_ms: None,
            installed: BTreeSet::new(),
            cancellation: None,
        }
    }
}

impl PlanOptions {
    /// The include flags after the strategy has its say.
    pub fn effective_includes(&self) -> (bool, bool) {
        match self.strategy {
            InstallStrategy::Eager => (true, true),
            InstallStrategy::Lazy | InstallStrategy::Conservative | InstallStrategy::Minimal => {
                (false, false)
            }
            InstallStrategy::Aggressive => (true, false),
            InstallStrategy::Optimal => (self.include_optional, self.include_suggested),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredDependency {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallationOrder {
    /// Dependencies first; excludes already-installed tools.
    pub installation_sequence: Vec<String>,
    /// Version each tool installs at, after the strategy's preference
    /// (conservative pins stable, aggressive pins latest) and any resolver
    /// pin are applied.
    pub versions: BTreeMap<String, String>,
    /// Consecutive independent groups, lexicographic within a batch.
    pub batches: Vec<Vec<String>>,
    pub deferred_dependencies: Vec<DeferredDependency>,
    /// Cycles that could not be planned around.
    pub circular_dependencies: Vec<Vec<String>>,
    pub already_installed: Vec<String>,
    pub estimated_time_seconds: u64,
    pub success: bool,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

impl InstallationOrder {
    fn failure(errors: Vec<Diagnostic>, warnings: Vec<Diagnostic>) -> Self {
        Self {
            success: false,
            errors,
            warnings,
            ..Self::default()
        }
    }

    pub fn position(&self, tool_id: &str) -> Option<usize> {
        self.installation_sequence.iter().position(|t| t == tool_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlanCacheKey {
    targets: Vec<String>,
    platform: Platform,
    architecture: Architecture,
    strategy: InstallStrategy,
    include_optional: bool,
    include_suggested: bool,
    enable_parallel: bool,
    installed: Vec<String>,
}

/// Per-category rough install time, seconds. Feeds the plan estimate only.
fn estimate_secs(category: ToolCategory) -> u64 {
    match category {
        ToolCategory::Language => 120,
        ToolCategory::Infrastructure => 180,
        ToolCategory::Database => 150,
        ToolCategory::Backend => 60,
        ToolCategory::Frontend => 60,
        ToolCategory::Mobile => 240,
        ToolCategory::DevOps => 90,
        ToolCategory::Testing => 45,
        ToolCategory::DataScience => 180,
        ToolCategory::Productivity => 30,
    }
}

/// Loop-head budget checks: deadline and cancellation.
struct Budget {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

enum BudgetStop {
    Timeout,
    Cancelled,
}

impl Budget {
    fn new(options: &PlanOptions) -> Self {
        Self {
            deadline: options
                .max_execution_time_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            cancellation: options.cancellation.clone(),
        }
    }

    fn check(&self) -> Result<(), BudgetStop> {
        if let Some(token) = &self.cancellation {
            if token.is_cancelled() {
                return Err(BudgetStop::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(BudgetStop::Timeout);
            }
        }
        Ok(())
    }

    fn stop_diagnostic(stop: BudgetStop) -> Diagnostic {
        match stop {
            BudgetStop::Timeout => Diagnostic::error(
                codes::PLAN_TIMEOUT,
                "planning exceeded its execution budget",
                "planner",
            ),
            BudgetStop::Cancelled => {
                Diagnostic::error(codes::CANCELLED, "planning was cancelled", "planner")
            }
        }
    }
}

pub struct InstallationPlanner {
    cache: HashMap<PlanCacheKey, InstallationOrder>,
}

impl Default for InstallationPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallationPlanner {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn cache_key(
        &self,
        graph: &DependencyGraph,
        targets: &[String],
        options: &PlanOptions,
    ) -> PlanCacheKey {
        let mut sorted = targets.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let (include_optional, include_suggested) = options.effective_includes();
        PlanCacheKey {
            targets: sorted,
            platform: graph.target_platform(),
            architecture: graph.target_architecture(),
            strategy: options.strategy,
            include_optional,
            include_suggested,
            enable_parallel: options.enable_parallel,
            installed: options.installed.iter().cloned().collect(),
        }
    }

    /// Produce an installation order for `targets` over `graph`.
    pub fn plan(
        &mut self,
        graph: &DependencyGraph,
        targets: &[String],
        options: &PlanOptions,
    ) -> InstallationOrder {
        let key = self.cache_key(graph, targets, options);
        if options.enable_caching {
            if let Some(hit) = self.cache.get(&key) {
                debug!(targets = targets.len(), "installation order served from cache");
                return hit.clone();
            }
        }

        let order = self.plan_uncached(graph, targets, options);
        if options.enable_caching && order.success {
            self.cache.insert(key, order.clone());
        }
        order
    }

    fn plan_uncached(
        &self,
        graph: &DependencyGraph,
        targets: &[String],
        options: &PlanOptions,
    ) -> InstallationOrder {
        let budget = Budget::new(options);
        let mut warnings: Vec<Diagnostic> = Vec::new();
        let mut errors: Vec<Diagnostic> = Vec::new();

        for target in targets {
            if !graph.contains(target) {
                errors.push(Diagnostic::error(
                    codes::UNKNOWN_TARGET,
                    format!("target '{target}' is not in the graph"),
                    target.clone(),
                ));
            }
        }
        if !errors.is_empty() {
            return InstallationOrder::failure(errors, warnings);
        }

        let (include_optional, include_suggested) = options.effective_includes();
        let filter = EdgeFilter {
            include_optional,
            include_suggested,
            platform: Some(graph.target_platform()),
            respect_resolution: true,
        };

        if let Err(stop) = budget.check() {
            return InstallationOrder::failure(vec![Budget::stop_diagnostic(stop)], warnings);
        }
        let scope = graph.reachable_from(targets, &filter);

        // Dangling manifest references surface as warnings, not failures;
        // the builder already dropped the edges.
        for tool_id in &scope {
            if let Some(node) = graph.node(tool_id) {
                for dep in &node.manifest.dependencies {
                    if dep.dep_type != devstrap_common::DependencyType::Conflicts
                        && !dep.tool_id.is_empty()
                        && !graph.contains(&dep.tool_id)
                    {
                        warnings.push(Diagnostic::warning(
                            codes::MISSING_DEPENDENCY,
                            format!(
                                "'{tool_id}' references unknown tool '{}'",
                                dep.tool_id
                            ),
                            tool_id.clone(),
                        ));
                    }
                }
            }
        }

        // Edges the resolver already deferred.
        let mut deferred: Vec<DeferredDependency> = graph
            .edges()
            .iter()
            .filter(|e| e.resolution == EdgeResolution::Deferred)
            .filter(|e| scope.contains(&e.from) && scope.contains(&e.to))
            .map(|e| DeferredDependency {
                from: e.from.clone(),
                to: e.to.clone(),
            })
            .collect();

        if let Err(stop) = budget.check() {
            return InstallationOrder::failure(vec![Budget::stop_diagnostic(stop)], warnings);
        }
        let sequence = match options.algorithm {
            PlanAlgorithm::Topological => self.order_topological(graph, &scope, &filter),
            PlanAlgorithm::Dfs => self.order_dfs(graph, targets, &scope, &filter, &mut deferred),
            PlanAlgorithm::Bfs => self.order_bfs(graph, targets, &scope, &filter),
        };
        let sequence = match sequence {
            Ok(sequence) => sequence,
            Err(cyclic) => {
                let cycles = cycles_within(graph, &scope);
                errors.push(Diagnostic::error(
                    codes::CIRCULAR_DEPENDENCIES,
                    format!("cannot order {} tools caught in cycles", cyclic.len()),
                    cyclic.join(","),
                ));
                let mut order = InstallationOrder::failure(errors, warnings);
                order.circular_dependencies = cycles;
                return order;
            }
        };

        let already_installed: Vec<String> = sequence
            .iter()
            .filter(|t| options.installed.contains(*t))
            .cloned()
            .collect();
        let sequence: Vec<String> = sequence
            .into_iter()
            .filter(|t| !options.installed.contains(t))
            .collect();

        if let Err(stop) = budget.check() {
            return InstallationOrder::failure(vec![Budget::stop_diagnostic(stop)], warnings);
        }
        let batches = if options.enable_parallel {
            batch(graph, &sequence)
        } else {
            sequence.iter().map(|t| vec![t.clone()]).collect()
        };

        let estimated_time_seconds = estimate(graph, &batches, options.enable_parallel);

        let mut versions: BTreeMap<String, String> = BTreeMap::new();
        for tool_id in &sequence {
            if let Some(node) = graph.node(tool_id) {
                let info = &node.manifest.version_info;
                let chosen = match options.strategy {
                    // A resolver pin always wins over strategy preference.
                    _ if node.version_state.resolved_version.is_some() => {
                        node.effective_version().to_string()
                    }
                    InstallStrategy::Aggressive => {
                        info.latest.clone().unwrap_or_else(|| info.stable.clone())
                    }
                    InstallStrategy::Conservative => info.stable.clone(),
                    _ => node.effective_version().to_string(),
                };
                versions.insert(tool_id.clone(), chosen);
            }
        }

        InstallationOrder {
            installation_sequence: sequence,
            versions,
            batches,
            deferred_dependencies: deferred,
            circular_dependencies: Vec::new(),
            already_installed,
            estimated_time_seconds,
            success: true,
            warnings,
            errors,
        }
    }

    fn order_topological(
        &self,
        graph: &DependencyGraph,
        scope: &BTreeSet<String>,
        filter: &EdgeFilter,
    ) -> Result<Vec<String>, Vec<String>> {
        let result = graph.topological_order(filter, Some(scope));
        if result.is_total() {
            Ok(result.order)
        } else {
            Err(result.cyclic)
        }
    }

    /// Post-order DFS from each target. A back edge is deferrable when it
    /// is optional or suggested; a required back edge fails the plan.
    fn order_dfs(
        &self,
        graph: &DependencyGraph,
        targets: &[String],
        scope: &BTreeSet<String>,
        filter: &EdgeFilter,
        deferred: &mut Vec<DeferredDependency>,
    ) -> Result<Vec<String>, Vec<String>> {
        let mut order: Vec<String> = Vec::new();
        let mut visited: BTreeSet<String> = BTreeSet::new();

        let mut sorted_targets = targets.to_vec();
        sorted_targets.sort_unstable();
        for start in &sorted_targets {
            if visited.contains(start) {
                continue;
            }
            let mut stack: Vec<(String, usize)> = vec![(start.clone(), 0)];
            let mut on_stack: BTreeSet<String> = BTreeSet::from([start.clone()]);
            visited.insert(start.clone());

            while let Some((node, cursor)) = stack.last().cloned() {
                let mut edges: Vec<_> = graph
                    .outgoing_edges(&node)
                    .into_iter()
                    .filter(|e| filter.admits(e) && scope.contains(&e.to))
                    .collect();
                edges.sort_by(|a, b| a.to.cmp(&b.to));
                if cursor >= edges.len() {
                    stack.pop();
                    on_stack.remove(&node);
                    order.push(node);
                    continue;
                }
                stack.last_mut().expect("nonempty").1 += 1;
                let edge = edges[cursor];
                if on_stack.contains(&edge.to) {
                    // Back edge: defer soft edges, fail on hard ones.
                    use devstrap_common::DependencyType::*;
                    match edge.dependency.dep_type {
                        Optional | Suggests => {
                            warn!(from = %edge.from, to = %edge.to, "deferring cyclic edge");
                            deferred.push(DeferredDependency {
                                from: edge.from.clone(),
                                to: edge.to.clone(),
                            });
                            continue;
                        }
                        _ => return Err(vec![edge.from.clone(), edge.to.clone()]),
                    }
                }
                if visited.insert(edge.to.clone()) {
                    stack.push((edge.to.clone(), 0));
                    on_stack.insert(edge.to.clone());
                }
            }
        }
        Ok(order)
    }

    /// Levelize by longest distance from the target set; deeper
    /// dependencies install first. Within a level: category, then id.
    fn order_bfs(
        &self,
        graph: &DependencyGraph,
        targets: &[String],
        scope: &BTreeSet<String>,
        filter: &EdgeFilter,
    ) -> Result<Vec<String>, Vec<String>> {
        let mut level: BTreeMap<String, usize> = BTreeMap::new();
        for target in targets {
            if scope.contains(target) {
                level.insert(target.clone(), 0);
            }
        }
        // Longest-path relaxation; more than |scope| rounds means a cycle.
        for _round in 0..=scope.len() {
            let mut changed = false;
            for id in scope {
                let Some(&current) = level.get(id) else {
                    continue;
                };
                for edge in graph.outgoing_edges(id) {
                    if !filter.admits(edge) || !scope.contains(&edge.to) {
                        continue;
                    }
                    let proposed = current + 1;
                    if level.get(&edge.to).map(|&l| proposed > l).unwrap_or(true) {
                        if proposed > scope.len() {
                            return Err(vec![edge.to.clone()]);
                        }
                        level.insert(edge.to.clone(), proposed);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let mut order: Vec<String> = level.keys().cloned().collect();
        order.sort_by_key(|id| {
            let depth = level[id];
            let priority = graph
                .node(id)
                .map(|n| n.manifest.category.priority())
                .unwrap_or(u8::MAX);
            (std::cmp::Reverse(depth), priority, id.clone())
        });
        Ok(order)
    }
}

/// Greedy batching: consecutive sequence members join a batch while no
/// pair of batch members has a directed path between them.
fn batch(graph: &DependencyGraph, sequence: &[String]) -> Vec<Vec<String>> {
    let mut batches: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for tool in sequence {
        let independent = current
            .iter()
            .all(|member| !graph.has_path(member, tool) && !graph.has_path(tool, member));
        if independent {
            current.push(tool.clone());
        } else {
            current.sort_unstable();
            batches.push(std::mem::take(&mut current));
            current.push(tool.clone());
        }
    }
    if !current.is_empty() {
        current.sort_unstable();
        batches.push(current);
    }
    batches
}

fn estimate(graph: &DependencyGraph, batches: &[Vec<String>], parallel: bool) -> u64 {
    batches
        .iter()
        .map(|members| {
            let costs = members.iter().filter_map(|id| {
                graph.node(id).map(|n| estimate_secs(n.manifest.category))
            });
            if parallel {
                costs.max().unwrap_or(0)
            } else {
                costs.sum()
            }
        })
        .sum()
}

fn cycles_within(graph: &DependencyGraph, scope: &BTreeSet<String>) -> Vec<Vec<String>> {
    graph
        .detect_cycles()
        .cycles
        .into_iter()
        .filter(|cycle| cycle.iter().all(|n| scope.contains(n)))
        .collect()
}

#[cfg(test)]
mod tests {
    use devstrap_common::{ToolCategory, ToolDependency, ToolManifest, VersionInfo};
    use pretty_assertions::assert_eq;

    use crate::builder::GraphBuilder;

    use super::*;

    fn tool(id: &str, category: ToolCategory) -> ToolManifest {
        ToolManifest::new(id, id, category).with_versions(VersionInfo::stable("1.0.0"))
    }

    fn stack_catalog() -> Vec<ToolManifest> {
        vec![
            tool("node", ToolCategory::Language),
            tool("npm", ToolCategory::Language).with_dependency(ToolDependency::required("node")),
            tool("react-app", ToolCategory::Frontend)
                .with_dependency(ToolDependency::required("node").with_min_version("16.0.0"))
                .with_dependency(ToolDependency::required("npm")),
            tool("express-api", ToolCategory::Backend)
                .with_dependency(ToolDependency::required("node").with_min_version("14.0.0"))
                .with_dependency(ToolDependency::required("npm")),
            tool("postgres", ToolCategory::Database),
        ]
    }

    fn graph_for(manifests: Vec<ToolManifest>) -> DependencyGraph {
        let result = GraphBuilder::new(Platform::Linux, Architecture::X64).build(&manifests);
        assert!(result.success(), "build failed: {:?}", result.errors);
        result.graph
    }

    fn plan_ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn full_stack_plans_dependencies_first() {
        let graph = graph_for(stack_catalog());
        let mut planner = InstallationPlanner::new();
        let order = planner.plan(
            &graph,
            &plan_ids(&["react-app", "express-api", "postgres"]),
            &PlanOptions::default(),
        );
        assert!(order.success);
        let pos = |id: &str| order.position(id).unwrap();
        assert!(pos("node") < pos("react-app"));
        assert!(pos("node") < pos("express-api"));
        assert!(pos("npm") < pos("react-app"));
        assert!(pos("npm") < pos("express-api"));
        assert_eq!(order.installation_sequence.len(), 5);
    }

    #[test]
    fn dfs_and_bfs_agree_on_the_invariant() {
        let graph = graph_for(stack_catalog());
        let mut planner = InstallationPlanner::new();
        for algorithm in [PlanAlgorithm::Dfs, PlanAlgorithm::Bfs] {
            let order = planner.plan(
                &graph,
                &plan_ids(&["react-app", "express-api", "postgres"]),
                &PlanOptions {
                    algorithm,
                    enable_caching: false,
                    ..PlanOptions::default()
                },
            );
            assert!(order.success, "{algorithm:?} failed");
            let pos = |id: &str| order.position(id).unwrap();
            assert!(pos("node") < pos("react-app"), "{algorithm:?}");
            assert!(pos("npm") < pos("express-api"), "{algorithm:?}");
        }
    }

    #[test]
    fn services_share_one_batch() {
        let mut manifests = vec![
            tool("docker", ToolCategory::Infrastructure),
            tool("redis", ToolCategory::Database),
            tool("node", ToolCategory::Language),
        ];
        for service in [
            "auth-service",
            "user-service",
            "payment-service",
            "notification-service",
        ] {
            manifests.push(
                tool(service, ToolCategory::Backend)
                    .with_dependency(ToolDependency::required("docker"))
                    .with_dependency(ToolDependency::required("node"))
                    .with_dependency(ToolDependency::required("redis")),
            );
        }
        let graph = graph_for(manifests);
        let mut planner = InstallationPlanner::new();
        let order = planner.plan(
            &graph,
            &plan_ids(&[
                "auth-service",
                "user-service",
                "payment-service",
                "notification-service",
            ]),
            &PlanOptions::default(),
        );
        assert!(order.success);
        let service_batch = order
            .batches
            .iter()
            .find(|b| b.contains(&"auth-service".to_string()))
            .unwrap();
        assert_eq!(
            service_batch,
            &vec![
                "auth-service".to_string(),
                "notification-service".to_string(),
                "payment-service".to_string(),
                "user-service".to_string(),
            ]
        );
        // Infrastructure precedes every service.
        let pos = |id: &str| order.position(id).unwrap();
        for service in ["auth-service", "user-service", "payment-service", "notification-service"] {
            assert!(pos("docker") < pos(service));
            assert!(pos("node") < pos(service));
            assert!(pos("redis") < pos(service));
        }
    }

    #[test]
    fn batch_members_are_pairwise_independent() {
        let graph = graph_for(stack_catalog());
        let mut planner = InstallationPlanner::new();
        let order = planner.plan(
            &graph,
            &plan_ids(&["react-app", "express-api", "postgres"]),
            &PlanOptions::default(),
        );
        for members in &order.batches {
            for a in members {
                for b in members {
                    if a != b {
                        assert!(!graph.has_path(a, b), "{a} -> {b} inside one batch");
                    }
                }
            }
        }
    }

    #[test]
    fn installed_tools_are_excluded_but_still_satisfy() {
        let graph = graph_for(stack_catalog());
        let mut planner = InstallationPlanner::new();
        let order = planner.plan(
            &graph,
            &plan_ids(&["react-app"]),
            &PlanOptions {
                installed: BTreeSet::from(["node".to_string(), "npm".to_string()]),
                ..PlanOptions::default()
            },
        );
        assert!(order.success);
        assert_eq!(order.installation_sequence, vec!["react-app"]);
        assert_eq!(order.already_installed, vec!["node", "npm"]);
    }

    #[test]
    fn lazy_strategy_drops_optional_edges() {
        let manifests = vec![
            tool("app", ToolCategory::Frontend)
                .with_dependency(ToolDependency::required("node"))
                .with_dependency(ToolDependency::optional("docker")),
            tool("node", ToolCategory::Language),
            tool("docker", ToolCategory::Infrastructure),
        ];
        let graph = graph_for(manifests);
        let mut planner = InstallationPlanner::new();

        let eager = planner.plan(
            &graph,
            &plan_ids(&["app"]),
            &PlanOptions {
                enable_caching: false,
                ..PlanOptions::default()
            },
        );
        assert!(eager.installation_sequence.contains(&"docker".to_string()));

        let lazy = planner.plan(
            &graph,
            &plan_ids(&["app"]),
            &PlanOptions {
                strategy: InstallStrategy::Lazy,
                enable_caching: false,
                ..PlanOptions::default()
            },
        );
        assert!(!lazy.installation_sequence.contains(&"docker".to_string()));
    }

    #[test]
    fn required_cycle_fails_the_plan_without_partial_output() {
        let manifests = vec![
            tool("a", ToolCategory::Backend).with_dependency(ToolDependency::required("b")),
            tool("b", ToolCategory::Backend).with_dependency(ToolDependency::required("a")),
        ];
        let graph = graph_for(manifests);
        let mut planner = InstallationPlanner::new();
        let order = planner.plan(&graph, &plan_ids(&["a"]), &PlanOptions::default());
        assert!(!order.success);
        assert!(order.installation_sequence.is_empty());
        assert_eq!(order.errors[0].code, codes::CIRCULAR_DEPENDENCIES);
        assert_eq!(order.circular_dependencies, vec![vec!["a", "b"]]);
    }

    #[test]
    fn dfs_defers_soft_back_edges() {
        let manifests = vec![
            tool("tool-a", ToolCategory::Backend).with_dependency(ToolDependency::required("tool-b")),
            tool("tool-b", ToolCategory::Backend).with_dependency(ToolDependency::optional("tool-a")),
        ];
        let graph = graph_for(manifests);
        let mut planner = InstallationPlanner::new();
        let order = planner.plan(
            &graph,
            &plan_ids(&["tool-a", "tool-b"]),
            &PlanOptions {
                algorithm: PlanAlgorithm::Dfs,
                ..PlanOptions::default()
            },
        );
        assert!(order.success);
        assert_eq!(
            order.deferred_dependencies,
            vec![DeferredDependency {
                from: "tool-b".to_string(),
                to: "tool-a".to_string(),
            }]
        );
        assert_eq!(order.installation_sequence, vec!["tool-b", "tool-a"]);
    }

    #[test]
    fn unknown_target_fails_cleanly() {
        let graph = graph_for(stack_catalog());
        let mut planner = InstallationPlanner::new();
        let order = planner.plan(&graph, &plan_ids(&["ghost"]), &PlanOptions::default());
        assert!(!order.success);
        assert_eq!(order.errors[0].code, codes::UNKNOWN_TARGET);
        assert!(order.installation_sequence.is_empty());
    }

    #[test]
    fn cache_returns_identical_plan() {
        let graph = graph_for(stack_catalog());
        let mut planner = InstallationPlanner::new();
        let targets = plan_ids(&["react-app"]);
        let first = planner.plan(&graph, &targets, &PlanOptions::default());
        let second = planner.plan(&graph, &targets, &PlanOptions::default());
        assert_eq!(first, second);
    }

    #[test]
    fn cancellation_stops_planning() {
        let graph = graph_for(stack_catalog());
        let token = CancellationToken::new();
        token.cancel();
        let mut planner = InstallationPlanner::new();
        let order = planner.plan(
            &graph,
            &plan_ids(&["react-app"]),
            &PlanOptions {
                cancellation: Some(token),
                ..PlanOptions::default()
            },
        );
        assert!(!order.success);
        assert_eq!(order.errors[0].code, codes::CANCELLED);
    }

    #[test]
    fn strategy_drives_version_choice() {
        let manifests = vec![ToolManifest::new("node", "Node.js", ToolCategory::Language)
            .with_versions(VersionInfo {
                stable: "18.0.0".into(),
                latest: Some("20.0.0".into()),
                recommended: None,
                available_versions: vec!["18.0.0".into(), "20.0.0".into()],
            })];
        let graph = graph_for(manifests);
        let mut planner = InstallationPlanner::new();
        let conservative = planner.plan(
            &graph,
            &plan_ids(&["node"]),
            &PlanOptions {
                strategy: InstallStrategy::Conservative,
                enable_caching: false,
                ..PlanOptions::default()
            },
        );
        assert_eq!(conservative.versions["node"], "18.0.0");
        let aggressive = planner.plan(
            &graph,
            &plan_ids(&["node"]),
            &PlanOptions {
                strategy: InstallStrategy::Aggressive,
                enable_caching: false,
                ..PlanOptions::default()
            },
        );
        assert_eq!(aggressive.versions["node"], "20.0.0");
    }

    #[test]
    fn estimates_shrink_under_parallelism() {
        let graph = graph_for(stack_catalog());
        let mut planner = InstallationPlanner::new();
        let targets = plan_ids(&["react-app", "express-api", "postgres"]);
        let parallel = planner.plan(&graph, &targets, &PlanOptions::default());
        let serial = planner.plan(
            &graph,
            &targets,
            &PlanOptions {
                enable_parallel: false,
                enable_caching: false,
                ..PlanOptions::default()
            },
        );
        assert!(parallel.estimated_time_seconds <= serial.estimated_time_seconds);
    }
}
