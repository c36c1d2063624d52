// devstrap-core/src/resolve/mod.rs

//! Policy-driven conflict remediation. The resolver never touches the
//! canonical graph: it clones a working copy, applies one remediation step
//! per conflict in priority order, and hands back the modified graph, the
//! step log, and whatever it could not fix.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use devstrap_common::version::{parse_lenient, VersionConstraint};
use devstrap_common::{
    codes, ConfirmAnswer, DependencyType, Diagnostic, PinningStrategy, ResolutionAction,
    ResolutionPolicy, RiskTolerance, UserPrompt,
};
use semver::Version;

use crate::detect::{
    priority_sort, BreakStrategy, CircularConflict, Conflict, ConflictKind, ExclusionConflict,
    PlatformConflict, ResourceConflict, VersionConflict,
};
use crate::graph::{DependencyGraph, DependencyGraphEdge, EdgeFilter, EdgeResolution};
use crate::plan::{InstallationOrder, InstallationPlanner, PlanOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepResult {
    Success,
    Failed,
    Skipped,
    RequiresUserInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStep {
    pub conflict_id: String,
    pub action: ResolutionAction,
    pub description: String,
    pub result: StepResult,
    pub elapsed: Duration,
    pub affected_tools: Vec<String>,
}

/// Inverse operations for every reversible change applied to the working
/// graph. `Remove` leaves no entry; it is the one irreversible action.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoEntry {
    VersionPin {
        tool_id: String,
        previous: Option<String>,
    },
    EdgeResolution {
        from: String,
        to: String,
        previous: EdgeResolution,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub steps_executed: usize,
    pub conflicts_resolved: usize,
    pub reversible: bool,
    pub side_effects: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolutionResult {
    /// The modified working graph; the input graph is untouched.
    pub graph: DependencyGraph,
    /// Target set after substitutions and removals.
    pub targets: Vec<String>,
    /// Re-planned installation order over the modified graph, when
    /// resolution left it plannable.
    pub plan: Option<InstallationOrder>,
    pub steps: Vec<ResolutionStep>,
    pub unresolved: Vec<Conflict>,
    pub undo_log: Vec<UndoEntry>,
    pub summary: ResolutionSummary,
    pub success: bool,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

struct StepOutcome {
    action: ResolutionAction,
    description: String,
    result: StepResult,
    affected_tools: Vec<String>,
    resolved: bool,
    side_effects: Vec<String>,
}

impl StepOutcome {
    fn skipped(action: ResolutionAction, description: impl Into<String>) -> Self {
        Self {
            action,
            description: description.into(),
            result: StepResult::Skipped,
            affected_tools: Vec::new(),
            resolved: false,
            side_effects: Vec::new(),
        }
    }

    fn failed(action: ResolutionAction, description: impl Into<String>) -> Self {
        Self {
            action,
            description: description.into(),
            result: StepResult::Failed,
            affected_tools: Vec::new(),
            resolved: false,
            side_effects: Vec::new(),
        }
    }

    fn needs_user(action: ResolutionAction, description: impl Into<String>) -> Self {
        Self {
            action,
            description: description.into(),
            result: StepResult::RequiresUserInput,
            affected_tools: Vec::new(),
            resolved: false,
            side_effects: Vec::new(),
        }
    }
}

pub struct ConflictResolver {
    policy: ResolutionPolicy,
}

impl ConflictResolver {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    /// Apply up to `max_steps` remediation steps, most severe conflicts
    /// first. Monotone: a successful step never introduces a new conflict
    /// into the inputs, so the unresolved set only shrinks.
    pub fn resolve(
        &self,
        graph: &DependencyGraph,
        conflicts: &[Conflict],
        targets: &[String],
        prompt: Option<&dyn UserPrompt>,
    ) -> ResolutionResult {
        let mut working = graph.clone();
        let mut targets: Vec<String> = targets.to_vec();
        let mut ordered: Vec<Conflict> = conflicts.to_vec();
        priority_sort(&mut ordered);

        let mut steps: Vec<ResolutionStep> = Vec::new();
        let mut undo_log: Vec<UndoEntry> = Vec::new();
        let mut side_effects: Vec<String> = Vec::new();
        let mut unresolved: Vec<Conflict> = Vec::new();
        let mut errors: Vec<Diagnostic> = Vec::new();
        let warnings: Vec<Diagnostic> = Vec::new();
        let mut resolved_count = 0usize;

        if !self.policy.automatic.enabled {
            unresolved = ordered;
            return self.finish(
                working, targets, steps, undo_log, side_effects, unresolved, errors, warnings,
                resolved_count,
            );
        }

        let max_steps = self.policy.automatic.max_steps;
        let total = ordered.len();
        let mut exhausted = false;
        for (index, conflict) in ordered.into_iter().enumerate() {
            if steps.len() >= max_steps {
                if conflict.blocking {
                    exhausted = true;
                }
                unresolved.push(conflict);
                continue;
            }
            if let Some(prompt) = prompt {
                let percent = ((index * 100) / total.max(1)) as u8;
                prompt.notify_progress(&format!("resolving {}", conflict.id), percent);
            }
            let started = Instant::now();
            let mut outcome = self.apply(&mut working, &mut targets, &conflict, prompt, &mut undo_log);
            if outcome.affected_tools.is_empty() {
                outcome.affected_tools = conflict.tools.clone();
            }
            if self.policy.interaction.verbose_explanations {
                outcome.description = format!("{} [{}]", outcome.description, conflict.root_cause);
            }
            debug!(
                conflict = %conflict.id,
                action = ?outcome.action,
                result = ?outcome.result,
                "resolution step"
            );
            steps.push(ResolutionStep {
                conflict_id: conflict.id.clone(),
                action: outcome.action,
                description: outcome.description,
                result: outcome.result,
                elapsed: started.elapsed(),
                affected_tools: outcome.affected_tools,
            });
            side_effects.extend(outcome.side_effects);
            if outcome.resolved {
                resolved_count += 1;
            } else {
                unresolved.push(conflict);
            }
        }
        if exhausted {
            errors.push(Diagnostic::error(
                codes::RESOLUTION_EXHAUSTED,
                format!("step budget of {max_steps} reached with conflicts remaining"),
                "resolver",
            ));
        }

        self.finish(
            working, targets, steps, undo_log, side_effects, unresolved, errors, warnings,
            resolved_count,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        graph: DependencyGraph,
        targets: Vec<String>,
        steps: Vec<ResolutionStep>,
        undo_log: Vec<UndoEntry>,
        side_effects: Vec<String>,
        unresolved: Vec<Conflict>,
        errors: Vec<Diagnostic>,
        warnings: Vec<Diagnostic>,
        resolved_count: usize,
    ) -> ResolutionResult {
        let reversible = steps
            .iter()
            .filter(|s| s.result == StepResult::Success)
            .all(|s| s.action.is_reversible());
        let success =
            errors.is_empty() && !unresolved.iter().any(|c| c.blocking);
        let plan = if success {
            let order =
                InstallationPlanner::new().plan(&graph, &targets, &PlanOptions::default());
            order.success.then_some(order)
        } else {
            None
        };
        ResolutionResult {
            summary: ResolutionSummary {
                steps_executed: steps.len(),
                conflicts_resolved: resolved_count,
                reversible,
                side_effects,
            },
            graph,
            targets,
            plan,
            steps,
            unresolved,
            undo_log,
            success,
            warnings,
            errors,
        }
    }

    /// Gate a major action behind the configured interaction policy.
    fn confirm(
        &self,
        action: ResolutionAction,
        message: &str,
        prompt: Option<&dyn UserPrompt>,
    ) -> ConfirmAnswer {
        if !self.policy.interaction.confirm_major_changes || !action.is_major() {
            return ConfirmAnswer::Yes;
        }
        match prompt {
            Some(prompt) => prompt.request_confirmation(
                message,
                &[ConfirmAnswer::Yes, ConfirmAnswer::No, ConfirmAnswer::Skip],
            ),
            // No callback wired up: fall back to the risk tolerance.
            None => match self.policy.automatic.risk_tolerance {
                RiskTolerance::Conservative => ConfirmAnswer::Skip,
                RiskTolerance::Moderate | RiskTolerance::Aggressive => ConfirmAnswer::Yes,
            },
        }
    }

    fn apply(
        &self,
        working: &mut DependencyGraph,
        targets: &mut Vec<String>,
        conflict: &Conflict,
        prompt: Option<&dyn UserPrompt>,
        undo_log: &mut Vec<UndoEntry>,
    ) -> StepOutcome {
        match &conflict.kind {
            ConflictKind::Version(v) => self.resolve_version(working, v, prompt, undo_log),
            ConflictKind::Circular(c) => self.resolve_circular(working, c, undo_log),
            ConflictKind::Platform(p) => {
                self.resolve_platform(working, targets, p, prompt)
            }
            ConflictKind::MutualExclusion(m) => {
                self.resolve_exclusion(working, targets, m, prompt)
            }
            ConflictKind::Resource(r) => self.resolve_resource(working, targets, r, prompt),
            ConflictKind::DetectionFailure { .. } => StepOutcome::skipped(
                ResolutionAction::Configure,
                "detection failures cannot be auto-resolved",
            ),
        }
    }

    // ---- version ----------------------------------------------------------

    fn resolve_version(
        &self,
        working: &mut DependencyGraph,
        conflict: &VersionConflict,
        prompt: Option<&dyn UserPrompt>,
        undo_log: &mut Vec<UndoEntry>,
    ) -> StepOutcome {
        let tool_id = conflict.tool_id.clone();
        let Some(node) = working.node(&tool_id) else {
            return StepOutcome::failed(
                ResolutionAction::Configure,
                format!("'{tool_id}' is no longer in the graph"),
            );
        };
        let current = match parse_lenient(node.effective_version()) {
            Ok(v) => v,
            Err(e) => {
                return StepOutcome::failed(
                    ResolutionAction::Configure,
                    format!("current version of '{tool_id}' is unparseable: {e}"),
                )
            }
        };

        let constraints = self.collect_constraints(working, &tool_id);
        let mut candidates: Vec<(String, Version)> = working
            .node(&tool_id)
            .map(|n| n.manifest.version_info.all_versions())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| parse_lenient(&raw).ok().map(|v| (raw, v)))
            .collect();
        if self.policy.versioning.prefer_latest {
            candidates.sort_by(|(_, a), (_, b)| b.cmp(a));
        }
        let allowed = |v: &Version| {
            (self.policy.versioning.allow_downgrades || *v >= current)
                && (self.policy.versioning.allow_major_upgrades || v.major <= current.major)
        };

        let chosen: Option<String> = candidates
            .iter()
            .filter(|(_, v)| allowed(v))
            .find(|(_, v)| constraints.iter().all(|c| c.satisfied_by(v)))
            .map(|(raw, _)| raw.clone())
            .or_else(|| conflict.compromise_version.clone())
            .or_else(|| {
                working
                    .node(&tool_id)
                    .and_then(|n| n.manifest.version_info.recommended.clone())
            })
            .or_else(|| working.node(&tool_id).map(|n| n.manifest.version_info.stable.clone()));

        let Some(raw_choice) = chosen else {
            return StepOutcome::failed(
                ResolutionAction::Configure,
                format!("'{tool_id}' has no candidate versions at all"),
            );
        };
        let Ok(choice) = parse_lenient(&raw_choice) else {
            return StepOutcome::failed(
                ResolutionAction::Configure,
                format!("candidate version '{raw_choice}' for '{tool_id}' is unparseable"),
            );
        };

        let action = match choice.cmp(&current) {
            std::cmp::Ordering::Greater => ResolutionAction::Upgrade,
            std::cmp::Ordering::Less => ResolutionAction::Downgrade,
            std::cmp::Ordering::Equal => ResolutionAction::Configure,
        };
        if !self.policy.allows(action) {
            return StepOutcome::skipped(
                action,
                format!("policy does not allow {action:?} for '{tool_id}'"),
            );
        }
        match self.confirm(
            action,
            &format!("Pin '{tool_id}' to {raw_choice}?"),
            prompt,
        ) {
            ConfirmAnswer::Yes => {}
            ConfirmAnswer::No => {
                return StepOutcome::failed(action, format!("user declined pinning '{tool_id}'"))
            }
            ConfirmAnswer::Skip => {
                return StepOutcome::skipped(action, format!("user skipped pinning '{tool_id}'"))
            }
        }

        let pin = pin_string(&choice, self.policy.versioning.pinning_strategy);
        let satisfies_everyone = constraints.iter().all(|c| c.satisfied_by(&choice));
        let node = working.node_mut(&tool_id).expect("checked above");
        undo_log.push(UndoEntry::VersionPin {
            tool_id: tool_id.clone(),
            previous: node.version_state.resolved_version.clone(),
        });
        node.version_state.resolved_version = Some(pin.clone());

        // Re-grade incoming edges against the pin.
        let incoming: Vec<(String, String)> = working
            .incoming_edges(&tool_id)
            .into_iter()
            .filter(|e| e.dependency.has_version_constraint())
            .map(|e| (e.from.clone(), e.to.clone()))
            .collect();
        for (from, to) in incoming {
            let satisfied = working
                .edge_between(&from, &to)
                .and_then(|e| VersionConstraint::from_dependency(&e.dependency).ok().flatten())
                .map(|c| c.satisfied_by(&choice))
                .unwrap_or(true);
            if let Some(edge) = working.edge_between_mut(&from, &to) {
                undo_log.push(UndoEntry::EdgeResolution {
                    from: from.clone(),
                    to: to.clone(),
                    previous: edge.resolution,
                });
                edge.resolution = if satisfied {
                    EdgeResolution::Satisfied
                } else {
                    EdgeResolution::Conflicted
                };
            }
        }

        let mut outcome = StepOutcome {
            action,
            description: format!("pinned '{tool_id}' to {pin}"),
            result: StepResult::Success,
            affected_tools: vec![tool_id.clone()],
            resolved: true,
            side_effects: Vec::new(),
        };
        if !satisfies_everyone {
            outcome.side_effects.push(format!(
                "pin {pin} for '{tool_id}' is a compromise; some requirements stay unmet"
            ));
        }
        outcome
    }

    fn collect_constraints(
        &self,
        working: &DependencyGraph,
        tool_id: &str,
    ) -> Vec<VersionConstraint> {
        let filter = EdgeFilter {
            platform: Some(working.target_platform()),
            ..EdgeFilter::default()
        };
        working
            .incoming_edges(tool_id)
            .into_iter()
            .filter(|e| filter.admits(e))
            .filter_map(|e| match VersionConstraint::from_dependency(&e.dependency) {
                Ok(c) => c,
                Err(e) => {
                    warn!("ignoring malformed constraint during resolution: {e}");
                    None
                }
            })
            .collect()
    }

    // ---- circular ---------------------------------------------------------

    fn resolve_circular(
        &self,
        working: &mut DependencyGraph,
        conflict: &CircularConflict,
        undo_log: &mut Vec<UndoEntry>,
    ) -> StepOutcome {
        if !conflict.breakable {
            return StepOutcome::failed(
                ResolutionAction::Defer,
                format!(
                    "cycle {} has only required edges; nothing to break",
                    conflict.cycle.join(" -> ")
                ),
            );
        }
        // Break points arrive sorted by impact; take the cheapest.
        let bp = &conflict.break_points[0];
        let (action, new_resolution) = match bp.strategy {
            BreakStrategy::Defer => (ResolutionAction::Defer, EdgeResolution::Deferred),
            BreakStrategy::Optional => (ResolutionAction::Configure, EdgeResolution::Unsatisfied),
        };
        if !self.policy.allows(action) {
            return StepOutcome::skipped(
                action,
                format!("policy does not allow {action:?} for cycle breaking"),
            );
        }
        let Some(edge) = working.edge_between_mut(&bp.from, &bp.to) else {
            return StepOutcome::failed(
                action,
                format!("break-point edge {} -> {} vanished", bp.from, bp.to),
            );
        };
        undo_log.push(UndoEntry::EdgeResolution {
            from: bp.from.clone(),
            to: bp.to.clone(),
            previous: edge.resolution,
        });
        edge.resolution = new_resolution;

        let verb = match bp.strategy {
            BreakStrategy::Defer => "deferred",
            BreakStrategy::Optional => "dropped",
        };
        StepOutcome {
            action,
            description: format!("{verb} {} -> {} to break the cycle", bp.from, bp.to),
            result: StepResult::Success,
            affected_tools: conflict.cycle.clone(),
            resolved: true,
            side_effects: Vec::new(),
        }
    }

    // ---- platform ---------------------------------------------------------

    fn resolve_platform(
        &self,
        working: &mut DependencyGraph,
        targets: &mut Vec<String>,
        conflict: &PlatformConflict,
        prompt: Option<&dyn UserPrompt>,
    ) -> StepOutcome {
        if !self.policy.platform.use_alternatives {
            return StepOutcome::skipped(
                ResolutionAction::Substitute,
                "platform alternatives disabled by policy",
            );
        }
        // Without a native-first preference, a workaround (container, VM,
        // remote) beats swapping the tool out from under its dependents.
        if !self.policy.platform.prefer_native
            && self.policy.platform.allow_workarounds
            && !conflict.workarounds.is_empty()
        {
            return StepOutcome::needs_user(
                ResolutionAction::Configure,
                format!(
                    "keeping '{}'; suggested workaround: {}",
                    conflict.tool_id, conflict.workarounds[0]
                ),
            );
        }
        let scored_best = conflict
            .alternatives
            .iter()
            .filter_map(|alt| {
                working
                    .node(alt)
                    .map(|_| (compatibility_score(working, &conflict.tool_id, alt), alt.clone()))
            })
            // Highest score wins, ties go to the lexicographically first id.
            .max_by(|(sa, ida), (sb, idb)| sa.cmp(sb).then(idb.cmp(ida)));

        let threshold = self.policy.platform.substitution_threshold;
        match scored_best {
            Some((score, alternative)) if score >= threshold => {
                if !self.policy.allows(ResolutionAction::Substitute) {
                    return StepOutcome::skipped(
                        ResolutionAction::Substitute,
                        "policy does not allow substitution",
                    );
                }
                match self.confirm(
                    ResolutionAction::Substitute,
                    &format!(
                        "Replace '{}' with '{alternative}' (compatibility {score})?",
                        conflict.tool_id
                    ),
                    prompt,
                ) {
                    ConfirmAnswer::Yes => {}
                    ConfirmAnswer::No => {
                        return StepOutcome::failed(
                            ResolutionAction::Substitute,
                            format!("user declined substituting '{}'", conflict.tool_id),
                        )
                    }
                    ConfirmAnswer::Skip => {
                        return StepOutcome::skipped(
                            ResolutionAction::Substitute,
                            format!("user skipped substituting '{}'", conflict.tool_id),
                        )
                    }
                }
                substitute(working, targets, &conflict.tool_id, &alternative);
                StepOutcome {
                    action: ResolutionAction::Substitute,
                    description: format!(
                        "substituted '{alternative}' for '{}' (score {score})",
                        conflict.tool_id
                    ),
                    result: StepResult::Success,
                    affected_tools: vec![conflict.tool_id.clone(), alternative],
                    resolved: true,
                    side_effects: vec![format!(
                        "'{}' was replaced; review its dependents for behavioral differences",
                        conflict.tool_id
                    )],
                }
            }
            _ if self.policy.platform.allow_workarounds && !conflict.workarounds.is_empty() => {
                StepOutcome::needs_user(
                    ResolutionAction::Configure,
                    format!(
                        "no suitable substitute for '{}'; workaround: {}",
                        conflict.tool_id, conflict.workarounds[0]
                    ),
                )
            }
            _ => StepOutcome::failed(
                ResolutionAction::Substitute,
                format!(
                    "'{}' is incompatible with {} and no alternative scores above {threshold}",
                    conflict.tool_id,
                    working.target_platform()
                ),
            ),
        }
    }

    // ---- exclusion / resource ---------------------------------------------

    fn resolve_exclusion(
        &self,
        working: &mut DependencyGraph,
        targets: &mut Vec<String>,
        conflict: &ExclusionConflict,
        prompt: Option<&dyn UserPrompt>,
    ) -> StepOutcome {
        self.remove_all_but_one(working, targets, &conflict.members_present, prompt)
    }

    fn resolve_resource(
        &self,
        working: &mut DependencyGraph,
        targets: &mut Vec<String>,
        conflict: &ResourceConflict,
        prompt: Option<&dyn UserPrompt>,
    ) -> StepOutcome {
        let removal = self.remove_all_but_one(working, targets, &conflict.claimants, prompt);
        if removal.result != StepResult::Success && self.policy.allows(ResolutionAction::Configure)
        {
            // Keeping every claimant is fine if the user re-binds the
            // resource by hand.
            return StepOutcome {
                action: ResolutionAction::Configure,
                description: format!(
                    "kept all claimants of {}; manual reconfiguration required",
                    conflict.resource
                ),
                result: StepResult::Success,
                affected_tools: conflict.claimants.clone(),
                resolved: true,
                side_effects: vec![format!(
                    "reassign {} for all but one of: {}",
                    conflict.resource,
                    conflict.claimants.join(", ")
                )],
            };
        }
        removal
    }

    fn remove_all_but_one(
        &self,
        working: &mut DependencyGraph,
        targets: &mut Vec<String>,
        members: &[String],
        prompt: Option<&dyn UserPrompt>,
    ) -> StepOutcome {
        let present: Vec<String> = members
            .iter()
            .filter(|m| working.contains(m))
            .cloned()
            .collect();
        if present.len() < 2 {
            // An earlier step already thinned this combination out.
            return StepOutcome {
                action: ResolutionAction::Configure,
                description: "already resolved by an earlier step".to_string(),
                result: StepResult::Success,
                affected_tools: members.to_vec(),
                resolved: true,
                side_effects: Vec::new(),
            };
        }
        if !self.policy.interaction.allow_overrides {
            return StepOutcome::needs_user(
                ResolutionAction::Remove,
                format!(
                    "overrides disabled; choose manually between {}",
                    present.join(", ")
                ),
            );
        }
        if !self.policy.allows(ResolutionAction::Remove) {
            return StepOutcome::skipped(
                ResolutionAction::Remove,
                "policy does not allow removal",
            );
        }
        let keep = crate::detect::exclusion::suggest_keeper(working, &present);
        let losers: Vec<String> = present.iter().filter(|m| **m != keep).cloned().collect();
        match self.confirm(
            ResolutionAction::Remove,
            &format!("Keep '{keep}' and remove {}?", losers.join(", ")),
            prompt,
        ) {
            ConfirmAnswer::Yes => {}
            ConfirmAnswer::No => {
                return StepOutcome::failed(
                    ResolutionAction::Remove,
                    format!("user declined removing {}", losers.join(", ")),
                )
            }
            ConfirmAnswer::Skip => {
                return StepOutcome::skipped(
                    ResolutionAction::Remove,
                    format!("user skipped removing {}", losers.join(", ")),
                )
            }
        }
        for loser in &losers {
            working.remove_node(loser);
            targets.retain(|t| t != loser);
        }
        StepOutcome {
            action: ResolutionAction::Remove,
            description: format!("kept '{keep}', removed {}", losers.join(", ")),
            result: StepResult::Success,
            affected_tools: members.to_vec(),
            resolved: true,
            side_effects: losers
                .iter()
                .map(|l| format!("'{l}' was removed from the plan; this cannot be undone"))
                .collect(),
        }
    }
}

/// Replace `tool_id` with `alternative`: incoming edges are re-pointed,
/// the node is removed, and the target set is rewritten.
fn substitute(
    working: &mut DependencyGraph,
    targets: &mut Vec<String>,
    tool_id: &str,
    alternative: &str,
) {
    let incoming: Vec<DependencyGraphEdge> = working
        .incoming_edges(tool_id)
        .into_iter()
        .cloned()
        .collect();
    for old in incoming {
        if old.from == alternative {
            continue;
        }
        let mut dependency = old.dependency.clone();
        dependency.tool_id = alternative.to_string();
        working.insert_edge(DependencyGraphEdge::new(old.from.clone(), dependency));
    }
    working.remove_node(tool_id);
    for target in targets.iter_mut() {
        if target == tool_id {
            *target = alternative.to_string();
        }
    }
    let mut seen = std::collections::BTreeSet::new();
    targets.retain(|t| seen.insert(t.clone()));
}

/// 0-100 score for how well `alternative` can stand in for `tool_id`.
fn compatibility_score(graph: &DependencyGraph, tool_id: &str, alternative: &str) -> u8 {
    let (Some(original), Some(candidate)) = (graph.node(tool_id), graph.node(alternative)) else {
        return 0;
    };
    let mut score = 0u32;
    if original.manifest.category == candidate.manifest.category {
        score += 40;
    }
    if candidate
        .manifest
        .supports(graph.target_platform(), graph.target_architecture())
    {
        score += 45;
    }
    // Shared declared dependencies suggest interchangeable roles.
    let original_deps: Vec<&str> = original
        .manifest
        .dependencies
        .iter()
        .filter(|d| d.dep_type != DependencyType::Conflicts)
        .map(|d| d.tool_id.as_str())
        .collect();
    if original_deps.is_empty()
        || candidate
            .manifest
            .dependencies
            .iter()
            .any(|d| original_deps.contains(&d.tool_id.as_str()))
    {
        score += 15;
    }
    score.min(100) as u8
}

fn pin_string(version: &Version, strategy: PinningStrategy) -> String {
    match strategy {
        PinningStrategy::Exact => version.to_string(),
        PinningStrategy::Major => format!("{}", version.major),
        PinningStrategy::Minor => format!("{}.{}", version.major, version.minor),
        PinningStrategy::Patch => {
            format!("{}.{}.{}", version.major, version.minor, version.patch)
        }
    }
}
