// devstrap-common/src/policy.rs

//! Resolution policy as plain configuration data. Behavior lives in the
//! resolver; these records only say what it is allowed to do.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The closed set of remediation actions the resolver can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionAction {
    Substitute,
    Defer,
    Upgrade,
    Downgrade,
    Remove,
    Configure,
}

impl ResolutionAction {
    /// `Remove` cannot be undone once the plan executes; everything else is
    /// recorded in the resolver's undo log.
    pub fn is_reversible(&self) -> bool {
        !matches!(self, ResolutionAction::Remove)
    }

    /// Actions that warrant a user confirmation under
    /// [`InteractionPolicy::confirm_major_changes`].
    pub fn is_major(&self) -> bool {
        matches!(
            self,
            ResolutionAction::Substitute | ResolutionAction::Remove | ResolutionAction::Upgrade
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    Moderate,
    Aggressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinningStrategy {
    Exact,
    Major,
    Minor,
    Patch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomaticPolicy {
    pub enabled: bool,
    pub max_steps: usize,
    pub allowed_actions: BTreeSet<ResolutionAction>,
    pub risk_tolerance: RiskTolerance,
}

impl Default for AutomaticPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_steps: 10,
            allowed_actions: [
                ResolutionAction::Substitute,
                ResolutionAction::Defer,
                ResolutionAction::Upgrade,
                ResolutionAction::Downgrade,
                ResolutionAction::Configure,
            ]
            .into_iter()
            .collect(),
            risk_tolerance: RiskTolerance::Moderate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersioningPolicy {
    pub prefer_latest: bool,
    pub allow_major_upgrades: bool,
    pub allow_downgrades: bool,
    pub pinning_strategy: PinningStrategy,
}

impl Default for VersioningPolicy {
    fn default() -> Self {
        Self {
            prefer_latest: true,
            allow_major_upgrades: false,
            allow_downgrades: false,
            pinning_strategy: PinningStrategy::Exact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPolicy {
    pub use_alternatives: bool,
    pub allow_workarounds: bool,
    pub prefer_native: bool,
    /// Minimum compatibility score (0-100) an alternative must reach before
    /// the resolver will substitute it.
    pub substitution_threshold: u8,
}

impl Default for PlatformPolicy {
    fn default() -> Self {
        Self {
            use_alternatives: true,
            allow_workarounds: true,
            prefer_native: true,
            substitution_threshold: 70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionPolicy {
    pub confirm_major_changes: bool,
    pub verbose_explanations: bool,
    pub allow_overrides: bool,
}

impl Default for InteractionPolicy {
    fn default() -> Self {
        Self {
            confirm_major_changes: false,
            verbose_explanations: false,
            allow_overrides: true,
        }
    }
}

/// Everything the conflict resolver is allowed to do, as one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionPolicy {
    pub automatic: AutomaticPolicy,
    pub versioning: VersioningPolicy,
    pub platform: PlatformPolicy,
    pub interaction: InteractionPolicy,
}

impl ResolutionPolicy {
    pub fn allows(&self, action: ResolutionAction) -> bool {
        self.automatic.enabled && self.automatic.allowed_actions.contains(&action)
    }
}
