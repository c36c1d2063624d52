// devstrap-common/src/lib.rs
pub mod cancel;
pub mod dependency;
pub mod diagnostics;
pub mod error;
pub mod interfaces;
pub mod model;
pub mod policy;
pub mod version;

// Re-export key types
pub use cancel::CancellationToken;
pub use dependency::{DependencyType, ToolDependency};
pub use diagnostics::{codes, Diagnostic, Severity};
pub use error::{DevstrapError, Result};
pub use interfaces::{ConfirmAnswer, ManifestSource, SystemInspector, UserPrompt};
pub use model::{
    ArchSet, Architecture, Platform, PlatformSet, SystemRequirements, ToolCategory, ToolManifest,
    VersionInfo,
};
pub use policy::{
    AutomaticPolicy, InteractionPolicy, PinningStrategy, PlatformPolicy, ResolutionAction,
    ResolutionPolicy, RiskTolerance, VersioningPolicy,
};
