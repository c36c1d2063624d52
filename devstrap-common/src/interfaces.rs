// devstrap-common/src/interfaces.rs

//! The narrow interfaces the core consumes. All three are optional at the
//! call sites; the resolver falls back to policy defaults when no prompt is
//! wired up, and the planner accepts a plain installed set instead of an
//! inspector.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::manifest::ToolManifest;
use crate::model::platform::{Architecture, Platform};

/// Produces the tool catalog. File parsing and validation at the file level
/// happen behind this boundary.
pub trait ManifestSource {
    fn manifests(&self) -> Result<Vec<ToolManifest>>;
}

/// Reports the host environment and which tools are already present.
pub trait SystemInspector {
    fn platform(&self) -> Platform;
    fn architecture(&self) -> Architecture;
    fn installed(&self) -> BTreeSet<String>;
}

/// Answer to a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAnswer {
    Yes,
    No,
    Skip,
}

/// Abstract user-interaction surface. Kept out of the analyzer and planner
/// bodies so those stay pure; only the resolver's confirmation path touches
/// it.
pub trait UserPrompt {
    fn request_confirmation(&self, message: &str, options: &[ConfirmAnswer]) -> ConfirmAnswer;

    fn request_input(&self, _prompt: &str) -> Option<String> {
        None
    }

    fn notify_progress(&self, _message: &str, _percent: u8) {}
}

/// A fixed in-memory catalog, useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticManifestSource {
    pub manifests: Vec<ToolManifest>,
}

impl StaticManifestSource {
    pub fn new(manifests: Vec<ToolManifest>) -> Self {
        Self { manifests }
    }
}

impl ManifestSource for StaticManifestSource {
    fn manifests(&self) -> Result<Vec<ToolManifest>> {
        Ok(self.manifests.clone())
    }
}
