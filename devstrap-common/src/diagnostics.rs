// devstrap-common/src/diagnostics.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable diagnostic codes referenced by tests and external tooling.
/// Never rename these.
pub mod codes {
    pub const MISSING_TOOL_ID: &str = "MISSING_TOOL_ID";
    pub const MISSING_TOOL_NAME: &str = "MISSING_TOOL_NAME";
    pub const EMPTY_PLATFORM_SET: &str = "EMPTY_PLATFORM_SET";
    pub const EMPTY_ARCH_SET: &str = "EMPTY_ARCH_SET";
    pub const INVALID_DEPENDENCY: &str = "INVALID_DEPENDENCY";
    pub const PLATFORM_INCOMPATIBLE: &str = "PLATFORM_INCOMPATIBLE";
    pub const MISSING_DEPENDENCY: &str = "MISSING_DEPENDENCY";
    pub const MISSING_REQUIRED_DEPENDENCY: &str = "MISSING_REQUIRED_DEPENDENCY";
    pub const DUPLICATE_TOOL: &str = "DUPLICATE_TOOL";
    pub const CIRCULAR_DEPENDENCIES: &str = "CIRCULAR_DEPENDENCIES";
    pub const DETECTION_FAILURE: &str = "DETECTION_FAILURE";
    pub const PLAN_TIMEOUT: &str = "PLAN_TIMEOUT";
    pub const RESOLUTION_EXHAUSTED: &str = "RESOLUTION_EXHAUSTED";
    pub const MAX_NODES_EXCEEDED: &str = "MAX_NODES_EXCEEDED";
    pub const CANCELLED: &str = "CANCELLED";
    pub const UNKNOWN_TARGET: &str = "UNKNOWN_TARGET";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One validation or planning finding with a stable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    /// Where the finding points, e.g. `"manifests[3].dependencies[0]"` or a
    /// tool id.
    pub path: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: path.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: path.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {}: {} ({})",
            self.severity, self.code, self.message, self.path
        )
    }
}
