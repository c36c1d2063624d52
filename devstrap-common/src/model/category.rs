// devstrap-common/src/model/category.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of tool categories.
///
/// The ordering returned by [`ToolCategory::priority`] drives the
/// topological tie-break: when several tools are simultaneously
/// installable, foundational categories go first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCategory {
    Language,
    Infrastructure,
    Database,
    Backend,
    Frontend,
    Mobile,
    DevOps,
    Testing,
    DataScience,
    Productivity,
}

impl ToolCategory {
    /// Installation priority, lower installs earlier on ties.
    pub fn priority(&self) -> u8 {
        match self {
            ToolCategory::Language => 0,
            ToolCategory::Infrastructure => 1,
            ToolCategory::Database => 2,
            ToolCategory::Backend => 3,
            ToolCategory::Frontend => 4,
            ToolCategory::Mobile => 5,
            ToolCategory::DevOps => 6,
            ToolCategory::Testing => 7,
            ToolCategory::DataScience => 8,
            ToolCategory::Productivity => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Language => "language",
            ToolCategory::Infrastructure => "infrastructure",
            ToolCategory::Database => "database",
            ToolCategory::Backend => "backend",
            ToolCategory::Frontend => "frontend",
            ToolCategory::Mobile => "mobile",
            ToolCategory::DevOps => "devops",
            ToolCategory::Testing => "testing",
            ToolCategory::DataScience => "data-science",
            ToolCategory::Productivity => "productivity",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
