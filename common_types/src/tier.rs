use serde::{Deserialize, Serialize};

/// Which back-end class handled (or should handle) a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTier {
    /// Fast, cheap model used for routing, classification and orchestration.
    Cheap,
    /// Model tier used for code generation and tool-style execution.
    Coder,
    /// Model tier used for deep reasoning, planning and vision-guided repair.
    Reasoner,
}

impl ProviderTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTier::Cheap => "cheap",
            ProviderTier::Coder => "coder",
            ProviderTier::Reasoner => "reasoner",
        }
    }
}

impl std::fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
