use common_types::ProviderTier;
use serde::{Deserialize, Serialize};

/// Task complexity classification driving provider selection (4.C / §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    ComplexExecution,
    ComplexReasoning,
}

impl Complexity {
    /// Fixed complexity → provider table (§3 invariant, never configurable).
    pub fn target_provider(&self) -> ProviderTier {
        match self {
            Complexity::Simple => ProviderTier::Cheap,
            Complexity::ComplexExecution => ProviderTier::Coder,
            Complexity::ComplexReasoning => ProviderTier::Reasoner,
        }
    }

    pub fn from_raw(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "complex_execution" => Complexity::ComplexExecution,
            "complex_reasoning" => Complexity::ComplexReasoning,
            _ => Complexity::Simple,
        }
    }
}

/// The router's output: which back-end should handle this request (4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub complexity: Complexity,
    pub target_provider: ProviderTier,
    pub reasoning: String,
    pub confidence: f32,
    pub is_device_command: bool,
    pub should_respond_directly: bool,
}

impl RoutingDecision {
    /// Default decision on classifier HTTP/parse failure (4.C: "the router
    /// never raises").
    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self {
            complexity: Complexity::Simple,
            target_provider: ProviderTier::Cheap,
            reasoning: reasoning.into(),
            confidence: 0.5,
            is_device_command: false,
            should_respond_directly: false,
        }
    }
}
