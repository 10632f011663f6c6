use common_types::TokenUsage;
use serde::{Deserialize, Serialize};

/// Everything the generator needs to build one HTML document (4.F user prompt
/// composition).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationContext {
    pub user_request: String,
    #[serde(default = "default_info_type")]
    pub info_type: String,
    pub title: Option<String>,
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub layout_hints: Vec<String>,
    /// Raw conversation block from `process()`'s context map, formatted into
    /// the prompt's "CONVERSATION CONTEXT" section.
    pub conversation: Option<serde_json::Value>,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
}

impl GenerationContext {
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            info_type: default_info_type(),
            ..Default::default()
        }
    }
}

fn default_info_type() -> String {
    "custom".to_string()
}

/// Result of one HTML generation call (4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    pub html: Option<String>,
    pub error: Option<String>,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    pub model: String,
}

impl GenerationResult {
    pub fn failure(error: impl Into<String>, model: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            success: false,
            html: None,
            error: Some(error.into()),
            usage: TokenUsage::default(),
            latency_ms,
            model: model.into(),
        }
    }
}
