use common_types::{ProviderTier, TokenUsage};
use serde::{Deserialize, Serialize};

/// Uniform record returned by every model call, regardless of back-end.
///
/// Invariant: `ok == false` implies `content` is empty and `error` is set;
/// `ok == true` implies `content` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: String,
    pub provider: ProviderTier,
    pub model: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    pub ok: bool,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ProviderResponse {
    pub fn success(
        content: impl Into<String>,
        provider: ProviderTier,
        model: impl Into<String>,
        usage: TokenUsage,
        latency_ms: u64,
    ) -> Self {
        Self {
            content: content.into(),
            provider,
            model: model.into(),
            usage,
            latency_ms,
            ok: true,
            error: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn failure(
        provider: ProviderTier,
        model: impl Into<String>,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            content: String::new(),
            provider,
            model: model.into(),
            usage: TokenUsage::default(),
            latency_ms,
            ok: false,
            error: Some(error.into()),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Tunables for a single completion call. Left permissive (all optional) since each
/// provider may clamp or ignore fields it doesn't support.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Coder-tier "reasoning effort" knob, used by the vision-repair stage's
    /// repair call (4.I step 2).
    pub reasoning_effort: Option<String>,
    pub use_search: bool,
}
