use crate::response::{CompletionOptions, ProviderResponse};
use async_trait::async_trait;
use common_types::ProviderTier;

/// Uniform interface over the three back-ends (cheap/coder/reasoner). Every call
/// site depends on this trait, never on a concrete HTTP client, so tests can swap
/// in a `MockProvider` and production code can swap back-ends without touching
/// callers.
#[async_trait]
pub trait Provider: Send + Sync {
    fn tier(&self) -> ProviderTier;

    fn model_id(&self) -> &str;

    async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
        options: &CompletionOptions,
    ) -> ProviderResponse;

    /// Attaches images to the request. Back-ends without vision support return a
    /// response with `ok=false` and `error` set to an "unsupported" message rather
    /// than panicking — callers treat it like any other provider failure.
    async fn complete_with_vision(
        &self,
        prompt: &str,
        _images: &[Vec<u8>],
        system: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
        options: &CompletionOptions,
    ) -> ProviderResponse {
        let mut r = self.complete(prompt, system, temperature, max_tokens, options).await;
        if !r.ok {
            return r;
        }
        r.metadata = serde_json::json!({"vision": false, "note": "provider has no vision-specific path; fell back to text-only complete"});
        r
    }

    /// Attaches a search/grounding tool to the request. Default falls back to a
    /// plain completion, same rationale as `complete_with_vision`.
    async fn complete_with_grounding(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
        options: &CompletionOptions,
    ) -> ProviderResponse {
        self.complete(prompt, system, temperature, max_tokens, options).await
    }

    /// Cheap, non-hot-path liveness probe used by router startup diagnostics.
    /// Mirrors a lightweight provider health probe: a cheap call that confirms
    /// the endpoint is reachable and credentials are valid.
    async fn health_check(&self) -> bool {
        let r = self
            .complete("ping", None, 0.0, Some(4), &CompletionOptions::default())
            .await;
        r.ok
    }
}

/// Strip a leading/trailing markdown code fence (```json ... ``` or ``` ... ```)
/// from a model response before attempting to parse it as JSON.
pub fn strip_markdown_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    trimmed
}
