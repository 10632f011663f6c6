use crate::provider_trait::{strip_markdown_fence, Provider};
use crate::response::CompletionOptions;
use error_types::JsonRepairError;

/// JSON-oriented completion with self-repair (4.A).
///
/// Holds the "diagnosis" provider — normally the cheap tier, regardless of which
/// tier produced the malformed output — and retries against the *original*
/// provider with a repair prompt built from the diagnosis.
pub struct JsonRepairLoop<'a> {
    diagnosis_provider: &'a dyn Provider,
    enabled: bool,
    max_attempts: u32,
}

impl<'a> JsonRepairLoop<'a> {
    pub fn new(diagnosis_provider: &'a dyn Provider, enabled: bool, max_attempts: u32) -> Self {
        Self {
            diagnosis_provider,
            enabled,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Calls `target` asking for JSON only, repairing malformed output in place.
    pub async fn complete_json(
        &self,
        target: &dyn Provider,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<serde_json::Value, JsonRepairError> {
        let options = CompletionOptions::default();
        let resp = target
            .complete(prompt, system, temperature, max_tokens, &options)
            .await;
        if !resp.ok {
            return Err(JsonRepairError::Provider(error_types::ProviderError::InvalidResponse(
                resp.error.unwrap_or_else(|| "provider call failed".to_string()),
            )));
        }

        let cleaned = strip_markdown_fence(&resp.content).to_string();
        match serde_json::from_str::<serde_json::Value>(&cleaned) {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !self.enabled {
                    return Err(JsonRepairError::RepairDisabled(e.to_string()));
                }
                self.repair_loop(target, &cleaned, e.to_string(), system, prompt, temperature, max_tokens)
                    .await
            }
        }
    }

    async fn repair_loop(
        &self,
        target: &dyn Provider,
        malformed: &str,
        mut last_error: String,
        system: Option<&str>,
        original_prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<serde_json::Value, JsonRepairError> {
        let options = CompletionOptions::default();
        for _ in 0..self.max_attempts {
            let diagnosis_prompt = format!(
                "The following text was supposed to be valid JSON but failed to parse.\n\
                 Parser error: {last_error}\n\
                 Text:\n{malformed}\n\n\
                 In 1-2 sentences, diagnose exactly what is wrong with the JSON."
            );
            let diagnosis_resp = self
                .diagnosis_provider
                .complete(&diagnosis_prompt, None, 0.0, Some(200), &options)
                .await;
            if !diagnosis_resp.ok {
                return Err(JsonRepairError::Provider(error_types::ProviderError::InvalidResponse(
                    diagnosis_resp.error.unwrap_or_default(),
                )));
            }

            let truncated_context: String = original_prompt.chars().take(2000).collect();
            let repair_prompt = format!(
                "You previously returned malformed JSON.\n\
                 Diagnosis: {}\n\
                 Malformed JSON:\n{}\n\n\
                 Original request context (truncated):\n{}\n\n\
                 Return ONLY the corrected JSON. No prose, no markdown fences.",
                diagnosis_resp.content, malformed, truncated_context
            );
            let repair_resp = target
                .complete(&repair_prompt, system, temperature, max_tokens, &options)
                .await;
            if !repair_resp.ok {
                return Err(JsonRepairError::Provider(error_types::ProviderError::InvalidResponse(
                    repair_resp.error.unwrap_or_default(),
                )));
            }

            let cleaned = strip_markdown_fence(&repair_resp.content).to_string();
            match serde_json::from_str::<serde_json::Value>(&cleaned) {
                Ok(v) => return Ok(v),
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(JsonRepairError::RepairExhausted(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use common_types::ProviderTier;

    #[tokio::test]
    async fn succeeds_without_repair_on_clean_json() {
        let target = MockProvider::with_fixed_response(ProviderTier::Cheap, "{\"a\":1}");
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let repair = JsonRepairLoop::new(&diag, true, 1);
        let v = repair
            .complete_json(&target, "give me json", None, 0.0, None)
            .await
            .unwrap();
        assert_eq!(v["a"], 1);
    }

    #[tokio::test]
    async fn repairs_missing_comma_via_diagnosis_then_retry() {
        let target = MockProvider::with_sequence(
            ProviderTier::Cheap,
            vec![
                "{\"a\":1 \"b\":2}".to_string(),
                "{\"a\":1,\"b\":2}".to_string(),
            ],
        );
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "missing comma between fields");
        let repair = JsonRepairLoop::new(&diag, true, 1);
        let v = repair
            .complete_json(&target, "give me json", None, 0.0, None)
            .await
            .unwrap();
        assert_eq!(v["a"], 1);
        assert_eq!(v["b"], 2);
    }

    #[tokio::test]
    async fn disabled_repair_returns_parse_error_verbatim() {
        let target = MockProvider::with_fixed_response(ProviderTier::Cheap, "not json");
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let repair = JsonRepairLoop::new(&diag, false, 1);
        let err = repair
            .complete_json(&target, "give me json", None, 0.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, JsonRepairError::RepairDisabled(_)));
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let target = MockProvider::with_fixed_response(ProviderTier::Cheap, "still not json");
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "unclear");
        let repair = JsonRepairLoop::new(&diag, true, 1);
        let err = repair
            .complete_json(&target, "give me json", None, 0.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, JsonRepairError::RepairExhausted(_)));
    }
}
