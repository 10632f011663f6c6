//! Step 1 of two-step vision repair (4.I): produces a line-by-line diagnosis
//! from the page screenshot (when available) plus the validator's report.
//! Grounded on `validation/fixer.py::DirectFixer._analyze_with_vision` /
//! `_analyze_text_only`.

use crate::contracts::{DiagnosisResult, VisionRepairContext};
use crate::prompts::{build_diagnosis_prompt, parse_diagnosis_response, DIAGNOSIS_SYSTEM_PROMPT};
use monitor::Monitor;
use provider::{CompletionOptions, Provider};
use std::time::Instant;

/// Calls the analyzer model (vision when a screenshot is present, text-only
/// otherwise) and parses its response into structured diagnoses. Never
/// raises: a provider failure or malformed response yields `success=false`
/// with an empty diagnosis list, and the repair step falls back to repairing
/// from the validation report alone.
pub struct VisionAnalyzer<'a> {
    provider: &'a dyn Provider,
    monitor: Option<&'a Monitor>,
}

impl<'a> VisionAnalyzer<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self { provider, monitor: None }
    }

    pub fn with_monitor(mut self, monitor: &'a Monitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub async fn analyze(&self, request_id: &str, context: &VisionRepairContext) -> DiagnosisResult {
        let start = Instant::now();
        let prompt = build_diagnosis_prompt(&context.html, context.validation.as_ref());
        let options = CompletionOptions::default();

        let response = match &context.screenshot {
            Some(png) => {
                self.provider
                    .complete_with_vision(&prompt, std::slice::from_ref(png), Some(DIAGNOSIS_SYSTEM_PROMPT), 0.1, Some(2000), &options)
                    .await
            }
            None => {
                self.provider
                    .complete(&prompt, Some(DIAGNOSIS_SYSTEM_PROMPT), 0.1, Some(2000), &options)
                    .await
            }
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        if let Some(m) = self.monitor {
            m.track_provider_call(
                request_id,
                self.provider.tier(),
                self.provider.model_id(),
                response.usage,
                latency_ms,
                response.ok,
                true,
                response.error.as_deref(),
            );
        }

        if !response.ok {
            tracing::warn!(request_id, error = response.error.as_deref(), "vision diagnosis call failed");
            return DiagnosisResult {
                success: false,
                diagnoses: Vec::new(),
                raw_text: None,
                tokens_used: response.usage.total_tokens,
                latency_ms,
            };
        }

        match parse_diagnosis_response(&response.content) {
            Ok(diagnoses) => DiagnosisResult {
                success: true,
                diagnoses,
                raw_text: Some(response.content),
                tokens_used: response.usage.total_tokens,
                latency_ms,
            },
            Err(e) => {
                tracing::warn!(request_id, error = %e, "could not parse vision diagnosis response");
                DiagnosisResult {
                    success: false,
                    diagnoses: Vec::new(),
                    raw_text: Some(response.content),
                    tokens_used: response.usage.total_tokens,
                    latency_ms,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::ProviderTier;
    use provider::MockProvider;

    #[tokio::test]
    async fn text_only_diagnosis_without_screenshot() {
        let response = r#"[{"selector":"#go","line_number":3,"problem":"no feedback","concrete_fix":"add background-color: #1e90ff"}]"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let analyzer = VisionAnalyzer::new(&provider);
        let context = VisionRepairContext::new("<div id=\"go\"></div>");
        let result = analyzer.analyze("r1", &context).await;
        assert!(result.success);
        assert_eq!(result.diagnoses.len(), 1);
        assert_eq!(result.diagnoses[0].selector, "#go");
    }

    #[tokio::test]
    async fn vision_mode_used_when_screenshot_present() {
        let response = r#"[{"selector":"#go","problem":"no feedback","concrete_fix":"add bg"}]"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let analyzer = VisionAnalyzer::new(&provider);
        let context = VisionRepairContext::new("<div id=\"go\"></div>").with_screenshot(vec![1, 2, 3]);
        let result = analyzer.analyze("r1", &context).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn provider_failure_is_not_fatal() {
        let provider = MockProvider::failing(ProviderTier::Cheap);
        let analyzer = VisionAnalyzer::new(&provider);
        let context = VisionRepairContext::new("<div></div>");
        let result = analyzer.analyze("r1", &context).await;
        assert!(!result.success);
        assert!(result.diagnoses.is_empty());
    }

    #[tokio::test]
    async fn malformed_response_is_not_fatal() {
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, "not json at all");
        let analyzer = VisionAnalyzer::new(&provider);
        let context = VisionRepairContext::new("<div></div>");
        let result = analyzer.analyze("r1", &context).await;
        assert!(!result.success);
    }
}
