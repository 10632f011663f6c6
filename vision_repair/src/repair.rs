//! Step 2 of two-step vision repair (4.I): rewrites the document per the
//! Step 1 diagnosis, carrying repair history so the model doesn't retry
//! CSS rules that already failed. Grounded on
//! `validation/fixer.py::DirectFixer._repair_with_vision` / `_repair_text_only`.

use crate::cleaner;
use crate::contracts::{DiagnosisResult, RepairResult, VisionRepairContext};
use crate::prompts::{build_repair_prompt, REPAIR_SYSTEM_PROMPT};
use monitor::Monitor;
use provider::{CompletionOptions, Provider};
use std::time::Instant;

pub struct VisionRepairer<'a> {
    provider: &'a dyn Provider,
    monitor: Option<&'a Monitor>,
}

impl<'a> VisionRepairer<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self { provider, monitor: None }
    }

    pub fn with_monitor(mut self, monitor: &'a Monitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Rewrites `context.html` per `diagnosis`. On any failure (provider error,
    /// malformed/incomplete document), returns `success=false` with `html`
    /// equal to the prior document unchanged — the pipeline's best-result
    /// tracker is the only thing that decides whether this counts as progress.
    pub async fn repair(&self, request_id: &str, context: &VisionRepairContext, diagnosis: &DiagnosisResult) -> RepairResult {
        let start = Instant::now();
        let diagnosis_text = diagnosis_text(diagnosis);
        let prompt = build_repair_prompt(&context.html, &diagnosis_text, &context.repair_history);
        let options = CompletionOptions {
            reasoning_effort: Some("high".to_string()),
            use_search: false,
        };

        let response = match &context.screenshot {
            Some(png) => {
                self.provider
                    .complete_with_vision(&prompt, std::slice::from_ref(png), Some(REPAIR_SYSTEM_PROMPT), 0.2, Some(16000), &options)
                    .await
            }
            None => {
                self.provider
                    .complete(&prompt, Some(REPAIR_SYSTEM_PROMPT), 0.2, Some(16000), &options)
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
            tracing::warn!(request_id, error = response.error.as_deref(), "vision repair call failed");
            return unchanged(context, response.usage.total_tokens, latency_ms);
        }

        match cleaner::clean(&response.content) {
            Some(html) => {
                let changed = html != context.html;
                RepairResult {
                    success: true,
                    html,
                    changed,
                    tokens_used: response.usage.total_tokens,
                    latency_ms,
                }
            }
            None => {
                tracing::warn!(request_id, "vision repair output failed structural cleanup, keeping prior HTML");
                unchanged(context, response.usage.total_tokens, latency_ms)
            }
        }
    }
}

fn unchanged(context: &VisionRepairContext, tokens_used: u32, latency_ms: u64) -> RepairResult {
    RepairResult {
        success: false,
        html: context.html.clone(),
        changed: false,
        tokens_used,
        latency_ms,
    }
}

fn diagnosis_text(diagnosis: &DiagnosisResult) -> String {
    if diagnosis.success && !diagnosis.diagnoses.is_empty() {
        diagnosis
            .diagnoses
            .iter()
            .map(|d| {
                format!(
                    "- {} (line {}): {} -> {}",
                    d.selector,
                    d.line_number.map(|l| l.to_string()).unwrap_or_else(|| "?".to_string()),
                    d.problem,
                    d.concrete_fix
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        diagnosis
            .raw_text
            .clone()
            .unwrap_or_else(|| "no diagnosis available; infer problems from the validation report directly".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ElementDiagnosis;
    use common_types::ProviderTier;
    use provider::MockProvider;

    fn diagnosis_with(selector: &str) -> DiagnosisResult {
        DiagnosisResult {
            success: true,
            diagnoses: vec![ElementDiagnosis {
                selector: selector.to_string(),
                line_number: Some(3),
                problem: "no visible feedback on click".to_string(),
                concrete_fix: "add background-color: #1e90ff on click".to_string(),
            }],
            raw_text: None,
            tokens_used: 10,
            latency_ms: 5,
        }
    }

    #[tokio::test]
    async fn successful_repair_returns_cleaned_document() {
        let doc = "<!DOCTYPE html><html><head></head><body><button id=\"go\">Go</button></body></html>";
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, doc);
        let repairer = VisionRepairer::new(&provider);
        let context = VisionRepairContext::new("<!DOCTYPE html><html><head></head><body><button id=\"go\">Go</button></body></html>");
        let diagnosis = diagnosis_with("#go");
        let result = repairer.repair("r1", &context, &diagnosis).await;
        assert!(result.success);
        assert!(result.html.contains("<button"));
    }

    #[tokio::test]
    async fn malformed_output_falls_back_to_prior_html() {
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, "<div>not a full document</div>");
        let repairer = VisionRepairer::new(&provider);
        let context = VisionRepairContext::new("<!DOCTYPE html><html><head></head><body>original</body></html>");
        let diagnosis = diagnosis_with("#go");
        let result = repairer.repair("r1", &context, &diagnosis).await;
        assert!(!result.success);
        assert!(!result.changed);
        assert_eq!(result.html, context.html);
    }

    #[tokio::test]
    async fn provider_failure_never_raises() {
        let provider = MockProvider::failing(ProviderTier::Reasoner);
        let repairer = VisionRepairer::new(&provider);
        let context = VisionRepairContext::new("<!DOCTYPE html><html><head></head><body>x</body></html>");
        let diagnosis = diagnosis_with("#go");
        let result = repairer.repair("r1", &context, &diagnosis).await;
        assert!(!result.success);
        assert_eq!(result.html, context.html);
    }

    #[tokio::test]
    async fn text_only_mode_when_no_screenshot() {
        let doc = "<!DOCTYPE html><html><head></head><body>fixed</body></html>";
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, doc);
        let repairer = VisionRepairer::new(&provider);
        let context = VisionRepairContext::new("<!DOCTYPE html><html><head></head><body>orig</body></html>");
        let diagnosis = DiagnosisResult::default();
        let result = repairer.repair("r1", &context, &diagnosis).await;
        assert!(result.success);
    }
}
