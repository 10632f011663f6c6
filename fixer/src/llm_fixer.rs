//! LLM fixer orchestrator (4.H), grounded on `llm_fixer.py::LLMFixer.fix`.
//! Errors that the deterministic registry can't handle are split into a
//! Tailwind domain and a JS domain and fixed independently: Tailwind first
//! (feedback is usually the easier fix and unblocks the JS domain from
//! fighting over the same elements), then JS.

use crate::class_applier;
use crate::contracts::{ClassifiedError, FixContext, LLMFixResult, PatchSet};
use crate::js_applier;
use crate::prompts::{js as js_prompt, tailwind as tailwind_prompt};
use crate::validators;
use provider::{CompletionOptions, Provider};

const DEFAULT_MAX_RETRIES: u32 = 2;

pub struct LlmFixer {
    max_retries: u32,
}

impl Default for LlmFixer {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmFixer {
    pub fn new() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES }
    }

    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries: max_retries.max(1) }
    }

    /// Fixes every LLM-routed error in `context`, applying Tailwind patches
    /// then JS patches to a running copy of the document.
    pub async fn fix(&self, context: &FixContext, provider: &dyn Provider) -> LLMFixResult {
        let llm_errors: Vec<ClassifiedError> = context.errors.iter().filter(|e| e.error_type.requires_llm()).cloned().collect();
        let tailwind_errors: Vec<ClassifiedError> = llm_errors.iter().filter(|e| e.error_type.is_feedback_related()).cloned().collect();
        let js_errors: Vec<ClassifiedError> = llm_errors.iter().filter(|e| e.error_type.is_js_related()).cloned().collect();

        let mut result = LLMFixResult::default();
        let mut html = context.html.clone();

        if !tailwind_errors.is_empty() {
            let mut sub_context = context.clone();
            sub_context.errors = tailwind_errors;
            sub_context.html = html.clone();

            if let Some(patches) = self.fix_tailwind_domain(&sub_context, provider, &mut result).await {
                let set = PatchSet::from_patches("llm", patches);
                let injection = class_applier::inject(&html, &set);
                html = injection.html;
                result.class_patches = injection.applied;
            }
        }

        if !js_errors.is_empty() {
            let mut sub_context = context.clone();
            sub_context.errors = js_errors;
            sub_context.html = html.clone();

            if let Some(patches) = self.fix_js_domain(&sub_context, provider, &mut result).await {
                let applied = js_applier::apply(&html, &patches);
                html = applied.html;
                result.js_patches = applied.applied;
            }
        }

        result.success = !result.class_patches.is_empty() || !result.js_patches.is_empty();
        result.fixed_html = Some(html);
        result
    }

    async fn fix_tailwind_domain(
        &self,
        context: &FixContext,
        provider: &dyn Provider,
        result: &mut LLMFixResult,
    ) -> Option<Vec<crate::contracts::ClassPatch>> {
        let mut previous = context.previous_patches.clone();

        for attempt in 1..=self.max_retries {
            let mut attempt_context = context.clone();
            attempt_context.attempt_number = attempt;
            attempt_context.previous_patches = previous.clone();

            let prompt = tailwind_prompt::build(&attempt_context);
            let response = provider
                .complete(&prompt, Some(tailwind_prompt::SYSTEM_PROMPT), 0.2, Some(1500), &CompletionOptions::default())
                .await;
            result.llm_calls_made += 1;

            if !response.ok {
                tracing::warn!(attempt, error = ?response.error, "tailwind fix call failed");
                continue;
            }
            result.tokens_used += response.usage.total_tokens;

            let parsed = match tailwind_prompt::parse_response(&response.content) {
                Ok(patches) => patches,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "could not parse tailwind fix response");
                    continue;
                }
            };

            let valid = validators::validate_class_patches(&attempt_context.html, parsed.clone());
            if !valid.is_empty() {
                return Some(valid);
            }

            for patch in &parsed {
                previous.push(format!("selector {} add={:?} remove={:?} (rejected)", patch.selector, patch.add_classes, patch.remove_classes));
            }
        }

        None
    }

    async fn fix_js_domain(&self, context: &FixContext, provider: &dyn Provider, result: &mut LLMFixResult) -> Option<Vec<crate::contracts::JSPatch>> {
        let mut previous = context.previous_patches.clone();

        for attempt in 1..=self.max_retries {
            let mut attempt_context = context.clone();
            attempt_context.attempt_number = attempt;
            attempt_context.previous_patches = previous.clone();

            let prompt = js_prompt::build(&attempt_context);
            let response = provider
                .complete(&prompt, Some(js_prompt::SYSTEM_PROMPT), 0.2, Some(1500), &CompletionOptions::default())
                .await;
            result.llm_calls_made += 1;

            if !response.ok {
                tracing::warn!(attempt, error = ?response.error, "js fix call failed");
                continue;
            }
            result.tokens_used += response.usage.total_tokens;

            let parsed = match js_prompt::parse_response(&response.content) {
                Ok(patches) => patches,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "could not parse js fix response");
                    continue;
                }
            };

            let valid = validators::validate_js_patches(&attempt_context, parsed.clone());
            if !valid.is_empty() {
                return Some(valid);
            }

            for patch in &parsed {
                previous.push(format!("{} (rejected)", patch.describe()));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ErrorType;
    use common_types::ProviderTier;
    use provider::MockProvider;

    #[tokio::test]
    async fn fixes_tailwind_error_in_one_round() {
        let html = r#"<button id="go" class="hidden">Go</button>"#;
        let mut context = FixContext::default();
        context.html = html.to_string();
        context.errors.push(ClassifiedError::new(ErrorType::FeedbackMissing, "#go", "button"));

        let response = r#"[{"selector":"#go","add_classes":["hover:scale-105","transition-all"],"remove_classes":["hidden"],"reason":"feedback"}]"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);

        let fixer = LlmFixer::new();
        let result = fixer.fix(&context, &provider).await;
        assert!(result.success);
        assert_eq!(result.class_patches.len(), 1);
        assert!(result.fixed_html.unwrap().contains("hover:scale-105"));
    }

    #[tokio::test]
    async fn retries_after_invalid_patch_then_succeeds() {
        let html = r#"<button id="go" class="px-4">Go</button>"#;
        let mut context = FixContext::default();
        context.html = html.to_string();
        context.errors.push(ClassifiedError::new(ErrorType::FeedbackMissing, "#go", "button"));

        let bad = r#"[{"selector":"#go","add_classes":["totally-invalid-token"],"remove_classes":[],"reason":"x"}]"#;
        let good = r#"[{"selector":"#go","add_classes":["hover:bg-blue-600"],"remove_classes":[],"reason":"x"}]"#;
        let provider = MockProvider::with_sequence(ProviderTier::Cheap, vec![bad.to_string(), good.to_string()]);

        let fixer = LlmFixer::new();
        let result = fixer.fix(&context, &provider).await;
        assert!(result.success);
        assert_eq!(result.llm_calls_made, 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries_exhausted() {
        let html = r#"<button id="go" class="px-4">Go</button>"#;
        let mut context = FixContext::default();
        context.html = html.to_string();
        context.errors.push(ClassifiedError::new(ErrorType::FeedbackMissing, "#go", "button"));

        let bad = r#"[{"selector":"#go","add_classes":["nonsense-token"],"remove_classes":[],"reason":"x"}]"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, bad);

        let fixer = LlmFixer::with_max_retries(2);
        let result = fixer.fix(&context, &provider).await;
        assert!(!result.success);
        assert_eq!(result.llm_calls_made, 2);
    }

    #[tokio::test]
    async fn fixes_js_domain_error() {
        let html = "<script>function existing(){}</script>";
        let mut context = FixContext::default();
        context.html = html.to_string();
        context.errors.push(ClassifiedError::new(ErrorType::JsMissingFunction, "script#0", "script"));
        context.called_functions.insert("toggleMenu".to_string());

        let response = r#"[{"patch_type":"add_function","function_name":"toggleMenu","function_code":"function toggleMenu(){ const el = document.getElementById('menu'); if (el) { el.classList.toggle('hidden'); } }","reason":"missing"}]"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);

        let fixer = LlmFixer::new();
        let result = fixer.fix(&context, &provider).await;
        assert!(result.success);
        assert_eq!(result.js_patches.len(), 1);
        assert!(result.fixed_html.unwrap().contains("toggleMenu"));
    }

    #[tokio::test]
    async fn provider_failure_does_not_panic() {
        let mut context = FixContext::default();
        context.html = "<div></div>".to_string();
        context.errors.push(ClassifiedError::new(ErrorType::FeedbackMissing, "#go", "button"));
        let provider = MockProvider::failing(ProviderTier::Cheap);

        let fixer = LlmFixer::with_max_retries(1);
        let result = fixer.fix(&context, &provider).await;
        assert!(!result.success);
    }
}
