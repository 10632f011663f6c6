use crate::contracts::{GenerationContext, GenerationResult};
use crate::prompts::{build_user_prompt, SYSTEM_PROMPT};
use monitor::Monitor;
use provider::Provider;
use std::time::Instant;

/// Single large-model call that produces a complete HTML document (4.F).
/// Always calls the reasoner tier; there is no JSON repair loop here since the
/// output is a document, not structured data — malformed output is instead
/// caught by [`HtmlGenerator::is_valid_html`] and returned as a typed failure.
pub struct HtmlGenerator<'a> {
    provider: &'a dyn Provider,
    temperature: f32,
    max_tokens: u32,
    monitor: Option<&'a Monitor>,
}

impl<'a> HtmlGenerator<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            temperature: 0.3,
            max_tokens: 16000,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: &'a Monitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub async fn generate(&self, request_id: &str, ctx: &GenerationContext) -> GenerationResult {
        let start = Instant::now();
        let prompt = build_user_prompt(ctx);

        let options = provider::CompletionOptions::default();
        let response = self
            .provider
            .complete(&prompt, Some(SYSTEM_PROMPT), self.temperature, Some(self.max_tokens), &options)
            .await;
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
            tracing::warn!(request_id, error = response.error.as_deref(), "html generation call failed");
            return GenerationResult::failure(
                response.error.unwrap_or_else(|| "provider call failed".to_string()),
                self.provider.model_id(),
                latency_ms,
            );
        }

        let Some(html) = extract_html(&response.content) else {
            tracing::warn!(request_id, "no valid HTML extracted from generator response");
            return GenerationResult::failure("no valid HTML in response", self.provider.model_id(), latency_ms);
        };

        if !is_valid_html(&html) {
            tracing::warn!(request_id, "generated HTML has invalid structure");
            return GenerationResult {
                success: false,
                html: Some(html),
                error: Some("invalid HTML structure".to_string()),
                usage: response.usage,
                latency_ms,
                model: self.provider.model_id().to_string(),
            };
        }

        tracing::info!(request_id, chars = html.len(), latency_ms, "generated HTML document");
        GenerationResult {
            success: true,
            html: Some(html),
            error: None,
            usage: response.usage,
            latency_ms,
            model: self.provider.model_id().to_string(),
        }
    }
}

/// Strips markdown fences and seeks forward to `<!DOCTYPE` or `<html` if the
/// response has leading prose (4.F output extraction). Returns `None` when
/// neither marker is found.
fn extract_html(content: &str) -> Option<String> {
    if content.trim().is_empty() {
        return None;
    }
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```html") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    if text.starts_with("<!DOCTYPE") || text.starts_with("<!doctype") || text.starts_with("<html") {
        return Some(text.to_string());
    }

    if let Some(pos) = text.find("<!DOCTYPE").or_else(|| text.find("<!doctype")) {
        return Some(text[pos..].to_string());
    }
    if let Some(pos) = text.find("<html") {
        return Some(text[pos..].to_string());
    }
    None
}

/// Basic structural check (4.F): must declare a doctype, an `<html>` tag, a
/// `<body>` tag, and close `</html>`.
fn is_valid_html(html: &str) -> bool {
    if html.is_empty() {
        return false;
    }
    let has_doctype = html.contains("<!DOCTYPE") || html.contains("<!doctype");
    let has_html_tag = html.contains("<html");
    let has_body = html.contains("<body");
    let has_closing = html.contains("</html>");
    has_doctype && has_html_tag && has_body && has_closing
}

/// Infers a content-type hint key from a free-form request, used when the
/// caller (intent service) hasn't already classified `info_type`.
pub fn infer_info_type(request: &str) -> &'static str {
    let lower = request.to_lowercase();
    if lower.contains("trivia") || lower.contains("quiz") {
        "trivia"
    } else if lower.contains("dashboard") || lower.contains("metrics") {
        "dashboard"
    } else if lower.contains("game") || lower.contains("play") {
        "game"
    } else if lower.contains("calendar") || lower.contains("schedule") {
        "calendar"
    } else if lower.contains("weather") || lower.contains("forecast") {
        "weather"
    } else if lower.contains("list") || lower.contains("checklist") {
        "list"
    } else {
        "custom"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::GenerationContext;
    use common_types::ProviderTier;
    use provider::MockProvider;

    const VALID_DOC: &str = "<!DOCTYPE html><html><head></head><body><button data-action=\"x\">Go</button></body></html>";

    #[tokio::test]
    async fn successful_generation_extracts_and_validates_html() {
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, VALID_DOC);
        let generator = HtmlGenerator::new(&provider);
        let ctx = GenerationContext::new("show trivia");
        let result = generator.generate("r1", &ctx).await;
        assert!(result.success);
        assert_eq!(result.html.as_deref(), Some(VALID_DOC));
    }

    #[tokio::test]
    async fn strips_markdown_fence_before_validating() {
        let fenced = format!("```html\n{VALID_DOC}\n```");
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, fenced);
        let generator = HtmlGenerator::new(&provider);
        let ctx = GenerationContext::new("show trivia");
        let result = generator.generate("r1", &ctx).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn missing_closing_html_is_invalid_structure() {
        let broken = "<!DOCTYPE html><html><body><div>no close</div>";
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, broken);
        let generator = HtmlGenerator::new(&provider);
        let ctx = GenerationContext::new("show trivia");
        let result = generator.generate("r1", &ctx).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("invalid HTML structure"));
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced_as_typed_failure() {
        let provider = MockProvider::failing(ProviderTier::Reasoner);
        let generator = HtmlGenerator::new(&provider);
        let ctx = GenerationContext::new("show trivia");
        let result = generator.generate("r1", &ctx).await;
        assert!(!result.success);
        assert!(result.html.is_none());
    }

    #[test]
    fn infers_content_type_from_keywords() {
        assert_eq!(infer_info_type("show me trivia about capitals"), "trivia");
        assert_eq!(infer_info_type("display the weather forecast"), "weather");
        assert_eq!(infer_info_type("random custom request"), "custom");
    }
}
