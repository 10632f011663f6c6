//! Top-level generate -> validate -> repair loop (4.J), wiring the HTML
//! generator, sandbox validator, deterministic + LLM fixer and two-step
//! vision repair into one scored result.

use crate::contracts::{BestResultTracker, PipelineConfig, PipelineResult, RunTotals};
use crate::{error_mapping, human_feedback, static_analysis};
use fixer::{fix_deterministic, LlmFixer};
use html_generator::{GenerationContext, GenerationResult, HtmlGenerator};
use monitor::Monitor;
use provider::Provider;
use sandbox_validator::{PageHandle, SandboxConfig, SandboxResult, SandboxValidator};
use std::time::Instant;

/// Collaborators a pipeline run needs. Kept as three separate provider
/// references (rather than one) because the original dispatches generation,
/// repair and diagnosis to different model tiers; tests can pass the same
/// `MockProvider` to all three.
pub struct CustomLayoutPipeline<'a> {
    generator: HtmlGenerator<'a>,
    fixer_provider: &'a dyn Provider,
    vision_provider: &'a dyn Provider,
    validator: SandboxValidator,
    monitor: Option<&'a Monitor>,
    config: PipelineConfig,
}

impl<'a> CustomLayoutPipeline<'a> {
    pub fn new(generator_provider: &'a dyn Provider, fixer_provider: &'a dyn Provider, vision_provider: &'a dyn Provider) -> Self {
        Self {
            generator: HtmlGenerator::new(generator_provider),
            fixer_provider,
            vision_provider,
            validator: SandboxValidator::new(SandboxConfig::default()),
            monitor: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: &'a Monitor) -> Self {
        self.generator = self.generator.with_monitor(monitor);
        self.monitor = Some(monitor);
        self
    }

    pub fn with_sandbox_config(mut self, config: SandboxConfig) -> Self {
        self.validator = SandboxValidator::new(config);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the full generate/validate/repair loop (4.J steps 1-7).
    pub async fn run(&self, request_id: &str, page: &dyn PageHandle, context: &GenerationContext, static_layout: bool) -> PipelineResult {
        let start = Instant::now();
        let mut totals = RunTotals::default();

        let generation = self.generator.generate(request_id, context).await;
        totals.add_tokens(generation.usage.total_tokens);
        totals.add_latency(generation.latency_ms);

        let Some(html) = generation.html.clone() else {
            return self.finish_failure(generation, start, totals);
        };
        if !generation.success {
            return self.finish_failure(generation, start, totals);
        }

        if !self.config.custom_layout_validation_enabled {
            return PipelineResult {
                ok: true,
                html: Some(html),
                generation_result: Some(generation),
                validation_result: None,
                total_latency_ms: start.elapsed().as_millis() as u64,
                total_tokens: totals.usage.total_tokens,
                final_score: 1.0,
                error: None,
                validation_skipped: true,
            };
        }

        let mut tracker = BestResultTracker::new();
        let mut current_html = html;
        let mut validation = self.validate(page, &current_html, static_layout, &mut totals).await;
        tracker.record(current_html.clone(), validation.confidence, "generate", error_mapping::classify(&validation).len());

        let mut cycle = 0;
        while !self.acceptable(&validation) && cycle < self.config.max_repair_cycles {
            cycle += 1;
            let repaired = self.repair_cycle(request_id, &current_html, &validation, &mut totals).await;

            let Some(repaired_html) = repaired else {
                tracing::info!(request_id, cycle, "repair pass produced no edits, stopping early");
                break;
            };
            if repaired_html == current_html {
                tracing::info!(request_id, cycle, "repair pass returned identical HTML, stopping early");
                break;
            }

            current_html = repaired_html;
            validation = self.validate(page, &current_html, static_layout, &mut totals).await;
            tracker.record(current_html.clone(), validation.confidence, format!("repair_{cycle}"), error_mapping::classify(&validation).len());

            if tracker.stalled_for_two_cycles() {
                tracing::info!(request_id, cycle, "score unchanged for two cycles, stopping early");
                break;
            }
        }

        let best_html = tracker.best_html().unwrap_or(&current_html).to_string();
        PipelineResult {
            ok: true,
            html: Some(best_html),
            generation_result: Some(generation),
            validation_result: Some(validation),
            total_latency_ms: start.elapsed().as_millis() as u64,
            total_tokens: totals.usage.total_tokens,
            final_score: tracker.best_score(),
            error: None,
            validation_skipped: false,
        }
    }

    /// Human-feedback mode (4.J): skips generation entirely, runs a single
    /// JS-only LLM fix pass over an operator-annotated document, strips the
    /// annotations, and validates once (no CSS rewrite, no repeat cycles).
    pub async fn run_human_feedback(&self, request_id: &str, page: &dyn PageHandle, annotated_html: &str, static_layout: bool) -> PipelineResult {
        let start = Instant::now();
        let mut totals = RunTotals::default();

        let (elements, global) = human_feedback::parse_feedback(annotated_html);
        let prompt = human_feedback::build_feedback_prompt(annotated_html, &elements, global.as_deref());

        let options = provider::CompletionOptions::default();
        let response = self
            .vision_provider
            .complete(&prompt, Some("You repair HTML per embedded operator feedback annotations."), 0.2, Some(16000), &options)
            .await;
        totals.add_tokens(response.usage.total_tokens);

        let repaired = if response.ok {
            human_feedback::strip_annotations(provider::strip_markdown_fence(&response.content))
        } else {
            human_feedback::strip_annotations(annotated_html)
        };

        let validation = self.validate(page, &repaired, static_layout, &mut totals).await;
        let score = validation.confidence;
        PipelineResult {
            ok: true,
            html: Some(repaired),
            generation_result: None,
            validation_result: Some(validation),
            total_latency_ms: start.elapsed().as_millis() as u64,
            total_tokens: totals.usage.total_tokens,
            final_score: score,
            error: None,
            validation_skipped: false,
        }
    }

    async fn validate(&self, page: &dyn PageHandle, html: &str, static_layout: bool, totals: &mut RunTotals) -> SandboxResult {
        let result = self.validator.validate(page, html, static_layout).await;
        totals.add_latency(result.total_duration_ms);
        result
    }

    fn acceptable(&self, validation: &SandboxResult) -> bool {
        validation.valid && validation.confidence >= self.config.acceptance_score
    }

    /// One repair attempt: vision repair when a screenshot is available and
    /// HTML repair is enabled, otherwise deterministic + LLM class/JS patches.
    async fn repair_cycle(&self, request_id: &str, html: &str, validation: &SandboxResult, totals: &mut RunTotals) -> Option<String> {
        if !self.config.html_repair_enabled {
            return None;
        }

        if let Some(screenshot) = &validation.page_screenshot {
            let context = vision_repair::VisionRepairContext::new(html).with_validation(validation.clone()).with_screenshot(screenshot.clone());
            let vision = vision_repair::VisionRepair::new(self.vision_provider);
            let vision = match self.monitor {
                Some(m) => vision.with_monitor(m),
                None => vision,
            };
            let (diagnosis, repair) = vision.run(request_id, &context).await;
            totals.add_tokens(diagnosis.tokens_used + repair.tokens_used);
            totals.add_latency(diagnosis.latency_ms + repair.latency_ms);
            return if repair.success && repair.changed { Some(repair.html) } else { None };
        }

        let errors = error_mapping::classify(validation);
        if errors.is_empty() {
            return None;
        }

        if let Ok(injection) = fix_deterministic(html, &errors) {
            if !injection.applied.is_empty() {
                return Some(injection.html);
            }
        }

        let mut fix_context = static_analysis::build_context(html, 1, Vec::new());
        fix_context.errors = errors;
        let llm_fixer = LlmFixer::new();
        let result = llm_fixer.fix(&fix_context, self.fixer_provider).await;
        totals.add_tokens(result.tokens_used);
        if result.success {
            result.fixed_html
        } else {
            None
        }
    }

    fn finish_failure(&self, generation: GenerationResult, start: Instant, totals: RunTotals) -> PipelineResult {
        PipelineResult {
            ok: false,
            html: generation.html.clone(),
            generation_result: Some(generation.clone()),
            validation_result: None,
            total_latency_ms: start.elapsed().as_millis() as u64,
            total_tokens: totals.usage.total_tokens,
            final_score: 0.0,
            error: generation.error,
            validation_skipped: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::ProviderTier;
    use provider::MockProvider;
    use sandbox_validator::MockPage;

    const VALID_DOC: &str = "<!DOCTYPE html><html><head></head><body><button data-action=\"go\">Go</button></body></html>";

    #[tokio::test]
    async fn generation_failure_short_circuits_before_validation() {
        let provider = MockProvider::failing(ProviderTier::Reasoner);
        let pipeline = CustomLayoutPipeline::new(&provider, &provider, &provider);
        let page = MockPage::default();
        let context = GenerationContext::new("show trivia");
        let result = pipeline.run("r1", &page, &context, true).await;
        assert!(!result.ok);
        assert!(result.validation_result.is_none());
    }

    #[tokio::test]
    async fn static_layout_passes_without_repair_cycles() {
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, VALID_DOC);
        let pipeline = CustomLayoutPipeline::new(&provider, &provider, &provider);
        let page = MockPage::default();
        page.push_eval(serde_json::json!(true));
        page.push_screenshot(checkerboard_png());
        page.push_eval(serde_json::json!({ "viewport": {"width":1920,"height":1080}, "nodes": [] }));
        let context = GenerationContext::new("show trivia");
        let result = pipeline.run("r1", &page, &context, true).await;
        assert!(result.ok);
        assert!(result.final_score > 0.0);
        assert!(result.validation_result.unwrap().valid);
    }

    #[tokio::test]
    async fn validation_disabled_returns_unvalidated_html() {
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, VALID_DOC);
        let pipeline = CustomLayoutPipeline::new(&provider, &provider, &provider).with_config(crate::contracts::PipelineConfig {
            custom_layout_validation_enabled: false,
            ..Default::default()
        });
        let page = MockPage::default();
        let context = GenerationContext::new("show trivia");
        let result = pipeline.run("r1", &page, &context, true).await;
        assert!(result.ok);
        assert!(result.validation_skipped);
    }

    #[tokio::test]
    async fn human_feedback_mode_strips_annotations_and_validates() {
        let annotated = "<!DOCTYPE html><html><head></head><body>\n\
            <!-- [ELEMENT #1] status:broken user_feedback:\"no feedback on click\" -->\n\
            <button id=\"go\">Go</button>\n\
            <!-- [GLOBAL FEEDBACK] make it punchier -->\n\
            </body></html>";
        let repaired = "<!DOCTYPE html><html><head></head><body><button id=\"go\" class=\"bg-blue-500\">Go</button></body></html>";
        let provider = MockProvider::with_fixed_response(ProviderTier::Reasoner, repaired);
        let pipeline = CustomLayoutPipeline::new(&provider, &provider, &provider);
        let page = MockPage::default();
        page.push_eval(serde_json::json!(true));
        page.push_screenshot(checkerboard_png());
        page.push_eval(serde_json::json!({ "viewport": {"width":1920,"height":1080}, "nodes": [] }));
        let result = pipeline.run_human_feedback("r1", &page, annotated, true).await;
        assert!(result.ok);
        let html = result.html.unwrap();
        assert!(!html.contains("ELEMENT #"));
    }

    fn checkerboard_png() -> Vec<u8> {
        let mut buf = image::GrayImage::new(16, 16);
        for (x, y, px) in buf.enumerate_pixels_mut() {
            *px = image::Luma([if (x + y) % 2 == 0 { 10 } else { 240 }]);
        }
        let mut out = Vec::new();
        image::DynamicImage::ImageLuma8(buf)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }
}
