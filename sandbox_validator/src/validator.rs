//! Top-level orchestrator wiring the seven phases to a live [`PageHandle`]
//! (4.G). `static_layout` short-circuits Phase 5 per the aggregator's one
//! caller-supplied exception (§6.2: "never introspects per-layout semantics
//! except to short-circuit interaction testing for layouts declared static").

use crate::config::SandboxConfig;
use crate::page::PageHandle;
use crate::phase4_inputs;
use crate::phase6_aggregate;
use crate::types::{PhaseResult, SandboxResult};
use crate::{phase1_render, phase2_visual, phase3_scene, phase5_interaction};
use std::time::Instant;
use tracing::{info, warn};

pub struct SandboxValidator {
    config: SandboxConfig,
}

impl SandboxValidator {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Runs all seven phases against `html` over `page`. `static_layout` comes
    /// from the caller (the layout spec declares whether it needs interaction
    /// testing at all); this function never infers it from the markup.
    pub async fn validate(&self, page: &dyn PageHandle, html: &str, static_layout: bool) -> SandboxResult {
        let start = Instant::now();
        let mut phases: Vec<PhaseResult> = Vec::with_capacity(6);

        let render = phase1_render::run(page, html, &self.config).await;
        let render_passed = render.passed;
        phases.push(render);
        if !render_passed {
            return self.finish(phases, Vec::new(), static_layout, start, 0, None);
        }

        let (visual, snapshot) = phase2_visual::run(page, &self.config).await;
        let visual_passed = visual.passed;
        let screenshot = snapshot.as_ref().map(|s| s.png_bytes.clone());
        phases.push(visual);
        if !visual_passed {
            return self.finish(phases, Vec::new(), static_layout, start, 0, screenshot);
        }

        let (scene_result, graph) = phase3_scene::run(page).await;
        let scene_passed = scene_result.passed;
        phases.push(scene_result);
        if !scene_passed {
            return self.finish(phases, Vec::new(), static_layout, start, 0, screenshot);
        }

        let (inputs_result, candidates) = phase4_inputs::run(page, &graph, &self.config).await;
        let inputs_passed = inputs_result.passed;
        let invisible_count = phase4_inputs::invisible_count_from_details(&inputs_result.details);
        phases.push(inputs_result);
        if !inputs_passed {
            return self.finish(phases, Vec::new(), static_layout, start, invisible_count, screenshot);
        }

        if static_layout {
            info!("layout declared static, skipping interaction testing");
            return self.finish(phases, Vec::new(), static_layout, start, invisible_count, screenshot);
        }

        let (interaction_result, interactions) = phase5_interaction::run(page, html, &graph, &candidates, &self.config).await;
        if !interaction_result.passed {
            warn!(error = ?interaction_result.error, "interaction testing phase failed");
        }
        phases.push(interaction_result);

        self.finish(phases, interactions, static_layout, start, invisible_count, screenshot)
    }

    fn finish(
        &self,
        phases: Vec<PhaseResult>,
        interactions: Vec<crate::types::InteractionResult>,
        static_layout: bool,
        start: Instant,
        invisible_elements_count: usize,
        screenshot: Option<Vec<u8>>,
    ) -> SandboxResult {
        phase6_aggregate::run(
            phases,
            interactions,
            static_layout,
            start.elapsed().as_millis() as u64,
            invisible_elements_count,
            screenshot,
            self.config.min_responsive_ratio,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::mock::MockPage;
    use serde_json::json;

    #[tokio::test]
    async fn render_failure_short_circuits_remaining_phases() {
        let page = MockPage::default();
        page.page_errors.lock().unwrap().push("TypeError".to_string());
        let validator = SandboxValidator::new(SandboxConfig::default());
        let result = validator.validate(&page, "<html></html>", false).await;
        assert!(!result.valid);
        assert_eq!(result.phases.len(), 1);
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

    #[tokio::test]
    async fn static_layout_skips_interaction_testing_and_passes() {
        let page = MockPage::default();
        page.push_eval(json!(true)); // phase1 has_content
        page.push_screenshot(checkerboard_png()); // phase2 snapshot
        page.push_eval(json!({ "viewport": {"width":1920,"height":1080}, "nodes": [] })); // phase3 scene graph
        let validator = SandboxValidator::new(SandboxConfig::default());
        let result = validator.validate(&page, "<html></html>", true).await;
        assert!(result.valid);
        assert_eq!(result.phases.len(), 4);
        assert!(result.interaction_results.is_empty());
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }
}
