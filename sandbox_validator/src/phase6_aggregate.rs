//! Phase 6 — Aggregation (4.G). Folds the six phase results plus interaction
//! outcomes into one scored [`SandboxResult`].

use crate::types::{InteractionResult, PhaseResult, SandboxResult};

const CRITICAL_PHASES: [u8; 4] = [1, 2, 3, 4];

pub fn run(
    phases: Vec<PhaseResult>,
    interactions: Vec<InteractionResult>,
    layout_is_static: bool,
    total_duration_ms: u64,
    invisible_elements_count: usize,
    page_screenshot: Option<Vec<u8>>,
    min_responsive_ratio: f64,
) -> SandboxResult {
    let critical_failed = phases.iter().any(|p| CRITICAL_PHASES.contains(&p.phase) && !p.passed);

    let tested = interactions.len();
    let responsive = interactions.iter().filter(|i| i.responsive).count();

    let phase5_passed = if critical_failed {
        false
    } else if tested == 0 {
        // Static layouts skip interaction testing by convention; a non-static
        // layout with zero tested candidates still reports an explicit pass
        // (Phase 5 bullet: "otherwise (static layouts) phase passes by convention").
        true
    } else {
        responsive >= 1 && (responsive as f64 / tested as f64) >= min_responsive_ratio
    };

    let warnings = phases.iter().filter(|p| !p.passed && !CRITICAL_PHASES.contains(&p.phase)).count()
        + if !phase5_passed && !critical_failed { 1 } else { 0 };

    let confidence = if layout_is_static && tested == 0 {
        0.9
    } else if tested == 0 {
        0.6
    } else {
        0.5 + 0.5 * (responsive as f64 / tested as f64)
    };
    let confidence = confidence - (0.05 * warnings as f64).min(0.20);
    let confidence = confidence.clamp(0.0, 1.0) as f32;

    let valid = !critical_failed && phase5_passed;

    let failure_summary = if valid {
        None
    } else {
        let names: Vec<String> = phases
            .iter()
            .filter(|p| !p.passed)
            .map(|p| format!("{}: {}", p.name, p.error.clone().unwrap_or_default()))
            .collect();
        if names.is_empty() && !phase5_passed {
            Some(format!(
                "only {responsive}/{tested} candidates were responsive (minimum ratio {min_responsive_ratio:.2})"
            ))
        } else {
            Some(names.join("; "))
        }
    };

    SandboxResult {
        valid,
        phases,
        inputs_tested: tested,
        inputs_responsive: responsive,
        confidence,
        layout_type: if layout_is_static { "static".to_string() } else { "interactive".to_string() },
        total_duration_ms,
        failure_summary,
        interaction_results: interactions,
        page_screenshot,
        invisible_elements_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_phase(n: u8, name: &str) -> PhaseResult {
        PhaseResult::ok(n, name, serde_json::Value::Null, 1)
    }

    #[test]
    fn critical_failure_forces_invalid_regardless_of_interactions() {
        let phases = vec![ok_phase(1, "render"), PhaseResult::fail(2, "visual_analysis", "blank", 1), ok_phase(3, "scene_graph"), ok_phase(4, "input_detection")];
        let result = run(phases, Vec::new(), false, 10, 0, None, 0.70);
        assert!(!result.valid);
    }

    #[test]
    fn static_layout_with_no_inputs_gets_0_9_confidence() {
        let phases = vec![ok_phase(1, "render"), ok_phase(2, "visual_analysis"), ok_phase(3, "scene_graph"), ok_phase(4, "input_detection")];
        let result = run(phases, Vec::new(), true, 10, 0, None, 0.70);
        assert!(result.valid);
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn non_static_layout_with_zero_inputs_gets_0_6_confidence() {
        let phases = vec![ok_phase(1, "render"), ok_phase(2, "visual_analysis"), ok_phase(3, "scene_graph"), ok_phase(4, "input_detection")];
        let result = run(phases, Vec::new(), false, 10, 0, None, 0.70);
        assert!(result.valid);
        assert!((result.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn responsive_ratio_below_bar_fails_overall() {
        use crate::types::{InputCandidate, InputType, InteractionCategory, NodeType, SceneNode};
        let make = |selector: &str, responsive: bool| InteractionResult {
            input: InputCandidate {
                selector: selector.to_string(),
                node: SceneNode {
                    selector: selector.to_string(),
                    tag: "button".to_string(),
                    node_type: NodeType::Button,
                    bounding_box: common_types::BoundingBox::new(0.0, 0.0, 50.0, 20.0),
                    visible: true,
                    z_index: 0,
                    text: String::new(),
                    attributes: Default::default(),
                    event_owner_candidate: None,
                },
                confidence: 0.95,
                input_type: InputType::Button,
                priority: 1,
                source_elements: vec![selector.to_string()],
                testable: true,
                interaction_category: InteractionCategory::Actionable,
                interaction_units: Vec::new(),
            },
            action: "click".to_string(),
            visual_delta: None,
            scene_before: None,
            scene_after: None,
            responsive,
            error: None,
            duration_ms: 1,
            screenshot_before: None,
            screenshot_after: None,
            cascade_level: 0,
            cascade_trigger: None,
        };
        let phases = vec![ok_phase(1, "render"), ok_phase(2, "visual_analysis"), ok_phase(3, "scene_graph"), ok_phase(4, "input_detection")];
        let interactions = vec![make("#a", true), make("#b", false), make("#c", false)];
        let result = run(phases, interactions, false, 10, 0, None, 0.70);
        assert!(!result.valid);
        assert!(result.failure_summary.is_some());
    }
}
