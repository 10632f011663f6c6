//! Translates a [`SandboxResult`] into the [`ClassifiedError`]s the fixer
//! (4.H) expects. Grounded on `validation/error_classifier.py`, which sits
//! between the aggregator and the fixer in the original and performs exactly
//! this reshaping.

use fixer::{ClassifiedError, ErrorType};
use sandbox_validator::{FailureType, SandboxResult};

/// Builds one [`ClassifiedError`] per non-passing interaction result. Phase
/// 1-4 failures never reach here (the pipeline returns early on those); this
/// only classifies Phase 5 click outcomes.
pub fn classify(result: &SandboxResult) -> Vec<ClassifiedError> {
    result
        .interaction_results
        .iter()
        .filter_map(|interaction| {
            let error_type = match interaction.failure_type() {
                FailureType::Passed => return None,
                FailureType::NoChange => ErrorType::FeedbackMissing,
                FailureType::UnderThreshold => ErrorType::FeedbackTooSubtle,
                FailureType::Error => classify_js_error(interaction.error.as_deref().unwrap_or("")),
            };
            let mut classified = ClassifiedError::new(error_type, interaction.input.selector.clone(), interaction.input.node.tag.clone());
            if let Some(detail) = &interaction.error {
                classified = classified.with_detail(detail.clone());
            }
            Some(classified)
        })
        .collect()
}

fn classify_js_error(message: &str) -> ErrorType {
    let lower = message.to_lowercase();
    if lower.contains("is not defined") || lower.contains("undefined variable") {
        ErrorType::JsUndefinedVariable
    } else if lower.contains("is not a function") || lower.contains("not defined") {
        ErrorType::JsMissingFunction
    } else if lower.contains("null") || lower.contains("cannot read propert") {
        ErrorType::JsMissingDomElement
    } else if lower.contains("syntax") || lower.contains("unexpected token") {
        ErrorType::JsSyntaxError
    } else {
        ErrorType::JsRuntimeError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::BoundingBox;
    use sandbox_validator::{InputCandidate, InputType, InteractionCategory, InteractionResult, NodeType, SceneNode};

    fn candidate(selector: &str) -> InputCandidate {
        InputCandidate {
            selector: selector.to_string(),
            node: SceneNode {
                selector: selector.to_string(),
                tag: "button".to_string(),
                node_type: NodeType::Button,
                bounding_box: BoundingBox::new(0.0, 0.0, 40.0, 40.0),
                visible: true,
                z_index: 0,
                text: "Go".to_string(),
                attributes: Default::default(),
                event_owner_candidate: None,
            },
            confidence: 0.9,
            input_type: InputType::Button,
            priority: 1,
            source_elements: vec![selector.to_string()],
            testable: true,
            interaction_category: InteractionCategory::Actionable,
            interaction_units: Vec::new(),
        }
    }

    fn interaction(selector: &str, responsive: bool, error: Option<&str>) -> InteractionResult {
        InteractionResult {
            input: candidate(selector),
            action: "click".to_string(),
            visual_delta: None,
            scene_before: None,
            scene_after: None,
            responsive,
            error: error.map(|s| s.to_string()),
            duration_ms: 10,
            screenshot_before: None,
            screenshot_after: None,
            cascade_level: 0,
            cascade_trigger: None,
        }
    }

    fn result_with(interactions: Vec<InteractionResult>) -> SandboxResult {
        SandboxResult {
            valid: false,
            phases: Vec::new(),
            inputs_tested: interactions.len(),
            inputs_responsive: interactions.iter().filter(|i| i.responsive).count(),
            confidence: 0.4,
            layout_type: "interactive".to_string(),
            total_duration_ms: 0,
            failure_summary: None,
            interaction_results: interactions,
            page_screenshot: None,
            invisible_elements_count: 0,
        }
    }

    #[test]
    fn passed_interactions_are_skipped() {
        let result = result_with(vec![interaction("#go", true, None)]);
        assert!(classify(&result).is_empty());
    }

    #[test]
    fn no_change_maps_to_feedback_missing() {
        let result = result_with(vec![interaction("#go", false, None)]);
        let errors = classify(&result);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ErrorType::FeedbackMissing);
        assert_eq!(errors[0].selector, "#go");
    }

    #[test]
    fn js_error_message_classified_by_keyword() {
        let result = result_with(vec![interaction("#go", false, Some("toggleMenu is not defined"))]);
        let errors = classify(&result);
        assert_eq!(errors[0].error_type, ErrorType::JsMissingFunction);
    }
}
