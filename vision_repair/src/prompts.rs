//! Prompt construction for both steps of vision repair (4.I), grounded on
//! `validation/fixer.py::_build_diagnosis_prompt` / `_build_repair_prompt`
//! and the analyzer/repair system prompts in `validation/contracts.py`.

use crate::contracts::RepairAttempt;
use crate::line_annotator;
use provider::strip_markdown_fence;
use sandbox_validator::SandboxResult;
use serde::Deserialize;

pub const DIAGNOSIS_SYSTEM_PROMPT: &str = "\
You are a front-end QA engineer diagnosing why a generated HTML layout failed automated \
visual/interaction validation. For every failing element, name the exact selector, cite the \
line number in the annotated HTML where it is defined, describe the precise problem in one \
sentence, and give a concrete fix using literal values (actual class names, actual color \
values, actual pixel numbers) — never symbolic placeholders like 'a brighter color' or \
'increase the z-index'.

Return ONLY a JSON array, no prose, no markdown fence. Each element has exactly this shape:
{\"selector\": \"...\", \"line_number\": 123, \"problem\": \"...\", \"concrete_fix\": \"...\"}";

pub const REPAIR_SYSTEM_PROMPT: &str = "\
You are repairing a generated HTML layout that failed automated validation. Apply the \
diagnosis below and return the complete corrected HTML document.

Absolute prohibitions:
- Never remove an interactive element.
- Never hide an interactive element that was previously visible.
- Visual feedback for an interaction must always be a background-color change, not just a \
  border or shadow change.
- Never use symbolic color tokens ('brighter', 'darker', 'a contrasting color') — always \
  specify the literal color value.
- Prefer a dramatic, unmistakable visual delta over a subtle one.
- Do not repeat a CSS rule that a previous repair attempt already tried and failed (see the \
  repair history below).

Return ONLY the complete HTML document, no prose, no markdown fence.";

/// Builds the Step 1 diagnosis prompt: line-annotated (truncated) HTML plus the
/// validator's phase-by-phase report.
pub fn build_diagnosis_prompt(html: &str, validation: Option<&SandboxResult>) -> String {
    let annotated = line_annotator::annotate_and_truncate(html);
    let mut out = String::new();
    out.push_str("Annotated HTML (line numbers prefixed):\n");
    out.push_str(&annotated);
    out.push_str("\n\nValidation report:\n");
    match validation {
        Some(result) => {
            out.push_str(&format!("valid={} confidence={:.2}\n", result.valid, result.confidence));
            for phase in &result.phases {
                out.push_str(&format!(
                    "- phase {} ({}): passed={} error={}\n",
                    phase.phase,
                    phase.name,
                    phase.passed,
                    phase.error.as_deref().unwrap_or("none")
                ));
            }
            if let Some(summary) = &result.failure_summary {
                out.push_str(&format!("failure summary: {summary}\n"));
            }
        }
        None => out.push_str("(no validation report available; diagnose from the screenshot and markup alone)\n"),
    }
    out
}

/// Builds the Step 2 repair prompt: original HTML, the diagnosis, and a
/// repair-history block summarizing prior failed attempts so the model
/// doesn't retry the same CSS rules.
pub fn build_repair_prompt(html: &str, diagnosis_text: &str, history: &[RepairAttempt]) -> String {
    let mut out = String::new();
    out.push_str("Diagnosis from the previous step:\n");
    out.push_str(diagnosis_text);

    if !history.is_empty() {
        out.push_str("\n\nRepair history (attempts that did not work, do not repeat these CSS rules):\n");
        for attempt in history {
            out.push_str(&format!(
                "- cycle {}: tried {:?}, outcome: {}\n",
                attempt.cycle, attempt.css_rules_tried, attempt.outcome
            ));
        }
    }

    out.push_str("\n\nOriginal HTML document:\n");
    out.push_str(html);
    out
}

#[derive(Deserialize)]
struct RawDiagnosis {
    selector: String,
    #[serde(default)]
    line_number: Option<usize>,
    problem: String,
    concrete_fix: String,
}

/// Parses the Step 1 response into [`crate::contracts::ElementDiagnosis`] records.
pub fn parse_diagnosis_response(text: &str) -> Result<Vec<crate::contracts::ElementDiagnosis>, String> {
    let cleaned = strip_markdown_fence(text);
    let raw: Vec<RawDiagnosis> = serde_json::from_str(cleaned).map_err(|e| format!("failed to parse diagnosis array: {e}"))?;
    Ok(raw
        .into_iter()
        .map(|r| crate::contracts::ElementDiagnosis {
            selector: r.selector,
            line_number: r.line_number,
            problem: r.problem,
            concrete_fix: r.concrete_fix,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnosis_prompt_includes_annotated_html_and_phase_summary() {
        let result = SandboxResult {
            valid: false,
            phases: vec![sandbox_validator::PhaseResult::fail(5, "interaction", "low response rate", 10)],
            inputs_tested: 3,
            inputs_responsive: 1,
            confidence: 0.4,
            layout_type: "interactive".to_string(),
            total_duration_ms: 100,
            failure_summary: Some("1/3 elements responded".to_string()),
            interaction_results: Vec::new(),
            page_screenshot: None,
            invisible_elements_count: 0,
        };
        let prompt = build_diagnosis_prompt("<div id=\"go\">Go</div>", Some(&result));
        assert!(prompt.contains("1: <div"));
        assert!(prompt.contains("phase 5"));
        assert!(prompt.contains("1/3 elements responded"));
    }

    #[test]
    fn repair_prompt_includes_history() {
        let history = vec![RepairAttempt {
            cycle: 1,
            css_rules_tried: vec!["hover:text-blue-500".to_string()],
            outcome: "insufficient".to_string(),
        }];
        let prompt = build_repair_prompt("<html></html>", "selector #go needs bg change", &history);
        assert!(prompt.contains("cycle 1"));
        assert!(prompt.contains("hover:text-blue-500"));
    }

    #[test]
    fn parses_diagnosis_array() {
        let text = r#"[{"selector":"#go","line_number":4,"problem":"no bg change","concrete_fix":"add background-color: #1e90ff"}]"#;
        let diagnoses = parse_diagnosis_response(text).unwrap();
        assert_eq!(diagnoses.len(), 1);
        assert_eq!(diagnoses[0].selector, "#go");
        assert_eq!(diagnoses[0].line_number, Some(4));
    }
}
