//! Tailwind/CSS fix-domain prompt builder, grounded on
//! `tailwind_prompt_builder.py`'s `TailwindPromptBuilder` and
//! `TAILWIND_SYSTEM_PROMPT`.

use crate::contracts::{ClassPatch, FixContext};
use provider::strip_markdown_fence;

pub const SYSTEM_PROMPT: &str = "\
You are a Tailwind CSS expert fixing interaction feedback on a generated smart-display \
interface. Every interactive element must visibly respond when clicked or activated — \
a color shift, a scale change, a border, a shadow. Never rely on color alone.

Rules:
- Always pair a state variant (hover:, active:, focus:) with a transition utility \
  (transition, transition-colors, transition-transform, duration-150) so the change is \
  animated, not a hard cut.
- Never remove a class that affects layout (flex, grid, w-*, h-*, p-*, m-*) unless the \
  error explicitly calls out layout breakage.
- Never add a class that changes element dimensions or position unless asked to.
- Prefer the smallest edit that produces a clearly visible change.
- Return ONLY a JSON array, no prose, no markdown fence. Each element has exactly this \
  shape: {\"selector\": \"...\", \"add_classes\": [...], \"remove_classes\": [...], \"reason\": \"...\"}.";

/// Builds the user-turn prompt for one fix-domain attempt. On a retry
/// (`attempt_number > 1`), prior failed patches are included as negative
/// context so the model doesn't repeat them.
pub fn build(context: &FixContext) -> String {
    let mut out = String::new();
    out.push_str("The following elements failed interaction feedback validation:\n\n");
    for error in &context.errors {
        out.push_str(&format!("- selector: {}\n  tag: {}\n", error.selector, error.element_tag));
        if let Some(detail) = &error.detail {
            out.push_str(&format!("  problem: {detail}\n"));
        }
    }

    if context.attempt_number > 1 && !context.previous_patches.is_empty() {
        out.push_str("\nThe following patches were already tried and did NOT work, or were rejected. Do not repeat them:\n");
        for prev in &context.previous_patches {
            out.push_str(&format!("- {prev}\n"));
        }
    }

    out.push_str("\nCurrent document:\n");
    out.push_str(&truncate(&context.html, 12_000));
    out
}

fn truncate(html: &str, limit: usize) -> String {
    if html.len() <= limit {
        return html.to_string();
    }
    let half = limit / 2;
    format!("{}\n...[truncated]...\n{}", &html[..half], &html[html.len() - half..])
}

/// Parses the model's JSON array response into `ClassPatch`es.
pub fn parse_response(text: &str) -> Result<Vec<ClassPatch>, String> {
    let cleaned = strip_markdown_fence(text);
    serde_json::from_str::<Vec<ClassPatch>>(cleaned).map_err(|e| format!("failed to parse tailwind patch array: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ClassifiedError, ErrorType};

    #[test]
    fn build_includes_error_selectors() {
        let mut context = FixContext::default();
        context.errors.push(ClassifiedError::new(ErrorType::FeedbackMissing, "#submit", "button"));
        let prompt = build(&context);
        assert!(prompt.contains("#submit"));
    }

    #[test]
    fn build_includes_retry_context_on_later_attempts() {
        let mut context = FixContext::default();
        context.attempt_number = 2;
        context.previous_patches.push("added hover:bg-blue-500, rejected: unknown token".to_string());
        let prompt = build(&context);
        assert!(prompt.contains("did NOT work"));
    }

    #[test]
    fn parses_clean_patch_array() {
        let text = r#"[{"selector":"#go","add_classes":["hover:scale-105"],"remove_classes":[],"reason":"feedback"}]"#;
        let patches = parse_response(text).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].selector, "#go");
    }

    #[test]
    fn parses_fenced_patch_array() {
        let text = "```json\n[{\"selector\":\"#go\",\"add_classes\":[],\"remove_classes\":[],\"reason\":null}]\n```";
        let patches = parse_response(text).unwrap();
        assert_eq!(patches.len(), 1);
    }
}
