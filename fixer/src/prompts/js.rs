//! JavaScript fix-domain prompt builder, grounded on `js_prompt_builder.py`'s
//! `JSPromptBuilder` and `JS_SYSTEM_PROMPT`.

use crate::contracts::{FixContext, JSPatch};
use provider::strip_markdown_fence;

pub const SYSTEM_PROMPT: &str = "\
You are a JavaScript debugging expert fixing runtime errors in a generated smart-display \
interface. Make the smallest possible change that resolves the error — never rewrite \
working code. Always null-check a DOM lookup before using it. Prefer modern JS \
(const/let, arrow functions, template literals) consistent with the surrounding code. \
Never introduce a network call, eval, or storage-clearing call.

Return ONLY a JSON array, no prose, no markdown fence. Each element is exactly one of:
{\"patch_type\": \"add_function\", \"function_name\": \"...\", \"function_code\": \"...\", \"reason\": \"...\"}
{\"patch_type\": \"replace_function\", \"function_name\": \"...\", \"function_code\": \"...\", \"reason\": \"...\"}
{\"patch_type\": \"fix_dom_reference\", \"old_reference\": \"...\", \"new_reference\": \"...\", \"reason\": \"...\"}
{\"patch_type\": \"modify_handler\", \"selector\": \"...\", \"old_handler\": \"...\", \"new_handler\": \"...\", \"reason\": \"...\"}
{\"patch_type\": \"fix_syntax\", \"script_index\": 0, \"line_start\": 1, \"line_end\": 1, \"replacement_code\": \"...\", \"reason\": \"...\"}
{\"patch_type\": \"add_variable\", \"replacement_code\": \"...\", \"reason\": \"...\"}";

/// Builds the user-turn prompt for one fix-domain attempt, listing the
/// console errors to resolve plus static-analysis context (missing function
/// calls, known DOM ids) the orchestrator already extracted.
pub fn build(context: &FixContext) -> String {
    let mut out = String::new();
    out.push_str("The following JavaScript errors occurred during interaction testing:\n\n");
    for error in &context.errors {
        out.push_str(&format!("- {:?} at {}", error.error_type, error.selector));
        if let Some(line) = error.line_number {
            out.push_str(&format!(" (line {line})"));
        }
        if let Some(detail) = &error.detail {
            out.push_str(&format!(": {detail}"));
        }
        out.push('\n');
    }

    let missing = context.missing_functions();
    if !missing.is_empty() {
        out.push_str(&format!("\nCalled but never defined: {}\n", missing.into_iter().collect::<Vec<_>>().join(", ")));
    }
    if !context.dom_ids.is_empty() {
        let mut ids: Vec<&String> = context.dom_ids.iter().collect();
        ids.sort();
        out.push_str(&format!("\nKnown DOM element ids: {}\n", ids.into_iter().cloned().collect::<Vec<_>>().join(", ")));
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

/// Parses the model's JSON array response into `JSPatch`es.
pub fn parse_response(text: &str) -> Result<Vec<JSPatch>, String> {
    let cleaned = strip_markdown_fence(text);
    serde_json::from_str::<Vec<JSPatch>>(cleaned).map_err(|e| format!("failed to parse js patch array: {e}"))
}
