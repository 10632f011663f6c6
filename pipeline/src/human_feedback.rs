//! Human-feedback mode (4.J): an operator has already annotated a generated
//! document with per-element and global feedback comments; this mode
//! short-circuits the usual generate/validate loop to a single JS-focused
//! LLM fix pass that respects those annotations, then strips them from the
//! output.

use once_cell::sync::Lazy;
use regex::Regex;

static ELEMENT_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<!--\s*\[ELEMENT #(\d+)\]\s*status:(\w+)\s*user_feedback:"([^"]*)"\s*-->"#).unwrap());
static GLOBAL_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--\s*\[GLOBAL FEEDBACK\]\s*(.*?)\s*-->").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct ElementFeedback {
    pub element_index: u32,
    pub broken: bool,
    pub user_feedback: String,
}

/// Parses `[ELEMENT #n] status:... user_feedback:"..."` and `[GLOBAL
/// FEEDBACK] ...` comments out of an annotated document.
pub fn parse_feedback(html: &str) -> (Vec<ElementFeedback>, Option<String>) {
    let elements = ELEMENT_COMMENT
        .captures_iter(html)
        .filter_map(|c| {
            Some(ElementFeedback {
                element_index: c[1].parse().ok()?,
                broken: &c[2] == "broken",
                user_feedback: c[3].to_string(),
            })
        })
        .collect();

    let global = GLOBAL_COMMENT.captures(html).map(|c| c[1].trim().to_string()).filter(|s| !s.is_empty());

    (elements, global)
}

/// Builds the feedback-aware repair prompt (4.J): only broken elements may
/// change, "working" annotations are untouched, overall layout is preserved,
/// and the model must strip every annotation comment from its output.
pub fn build_feedback_prompt(html: &str, elements: &[ElementFeedback], global: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(
        "You are repairing a layout using operator feedback annotations embedded as HTML comments. \
         Rules:\n\
         1. Modify ONLY elements annotated with status:broken.\n\
         2. Leave every element annotated status:working exactly as it is.\n\
         3. Preserve the overall page layout and structure.\n\
         4. Strip every [ELEMENT #n] and [GLOBAL FEEDBACK] annotation comment from your output.\n\n",
    );

    if let Some(g) = global {
        out.push_str(&format!("Global feedback: {g}\n\n"));
    }

    if elements.is_empty() {
        out.push_str("No per-element feedback found; apply only the global feedback above.\n\n");
    } else {
        out.push_str("Per-element feedback:\n");
        for e in elements {
            let status = if e.broken { "broken" } else { "working" };
            out.push_str(&format!("- element #{}: status={status}, feedback: \"{}\"\n", e.element_index, e.user_feedback));
        }
        out.push('\n');
    }

    out.push_str("Annotated document:\n");
    out.push_str(html);
    out
}

/// Strips annotation comments from the model's output, in case it left any
/// behind despite the prompt instruction.
pub fn strip_annotations(html: &str) -> String {
    let without_elements = ELEMENT_COMMENT.replace_all(html, "");
    GLOBAL_COMMENT.replace_all(&without_elements, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNOTATED: &str = r#"<div>
<!-- [ELEMENT #1] status:broken user_feedback:"button doesn't respond" -->
<button id="go">Go</button>
<!-- [ELEMENT #2] status:working user_feedback:"" -->
<span>ok</span>
<!-- [GLOBAL FEEDBACK] overall theme is too bright -->
</div>"#;

    #[test]
    fn parses_element_and_global_feedback() {
        let (elements, global) = parse_feedback(ANNOTATED);
        assert_eq!(elements.len(), 2);
        assert!(elements[0].broken);
        assert!(!elements[1].broken);
        assert_eq!(global.as_deref(), Some("overall theme is too bright"));
    }

    #[test]
    fn prompt_lists_only_feedback_not_markup() {
        let (elements, global) = parse_feedback(ANNOTATED);
        let prompt = build_feedback_prompt(ANNOTATED, &elements, global.as_deref());
        assert!(prompt.contains("element #1: status=broken"));
        assert!(prompt.contains("too bright"));
    }

    #[test]
    fn strip_removes_all_annotation_comments() {
        let stripped = strip_annotations(ANNOTATED);
        assert!(!stripped.contains("ELEMENT #"));
        assert!(!stripped.contains("GLOBAL FEEDBACK"));
        assert!(stripped.contains("<button id=\"go\">Go</button>"));
    }

    #[test]
    fn no_feedback_present_returns_empty() {
        let (elements, global) = parse_feedback("<div>plain</div>");
        assert!(elements.is_empty());
        assert!(global.is_none());
    }
}
