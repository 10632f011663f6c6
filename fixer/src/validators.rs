//! Patch validation (4.H), grounded on `tailwind_validator.py` and
//! `js_validator.py`. The LLM fixer calls these after every parse so an
//! invalid patch gets dropped and retried with feedback rather than spliced
//! into the document.

use crate::class_applier::{element_tag, locate_opening_tag};
use crate::contracts::{ClassPatch, FixContext, JSPatch, JSPatchType};
use once_cell::sync::Lazy;
use regex::Regex;

const FORBIDDEN_INTERACTIVE_CLASSES: [&str; 5] = ["hidden", "invisible", "opacity-0", "pointer-events-none", "sr-only"];
const INTERACTIVE_TAGS: [&str; 5] = ["button", "a", "input", "select", "textarea"];

static VALID_CLASS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^(hover|focus|active|disabled|group-hover|focus-within|focus-visible|dark):[\w.\-/\[\]%]+$").unwrap(),
        Regex::new(r"^(bg|text|border|ring|shadow|outline|opacity|brightness|scale|rotate|translate|duration|ease|cursor|pointer-events|z|-z|w|h|p|m|px|py|pt|pb|pl|pr|mx|my|mt|mb|ml|mr|gap|inset|top|left|right|bottom|rounded|font|flex|grid)-?[\w.\-/\[\]%]*$").unwrap(),
        Regex::new(r"^(transition|transition-all|transition-colors|transition-transform|transition-opacity|relative|absolute|fixed|sticky|static|flex|grid|hidden|block|inline-block|inline|visible|invisible)$").unwrap(),
        Regex::new(r"^\[[^\]]+\]$").unwrap(),
    ]
});

static DANGEROUS_JS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\beval\s*\(").unwrap(),
        Regex::new(r"new\s+Function\s*\(").unwrap(),
        Regex::new(r"document\.write\s*\(").unwrap(),
        Regex::new(r"innerHTML\s*=.*<script").unwrap(),
        Regex::new(r#"fetch\s*\(\s*['"]https?://"#).unwrap(),
        Regex::new(r"\bXMLHttpRequest\b").unwrap(),
        Regex::new(r"localStorage\.clear").unwrap(),
        Regex::new(r"sessionStorage\.clear").unwrap(),
    ]
});

fn is_valid_class_token(token: &str) -> bool {
    VALID_CLASS_PATTERNS.iter().any(|re| re.is_match(token))
}

fn validate_one_class(html: &str, patch: &ClassPatch) -> Result<(), String> {
    for token in patch.add_classes.iter().chain(patch.remove_classes.iter()) {
        if !is_valid_class_token(token) {
            return Err(format!("'{token}' doesn't match any known Tailwind utility pattern"));
        }
    }

    let tag = element_tag(html, &patch.selector);
    if let Some(tag) = tag {
        if INTERACTIVE_TAGS.contains(&tag.as_str()) {
            for added in &patch.add_classes {
                if FORBIDDEN_INTERACTIVE_CLASSES.contains(&added.as_str()) {
                    return Err(format!("'{added}' would hide an interactive <{tag}> element"));
                }
            }
        }
    }

    Ok(())
}

/// Filters `patches` to those that pass Tailwind validation, logging each
/// rejection.
pub fn validate_class_patches(html: &str, patches: Vec<ClassPatch>) -> Vec<ClassPatch> {
    patches
        .into_iter()
        .filter(|patch| match validate_one_class(html, patch) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(selector = %patch.selector, reason = %reason, "rejected class patch");
                false
            }
        })
        .collect()
}

fn contains_dangerous_pattern(code: &str) -> Option<&'static str> {
    DANGEROUS_JS_PATTERNS.iter().find(|re| re.is_match(code)).map(|re| re.as_str())
}

fn is_balanced(code: &str) -> bool {
    let mut braces = 0i32;
    let mut parens = 0i32;
    let mut in_string: Option<char> = None;
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            if c == '\\' {
                chars.next();
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => in_string = Some(c),
            '{' => braces += 1,
            '}' => braces -= 1,
            '(' => parens += 1,
            ')' => parens -= 1,
            _ => {}
        }
    }
    braces == 0 && parens == 0
}

fn looks_like_function(code: &str) -> bool {
    code.contains("function") || code.contains("=>")
}

fn validate_one_js(context: &FixContext, patch: &JSPatch) -> Result<(), String> {
    let code_to_scan = patch.function_code.as_deref().or(patch.replacement_code.as_deref()).unwrap_or("");
    if let Some(pattern) = contains_dangerous_pattern(code_to_scan) {
        return Err(format!("matched dangerous pattern {pattern}"));
    }

    match patch.patch_type {
        JSPatchType::AddFunction | JSPatchType::ReplaceFunction => {
            let name = patch.function_name.as_deref().ok_or("missing function_name")?;
            let code = patch.function_code.as_deref().ok_or("missing function_code")?;
            if name.is_empty() {
                return Err("function_name is empty".to_string());
            }
            if !looks_like_function(code) {
                return Err("function_code doesn't look like a function".to_string());
            }
            if !is_balanced(code) {
                return Err("function_code has unbalanced braces/parens".to_string());
            }
        }
        JSPatchType::FixDomReference => {
            let new_ref = patch.new_reference.as_deref().ok_or("missing new_reference")?;
            if !context.dom_ids.contains(new_ref) {
                return Err(format!("'{new_ref}' is not a known DOM id"));
            }
        }
        JSPatchType::ModifyHandler => {
            let selector = patch.selector.as_deref().ok_or("missing selector")?;
            if locate_opening_tag(&context.html, selector).is_none() {
                return Err(format!("selector '{selector}' does not resolve"));
            }
            if patch.new_handler.as_deref().unwrap_or("").is_empty() {
                return Err("missing new_handler".to_string());
            }
        }
        JSPatchType::FixSyntax => {
            let start = patch.line_start.ok_or("missing line_start")?;
            let end = patch.line_end.ok_or("missing line_end")?;
            if start > end {
                return Err("line_start is after line_end".to_string());
            }
            if patch.replacement_code.as_deref().unwrap_or("").is_empty() {
                return Err("missing replacement_code".to_string());
            }
        }
        JSPatchType::AddVariable => {
            if patch.replacement_code.as_deref().unwrap_or("").is_empty() {
                return Err("missing replacement_code".to_string());
            }
        }
    }

    Ok(())
}

/// Filters `patches` to those that pass JS validation, logging each
/// rejection.
pub fn validate_js_patches(context: &FixContext, patches: Vec<JSPatch>) -> Vec<JSPatch> {
    patches
        .into_iter()
        .filter(|patch| match validate_one_js(context, patch) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(patch = %patch.describe(), reason = %reason, "rejected js patch");
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn rejects_unknown_class_token() {
        let html = r#"<div id="x" class="foo">y</div>"#;
        let mut patch = ClassPatch::new("#x");
        patch.add_classes.push("totally-not-a-class-ever".to_string());
        let result = validate_class_patches(html, vec![patch]);
        assert!(result.is_empty());
    }

    #[test]
    fn accepts_known_variant_class() {
        let html = r#"<div id="x" class="foo">y</div>"#;
        let mut patch = ClassPatch::new("#x");
        patch.add_classes.push("hover:scale-105".to_string());
        let result = validate_class_patches(html, vec![patch]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn rejects_hidden_on_interactive_element() {
        let html = r#"<button id="go" class="px-4">Go</button>"#;
        let mut patch = ClassPatch::new("#go");
        patch.add_classes.push("hidden".to_string());
        let result = validate_class_patches(html, vec![patch]);
        assert!(result.is_empty());
    }

    #[test]
    fn rejects_eval_in_js_patch() {
        let context = FixContext::default();
        let mut patch = js_patch();
        patch.function_name = Some("run".to_string());
        patch.function_code = Some("function run(){ eval('1+1'); }".to_string());
        let result = validate_js_patches(&context, vec![patch]);
        assert!(result.is_empty());
    }

    #[test]
    fn rejects_unbalanced_function_code() {
        let context = FixContext::default();
        let mut patch = js_patch();
        patch.function_name = Some("run".to_string());
        patch.function_code = Some("function run(){ console.log('x'; }".to_string());
        let result = validate_js_patches(&context, vec![patch]);
        assert!(result.is_empty());
    }

    #[test]
    fn rejects_fix_dom_reference_to_unknown_id() {
        let mut context = FixContext::default();
        context.dom_ids = HashSet::from(["known".to_string()]);
        let mut patch = js_patch();
        patch.patch_type = JSPatchType::FixDomReference;
        patch.old_reference = Some("gone".to_string());
        patch.new_reference = Some("unknown".to_string());
        let result = validate_js_patches(&context, vec![patch]);
        assert!(result.is_empty());
    }

    fn js_patch() -> JSPatch {
        JSPatch {
            patch_type: JSPatchType::AddFunction,
            function_name: None,
            function_code: None,
            old_reference: None,
            new_reference: None,
            selector: None,
            old_handler: None,
            new_handler: None,
            script_index: None,
            line_start: None,
            line_end: None,
            replacement_code: None,
            reason: None,
            confidence: 1.0,
        }
    }
}
