//! Lightweight static analysis over the generated document, used to build
//! the [`FixContext`] the JS prompt builder needs (4.H: "extracts all inline
//! scripts, event-handler attributes, known DOM ids, defined and called
//! functions"). There's no JS parser in this stack — regexes over the inline
//! `<script>` bodies and handler attributes are good enough for the closed
//! vocabulary the generator is instructed to produce.

use fixer::FixContext;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<script[^>]*>(.*?)</script>").unwrap());
static FUNCTION_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"function\s+([A-Za-z_$][\w$]*)\s*\(").unwrap());
static FUNCTION_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*\(").unwrap());
static HANDLER_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"on[a-z]+\s*=\s*"([^"]*)""#).unwrap());
static DOM_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bid\s*=\s*"([^"]+)""#).unwrap());

const JS_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "function", "return"];

/// Builds the static portion of a [`FixContext`] from `html`; the caller
/// fills in `errors`, `previous_patches` and `attempt_number`.
pub fn build_context(html: &str, attempt_number: u32, previous_patches: Vec<String>) -> FixContext {
    let mut defined_functions = HashSet::new();
    let mut called_functions = HashSet::new();
    let mut dom_ids = HashSet::new();

    for script in SCRIPT_BLOCK.captures_iter(html) {
        let body = &script[1];
        for cap in FUNCTION_DEF.captures_iter(body) {
            defined_functions.insert(cap[1].to_string());
        }
        for cap in FUNCTION_CALL.captures_iter(body) {
            let name = &cap[1];
            if !JS_KEYWORDS.contains(&name) {
                called_functions.insert(name.to_string());
            }
        }
    }

    for cap in HANDLER_ATTR.captures_iter(html) {
        for call in FUNCTION_CALL.captures_iter(&cap[1]) {
            let name = &call[1];
            if !JS_KEYWORDS.contains(&name) {
                called_functions.insert(name.to_string());
            }
        }
    }

    for cap in DOM_ID.captures_iter(html) {
        dom_ids.insert(cap[1].to_string());
    }

    // A called function found inside its own script block isn't "missing" if
    // it was only ever called, never defined, and happens to share a name
    // with a defined function elsewhere; no correction needed here since the
    // difference is computed downstream by `FixContext::missing_functions`.
    FixContext {
        html: html.to_string(),
        errors: Vec::new(),
        defined_functions,
        called_functions,
        dom_ids,
        previous_patches,
        attempt_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_defined_and_called_functions() {
        let html = r#"<html><body>
            <button onclick="toggleMenu()">Menu</button>
            <script>function showResult(){ console.log('hi'); }</script>
        </body></html>"#;
        let ctx = build_context(html, 1, Vec::new());
        assert!(ctx.defined_functions.contains("showResult"));
        assert!(ctx.called_functions.contains("toggleMenu"));
        assert!(ctx.missing_functions().contains("toggleMenu"));
    }

    #[test]
    fn extracts_dom_ids() {
        let html = r#"<div id="score-board"></div><span id="timer"></span>"#;
        let ctx = build_context(html, 1, Vec::new());
        assert!(ctx.dom_ids.contains("score-board"));
        assert!(ctx.dom_ids.contains("timer"));
    }

    #[test]
    fn javascript_keywords_are_not_treated_as_calls() {
        let html = "<script>function f(){ if (true) { return; } }</script>";
        let ctx = build_context(html, 1, Vec::new());
        assert!(!ctx.called_functions.contains("if"));
        assert!(!ctx.called_functions.contains("return"));
    }
}
