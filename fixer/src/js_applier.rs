//! JavaScript patch applier (4.H), grounded on `js_patch_applier.py`. Works
//! directly on the HTML text via regex rather than a script AST — the corpus
//! has no JS-parsing crate, and patches are small enough (one function, one
//! reference, one handler) that line/regex surgery is what the Python
//! applier does too.

use crate::class_applier::locate_opening_tag;
use crate::contracts::{JSApplyResult, JSPatch, JSPatchType};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| RegexBuilder::new(r"<script\b([^>]*)>([\s\S]*?)</script>").case_insensitive(true).build().unwrap());
static BODY_CLOSE_RE: Lazy<Regex> = Lazy::new(|| RegexBuilder::new(r"</body>").case_insensitive(true).build().unwrap());
static HANDLER_ATTRS: [&str; 5] = ["onclick", "onchange", "onsubmit", "onmouseover", "onkeydown"];

struct ScriptBlock {
    /// Byte range of the block's content (between `<script ...>` and `</script>`).
    content_range: (usize, usize),
    inline: bool,
}

fn find_scripts(html: &str) -> Vec<ScriptBlock> {
    SCRIPT_RE
        .captures_iter(html)
        .map(|cap| {
            let attrs = cap.get(1).unwrap().as_str();
            let content = cap.get(2).unwrap();
            ScriptBlock {
                content_range: (content.start(), content.end()),
                inline: !attrs.to_ascii_lowercase().contains("src="),
            }
        })
        .collect()
}

fn last_inline_script(scripts: &[ScriptBlock]) -> Option<&ScriptBlock> {
    scripts.iter().rev().find(|s| s.inline)
}

fn apply_add_function(html: &str, patch: &JSPatch) -> Result<String, String> {
    let code = patch.function_code.as_deref().ok_or("add_function requires function_code")?;
    let scripts = find_scripts(html);
    match last_inline_script(&scripts) {
        Some(script) => {
            let mut out = html.to_string();
            out.insert_str(script.content_range.1, &format!("\n\n{code}\n"));
            Ok(out)
        }
        None => {
            let mut out = html.to_string();
            let snippet = format!("<script>\n{code}\n</script>\n");
            match BODY_CLOSE_RE.find(&out) {
                Some(m) => {
                    out.insert_str(m.start(), &snippet);
                    Ok(out)
                }
                None => {
                    out.push_str(&snippet);
                    Ok(out)
                }
            }
        }
    }
}

/// Finds the byte range (within `content`, offsets relative to `content`
/// start) of a top-level `function name(...) { ... }` definition using brace
/// counting, since a plain regex can't balance nested braces.
fn find_function_body(content: &str, name: &str) -> Option<(usize, usize)> {
    let header_re = Regex::new(&format!(r"function\s+{}\s*\([^)]*\)\s*\{{", regex::escape(name))).ok()?;
    let header = header_re.find(content)?;
    let mut depth = 0usize;
    let mut end = None;
    for (i, ch) in content[header.start()..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(header.start() + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }
    end.map(|e| (header.start(), e))
}

fn apply_replace_function(html: &str, patch: &JSPatch) -> Result<String, String> {
    let name = patch.function_name.as_deref().ok_or("replace_function requires function_name")?;
    let code = patch.function_code.as_deref().ok_or("replace_function requires function_code")?;
    let scripts = find_scripts(html);
    for script in scripts.iter().filter(|s| s.inline) {
        let content = &html[script.content_range.0..script.content_range.1];
        if let Some((start, end)) = find_function_body(content, name) {
            let mut out = html.to_string();
            out.replace_range(script.content_range.0 + start..script.content_range.0 + end, code);
            return Ok(out);
        }
    }
    apply_add_function(html, patch)
}

fn apply_fix_dom_reference(html: &str, patch: &JSPatch) -> Result<String, String> {
    let old_ref = patch.old_reference.as_deref().ok_or("fix_dom_reference requires old_reference")?;
    let new_ref = patch.new_reference.as_deref().ok_or("fix_dom_reference requires new_reference")?;
    let mut out = html.to_string();
    for (quote, pattern_old, pattern_new) in [('\'', old_ref.to_string(), new_ref.to_string()), ('"', old_ref.to_string(), new_ref.to_string())] {
        let get_by_id_old = format!("getElementById({quote}{pattern_old}{quote})");
        let get_by_id_new = format!("getElementById({quote}{pattern_new}{quote})");
        out = out.replace(&get_by_id_old, &get_by_id_new);

        let qs_old = format!("querySelector({quote}#{pattern_old}{quote})");
        let qs_new = format!("querySelector({quote}#{pattern_new}{quote})");
        out = out.replace(&qs_old, &qs_new);
    }
    Ok(out)
}

fn apply_modify_handler(html: &str, patch: &JSPatch) -> Result<String, String> {
    let selector = patch.selector.as_deref().ok_or("modify_handler requires selector")?;
    let new_handler = patch.new_handler.as_deref().ok_or("modify_handler requires new_handler")?;
    let (tag_start, tag_end) = locate_opening_tag(html, selector).ok_or_else(|| format!("selector '{selector}' not found"))?;

    let tag_text = &html[tag_start..tag_end];
    for attr in HANDLER_ATTRS {
        let attr_re = Regex::new(&format!(r#"{attr}\s*=\s*("([^"]*)"|'([^']*)')"#)).unwrap();
        if let Some(cap) = attr_re.captures(tag_text) {
            let current = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str()).unwrap_or("");
            if let Some(expected) = &patch.old_handler {
                if !current.contains(expected.as_str()) {
                    continue;
                }
            }
            let whole = cap.get(0).unwrap();
            let mut out = html.to_string();
            let replacement = format!(r#"{attr}="{new_handler}""#);
            out.replace_range(tag_start + whole.start()..tag_start + whole.end(), &replacement);
            return Ok(out);
        }
    }
    Err(format!("no handler attribute found on '{selector}'"))
}

fn apply_fix_syntax(html: &str, patch: &JSPatch) -> Result<String, String> {
    let script_index = patch.script_index.ok_or("fix_syntax requires script_index")?;
    let line_start = patch.line_start.ok_or("fix_syntax requires line_start")?;
    let line_end = patch.line_end.ok_or("fix_syntax requires line_end")?;
    let replacement = patch.replacement_code.as_deref().ok_or("fix_syntax requires replacement_code")?;

    let scripts = find_scripts(html);
    let script = scripts
        .iter()
        .filter(|s| s.inline)
        .nth(script_index)
        .ok_or_else(|| format!("no inline script at index {script_index}"))?;
    let content = &html[script.content_range.0..script.content_range.1];

    let mut offset = 0usize;
    let mut start_byte = None;
    let mut end_byte = None;
    for (i, line) in content.split_inclusive('\n').enumerate() {
        let line_no = i + 1;
        if line_no == line_start {
            start_byte = Some(offset);
        }
        if line_no == line_end {
            end_byte = Some(offset + line.len());
            break;
        }
        offset += line.len();
    }
    let (start, end) = match (start_byte, end_byte) {
        (Some(s), Some(e)) => (s, e),
        _ => return Err(format!("line range {line_start}-{line_end} out of bounds")),
    };

    let mut out = html.to_string();
    out.replace_range(script.content_range.0 + start..script.content_range.0 + end, replacement);
    Ok(out)
}

fn apply_add_variable(html: &str, patch: &JSPatch) -> Result<String, String> {
    let decl = patch.replacement_code.as_deref().ok_or("add_variable requires replacement_code")?;
    let scripts = find_scripts(html);
    let script = scripts.iter().find(|s| s.inline).ok_or("no inline script to prepend to")?;
    let mut out = html.to_string();
    out.insert_str(script.content_range.0, &format!("{decl}\n"));
    Ok(out)
}

/// Applies every patch in sequence against a running copy of `html`,
/// non-fatal on a per-patch failure.
pub fn apply(html: &str, patches: &[JSPatch]) -> JSApplyResult {
    let mut current = html.to_string();
    let mut applied = Vec::new();
    let mut failed = Vec::new();

    for patch in patches {
        let result = match patch.patch_type {
            JSPatchType::AddFunction => apply_add_function(&current, patch),
            JSPatchType::ReplaceFunction => apply_replace_function(&current, patch),
            JSPatchType::FixDomReference => apply_fix_dom_reference(&current, patch),
            JSPatchType::ModifyHandler => apply_modify_handler(&current, patch),
            JSPatchType::FixSyntax => apply_fix_syntax(&current, patch),
            JSPatchType::AddVariable => apply_add_variable(&current, patch),
        };
        match result {
            Ok(new_html) => {
                current = new_html;
                applied.push(patch.clone());
            }
            Err(reason) => failed.push((patch.clone(), reason)),
        }
    }

    JSApplyResult {
        success: !applied.is_empty(),
        html: current,
        applied,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(patch_type: JSPatchType) -> JSPatch {
        JSPatch {
            patch_type,
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

    #[test]
    fn add_function_appends_to_last_inline_script() {
        let html = "<html><body><script>function a(){}</script></body></html>";
        let mut p = patch(JSPatchType::AddFunction);
        p.function_code = Some("function b(){return 1;}".to_string());
        let result = apply(html, &[p]);
        assert!(result.success);
        assert!(result.html.contains("function b(){return 1;}"));
    }

    #[test]
    fn add_function_creates_script_when_none_inline() {
        let html = "<html><body></body></html>";
        let mut p = patch(JSPatchType::AddFunction);
        p.function_code = Some("function b(){}".to_string());
        let result = apply(html, &[p]);
        assert!(result.html.contains("<script>"));
        assert!(result.html.contains("function b(){}"));
    }

    #[test]
    fn replace_function_swaps_body() {
        let html = "<script>function toggle(){ console.log('old'); }</script>";
        let mut p = patch(JSPatchType::ReplaceFunction);
        p.function_name = Some("toggle".to_string());
        p.function_code = Some("function toggle(){ console.log('new'); }".to_string());
        let result = apply(html, &[p]);
        assert!(result.html.contains("'new'"));
        assert!(!result.html.contains("'old'"));
    }

    #[test]
    fn fix_dom_reference_rewrites_literal_ids() {
        let html = r#"<script>document.getElementById('oldId').focus();</script>"#;
        let mut p = patch(JSPatchType::FixDomReference);
        p.old_reference = Some("oldId".to_string());
        p.new_reference = Some("newId".to_string());
        let result = apply(html, &[p]);
        assert!(result.html.contains("getElementById('newId')"));
    }

    #[test]
    fn modify_handler_replaces_onclick_value() {
        let html = r#"<button id="go" onclick="doOldThing()">Go</button>"#;
        let mut p = patch(JSPatchType::ModifyHandler);
        p.selector = Some("#go".to_string());
        p.new_handler = Some("doNewThing()".to_string());
        let result = apply(html, &[p]);
        assert!(result.html.contains(r#"onclick="doNewThing()""#));
    }

    #[test]
    fn add_variable_prepends_to_first_inline_script() {
        let html = "<script>console.log('hi');</script>";
        let mut p = patch(JSPatchType::AddVariable);
        p.replacement_code = Some("let count = 0;".to_string());
        let result = apply(html, &[p]);
        assert!(result.html.starts_with("<script>let count = 0;"));
    }

    #[test]
    fn fix_syntax_replaces_line_range() {
        let html = "<script>\nlet a = 1\nlet b = 2;\nlet c = 3;\n</script>";
        let mut p = patch(JSPatchType::FixSyntax);
        p.script_index = Some(0);
        p.line_start = Some(2);
        p.line_end = Some(2);
        p.replacement_code = Some("let a = 1;\n".to_string());
        let result = apply(html, &[p]);
        assert!(result.html.contains("let a = 1;\nlet b = 2;"));
    }

    #[test]
    fn missing_function_for_replace_falls_back_to_add() {
        let html = "<script>function other(){}</script>";
        let mut p = patch(JSPatchType::ReplaceFunction);
        p.function_name = Some("missing".to_string());
        p.function_code = Some("function missing(){}".to_string());
        let result = apply(html, &[p]);
        assert!(result.success);
        assert!(result.html.contains("function missing(){}"));
    }
}
