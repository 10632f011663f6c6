//! Class-patch applier (4.H). No DOM-mutation crate exists anywhere in this
//! stack (`scraper` appears in the wider corpus but only for read-only
//! parsing), so this is a small tag tokenizer plus a selector matcher
//! restricted to exactly the forms `sandbox_validator`'s scene-graph
//! extraction script can produce: `#id`, `[data-attr="value"]`, `tag.class`,
//! and `tag:nth-of-type(n)` chains joined by `" > "`. Only the `class=`
//! attribute text is spliced; the rest of the document is left
//! byte-for-byte untouched, which an edit-in-place approach achieves by
//! construction and what a full re-serialization would risk breaking.

use crate::contracts::{ClassPatch, InjectionResult, PatchSet};
use once_cell::sync::Lazy;
use regex::Regex;

const VOID_ELEMENTS: [&str; 14] = ["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr"];

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)((?:\s+[a-zA-Z_:][-a-zA-Z0-9_:.]*(?:\s*=\s*(?:\x22[^\x22]*\x22|'[^']*'|[^\s>]+))?)*)\s*(/?)>").unwrap();
static ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());

/// One opening tag, with enough position/tree information to match the
/// selector forms above.
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    nth_of_type: usize,
    parent: Option<usize>,
    /// Byte range of the opening tag in the source HTML, `<tag ...>`.
    tag_range: (usize, usize),
    /// Byte range of the existing `class="..."` value text, if present.
    class_value_range: Option<(usize, usize)>,
    /// Byte offset right after the tag name, used to insert a missing
    /// `class` attribute.
    name_end: usize,
}

fn parse_attrs(attr_text: &str, tag_start: usize) -> (Option<String>, Vec<String>, Vec<(String, String)>, Option<(usize, usize)>) {
    let mut id = None;
    let mut classes = Vec::new();
    let mut attrs = Vec::new();
    let mut class_range = None;
    for cap in ATTR_RE.captures_iter(attr_text) {
        let name = cap[1].to_ascii_lowercase();
        let (value, value_match) = if let Some(m) = cap.get(2) {
            (m.as_str().to_string(), m)
        } else if let Some(m) = cap.get(3) {
            (m.as_str().to_string(), m)
        } else {
            let m = cap.get(4).unwrap();
            (m.as_str().to_string(), m)
        };
        if name == "id" {
            id = Some(value.clone());
        } else if name == "class" {
            classes = value.split_whitespace().map(|s| s.to_string()).collect();
            class_range = Some((tag_start + value_match.start(), tag_start + value_match.end()));
        }
        attrs.push((name, value));
    }
    (id, classes, attrs, class_range)
}

fn parse_nodes(html: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    // Stack of (node_index, per-tag sibling counters for this element's children).
    let mut stack: Vec<(usize, std::collections::HashMap<String, usize>)> = Vec::new();
    let mut root_counters: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for cap in TAG_RE.captures_iter(html) {
        let is_closing = &cap[1] == "/";
        let tag = cap[2].to_ascii_lowercase();
        let self_closes = &cap[4] == "/";
        let whole = cap.get(0).unwrap();

        if is_closing {
            if let Some((top_idx, _)) = stack.last() {
                if nodes[*top_idx].tag == tag {
                    stack.pop();
                }
            }
            continue;
        }

        let attr_text = cap.get(3).map(|m| m.as_str()).unwrap_or("");
        let attr_start = cap.get(3).map(|m| m.start()).unwrap_or(whole.end());
        let (id, classes, attrs, class_range) = parse_attrs(attr_text, attr_start);

        let parent = stack.last().map(|(idx, _)| *idx);
        let counters = stack.last_mut().map(|(_, c)| c).unwrap_or(&mut root_counters);
        let count = counters.entry(tag.clone()).or_insert(0);
        *count += 1;
        let nth_of_type = *count;

        let name_end = attr_start;
        let node = Node {
            tag: tag.clone(),
            id,
            classes,
            attrs,
            nth_of_type,
            parent,
            tag_range: (whole.start(), whole.end()),
            class_value_range: class_range,
            name_end,
        };
        let idx = nodes.len();
        nodes.push(node);

        let is_void = VOID_ELEMENTS.contains(&tag.as_str()) || self_closes;
        if !is_void {
            stack.push((idx, std::collections::HashMap::new()));
        }
    }

    nodes
}

fn attr_value<'a>(node: &'a Node, name: &str) -> Option<&'a str> {
    node.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

/// Matches exactly the selector forms the scene-graph extraction script
/// emits; returns the index of the first matching node in document order.
fn find_target(nodes: &[Node], selector: &str) -> Option<usize> {
    let selector = selector.trim();

    if let Some(id) = selector.strip_prefix('#') {
        return nodes.iter().position(|n| n.id.as_deref() == Some(id));
    }

    if selector.starts_with('[') && selector.ends_with(']') {
        let inner = &selector[1..selector.len() - 1];
        let (name, value) = inner.split_once('=')?;
        let value = value.trim_matches(|c| c == '"' || c == '\'');
        return nodes.iter().position(|n| attr_value(n, name) == Some(value));
    }

    if selector.contains(":nth-of-type") {
        return find_nth_of_type_chain(nodes, selector);
    }

    if let Some((tag, class)) = selector.split_once('.') {
        return nodes.iter().position(|n| n.tag.eq_ignore_ascii_case(tag) && n.classes.iter().any(|c| c == class));
    }

    None
}

fn find_nth_of_type_chain(nodes: &[Node], selector: &str) -> Option<usize> {
    let mut candidates: Vec<usize> = (0..nodes.len()).collect();
    let mut first_step = true;
    for step in selector.split('>').map(str::trim) {
        let (tag, n) = parse_nth_step(step)?;
        let next: Vec<usize> = if first_step {
            candidates
                .into_iter()
                .filter(|&i| nodes[i].tag.eq_ignore_ascii_case(&tag) && nodes[i].nth_of_type == n)
                .collect()
        } else {
            let previous = candidates;
            nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| node.tag.eq_ignore_ascii_case(&tag) && node.nth_of_type == n)
                .filter(|(_, node)| node.parent.map(|p| previous.contains(&p)).unwrap_or(false))
                .map(|(i, _)| i)
                .collect()
        };
        candidates = next;
        first_step = false;
        if candidates.is_empty() {
            return None;
        }
    }
    candidates.into_iter().next()
}

fn parse_nth_step(step: &str) -> Option<(String, usize)> {
    let (tag, rest) = step.split_once(":nth-of-type(")?;
    let n = rest.trim_end_matches(')').parse::<usize>().ok()?;
    Some((tag.to_string(), n))
}

fn is_z_order_token(token: &str) -> bool {
    let base = token.rsplit(':').next().unwrap_or(token);
    base.starts_with("z-") || base.starts_with("-z-")
}

/// Computes the new class list for one node: remove requested tokens, add
/// requested tokens (deduped), then apply the z-order dedup invariant (§8).
fn compute_new_classes(current: &[String], patch: &ClassPatch) -> Vec<String> {
    let mut result: Vec<String> = current.iter().filter(|c| !patch.remove_classes.contains(c)).cloned().collect();
    for add in &patch.add_classes {
        if !result.contains(add) {
            result.push(add.clone());
        }
    }
    if patch.add_classes.iter().any(|c| is_z_order_token(c)) {
        result.retain(|c| !is_z_order_token(c) || patch.add_classes.contains(c));
    }
    result
}

/// Current class list of the element matching `selector`, if any — the
/// deterministic rule registry reads this before deciding whether a rule
/// applies.
pub(crate) fn classes_for(html: &str, selector: &str) -> Option<Vec<String>> {
    let nodes = parse_nodes(html);
    find_target(&nodes, selector).map(|idx| nodes[idx].classes.clone())
}

/// Tag name of the element matching `selector`, if any — used by the
/// validators to decide whether a forbidden-on-interactive-elements class is
/// actually being applied to an interactive element.
pub(crate) fn element_tag(html: &str, selector: &str) -> Option<String> {
    let nodes = parse_nodes(html);
    find_target(&nodes, selector).map(|idx| nodes[idx].tag.clone())
}

/// Byte range of the full opening tag `<tag ...>` matching `selector`, for
/// callers (the JS applier's `modify_handler`) that need to search/replace
/// an attribute other than `class` on the same element.
pub(crate) fn locate_opening_tag(html: &str, selector: &str) -> Option<(usize, usize)> {
    let nodes = parse_nodes(html);
    find_target(&nodes, selector).map(|idx| nodes[idx].tag_range)
}

/// Applies every patch in `patch_set` to `html`, splicing only `class="..."`
/// attribute text. Non-fatal on a per-patch failure: a selector with no match
/// is recorded in `failed` and the rest of the set still applies.
pub fn inject(html: &str, patch_set: &PatchSet) -> InjectionResult {
    let nodes = parse_nodes(html);
    let mut edits: Vec<(usize, usize, String)> = Vec::new();
    let mut applied = Vec::new();
    let mut failed = Vec::new();

    for patch in &patch_set.patches {
        match find_target(&nodes, &patch.selector) {
            None => failed.push((patch.clone(), "selector not found".to_string())),
            Some(idx) => {
                let node = &nodes[idx];
                let new_classes = compute_new_classes(&node.classes, patch);
                let new_value = new_classes.join(" ");
                match node.class_value_range {
                    Some((start, end)) => edits.push((start, end, new_value)),
                    None => edits.push((node.name_end, node.name_end, format!(" class=\"{new_value}\""))),
                }
                applied.push(patch.clone());
            }
        }
    }

    edits.sort_by(|a, b| b.0.cmp(&a.0));
    let mut out = html.to_string();
    for (start, end, replacement) in edits {
        out.replace_range(start..end, &replacement);
    }

    InjectionResult {
        success: !applied.is_empty(),
        html: out,
        applied,
        failed,
    }
}
