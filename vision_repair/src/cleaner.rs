//! Output cleaner for the Step 2 repair call (4.I): ensures the returned
//! document is structurally sound before it's handed back to the pipeline.
//! Grounded on `validation/fixer.py::DirectFixer._clean_repaired_html`.

use provider::strip_markdown_fence;

/// Strips markdown fences and validates structure. Returns `None` (never an
/// error) when `<head>` or `<body>` are absent — per 4.I, "never raises; on
/// failure, returns the prior best HTML", which is the caller's job once this
/// returns `None`.
pub fn clean(text: &str) -> Option<String> {
    let mut html = strip_markdown_fence(text).trim().to_string();
    if html.is_empty() {
        return None;
    }

    let lower = html.to_lowercase();
    if !lower.contains("<!doctype") && !lower.contains("<html") {
        return None;
    }
    if !lower.contains("<head") || !lower.contains("<body") {
        return None;
    }

    if !lower.contains("</html>") {
        html.push_str("\n</html>");
    }

    Some(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_document_passes_through() {
        let doc = "<!DOCTYPE html><html><head></head><body></body></html>";
        assert_eq!(clean(doc).as_deref(), Some(doc));
    }

    #[test]
    fn strips_markdown_fence() {
        let fenced = "```html\n<!DOCTYPE html><html><head></head><body></body></html>\n```";
        let cleaned = clean(fenced).unwrap();
        assert!(cleaned.starts_with("<!DOCTYPE"));
    }

    #[test]
    fn appends_missing_closing_tag() {
        let doc = "<!DOCTYPE html><html><head></head><body>content";
        let cleaned = clean(doc).unwrap();
        assert!(cleaned.ends_with("</html>"));
    }

    #[test]
    fn missing_body_rejected() {
        let doc = "<!DOCTYPE html><html><head></head></html>";
        assert!(clean(doc).is_none());
    }

    #[test]
    fn missing_doctype_and_html_rejected() {
        assert!(clean("<div>just a fragment</div>").is_none());
    }

    #[test]
    fn empty_text_rejected() {
        assert!(clean("").is_none());
        assert!(clean("   ").is_none());
    }
}
