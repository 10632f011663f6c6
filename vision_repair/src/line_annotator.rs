//! Line-numbered, truncated HTML for the diagnosis prompt (4.I step 1).
//! Grounded on `validation/fixer.py`'s ~15k-char truncation with begin/end
//! windows — the analyzer needs exact line numbers to cite, but a full
//! multi-thousand-line document would blow the prompt budget and slow the
//! diagnosis call down for no benefit.

const DEFAULT_CHAR_LIMIT: usize = 15_000;

/// Prefixes every line with its 1-indexed line number, `"{n}: {line}"`.
pub fn annotate(html: &str) -> String {
    html.lines().enumerate().map(|(i, line)| format!("{}: {line}", i + 1)).collect::<Vec<_>>().join("\n")
}

/// Truncates an already-annotated document to roughly `limit` characters,
/// keeping a window from the start and a window from the end and marking the
/// gap, so the analyzer can still cite real line numbers on both sides.
pub fn truncate(annotated: &str, limit: usize) -> String {
    if annotated.len() <= limit {
        return annotated.to_string();
    }
    let half = limit / 2;
    let head = take_chars_at_line_boundary(annotated, half, true);
    let tail = take_chars_at_line_boundary(annotated, half, false);
    format!("{head}\n\n... [document truncated, {} characters omitted] ...\n\n{tail}", annotated.len() - head.len() - tail.len())
}

/// Default-limit convenience wrapper used by the diagnosis builder.
pub fn annotate_and_truncate(html: &str) -> String {
    truncate(&annotate(html), DEFAULT_CHAR_LIMIT)
}

fn take_chars_at_line_boundary(text: &str, approx_chars: usize, from_start: bool) -> String {
    if from_start {
        let mut end = approx_chars.min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        match text[..end].rfind('\n') {
            Some(nl) => text[..nl].to_string(),
            None => text[..end].to_string(),
        }
    } else {
        let mut start = text.len().saturating_sub(approx_chars);
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        match text[start..].find('\n') {
            Some(nl) => text[start + nl + 1..].to_string(),
            None => text[start..].to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_numbers_every_line() {
        let html = "<div>\n<span>hi</span>\n</div>";
        let annotated = annotate(html);
        assert!(annotated.starts_with("1: <div>"));
        assert!(annotated.contains("2: <span>hi</span>"));
        assert!(annotated.contains("3: </div>"));
    }

    #[test]
    fn short_document_is_not_truncated() {
        let annotated = annotate("<div></div>");
        assert_eq!(truncate(&annotated, 15_000), annotated);
    }

    #[test]
    fn long_document_is_truncated_with_marker() {
        let lines: Vec<String> = (0..2000).map(|i| format!("<div id=\"d{i}\">content</div>")).collect();
        let html = lines.join("\n");
        let annotated = annotate(&html);
        let truncated = truncate(&annotated, 2000);
        assert!(truncated.len() < annotated.len());
        assert!(truncated.contains("truncated"));
        assert!(truncated.starts_with("1: "));
    }
}
