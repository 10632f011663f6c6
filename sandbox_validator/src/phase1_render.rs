//! Phase 1 — Render (4.G). Loads the document at the declared viewport and
//! checks for a non-empty, error-free first paint.

use crate::config::SandboxConfig;
use crate::page::PageHandle;
use crate::types::PhaseResult;
use std::time::Instant;

pub async fn run(page: &dyn PageHandle, html: &str, config: &SandboxConfig) -> PhaseResult {
    let start = Instant::now();
    if let Err(e) = page
        .set_content(html, config.viewport_width, config.viewport_height, config.render_timeout())
        .await
    {
        return PhaseResult::fail(1, "render", e.to_string(), start.elapsed().as_millis() as u64);
    }

    let page_errors = page.drain_page_errors();
    if !page_errors.is_empty() {
        return PhaseResult::fail(
            1,
            "render",
            format!("{} page error(s): {}", page_errors.len(), page_errors.join("; ")),
            start.elapsed().as_millis() as u64,
        );
    }

    let has_content = page
        .evaluate(
            "(function(){ \
                var body = document.body; \
                if (!body || body.children.length === 0) return false; \
                if ((body.textContent || '').trim().length > 0) return true; \
                var els = body.querySelectorAll('*'); \
                for (var i = 0; i < els.length; i++) { \
                    var r = els[i].getBoundingClientRect(); \
                    if (r.width > 0 && r.height > 0) return true; \
                } \
                return false; \
            })()",
        )
        .await
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let duration_ms = start.elapsed().as_millis() as u64;
    if !has_content {
        return PhaseResult::fail(1, "render", "body has no children or visible content", duration_ms);
    }

    PhaseResult::ok(1, "render", serde_json::json!({ "page_errors": 0 }), duration_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::mock::MockPage;
    use serde_json::json;

    #[tokio::test]
    async fn passes_when_body_has_visible_content() {
        let page = MockPage::default();
        page.push_eval(json!(true));
        let result = run(&page, "<html></html>", &SandboxConfig::default()).await;
        assert!(result.passed);
        assert_eq!(result.phase, 1);
    }

    #[tokio::test]
    async fn fails_when_page_errors_present() {
        let page = MockPage::default();
        page.page_errors.lock().unwrap().push("ReferenceError: x is not defined".to_string());
        let result = run(&page, "<html></html>", &SandboxConfig::default()).await;
        assert!(!result.passed);
        assert!(result.error.unwrap().contains("page error"));
    }

    #[tokio::test]
    async fn fails_when_body_is_empty() {
        let page = MockPage::default();
        page.push_eval(json!(false));
        let result = run(&page, "<html></html>", &SandboxConfig::default()).await;
        assert!(!result.passed);
    }
}
