use crate::cdp::CdpConnection;
use crate::process::ChromiumProcess;
use base64::Engine;
use error_types::SandboxError;
use serde_json::Value;
use std::time::Duration;

/// One browser context for one validation run (§5: "the browser is not shared;
/// each validation gets its own browser context, freed at end of validation").
///
/// `Drop` tears down the Chromium child process and its WebSocket on every exit
/// path — including early-return via `?` and task cancellation — which is the
/// Rust rendering of the distilled spec's "scoped ownership" note (§9): a
/// `Drop`-based guard rather than a manual try/finally.
pub struct BrowserSession {
    process: ChromiumProcess,
    cdp: CdpConnection,
}

impl BrowserSession {
    /// Launches a fresh headless Chromium instance and connects to its page
    /// target, enabling the CDP domains Phase 1 needs (page lifecycle, JS
    /// evaluation, console/exception events, DOM).
    pub async fn launch(debug_port: u16) -> Result<Self, SandboxError> {
        let process = ChromiumProcess::launch(debug_port)?;
        // headless_chrome's own readiness probe already blocks until the devtools
        // endpoint answers, but a short settle avoids a connection race on slower hosts.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let cdp = CdpConnection::connect(debug_port).await?;
        cdp.send("Page.enable", serde_json::json!({})).await?;
        cdp.send("Runtime.enable", serde_json::json!({})).await?;
        cdp.send("Log.enable", serde_json::json!({})).await?;
        cdp.send("DOM.enable", serde_json::json!({})).await?;
        Ok(Self { process, cdp })
    }

    pub fn debug_port(&self) -> u16 {
        self.process.debug_port
    }

    /// Loads `html` as the page content at the given viewport, waiting for
    /// `document.readyState == "complete"`, bounded by `timeout` (Phase 1:
    /// `5 × interaction_timeout_ms`). The document is inlined as a `data:` URL so
    /// no disk write or local HTTP server is required.
    pub async fn set_content(&self, html: &str, viewport_w: u32, viewport_h: u32, timeout: Duration) -> Result<(), SandboxError> {
        self.cdp
            .send(
                "Emulation.setDeviceMetricsOverride",
                serde_json::json!({"width": viewport_w, "height": viewport_h, "deviceScaleFactor": 1, "mobile": false}),
            )
            .await?;

        let data_url = format!(
            "data:text/html;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(html)
        );
        tokio::time::timeout(timeout, self.cdp.send("Page.navigate", serde_json::json!({"url": data_url})))
            .await
            .map_err(|_| SandboxError::RenderTimeout(timeout.as_millis() as u64))??;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let ready = self.evaluate("document.readyState").await?;
            if ready.as_str() == Some("complete") {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SandboxError::RenderTimeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Evaluates `expression` and returns its JSON-serializable result.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, SandboxError> {
        let result = self
            .cdp
            .send(
                "Runtime.evaluate",
                serde_json::json!({"expression": expression, "returnByValue": true, "awaitPromise": true}),
            )
            .await?;
        if let Some(exception) = result.get("exceptionDetails") {
            return Err(SandboxError::Protocol(format!("evaluate failed: {exception}")));
        }
        Ok(result.get("result").and_then(|r| r.get("value")).cloned().unwrap_or(Value::Null))
    }

    /// Clicks the first element matching `selector`. Returns `false` (not an
    /// error) when no element matched, so callers can record `responsive=false`
    /// with a reason rather than aborting the phase.
    pub async fn click_selector(&self, selector: &str, timeout: Duration) -> Result<bool, SandboxError> {
        let js = format!(
            "(function(){{ var el = document.querySelector({sel}); if(!el) return false; el.click(); return true; }})()",
            sel = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string())
        );
        tokio::time::timeout(timeout, self.evaluate(&js))
            .await
            .map_err(|_| SandboxError::InteractionTimeout(timeout.as_millis() as u64))?
            .map(|v| v.as_bool().unwrap_or(false))
    }

    pub async fn screenshot_png(&self) -> Result<Vec<u8>, SandboxError> {
        let result = self
            .cdp
            .send(
                "Page.captureScreenshot",
                serde_json::json!({"format": "png", "captureBeyondViewport": false}),
            )
            .await?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| SandboxError::Protocol("captureScreenshot returned no data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| SandboxError::Protocol(format!("screenshot payload was not valid base64: {e}")))
    }

    /// Drains page-level JS exceptions observed since the last drain.
    pub fn drain_page_errors(&self) -> Vec<String> {
        self.cdp.take_page_errors()
    }

    pub fn drain_console_errors(&self) -> Vec<String> {
        self.cdp.take_console_errors()
    }

    /// Reloads the current document, used by cascading validation (4.G) to
    /// return to the initial state when no close button or Escape works.
    pub async fn reload(&self, timeout: Duration) -> Result<(), SandboxError> {
        tokio::time::timeout(timeout, self.cdp.send("Page.reload", serde_json::json!({})))
            .await
            .map_err(|_| SandboxError::RenderTimeout(timeout.as_millis() as u64))??;
        Ok(())
    }

    /// Sends the Escape key, used by cascading validation's "return to root
    /// state" step before testing the next candidate.
    pub async fn press_escape(&self) -> Result<(), SandboxError> {
        self.cdp
            .send(
                "Input.dispatchKeyEvent",
                serde_json::json!({"type": "keyDown", "key": "Escape", "code": "Escape", "windowsVirtualKeyCode": 27}),
            )
            .await?;
        self.cdp
            .send(
                "Input.dispatchKeyEvent",
                serde_json::json!({"type": "keyUp", "key": "Escape", "code": "Escape", "windowsVirtualKeyCode": 27}),
            )
            .await?;
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        tracing::debug!(port = self.process.debug_port, "browser session released");
    }
}
