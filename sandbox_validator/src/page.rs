//! Trait seam over the live browser session, so every phase can be exercised
//! hermetically with a mock page instead of a real Chromium process (§9
//! "non-determinism... handled at the edges"; browser_driver's own doc comment
//! points here for the same reason).

use async_trait::async_trait;
use error_types::SandboxError;
use serde_json::Value;
use std::time::Duration;

#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn set_content(&self, html: &str, viewport_w: u32, viewport_h: u32, timeout: Duration) -> Result<(), SandboxError>;
    async fn evaluate(&self, expression: &str) -> Result<Value, SandboxError>;
    async fn click_selector(&self, selector: &str, timeout: Duration) -> Result<bool, SandboxError>;
    async fn screenshot_png(&self) -> Result<Vec<u8>, SandboxError>;
    fn drain_page_errors(&self) -> Vec<String>;
    fn drain_console_errors(&self) -> Vec<String>;
    async fn reload(&self, timeout: Duration) -> Result<(), SandboxError>;
    async fn press_escape(&self) -> Result<(), SandboxError>;
}

#[async_trait]
impl PageHandle for browser_driver::BrowserSession {
    async fn set_content(&self, html: &str, viewport_w: u32, viewport_h: u32, timeout: Duration) -> Result<(), SandboxError> {
        browser_driver::BrowserSession::set_content(self, html, viewport_w, viewport_h, timeout).await
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, SandboxError> {
        browser_driver::BrowserSession::evaluate(self, expression).await
    }

    async fn click_selector(&self, selector: &str, timeout: Duration) -> Result<bool, SandboxError> {
        browser_driver::BrowserSession::click_selector(self, selector, timeout).await
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, SandboxError> {
        browser_driver::BrowserSession::screenshot_png(self).await
    }

    fn drain_page_errors(&self) -> Vec<String> {
        browser_driver::BrowserSession::drain_page_errors(self)
    }

    fn drain_console_errors(&self) -> Vec<String> {
        browser_driver::BrowserSession::drain_console_errors(self)
    }

    async fn reload(&self, timeout: Duration) -> Result<(), SandboxError> {
        browser_driver::BrowserSession::reload(self, timeout).await
    }

    async fn press_escape(&self) -> Result<(), SandboxError> {
        browser_driver::BrowserSession::press_escape(self).await
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Deterministic [`PageHandle`] double. Each call that would hit the
    /// network/browser instead reads from a small scripted plan, so phase tests
    /// stay hermetic per §9.
    pub struct MockPage {
        pub eval_responses: Mutex<std::collections::VecDeque<Value>>,
        pub click_responses: Mutex<std::collections::VecDeque<bool>>,
        pub screenshots: Mutex<std::collections::VecDeque<Vec<u8>>>,
        pub page_errors: Mutex<Vec<String>>,
        pub console_errors: Mutex<Vec<String>>,
        pub fail_set_content: bool,
    }

    impl Default for MockPage {
        fn default() -> Self {
            Self {
                eval_responses: Mutex::new(Default::default()),
                click_responses: Mutex::new(Default::default()),
                screenshots: Mutex::new(Default::default()),
                page_errors: Mutex::new(Vec::new()),
                console_errors: Mutex::new(Vec::new()),
                fail_set_content: false,
            }
        }
    }

    impl MockPage {
        pub fn push_eval(&self, v: Value) {
            self.eval_responses.lock().unwrap().push_back(v);
        }

        pub fn push_screenshot(&self, bytes: Vec<u8>) {
            self.screenshots.lock().unwrap().push_back(bytes);
        }
    }

    #[async_trait]
    impl PageHandle for MockPage {
        async fn set_content(&self, _html: &str, _w: u32, _h: u32, _timeout: Duration) -> Result<(), SandboxError> {
            if self.fail_set_content {
                return Err(SandboxError::RenderTimeout(0));
            }
            Ok(())
        }

        async fn evaluate(&self, _expression: &str) -> Result<Value, SandboxError> {
            let mut q = self.eval_responses.lock().unwrap();
            Ok(q.pop_front().unwrap_or(Value::Null))
        }

        async fn click_selector(&self, _selector: &str, _timeout: Duration) -> Result<bool, SandboxError> {
            let mut q = self.click_responses.lock().unwrap();
            Ok(q.pop_front().unwrap_or(true))
        }

        async fn screenshot_png(&self) -> Result<Vec<u8>, SandboxError> {
            let mut q = self.screenshots.lock().unwrap();
            Ok(q.pop_front().unwrap_or_default())
        }

        fn drain_page_errors(&self) -> Vec<String> {
            std::mem::take(&mut self.page_errors.lock().unwrap())
        }

        fn drain_console_errors(&self) -> Vec<String> {
            std::mem::take(&mut self.console_errors.lock().unwrap())
        }

        async fn reload(&self, _timeout: Duration) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn press_escape(&self) -> Result<(), SandboxError> {
            Ok(())
        }
    }
}
