use error_types::SandboxError;
use headless_chrome::{Browser, LaunchOptionsBuilder};

/// Owns the headless Chromium child process for one validation run.
///
/// Dropping this drops the underlying `headless_chrome::Browser` handle, which
/// kills the child process on its own `Drop` impl — the process-lifetime half of
/// the browser-lifecycle invariant (§5/§9); `BrowserSession` in
/// `driver.rs` wraps this together with the CDP transport into a single guard.
pub struct ChromiumProcess {
    #[allow(dead_code)]
    browser: Browser,
    pub debug_port: u16,
}

impl ChromiumProcess {
    /// Launches headless Chromium with remote debugging bound to `debug_port`.
    pub fn launch(debug_port: u16) -> Result<Self, SandboxError> {
        let options = LaunchOptionsBuilder::default()
            .headless(true)
            .port(Some(debug_port))
            .sandbox(false)
            .build()
            .map_err(|e| SandboxError::BrowserUnavailable(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| SandboxError::BrowserUnavailable(e.to_string()))?;

        Ok(Self { browser, debug_port })
    }
}
