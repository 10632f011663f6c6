//! Convenience wrapper around a [`browser_driver::BrowserSession`] for
//! callers of [`crate::Orchestrator::process`] that don't want to manage the
//! headless-browser lifecycle themselves (§9: browser lifecycle is the
//! invariant most worth protecting — one page per request, closed on drop).

use crate::config::Config;
use browser_driver::BrowserSession;
use error_types::CoreError;
use sandbox_validator::PageHandle;

/// Launches and owns one headless-browser page for the lifetime of a single
/// `DisplayContent` request. Dropping it tears the browser process down, so
/// callers should build one per request rather than sharing it across calls.
pub struct DisplaySession {
    inner: BrowserSession,
}

impl DisplaySession {
    pub async fn launch(config: &Config) -> Result<Self, CoreError> {
        let inner = BrowserSession::launch(config.chromium_debug_port).await?;
        Ok(Self { inner })
    }

    pub fn page(&self) -> &dyn PageHandle {
        &self.inner
    }
}
