//! Headless-browser driver underlying the sandbox validator (4.G): process
//! lifecycle management, a raw CDP-over-WebSocket transport, and a high-level
//! session API (navigate, evaluate, click, screenshot) guarded by `Drop`.
//!
//! Grounded in `browser_orch_ext`'s `orchestrator` module (`chromium_process`,
//! `cdp`, `driver`), generalized so the CDP reader task also captures page
//! exceptions and console errors rather than discarding unsolicited events.

mod cdp;
mod driver;
mod process;

pub use driver::BrowserSession;
