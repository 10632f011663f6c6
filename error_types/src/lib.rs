//! Unified error taxonomy for the orchestration core.
//!
//! Every internal component returns a concrete, typed error via `thiserror`.
//! Per §7 of the design, none of these are allowed to escape the public
//! entry points (`process()`, the pipeline's public functions) — callers
//! catch and fold them into a typed result envelope before returning.

use thiserror::Error;

/// Errors surfaced by the provider abstraction (4.A).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("missing API key for provider")]
    MissingKey,

    #[error("network error: {0}")]
    Network(String),

    #[error("quota exceeded for provider")]
    QuotaExceeded,

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("response truncated before completion")]
    Truncated,

    #[error("provider does not support this call variant")]
    Unsupported,
}

/// Errors from the JSON self-repair loop (4.A).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JsonRepairError {
    #[error("JSON parse error: {0}")]
    ParseFailed(String),

    #[error("repair disabled, parse error returned verbatim: {0}")]
    RepairDisabled(String),

    #[error("repair attempts exhausted: {0}")]
    RepairExhausted(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors from the intent parser (4.D). The parser itself never raises these to its
/// caller — it folds them into an `Unknown` intent — but internal helpers use them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntentParseError {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("malformed intent JSON: {0}")]
    Malformed(String),

    #[error("empty utterance")]
    EmptyInput,
}

/// Errors from device resolution in the intent service (4.E).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceResolutionError {
    #[error("no device matched '{0}'")]
    NoMatch(String),

    #[error("ambiguous device name '{0}', candidates: {1:?}")]
    Ambiguous(String, Vec<String>),

    #[error("device '{0}' is offline")]
    Offline(String),
}

/// Errors from the headless-browser sandbox validator (4.G).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SandboxError {
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("page load timed out after {0}ms")]
    RenderTimeout(u64),

    #[error("page reported {0} JS error(s): {1}")]
    PageErrors(usize, String),

    #[error("interaction timed out after {0}ms")]
    InteractionTimeout(u64),

    #[error("CDP/browser protocol error: {0}")]
    Protocol(String),
}

/// Errors from the deterministic/LLM fixer (4.H).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FixerError {
    #[error("patch failed to apply: {0}")]
    PatchApplicationFailed(String),

    #[error("patch rejected by validator: {0}")]
    PatchRejected(String),

    #[error("no selector match for '{0}'")]
    SelectorNotFound(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors from HTML generation (4.F) and vision repair (4.I).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("generated document missing required structure: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Top-level error enum composed from every subsystem. Internal `?`-propagation
/// within a component is fine; the pipeline and `process()` fold this into a
/// typed result envelope rather than letting it reach their callers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("JSON repair error: {0}")]
    JsonRepair(#[from] JsonRepairError),

    #[error("intent parse error: {0}")]
    IntentParse(#[from] IntentParseError),

    #[error("device resolution error: {0}")]
    DeviceResolution(#[from] DeviceResolutionError),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("fixer error: {0}")]
    Fixer(#[from] FixerError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "full")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "full")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

/// Configuration loading/validation errors (ambient stack, §2.1).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid configuration value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),
}
