//! Process-wide, read-only configuration (§6). Loaded once at process start
//! from the environment (optionally via a `.env` file picked up through
//! `dotenvy`); there is no reconfiguration path short of a process restart
//! (§5: "no global mutable configuration beyond read-only settings").

use std::env;

/// Connection details for one provider tier (§6: "provider endpoints and
/// API keys", "model identifiers for cheap / coder / reasoner tiers").
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub supports_vision: bool,
    pub supports_grounding: bool,
}

impl ProviderEndpoint {
    fn from_env(prefix: &str, default_base_url: &str, default_model: &str, supports_vision: bool, supports_grounding: bool) -> Self {
        Self {
            base_url: env::var(format!("{prefix}_BASE_URL")).unwrap_or_else(|_| default_base_url.to_string()),
            api_key: env::var(format!("{prefix}_API_KEY")).ok(),
            model: env::var(format!("{prefix}_MODEL")).unwrap_or_else(|_| default_model.to_string()),
            supports_vision,
            supports_grounding,
        }
    }
}

/// Feature flags (§6). All default on; each can be switched off without a
/// code change.
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    pub json_repair_enabled: bool,
    pub html_repair_enabled: bool,
    pub custom_layout_enabled: bool,
    pub custom_layout_validation_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            json_repair_enabled: true,
            html_repair_enabled: true,
            custom_layout_enabled: true,
            custom_layout_validation_enabled: true,
        }
    }
}

impl FeatureFlags {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            json_repair_enabled: bool_env("JSON_REPAIR_ENABLED", defaults.json_repair_enabled),
            html_repair_enabled: bool_env("HTML_REPAIR_ENABLED", defaults.html_repair_enabled),
            custom_layout_enabled: bool_env("CUSTOM_LAYOUT_ENABLED", defaults.custom_layout_enabled),
            custom_layout_validation_enabled: bool_env("CUSTOM_LAYOUT_VALIDATION_ENABLED", defaults.custom_layout_validation_enabled),
        }
    }
}

/// Numeric thresholds (§6). Defaults mirror the §6 table, tuned for a
/// 1920x1080 dark-theme viewport (§9 open question: re-derive empirically
/// before retargeting a different viewport).
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub visual_change_threshold: f32,
    pub blank_page_threshold: f32,
    pub min_responsive_ratio: f32,
    pub modal_open_threshold: f32,
    pub max_cascade_depth: u32,
    pub max_cascade_elements: u32,
    pub max_inputs_to_test: u32,
    pub stabilization_ms: u64,
    pub interaction_timeout_ms: u64,
    pub max_repair_cycles: u32,
    pub acceptance_score: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            visual_change_threshold: 0.02,
            blank_page_threshold: 0.95,
            min_responsive_ratio: 0.70,
            modal_open_threshold: 0.15,
            max_cascade_depth: 2,
            max_cascade_elements: 4,
            max_inputs_to_test: 10,
            stabilization_ms: 150,
            interaction_timeout_ms: 2000,
            max_repair_cycles: 2,
            acceptance_score: 0.7,
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

/// Top-level, process-wide configuration. Construct once with [`Config::from_env`]
/// and share by reference (never mutate after startup).
#[derive(Debug, Clone)]
pub struct Config {
    pub cheap: ProviderEndpoint,
    pub coder: ProviderEndpoint,
    pub reasoner: ProviderEndpoint,
    pub flags: FeatureFlags,
    pub thresholds: Thresholds,
    pub debug_screenshot_dir: Option<String>,
    pub monitor_capacity: usize,
    pub json_repair_max_attempts: u32,
    pub chromium_debug_port: u16,
}

impl Config {
    /// Loads configuration from the process environment, reading a `.env`
    /// file first if one is present (no-op otherwise). Every field has a
    /// sane default so the core can run hermetically in tests without any
    /// environment set up at all.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            cheap: ProviderEndpoint::from_env("CHEAP_PROVIDER", "https://api.openai.com/v1", "gpt-4o-mini", false, false),
            coder: ProviderEndpoint::from_env("CODER_PROVIDER", "https://api.openai.com/v1", "gpt-4o", false, false),
            reasoner: ProviderEndpoint::from_env("REASONER_PROVIDER", "https://api.anthropic.com/v1", "claude-reasoner", true, true),
            flags: FeatureFlags::from_env(),
            thresholds: Thresholds::default(),
            debug_screenshot_dir: env::var("DEBUG_SCREENSHOT_DIR").ok(),
            monitor_capacity: env::var("MONITOR_CAPACITY").ok().and_then(|v| v.parse().ok()).unwrap_or(1000),
            json_repair_max_attempts: env::var("JSON_REPAIR_MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(1),
            chromium_debug_port: env::var("CHROMIUM_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(9222),
        }
    }
}

fn bool_env(key: &str, default: bool) -> bool {
    env::var(key).ok().map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes")).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_spec_table() {
        let t = Thresholds::default();
        assert_eq!(t.visual_change_threshold, 0.02);
        assert_eq!(t.blank_page_threshold, 0.95);
        assert_eq!(t.min_responsive_ratio, 0.70);
        assert_eq!(t.max_repair_cycles, 2);
    }

    #[test]
    fn feature_flags_default_to_enabled() {
        let f = FeatureFlags::default();
        assert!(f.json_repair_enabled);
        assert!(f.html_repair_enabled);
        assert!(f.custom_layout_enabled);
        assert!(f.custom_layout_validation_enabled);
    }
}
