//! Numeric thresholds governing the sandbox validator (§6). Defaults are the
//! 1920×1080 dark-theme values called out in §9 ("retargeting a
//! different viewport is a config change, not a code change").

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub visual_change_threshold: f64,
    pub element_threshold: f64,
    pub blank_page_threshold: f64,
    pub min_responsive_ratio: f64,
    pub modal_open_threshold: f64,
    pub max_cascade_depth: u8,
    pub max_cascade_elements: usize,
    pub max_inputs_to_test: usize,
    pub stabilization_ms: u64,
    pub interaction_timeout_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1920,
            viewport_height: 1080,
            visual_change_threshold: 0.02,
            element_threshold: 0.30,
            blank_page_threshold: 0.95,
            min_responsive_ratio: 0.70,
            modal_open_threshold: 0.15,
            max_cascade_depth: 2,
            max_cascade_elements: 4,
            max_inputs_to_test: 10,
            stabilization_ms: 150,
            interaction_timeout_ms: 2000,
        }
    }
}

impl SandboxConfig {
    pub fn render_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interaction_timeout_ms * 5)
    }

    pub fn interaction_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interaction_timeout_ms)
    }

    pub fn stabilization(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.stabilization_ms)
    }
}
