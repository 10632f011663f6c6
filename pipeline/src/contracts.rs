use common_types::TokenUsage;
use html_generator::GenerationResult;
use sandbox_validator::SandboxResult;
use serde::{Deserialize, Serialize};

/// Top-level outcome of a custom-layout run (§3, §4.J).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub ok: bool,
    pub html: Option<String>,
    pub generation_result: Option<GenerationResult>,
    pub validation_result: Option<SandboxResult>,
    pub total_latency_ms: u64,
    pub total_tokens: u32,
    pub final_score: f32,
    pub error: Option<String>,
    /// §7 error kind 5: set when the validator never ran (no browser
    /// available) but the generated HTML is still returned.
    pub validation_skipped: bool,
}

impl PipelineResult {
    pub fn failure(error: impl Into<String>, total_latency_ms: u64) -> Self {
        Self {
            ok: false,
            html: None,
            generation_result: None,
            validation_result: None,
            total_latency_ms,
            total_tokens: 0,
            final_score: 0.0,
            error: Some(error.into()),
            validation_skipped: false,
        }
    }
}

/// Tunables for a pipeline run (§4.J, §6 config defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_repair_cycles: u32,
    pub acceptance_score: f32,
    pub html_repair_enabled: bool,
    pub custom_layout_validation_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_repair_cycles: 2,
            acceptance_score: 0.7,
            html_repair_enabled: true,
            custom_layout_validation_enabled: true,
        }
    }
}

/// One repair cycle's bookkeeping, tracked alongside the best-result so the
/// early-stop rules (§4.J step 6) have something to compare against.
#[derive(Debug, Clone)]
struct TrackedResult {
    html: String,
    score: f32,
    phase: String,
    errors_remaining: usize,
}

/// Remembers the best (html, score) pair seen across repair cycles (§4.J
/// step 5, §8): upgrades only on a **strictly greater** score, so repeated
/// ties never displace the first HTML that reached the max.
#[derive(Debug, Default)]
pub struct BestResultTracker {
    best: Option<TrackedResult>,
    history: Vec<f32>,
}

impl BestResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one cycle's outcome, keeping it as the best only if its score
    /// is strictly greater than whatever is currently stored.
    pub fn record(&mut self, html: impl Into<String>, score: f32, phase: impl Into<String>, errors_remaining: usize) {
        self.history.push(score);
        let is_better = match &self.best {
            Some(current) => score > current.score,
            None => true,
        };
        if is_better {
            self.best = Some(TrackedResult {
                html: html.into(),
                score,
                phase: phase.into(),
                errors_remaining,
            });
        }
    }

    pub fn best_html(&self) -> Option<&str> {
        self.best.as_ref().map(|b| b.html.as_str())
    }

    pub fn best_score(&self) -> f32 {
        self.best.as_ref().map(|b| b.score).unwrap_or(0.0)
    }

    pub fn best_phase(&self) -> Option<&str> {
        self.best.as_ref().map(|b| b.phase.as_str())
    }

    pub fn best_errors_remaining(&self) -> usize {
        self.best.as_ref().map(|b| b.errors_remaining).unwrap_or(0)
    }

    /// Early-stop rule (§4.J step 6): true once the last two recorded scores
    /// are equal (no improvement across a cycle boundary). Requires at least
    /// three samples since the first recording always "improves" from
    /// nothing.
    pub fn stalled_for_two_cycles(&self) -> bool {
        let n = self.history.len();
        n >= 3 && (self.history[n - 1] - self.history[n - 2]).abs() < 1e-9 && (self.history[n - 2] - self.history[n - 3]).abs() < 1e-9
    }
}

/// Token/latency accumulator across generation + every repair call in a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunTotals {
    pub usage: TokenUsage,
    pub latency_ms: u64,
}

impl RunTotals {
    pub fn add_tokens(&mut self, tokens: u32) {
        self.usage.total_tokens += tokens;
    }

    pub fn add_latency(&mut self, ms: u64) {
        self.latency_ms += ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_upgrades_only_on_strictly_greater_score() {
        let mut tracker = BestResultTracker::new();
        tracker.record("a", 0.4, "generate", 3);
        tracker.record("b", 0.4, "repair", 3);
        tracker.record("c", 0.6, "repair", 1);
        tracker.record("d", 0.5, "repair", 2);
        assert_eq!(tracker.best_html(), Some("c"));
        assert!((tracker.best_score() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn tracker_keeps_first_html_reaching_max_on_tie() {
        let mut tracker = BestResultTracker::new();
        tracker.record("first", 0.8, "repair", 0);
        tracker.record("second", 0.8, "repair", 0);
        assert_eq!(tracker.best_html(), Some("first"));
    }

    #[test]
    fn stalled_after_two_equal_cycles() {
        let mut tracker = BestResultTracker::new();
        tracker.record("a", 0.5, "generate", 1);
        assert!(!tracker.stalled_for_two_cycles());
        tracker.record("b", 0.5, "repair", 1);
        assert!(!tracker.stalled_for_two_cycles());
        tracker.record("c", 0.5, "repair", 1);
        assert!(tracker.stalled_for_two_cycles());
    }
}
