//! Structured event log + in-memory aggregates (4.B / §5).
//!
//! Consolidates what the original kept as two classes (`AILogger` / `AIMetrics`)
//! into one `Monitor`, per the binding decision recorded in DESIGN.md: only the
//! unified monitor is implemented, no legacy facade. Every event both emits a
//! `tracing` record at the right severity and updates the bounded in-memory
//! ring + aggregates, guarded by a single mutex (§5).

mod event;

pub use event::{EventKind, EventSeverity, MonitorEvent};

use chrono::Utc;
use common_types::{ProviderTier, TokenUsage};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Aggregate counters for one provider tier.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ProviderAggregate {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_tokens: u64,
    pub total_latency_ms: u64,
}

impl ProviderAggregate {
    pub fn avg_latency_ms(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.requests as f64
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.successes as f64 / self.requests as f64
        }
    }
}

struct MonitorState {
    history: VecDeque<MonitorEvent>,
    aggregated: HashMap<ProviderTier, ProviderAggregate>,
    capacity: usize,
}

/// Unified event log and metrics aggregator. One instance is constructed at
/// process start and shared (as an `Arc<Monitor>`) across every component that
/// needs to emit events (§9: no module-level singleton, an explicit collaborator
/// instead).
pub struct Monitor {
    state: Mutex<MonitorState>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Monitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                history: VecDeque::with_capacity(capacity.min(4096)),
                aggregated: HashMap::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Record a provider request/response pair. Emits `info` on success, `warn`
    /// on a recovered failure (provider returned `ok=false` but the caller has a
    /// fallback path), `error` when the caller has no fallback left.
    pub fn track_provider_call(
        &self,
        request_id: &str,
        provider: ProviderTier,
        model: &str,
        usage: TokenUsage,
        latency_ms: u64,
        ok: bool,
        recoverable: bool,
        error: Option<&str>,
    ) {
        let severity = if ok {
            EventSeverity::Info
        } else if recoverable {
            EventSeverity::Warn
        } else {
            EventSeverity::Error
        };

        match severity {
            EventSeverity::Info => tracing::info!(
                request_id, provider = %provider, model, tokens = usage.total_tokens, latency_ms, "provider call succeeded"
            ),
            EventSeverity::Warn => tracing::warn!(
                request_id, provider = %provider, model, error, "provider call failed, recovering"
            ),
            EventSeverity::Error => tracing::error!(
                request_id, provider = %provider, model, error, "provider call failed"
            ),
        }

        let event = MonitorEvent {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            kind: EventKind::ProviderCall,
            severity,
            provider: Some(provider),
            detail: serde_json::json!({
                "model": model,
                "usage": usage,
                "latency_ms": latency_ms,
                "ok": ok,
                "error": error,
            }),
        };

        let mut state = self.state.lock().unwrap();
        let agg = state.aggregated.entry(provider).or_default();
        agg.requests += 1;
        if ok {
            agg.successes += 1;
        } else {
            agg.failures += 1;
        }
        agg.total_tokens += usage.total_tokens as u64;
        agg.total_latency_ms += latency_ms;

        push_bounded(&mut state.history, event, state.capacity);
    }

    pub fn track_intent(&self, request_id: &str, intent_type: &str, confidence: f32) {
        tracing::info!(request_id, intent_type, confidence, "intent extracted");
        self.push_event(MonitorEvent {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            kind: EventKind::Intent,
            severity: EventSeverity::Info,
            provider: None,
            detail: serde_json::json!({"intent_type": intent_type, "confidence": confidence}),
        });
    }

    pub fn track_routing(&self, request_id: &str, complexity: &str, target: ProviderTier, confidence: f32) {
        tracing::info!(request_id, complexity, target = %target, confidence, "routing decision made");
        self.push_event(MonitorEvent {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            kind: EventKind::Routing,
            severity: EventSeverity::Info,
            provider: Some(target),
            detail: serde_json::json!({"complexity": complexity, "confidence": confidence}),
        });
    }

    pub fn track_command(&self, request_id: &str, command_type: &str, device_id: &str, ok: bool) {
        let severity = if ok { EventSeverity::Info } else { EventSeverity::Warn };
        match severity {
            EventSeverity::Info => tracing::info!(request_id, command_type, device_id, "command dispatched"),
            _ => tracing::warn!(request_id, command_type, device_id, "command dispatch failed"),
        }
        self.push_event(MonitorEvent {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            kind: EventKind::Command,
            severity,
            provider: None,
            detail: serde_json::json!({"command_type": command_type, "device_id": device_id, "ok": ok}),
        });
    }

    pub fn track_error(&self, request_id: &str, context: &str, message: &str) {
        tracing::error!(request_id, context, message, "request dropped");
        self.push_event(MonitorEvent {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            kind: EventKind::Error,
            severity: EventSeverity::Error,
            provider: None,
            detail: serde_json::json!({"context": context, "message": message}),
        });
    }

    fn push_event(&self, event: MonitorEvent) {
        let mut state = self.state.lock().unwrap();
        let capacity = state.capacity;
        push_bounded(&mut state.history, event, capacity);
    }

    pub fn stats_for(&self, provider: ProviderTier) -> ProviderAggregate {
        let state = self.state.lock().unwrap();
        state.aggregated.get(&provider).cloned().unwrap_or_default()
    }

    pub fn all_stats(&self) -> HashMap<ProviderTier, ProviderAggregate> {
        self.state.lock().unwrap().aggregated.clone()
    }

    pub fn recent_history(&self, limit: usize) -> Vec<MonitorEvent> {
        let state = self.state.lock().unwrap();
        state.history.iter().rev().take(limit).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().unwrap().history.len()
    }

    /// Resets aggregates and history. Test-only per §5 ("aggregates... may be
    /// reset for tests only").
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.history.clear();
        state.aggregated.clear();
    }
}

fn push_bounded(history: &mut VecDeque<MonitorEvent>, event: MonitorEvent, capacity: usize) {
    if history.len() >= capacity {
        history.pop_front();
    }
    history.push_back(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_success_and_failure_counts() {
        let m = Monitor::new(10);
        m.track_provider_call("r1", ProviderTier::Cheap, "m1", TokenUsage::new(10, 5), 20, true, false, None);
        m.track_provider_call("r2", ProviderTier::Cheap, "m1", TokenUsage::new(10, 5), 20, false, true, Some("timeout"));

        let stats = m.stats_for(ProviderTier::Cheap);
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.total_tokens, 30);
    }

    #[test]
    fn history_is_bounded() {
        let m = Monitor::new(3);
        for i in 0..10 {
            m.track_error(&format!("r{i}"), "test", "boom");
        }
        assert_eq!(m.history_len(), 3);
        let recent = m.recent_history(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].request_id, "r9");
    }

    #[test]
    fn avg_latency_and_success_rate() {
        let agg = ProviderAggregate {
            requests: 4,
            successes: 3,
            failures: 1,
            total_tokens: 100,
            total_latency_ms: 400,
        };
        assert_eq!(agg.avg_latency_ms(), 100.0);
        assert_eq!(agg.success_rate(), 0.75);
    }
}
