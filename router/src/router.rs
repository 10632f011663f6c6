use crate::decision::{Complexity, RoutingDecision};
use crate::prompts::{build_routing_prompt, ROUTING_SYSTEM_PROMPT};
use monitor::Monitor;
use provider::{JsonRepairLoop, Provider};
use serde_json::Value;

/// Two-stage routing decision maker (4.C). Always calls the cheap tier to
/// classify, then hands the full request to whichever tier the classifier
/// names. Never raises: classifier failure degrades to
/// [`RoutingDecision::fallback`].
pub struct Router<'a> {
    classifier: &'a dyn Provider,
    json_repair_enabled: bool,
    json_repair_max_attempts: u32,
    monitor: Option<&'a Monitor>,
}

impl<'a> Router<'a> {
    pub fn new(classifier: &'a dyn Provider) -> Self {
        Self {
            classifier,
            json_repair_enabled: true,
            json_repair_max_attempts: 1,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: &'a Monitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Analyzes a request and decides how to route it (4.C).
    pub async fn analyze(&self, request_id: &str, request: &str, context: Option<&Value>) -> RoutingDecision {
        let repair = JsonRepairLoop::new(self.classifier, self.json_repair_enabled, self.json_repair_max_attempts);
        let prompt = build_routing_prompt(request, context);

        let parsed = repair
            .complete_json(self.classifier, &prompt, Some(ROUTING_SYSTEM_PROMPT), 0.1, Some(300))
            .await;

        let decision = match parsed {
            Ok(data) => self.decision_from_json(&data),
            Err(_) => RoutingDecision::fallback("analysis failed, defaulting to cheap"),
        };

        if let Some(m) = self.monitor {
            m.track_routing(request_id, complexity_label(decision.complexity), decision.target_provider, decision.confidence);
        }
        decision
    }

    fn decision_from_json(&self, data: &Value) -> RoutingDecision {
        let complexity = data
            .get("complexity")
            .and_then(|v| v.as_str())
            .map(Complexity::from_raw)
            .unwrap_or(Complexity::Simple);
        let confidence = data
            .get("confidence")
            .and_then(|v| v.as_f64())
            .map(|f| f as f32)
            .unwrap_or(0.8)
            .clamp(0.0, 1.0);
        let reasoning = data
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let is_device_command = data.get("is_device_command").and_then(|v| v.as_bool()).unwrap_or(false);
        let should_respond_directly = data
            .get("should_respond_directly")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        RoutingDecision {
            target_provider: complexity.target_provider(),
            complexity,
            reasoning,
            confidence,
            is_device_command,
            should_respond_directly,
        }
    }
}

fn complexity_label(c: Complexity) -> &'static str {
    match c {
        Complexity::Simple => "simple",
        Complexity::ComplexExecution => "complex_execution",
        Complexity::ComplexReasoning => "complex_reasoning",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::ProviderTier;
    use provider::MockProvider;

    #[tokio::test]
    async fn classifier_failure_defaults_to_simple_cheap_half_confidence() {
        let classifier = MockProvider::failing(ProviderTier::Cheap);
        let router = Router::new(&classifier);
        let decision = router.analyze("r1", "turn on the tv", None).await;
        assert_eq!(decision.complexity, Complexity::Simple);
        assert_eq!(decision.target_provider, ProviderTier::Cheap);
        assert_eq!(decision.confidence, 0.5);
    }

    #[tokio::test]
    async fn maps_complex_reasoning_to_reasoner_tier() {
        let response = r#"{"complexity":"complex_reasoning","is_device_command":false,"should_respond_directly":true,"confidence":0.9,"reasoning":"planning request"}"#;
        let classifier = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let router = Router::new(&classifier);
        let decision = router.analyze("r1", "plan a movie night setup", None).await;
        assert_eq!(decision.complexity, Complexity::ComplexReasoning);
        assert_eq!(decision.target_provider, ProviderTier::Reasoner);
        assert!(decision.should_respond_directly);
    }

    #[tokio::test]
    async fn maps_complex_execution_to_coder_tier() {
        let response = r#"{"complexity":"complex_execution","is_device_command":false,"confidence":0.85,"reasoning":"code gen"}"#;
        let classifier = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let router = Router::new(&classifier);
        let decision = router.analyze("r1", "write a script to do X", None).await;
        assert_eq!(decision.target_provider, ProviderTier::Coder);
    }

    #[tokio::test]
    async fn simple_device_command_routes_to_cheap() {
        let response = r#"{"complexity":"simple","is_device_command":true,"confidence":0.95,"reasoning":"direct command"}"#;
        let classifier = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let router = Router::new(&classifier);
        let decision = router.analyze("r1", "turn on the living room TV", None).await;
        assert_eq!(decision.target_provider, ProviderTier::Cheap);
        assert!(decision.is_device_command);
    }
}
