//! Top-level orchestrator (§2 data flow: Router -> Parser -> Intent Service,
//! with the custom-layout pipeline invoked from inside the intent service
//! for creative display requests).
//!
//! Every collaborator is constructed once at process start and passed in
//! explicitly (§9: "global singletons ... constructed once during process
//! start and passed explicitly as collaborators; no module-level mutable
//! state apart from the Monitor's guarded ring").

use crate::compound;
use crate::config::Config;
use crate::context::{extract_conversation, extract_devices, find_device_mentioned};
use crate::response::IntentResponse;
use common_types::ProviderTier;
use html_generator::GenerationContext;
use intent::{DisplayContentIntent, Intent, IntentParser};
use intent_service::{CalendarCollaborator, DeviceDispatcher, IntentDispatcher, IntentResult, ParsedCommand};
use monitor::Monitor;
use pipeline::{CustomLayoutPipeline, PipelineConfig};
use provider::{CompletionOptions, Provider};
use router::Router;
use sandbox_validator::{PageHandle, SandboxConfig};
use serde_json::Value;
use std::time::Instant;

/// Everything `process()` needs: the shared config/monitor plus the three
/// provider-tier collaborators. Built once at startup and borrowed for the
/// lifetime of every request.
pub struct Orchestrator<'a> {
    config: &'a Config,
    monitor: &'a Monitor,
    cheap: &'a dyn Provider,
    coder: &'a dyn Provider,
    reasoner: &'a dyn Provider,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, monitor: &'a Monitor, cheap: &'a dyn Provider, coder: &'a dyn Provider, reasoner: &'a dyn Provider) -> Self {
        Self { config, monitor, cheap, coder, reasoner }
    }

    fn provider_for(&self, tier: ProviderTier) -> &'a dyn Provider {
        match tier {
            ProviderTier::Cheap => self.cheap,
            ProviderTier::Coder => self.coder,
            ProviderTier::Reasoner => self.reasoner,
        }
    }

    fn sandbox_config(&self) -> SandboxConfig {
        let t = &self.config.thresholds;
        SandboxConfig {
            viewport_width: t.viewport_width,
            viewport_height: t.viewport_height,
            visual_change_threshold: t.visual_change_threshold as f64,
            element_threshold: 0.30,
            blank_page_threshold: t.blank_page_threshold as f64,
            min_responsive_ratio: t.min_responsive_ratio as f64,
            modal_open_threshold: t.modal_open_threshold as f64,
            max_cascade_depth: t.max_cascade_depth as u8,
            max_cascade_elements: t.max_cascade_elements as usize,
            max_inputs_to_test: t.max_inputs_to_test as usize,
            stabilization_ms: t.stabilization_ms,
            interaction_timeout_ms: t.interaction_timeout_ms,
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_repair_cycles: self.config.thresholds.max_repair_cycles,
            acceptance_score: self.config.thresholds.acceptance_score,
            html_repair_enabled: self.config.flags.html_repair_enabled,
            custom_layout_validation_enabled: self.config.flags.custom_layout_validation_enabled,
        }
    }

    /// The single inbound entry point (§6): converts an utterance plus
    /// open-ended context into a typed, never-raising [`IntentResponse`].
    ///
    /// `user_id` is carried through only for request-scoped logging; nothing
    /// in the dispatch path currently branches on caller identity.
    ///
    /// `page` is the caller's headless-browser handle for this request, used
    /// only when the intent turns out to need the custom-layout pipeline
    /// (§7 error kind 5: when `page` is `None` or disabled by config, a
    /// `DisplayContent` request fails gracefully rather than panicking).
    #[allow(clippy::too_many_arguments)]
    pub async fn process(
        &self,
        request_id: &str,
        text: &str,
        user_id: Option<&str>,
        context: Option<&Value>,
        bridge: &dyn DeviceDispatcher,
        calendar: &dyn CalendarCollaborator,
        page: Option<&dyn PageHandle>,
    ) -> IntentResponse {
        let start = Instant::now();
        tracing::info!(request_id, user_id = user_id.unwrap_or("unknown"), "processing request");

        let router = Router::new(self.cheap).with_monitor(self.monitor);
        let decision = router.analyze(request_id, text, context).await;

        let parser = IntentParser::new(self.cheap, self.cheap)
            .with_monitor(self.monitor)
            .with_json_repair(self.config.flags.json_repair_enabled, self.config.json_repair_max_attempts);
        let intent = parser.parse(request_id, text, context).await;

        let devices = extract_devices(context);
        let pipeline = self.build_pipeline(page.is_some());
        let mut dispatcher = IntentDispatcher::new(&devices, bridge, calendar).with_monitor(self.monitor);
        if let Some(p) = &pipeline {
            dispatcher = dispatcher.with_pipeline(p);
        }

        let result = dispatcher.dispatch(request_id, &intent, page, context).await;
        let result = self
            .maybe_synthesize_display(request_id, &intent, result, &devices, context, &dispatcher, page, decision.target_provider)
            .await;

        if !result.ok {
            self.monitor.track_error(request_id, intent.type_name(), &result.message);
        }

        self.to_response(request_id, &intent, result, start.elapsed().as_millis() as u64)
    }

    fn build_pipeline(&self, have_page: bool) -> Option<CustomLayoutPipeline<'a>> {
        if !have_page || !self.config.flags.custom_layout_enabled {
            return None;
        }
        Some(
            CustomLayoutPipeline::new(self.reasoner, self.coder, self.reasoner)
                .with_monitor(self.monitor)
                .with_sandbox_config(self.sandbox_config())
                .with_config(self.pipeline_config()),
        )
    }

    /// Generate-and-display compound requests (§4.C): a `Conversation` intent
    /// whose text asks to both produce something and put it on a screen gets
    /// a synthesized follow-up `DisplayContent` intent carrying the generated
    /// text, dispatched through the same collaborators.
    async fn maybe_synthesize_display<'b>(
        &self,
        request_id: &str,
        intent: &Intent,
        result: IntentResult,
        devices: &[common_types::DeviceInfo],
        context: Option<&Value>,
        dispatcher: &IntentDispatcher<'b>,
        page: Option<&dyn PageHandle>,
        target_tier: ProviderTier,
    ) -> IntentResult {
        let Intent::Conversation(conv) = intent else {
            return result;
        };
        if !compound::wants_auto_display(&conv.original_text) {
            return result;
        }
        let Some(page) = page else {
            return result;
        };

        let generated = match result.user_visible_text.clone().filter(|t| !t.is_empty()) {
            Some(text) => text,
            None => {
                let provider = self.provider_for(target_tier);
                let options = CompletionOptions::default();
                let response = provider
                    .complete(&conv.original_text, Some("Produce the content the user asked for."), 0.7, Some(2000), &options)
                    .await;
                if !response.ok {
                    return result;
                }
                response.content
            }
        };

        let device_name = find_device_mentioned(&conv.original_text, devices).map(str::to_string);
        let display_intent = Intent::DisplayContent(DisplayContentIntent {
            confidence: conv.confidence,
            original_text: conv.original_text.clone(),
            reasoning: Some("synthesized from a generate-and-display compound request".to_string()),
            layout_hints: Vec::new(),
            info_type: None,
            request_text: generated,
            device_name,
        });

        let display_result = dispatcher.dispatch(request_id, &display_intent, Some(page), context).await;

        IntentResult {
            ok: result.ok && display_result.ok,
            message: format!("{}; {}", result.message, display_result.message),
            user_visible_text: result.user_visible_text.or(display_result.user_visible_text),
            command_sent: display_result.command_sent,
            command_id: display_result.command_id,
            debug: display_result.debug,
        }
    }

    fn to_response(&self, request_id: &str, intent: &Intent, result: IntentResult, processing_time_ms: u64) -> IntentResponse {
        let provider_used = Some(intent.type_name().to_string());
        let parsed_command = match intent {
            Intent::DeviceCommand(i) => Some(ParsedCommand {
                request_id: request_id.to_string(),
                device_id: i.device_id,
                device_name: Some(i.device_name.clone()),
                action: i.action.map(|a| a.as_str().to_string()).unwrap_or_default(),
                parameters: i.parameters.clone(),
                can_execute: result.command_sent,
                error: if result.ok { None } else { Some(result.message.clone()) },
                provider_used,
                processing_time_ms,
            }),
            _ => None,
        };

        IntentResponse {
            ok: result.ok,
            parsed_command,
            message: Some(result.message),
            response: result.user_visible_text,
            command_sent: result.command_sent,
            command_id: result.command_id,
            debug: result.debug,
        }
    }
}

/// Builds the conversation-context-aware [`GenerationContext`] the pipeline
/// needs from a `DisplayContent` intent plus the request's raw context map.
/// Exposed so callers that invoke the pipeline directly (outside
/// `Orchestrator::process`, e.g. a human-feedback admin tool) can build the
/// same context the dispatcher would.
pub fn generation_context(intent: &DisplayContentIntent, context: Option<&Value>) -> GenerationContext {
    let mut ctx = GenerationContext::new(intent.request_text.clone());
    if let Some(info_type) = &intent.info_type {
        ctx.info_type = info_type.clone();
    } else {
        ctx.info_type = html_generator::infer_info_type(&intent.request_text).to_string();
    }
    ctx.layout_hints = intent.layout_hints.clone();
    ctx.conversation = extract_conversation(context);
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::{DeviceInfo, DeviceType};
    use intent_service::mock::{MockCalendar, MockDispatcher};
    use provider::MockProvider;
    use sandbox_validator::MockPage;
    use uuid::Uuid;

    fn device(name: &str) -> DeviceInfo {
        DeviceInfo {
            device_id: Uuid::new_v4(),
            device_name: name.to_string(),
            device_type: DeviceType::Tv,
            bridge_type: "test".to_string(),
            capabilities: Vec::new(),
            online: true,
        }
    }

    #[tokio::test]
    async fn device_command_end_to_end() {
        let config = Config::from_env();
        let monitor = Monitor::default();
        let routing_response = r#"{"complexity":"simple","is_device_command":true,"confidence":0.95,"reasoning":"direct command"}"#;
        let intent_response = r#"{"intent_type":"device_command","confidence":0.9,"device_name":"Living Room TV","action":"power_on"}"#;
        let cheap = MockProvider::with_sequence(ProviderTier::Cheap, vec![routing_response.to_string(), intent_response.to_string()]);
        let coder = MockProvider::with_fixed_response(ProviderTier::Coder, "{}");
        let reasoner = MockProvider::with_fixed_response(ProviderTier::Reasoner, "{}");
        let orchestrator = Orchestrator::new(&config, &monitor, &cheap, &coder, &reasoner);

        let context = serde_json::json!({"devices": [
            {"device_id": Uuid::new_v4().to_string(), "device_name": "Living Room TV", "device_type": "tv", "bridge_type": "ws", "online": true}
        ]});
        let bridge = MockDispatcher::default();
        let calendar = MockCalendar::default();

        let response = orchestrator.process("r1", "turn on the living room TV", None, Some(&context), &bridge, &calendar, None).await;
        assert!(response.ok);
        assert!(response.command_sent);
        assert_eq!(bridge.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn calendar_count_query_end_to_end() {
        let config = Config::from_env();
        let monitor = Monitor::default();
        let routing_response = r#"{"complexity":"simple","is_device_command":false,"confidence":0.9,"reasoning":"calendar query"}"#;
        let intent_response = r#"{"intent_type":"calendar_query","action":"count_events","confidence":0.9,"date_range":"today"}"#;
        let cheap = MockProvider::with_sequence(ProviderTier::Cheap, vec![routing_response.to_string(), intent_response.to_string()]);
        let coder = MockProvider::with_fixed_response(ProviderTier::Coder, "{}");
        let reasoner = MockProvider::with_fixed_response(ProviderTier::Reasoner, "{}");
        let orchestrator = Orchestrator::new(&config, &monitor, &cheap, &coder, &reasoner);

        let bridge = MockDispatcher::default();
        let calendar = intent_service::mock::MockCalendar { event_count: 2, events: Vec::new() };

        let response = orchestrator.process("r1", "how many events do I have today?", None, None, &bridge, &calendar, None).await;
        assert!(response.ok);
        assert!(response.response.unwrap().contains('2'));
    }

    #[tokio::test]
    async fn classifier_failure_still_produces_a_response_never_panics() {
        let config = Config::from_env();
        let monitor = Monitor::default();
        let cheap = MockProvider::failing(ProviderTier::Cheap);
        let coder = MockProvider::with_fixed_response(ProviderTier::Coder, "{}");
        let reasoner = MockProvider::with_fixed_response(ProviderTier::Reasoner, "{}");
        let orchestrator = Orchestrator::new(&config, &monitor, &cheap, &coder, &reasoner);

        let bridge = MockDispatcher::default();
        let calendar = MockCalendar::default();
        let response = orchestrator.process("r1", "turn on the tv", None, None, &bridge, &calendar, None).await;
        assert!(!response.ok);
    }

    #[tokio::test]
    async fn display_content_without_page_fails_gracefully() {
        let config = Config::from_env();
        let monitor = Monitor::default();
        let routing_response = r#"{"complexity":"simple","is_device_command":true,"confidence":0.9,"reasoning":"display"}"#;
        let intent_response = r#"{"intent_type":"display_content","confidence":0.9,"info_type":"trivia"}"#;
        let cheap = MockProvider::with_sequence(ProviderTier::Cheap, vec![routing_response.to_string(), intent_response.to_string()]);
        let coder = MockProvider::with_fixed_response(ProviderTier::Coder, "{}");
        let reasoner = MockProvider::with_fixed_response(ProviderTier::Reasoner, "{}");
        let orchestrator = Orchestrator::new(&config, &monitor, &cheap, &coder, &reasoner);

        let bridge = MockDispatcher::default();
        let calendar = MockCalendar::default();
        let response = orchestrator.process("r1", "show me trivia about world capitals", None, None, &bridge, &calendar, None).await;
        assert!(!response.ok);
    }

    #[tokio::test]
    async fn display_content_with_page_runs_the_pipeline() {
        let config = Config::from_env();
        let monitor = Monitor::default();
        let routing_response = r#"{"complexity":"simple","is_device_command":true,"confidence":0.9,"reasoning":"display"}"#;
        let intent_response =
            r#"{"intent_type":"display_content","confidence":0.9,"info_type":"trivia","device_name":"Living Room TV"}"#;
        let valid_doc = "<!DOCTYPE html><html><head></head><body><button data-action=\"go\">Go</button></body></html>";
        let cheap = MockProvider::with_sequence(ProviderTier::Cheap, vec![routing_response.to_string(), intent_response.to_string()]);
        let coder = MockProvider::with_fixed_response(ProviderTier::Coder, "{}");
        let reasoner = MockProvider::with_fixed_response(ProviderTier::Reasoner, valid_doc);
        let orchestrator = Orchestrator::new(&config, &monitor, &cheap, &coder, &reasoner);

        let context = serde_json::json!({"devices": [
            {"device_id": Uuid::new_v4().to_string(), "device_name": "Living Room TV", "device_type": "tv", "bridge_type": "ws", "online": true}
        ]});
        let bridge = MockDispatcher::default();
        let calendar = MockCalendar::default();
        let page = MockPage::default();
        page.push_eval(serde_json::json!(true)); // phase1 has_content
        page.push_screenshot(checkerboard_png()); // phase2 snapshot
        page.push_eval(serde_json::json!({ "viewport": {"width": 1920, "height": 1080}, "nodes": [] })); // phase3 scene graph

        let response = orchestrator.process("r1", "show trivia on the living room TV", None, Some(&context), &bridge, &calendar, Some(&page)).await;
        assert!(response.ok);
        assert!(response.command_sent);
    }

    fn checkerboard_png() -> Vec<u8> {
        let mut buf = image::GrayImage::new(16, 16);
        for (x, y, px) in buf.enumerate_pixels_mut() {
            *px = image::Luma([if (x + y) % 2 == 0 { 10 } else { 240 }]);
        }
        let mut out = Vec::new();
        image::DynamicImage::ImageLuma8(buf)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }
}
