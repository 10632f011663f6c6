use crate::action::Action;
use crate::dates::{infer_bare_value_kind, resolve_date_range};
use crate::extract::{detect_selection_index, extract_search_term};
use crate::intent::*;
use crate::prompts::{build_analysis_prompt, INTENT_SYSTEM_PROMPT};
use common_types::ProviderTier;
use monitor::Monitor;
use provider::{JsonRepairLoop, Provider};
use serde_json::Value;

/// Converts utterance + optional context into one typed [`Intent`] (4.D).
///
/// Calls the cheap provider for extraction and the cheap provider again as
/// the JSON-repair loop's diagnosis back-end. Never raises: provider
/// failures and malformed JSON both collapse to `Intent::Unknown` with
/// confidence 0 and a diagnostic reason.
pub struct IntentParser<'a> {
    provider: &'a dyn Provider,
    diagnosis_provider: &'a dyn Provider,
    json_repair_enabled: bool,
    json_repair_max_attempts: u32,
    monitor: Option<&'a Monitor>,
}

impl<'a> IntentParser<'a> {
    pub fn new(provider: &'a dyn Provider, diagnosis_provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            diagnosis_provider,
            json_repair_enabled: true,
            json_repair_max_attempts: 1,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: &'a Monitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_json_repair(mut self, enabled: bool, max_attempts: u32) -> Self {
        self.json_repair_enabled = enabled;
        self.json_repair_max_attempts = max_attempts;
        self
    }

    pub async fn parse(&self, request_id: &str, utterance: &str, context: Option<&Value>) -> Intent {
        if utterance.trim().is_empty() {
            return self.finish(request_id, Intent::unknown(utterance, "empty utterance"));
        }

        let repair = JsonRepairLoop::new(self.diagnosis_provider, self.json_repair_enabled, self.json_repair_max_attempts);
        let prompt = build_analysis_prompt(utterance, context);
        let parsed = repair
            .complete_json(self.provider, &prompt, Some(INTENT_SYSTEM_PROMPT), 0.2, Some(800))
            .await;

        let data = match parsed {
            Ok(v) => v,
            Err(e) => {
                return self.finish(request_id, Intent::unknown(utterance, format!("failed to parse: {e}")));
            }
        };

        let intent = self.create_intent(&data, utterance, context);
        self.finish(request_id, intent)
    }

    fn finish(&self, request_id: &str, intent: Intent) -> Intent {
        if let Some(m) = self.monitor {
            m.track_intent(request_id, intent.type_name(), intent.confidence());
        }
        intent
    }

    fn create_intent(&self, data: &Value, original_text: &str, context: Option<&Value>) -> Intent {
        let intent_type = str_field(data, "intent_type").unwrap_or("unknown");
        let confidence = f32_field(data, "confidence").unwrap_or(0.5).clamp(0.0, 1.0);
        let reasoning = str_field(data, "reasoning").map(str::to_string);

        match intent_type {
            "device_command" => self.create_device_command(data, original_text, confidence, reasoning),
            "device_query" => self.create_device_query(data, original_text, confidence, reasoning),
            "system_query" => self.create_system_query(data, original_text, confidence, reasoning),
            "calendar_query" => self.create_calendar_query(data, original_text, confidence, reasoning),
            "calendar_create" => self.create_calendar_create(data, original_text, confidence, reasoning, context),
            "calendar_edit" => self.create_calendar_edit(data, original_text, confidence, reasoning),
            "doc_query" => self.create_doc_query(data, original_text, confidence, reasoning),
            "display_content" => self.create_display_content(data, original_text, confidence, reasoning),
            "conversation" => self.create_conversation(data, original_text, confidence, reasoning),
            _ => Intent::unknown(original_text, reasoning.unwrap_or_else(|| format!("unrecognized intent_type '{intent_type}'"))),
        }
    }

    fn create_device_command(&self, data: &Value, original_text: &str, confidence: f32, reasoning: Option<String>) -> Intent {
        Intent::DeviceCommand(DeviceCommandIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            device_name: str_field(data, "device_name").unwrap_or_default().to_string(),
            action: str_field(data, "action").map(Action::from_raw),
            parameters: object_field(data, "parameters"),
            device_id: None,
            matched_device_name: None,
        })
    }

    fn create_device_query(&self, data: &Value, original_text: &str, confidence: f32, reasoning: Option<String>) -> Intent {
        Intent::DeviceQuery(DeviceQueryIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            device_name: str_field(data, "device_name").unwrap_or_default().to_string(),
            action: str_field(data, "action").map(Action::from_raw),
            device_id: None,
            matched_device_name: None,
        })
    }

    fn create_system_query(&self, data: &Value, original_text: &str, confidence: f32, reasoning: Option<String>) -> Intent {
        Intent::SystemQuery(SystemQueryIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            action: str_field(data, "action").map(Action::from_raw),
            parameters: object_field(data, "parameters"),
        })
    }

    fn create_calendar_query(&self, data: &Value, original_text: &str, confidence: f32, reasoning: Option<String>) -> Intent {
        let date_range = str_field(data, "date_range")
            .map(resolve_date_range)
            .or_else(|| extract_date_token_from_text(original_text));
        let search_term = str_field(data, "search_term")
            .map(|s| s.to_lowercase())
            .or_else(|| extract_search_term(original_text));

        Intent::CalendarQuery(CalendarQueryIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            action: str_field(data, "action").map(Action::from_raw),
            date_range,
            search_term,
        })
    }

    fn create_calendar_create(
        &self,
        data: &Value,
        original_text: &str,
        confidence: f32,
        reasoning: Option<String>,
        context: Option<&Value>,
    ) -> Intent {
        let action = str_field(data, "action").map(Action::from_raw);
        let mut edit_field = str_field(data, "edit_field").map(str::to_string);
        let edit_value = str_field(data, "edit_value").map(str::to_string);

        // Bare-value edit-field inference (4.D point 5): when the caller has a
        // pending create and the model supplied a value but no field, infer
        // the field from the value's shape.
        if matches!(action, Some(Action::EditPendingEvent)) && edit_field.is_none() {
            if let Some(value) = edit_value.as_deref().or(Some(original_text.trim())) {
                if has_pending_create(context) {
                    if let Some(kind) = infer_bare_value_kind(value) {
                        edit_field = Some(kind.edit_field().to_string());
                    }
                }
            }
        }

        Intent::CalendarCreate(CalendarCreateIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            action,
            title: str_field(data, "title").map(str::to_string),
            date: str_field(data, "date").map(|d| resolve_date_range(d)),
            time: str_field(data, "time").map(str::to_string),
            duration_minutes: u32_field(data, "duration_minutes"),
            location: str_field(data, "location").map(str::to_string),
            attendees: string_array_field(data, "attendees"),
            recurrence: str_field(data, "recurrence").map(str::to_string),
            doc_url: str_field(data, "doc_url").map(str::to_string),
            edit_field,
            edit_value,
        })
    }

    fn create_calendar_edit(&self, data: &Value, original_text: &str, confidence: f32, reasoning: Option<String>) -> Intent {
        let action = str_field(data, "action").map(Action::from_raw);
        let selection_index = u32_field(data, "selection_index").or_else(|| {
            if matches!(action, Some(Action::SelectEvent)) {
                detect_selection_index(original_text)
            } else {
                None
            }
        });
        let search_term = str_field(data, "search_term")
            .map(|s| s.to_lowercase())
            .or_else(|| extract_search_term(original_text));

        Intent::CalendarEdit(CalendarEditIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            action,
            search_term,
            date_filter: str_field(data, "date_filter").map(|d| resolve_date_range(d)),
            changes: object_field(data, "changes"),
            selection_index,
        })
    }

    fn create_doc_query(&self, data: &Value, original_text: &str, confidence: f32, reasoning: Option<String>) -> Intent {
        Intent::DocQuery(DocQueryIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            action: str_field(data, "action").map(Action::from_raw),
            doc_url: str_field(data, "doc_url").map(str::to_string),
            meeting_search: str_field(data, "meeting_search").map(str::to_string),
            also_display: bool_field(data, "also_display"),
            display_device: str_field(data, "display_device").map(str::to_string),
            device_name: str_field(data, "device_name").map(str::to_string),
        })
    }

    fn create_display_content(&self, data: &Value, original_text: &str, confidence: f32, reasoning: Option<String>) -> Intent {
        Intent::DisplayContent(DisplayContentIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            layout_hints: string_array_field(data, "layout_hints"),
            info_type: str_field(data, "info_type").map(str::to_string),
            request_text: original_text.to_string(),
            device_name: str_field(data, "device_name").map(str::to_string),
        })
    }

    fn create_conversation(&self, data: &Value, original_text: &str, confidence: f32, reasoning: Option<String>) -> Intent {
        Intent::Conversation(ConversationIntent {
            confidence,
            original_text: original_text.to_string(),
            reasoning,
            action: str_field(data, "action").map(Action::from_raw),
            response_hint: str_field(data, "response_hint").map(str::to_string),
        })
    }
}

/// `true` when `context.pending_operation.pending_op_type == "create"`.
fn has_pending_create(context: Option<&Value>) -> bool {
    context
        .and_then(|c| c.get("pending_operation"))
        .and_then(|p| p.get("pending_op_type"))
        .and_then(|v| v.as_str())
        .map(|t| t == "create")
        .unwrap_or(false)
}

/// Best-effort fallback when the model omits `date_range`: look for a bare
/// `today`/`tomorrow` token in the raw utterance.
fn extract_date_token_from_text(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    if lower.contains("tomorrow") {
        Some(resolve_date_range("tomorrow"))
    } else if lower.contains("today") {
        Some(resolve_date_range("today"))
    } else if lower.contains("this week") {
        Some("this_week".to_string())
    } else {
        None
    }
}

fn str_field<'v>(data: &'v Value, key: &str) -> Option<&'v str> {
    data.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

fn f32_field(data: &Value, key: &str) -> Option<f32> {
    data.get(key).and_then(|v| v.as_f64()).map(|f| f as f32)
}

fn u32_field(data: &Value, key: &str) -> Option<u32> {
    data.get(key).and_then(|v| {
        if let Some(n) = v.as_u64() {
            Some(n as u32)
        } else {
            v.as_str().and_then(|s| s.parse().ok())
        }
    })
}

fn bool_field(data: &Value, key: &str) -> bool {
    data.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn object_field(data: &Value, key: &str) -> serde_json::Map<String, Value> {
    data.get(key).and_then(|v| v.as_object()).cloned().unwrap_or_default()
}

fn string_array_field(data: &Value, key: &str) -> Vec<String> {
    data.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Default diagnosis-provider tier used when the caller doesn't supply one
/// explicitly: always the cheap tier, regardless of which tier served the
/// original request (4.A).
pub const DIAGNOSIS_TIER: ProviderTier = ProviderTier::Cheap;

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::ProviderTier;
    use provider::MockProvider;

    #[tokio::test]
    async fn empty_utterance_returns_unknown_with_zero_confidence() {
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, "{}");
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let parser = IntentParser::new(&provider, &diag);
        let intent = parser.parse("r1", "", None).await;
        assert_eq!(intent.type_name(), "unknown");
        assert_eq!(intent.confidence(), 0.0);
    }

    #[tokio::test]
    async fn provider_failure_returns_unknown() {
        let provider = MockProvider::failing(ProviderTier::Cheap);
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let parser = IntentParser::new(&provider, &diag);
        let intent = parser.parse("r1", "turn on the tv", None).await;
        assert_eq!(intent.type_name(), "unknown");
        assert_eq!(intent.confidence(), 0.0);
    }

    #[tokio::test]
    async fn device_command_maps_action_and_device_name() {
        let response = r#"{"intent_type":"device_command","confidence":0.92,"device_name":"living room TV","action":"power_on"}"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let parser = IntentParser::new(&provider, &diag);
        let intent = parser.parse("r1", "Turn on the living room TV", None).await;
        match intent {
            Intent::DeviceCommand(d) => {
                assert_eq!(d.device_name, "living room TV");
                assert_eq!(d.action, Some(Action::PowerOn));
                assert!(d.confidence >= 0.9);
            }
            other => panic!("expected device_command, got {:?}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn unknown_action_string_collapses_to_status() {
        let response = r#"{"intent_type":"device_query","device_name":"tv","action":"do_a_backflip","confidence":0.4}"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let parser = IntentParser::new(&provider, &diag);
        let intent = parser.parse("r1", "whatever", None).await;
        match intent {
            Intent::DeviceQuery(d) => assert_eq!(d.action, Some(Action::Status)),
            other => panic!("expected device_query, got {:?}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn calendar_query_resolves_date_and_search_term_fallback() {
        let response = r#"{"intent_type":"calendar_query","action":"find_event","confidence":0.8}"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let parser = IntentParser::new(&provider, &diag);
        let intent = parser.parse("r1", "when is my birthday?", None).await;
        match intent {
            Intent::CalendarQuery(c) => {
                assert_eq!(c.search_term.as_deref(), Some("birthday"));
            }
            other => panic!("expected calendar_query, got {:?}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn bare_value_edit_field_inferred_with_pending_create() {
        let response = r#"{"intent_type":"calendar_create","action":"edit_pending_event","edit_value":"3pm","confidence":0.85}"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let parser = IntentParser::new(&provider, &diag);
        let context = serde_json::json!({"pending_operation": {"pending_op_type": "create", "timestamp": "2026-07-28T00:00:00Z"}});
        let intent = parser.parse("r1", "3pm", Some(&context)).await;
        match intent {
            Intent::CalendarCreate(c) => assert_eq!(c.edit_field.as_deref(), Some("event_time")),
            other => panic!("expected calendar_create, got {:?}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn selection_index_detected_for_select_event() {
        let response = r#"{"intent_type":"calendar_edit","action":"select_event","confidence":0.7}"#;
        let provider = MockProvider::with_fixed_response(ProviderTier::Cheap, response);
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "n/a");
        let parser = IntentParser::new(&provider, &diag);
        let intent = parser.parse("r1", "the first one", None).await;
        match intent {
            Intent::CalendarEdit(c) => assert_eq!(c.selection_index, Some(1)),
            other => panic!("expected calendar_edit, got {:?}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn malformed_json_repairs_then_succeeds() {
        let provider = MockProvider::with_sequence(
            ProviderTier::Cheap,
            vec![
                r#"{"intent_type":"conversation" "action":"greeting","confidence":0.99}"#.to_string(),
                r#"{"intent_type":"conversation","action":"greeting","confidence":0.99}"#.to_string(),
            ],
        );
        let diag = MockProvider::with_fixed_response(ProviderTier::Cheap, "missing comma");
        let parser = IntentParser::new(&provider, &diag);
        let intent = parser.parse("r1", "hello!", None).await;
        match intent {
            Intent::Conversation(c) => assert_eq!(c.action, Some(Action::Greeting)),
            other => panic!("expected conversation, got {:?}", other.type_name()),
        }
    }
}
