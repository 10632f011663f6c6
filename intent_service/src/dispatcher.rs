//! Pure dispatcher over every [`Intent`] variant (4.E, sketched in the
//! original). Each handler returns an [`IntentResult`]; device-bound intents
//! additionally resolve a device name via [`crate::device_mapper`] and
//! dispatch a [`CommandEnvelope`] through the [`DeviceDispatcher`]
//! collaborator. `DisplayContent` and the generate-and-display compound case
//! invoke the custom-layout pipeline (4.J).

use crate::contracts::{CommandEnvelope, IntentResult, Parameters};
use crate::device_mapper::{self, DeviceMatch};
use common_types::DeviceInfo;
use intent::{Action, Intent};
use monitor::Monitor;
use pipeline::CustomLayoutPipeline;
use sandbox_validator::PageHandle;
use html_generator::GenerationContext;

use crate::contracts::{CalendarCollaborator, DeviceDispatcher};

pub struct IntentDispatcher<'a> {
    devices: &'a [DeviceInfo],
    bridge: &'a dyn DeviceDispatcher,
    calendar: &'a dyn CalendarCollaborator,
    pipeline: Option<&'a CustomLayoutPipeline<'a>>,
    monitor: Option<&'a Monitor>,
}

impl<'a> IntentDispatcher<'a> {
    pub fn new(devices: &'a [DeviceInfo], bridge: &'a dyn DeviceDispatcher, calendar: &'a dyn CalendarCollaborator) -> Self {
        Self { devices, bridge, calendar, pipeline: None, monitor: None }
    }

    pub fn with_pipeline(mut self, pipeline: &'a CustomLayoutPipeline<'a>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_monitor(mut self, monitor: &'a Monitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Dispatches `intent`, routing `DisplayContent` through the
    /// custom-layout pipeline when `page` is available. `page` is `None` in
    /// contexts that never render (e.g. a headless device-control-only
    /// deployment); such a request fails gracefully rather than panicking.
    /// `context` is `process()`'s raw context map, forwarded unchanged so the
    /// generator can pick up its "CONVERSATION CONTEXT" section (4.F).
    pub async fn dispatch(&self, request_id: &str, intent: &Intent, page: Option<&dyn PageHandle>, context: Option<&serde_json::Value>) -> IntentResult {
        let result = match intent {
            Intent::DeviceCommand(i) => self.device_command(i).await,
            Intent::DeviceQuery(i) => self.device_query(i).await,
            Intent::SystemQuery(i) => self.system_query(i),
            Intent::CalendarQuery(i) => self.calendar_query(i).await,
            Intent::CalendarCreate(i) => self.calendar_create(i).await,
            Intent::CalendarEdit(i) => self.calendar_edit(i).await,
            Intent::DocQuery(i) => self.doc_query(i),
            Intent::DisplayContent(i) => self.display_content(request_id, i, page, context).await,
            Intent::Conversation(i) => self.conversation(i),
            Intent::Unknown(i) => self.unknown(i),
        };

        if let (Some(m), true) = (self.monitor, result.command_sent) {
            m.track_command(request_id, intent.type_name(), &result.command_id.map(|id| id.to_string()).unwrap_or_default(), result.ok);
        }
        result
    }

    async fn device_command(&self, i: &intent::DeviceCommandIntent) -> IntentResult {
        let device = match device_mapper::resolve(&i.device_name, self.devices) {
            DeviceMatch::Resolved(d, _) => d,
            other => {
                let msg = device_mapper::clarification_message(&i.device_name, &other);
                return IntentResult::failed(msg.clone()).with_response(msg);
            }
        };

        let action = i.action.unwrap_or(Action::Status);
        let envelope = CommandEnvelope::new(device.device_id, action.as_str(), i.parameters.clone());
        let command_id = envelope.command_id;
        let dispatch = self.bridge.send(envelope).await;

        if dispatch.ok {
            IntentResult::ok(format!("sent {} to {}", action, device.device_name)).with_command(command_id)
        } else {
            IntentResult::failed(dispatch.error.unwrap_or_else(|| "device dispatch failed".to_string()))
        }
    }

    async fn device_query(&self, i: &intent::DeviceQueryIntent) -> IntentResult {
        let device = match device_mapper::resolve(&i.device_name, self.devices) {
            DeviceMatch::Resolved(d, _) => d,
            other => {
                let msg = device_mapper::clarification_message(&i.device_name, &other);
                return IntentResult::failed(msg.clone()).with_response(msg);
            }
        };

        let action = i.action.unwrap_or(Action::Status);
        let envelope = CommandEnvelope::new(device.device_id, action.as_str(), Parameters::new());
        let command_id = envelope.command_id;
        let dispatch = self.bridge.send(envelope).await;

        if dispatch.ok {
            let text = format!("{} is {}", device.device_name, if device.online { "online" } else { "offline" });
            IntentResult::ok(text.clone()).with_response(text).with_command(command_id)
        } else {
            IntentResult::failed(dispatch.error.unwrap_or_else(|| "device query failed".to_string()))
        }
    }

    fn system_query(&self, i: &intent::SystemQueryIntent) -> IntentResult {
        let action = i.action.unwrap_or(Action::Status);
        let text = match action {
            Action::ListDevices => {
                let names: Vec<&str> = self.devices.iter().map(|d| d.device_name.as_str()).collect();
                if names.is_empty() {
                    "I don't see any devices right now.".to_string()
                } else {
                    format!("Available devices: {}", names.join(", "))
                }
            }
            Action::Help => "I can control devices, check your calendar, or put something on screen.".to_string(),
            _ => format!("System is running ({action})."),
        };
        IntentResult::ok(text.clone()).with_response(text)
    }

    async fn calendar_query(&self, i: &intent::CalendarQueryIntent) -> IntentResult {
        let action = i.action.unwrap_or(Action::CountEvents);
        let outcome = match action {
            Action::CountEvents | Action::NextEvent => self.calendar.count_events(i.date_range.as_deref()).await.map(|n| match action {
                Action::NextEvent if n == 0 => "You have no upcoming events.".to_string(),
                _ => format!("You have {n} event(s)."),
            }),
            Action::ListEvents => self.calendar.list_events(i.date_range.as_deref()).await.map(|events| {
                if events.is_empty() {
                    "You have no events.".to_string()
                } else {
                    format!("Your events: {}", events.join(", "))
                }
            }),
            Action::FindEvent => {
                let term = i.search_term.clone().unwrap_or_default();
                self.calendar.find_events(&term, i.date_range.as_deref()).await.map(|events| {
                    if events.is_empty() {
                        format!("I couldn't find any events matching '{term}'.")
                    } else {
                        format!("Found: {}", events.join(", "))
                    }
                })
            }
            _ => Ok("I'm not sure what you want to know about your calendar.".to_string()),
        };

        match outcome {
            Ok(text) => IntentResult::ok(text.clone()).with_response(text),
            Err(e) => IntentResult::failed(e),
        }
    }

    async fn calendar_create(&self, i: &intent::CalendarCreateIntent) -> IntentResult {
        let action = i.action.unwrap_or(Action::CreateEvent);
        match action {
            Action::CreateEvent => {
                let title = i.title.clone().unwrap_or_else(|| "New event".to_string());
                match self.calendar.create_event(&title, i.date.as_deref(), i.time.as_deref()).await {
                    Ok(msg) => IntentResult::ok(msg.clone()).with_response(msg),
                    Err(e) => IntentResult::failed(e),
                }
            }
            Action::ConfirmCreate => IntentResult::ok("Event confirmed.").with_response("Event confirmed."),
            Action::CancelCreate => IntentResult::ok("Okay, I cancelled that.").with_response("Okay, I cancelled that."),
            Action::EditPendingEvent => {
                let field = i.edit_field.clone().unwrap_or_default();
                let value = i.edit_value.clone().unwrap_or_default();
                let text = format!("Updated {field} to {value}.");
                IntentResult::ok(text.clone()).with_response(text)
            }
            _ => IntentResult::failed("unsupported calendar-create action"),
        }
    }

    async fn calendar_edit(&self, i: &intent::CalendarEditIntent) -> IntentResult {
        let action = i.action.unwrap_or(Action::EditExistingEvent);
        match action {
            Action::EditExistingEvent | Action::SelectEvent => match self.calendar.edit_event(i.selection_index, &i.changes).await {
                Ok(msg) => IntentResult::ok(msg.clone()).with_response(msg),
                Err(e) => IntentResult::failed(e),
            },
            Action::DeleteExistingEvent => IntentResult::ok("Event deleted.").with_response("Event deleted."),
            Action::ConfirmEdit | Action::ConfirmDelete => IntentResult::ok("Confirmed.").with_response("Confirmed."),
            Action::CancelEdit => IntentResult::ok("Okay, leaving it as is.").with_response("Okay, leaving it as is."),
            _ => IntentResult::failed("unsupported calendar-edit action"),
        }
    }

    fn doc_query(&self, i: &intent::DocQueryIntent) -> IntentResult {
        let action = i.action.unwrap_or(Action::ReadDoc);
        let text = match (action, &i.doc_url, &i.meeting_search) {
            (Action::LinkDoc, Some(url), _) => format!("Here's the document link: {url}"),
            (Action::OpenDoc, Some(url), _) => format!("Opening {url}."),
            (Action::SummarizeMeetingDoc, _, Some(search)) => format!("Summarizing the doc for '{search}'."),
            _ => "I couldn't find a document matching that request.".to_string(),
        };
        IntentResult::ok(text.clone()).with_response(text)
    }

    /// DisplayContent handler (4.E/4.J): invokes the custom-layout pipeline
    /// and, when a target device is named, dispatches the generated HTML as
    /// a device command payload.
    async fn display_content(
        &self,
        request_id: &str,
        i: &intent::DisplayContentIntent,
        page: Option<&dyn PageHandle>,
        context: Option<&serde_json::Value>,
    ) -> IntentResult {
        let (Some(pipeline), Some(page)) = (self.pipeline, page) else {
            return IntentResult::failed("custom layout generation is unavailable in this context");
        };

        let mut ctx = GenerationContext::new(i.request_text.clone());
        if let Some(info_type) = &i.info_type {
            ctx.info_type = info_type.clone();
        }
        ctx.layout_hints = i.layout_hints.clone();
        ctx.conversation = context.and_then(|c| c.get("conversation")).cloned();

        let static_layout = is_static_info_type(i.info_type.as_deref());
        let result = pipeline.run(request_id, page, &ctx, static_layout).await;
        if !result.ok {
            return IntentResult::failed(result.error.unwrap_or_else(|| "layout generation failed".to_string()));
        }
        let html = result.html.unwrap_or_default();

        let Some(device_name) = &i.device_name else {
            return IntentResult::ok("Generated the layout.").with_debug(format!("score={:.2}", result.final_score));
        };

        let device = match device_mapper::resolve(device_name, self.devices) {
            DeviceMatch::Resolved(d, _) => d,
            other => {
                let msg = device_mapper::clarification_message(device_name, &other);
                return IntentResult::failed(msg.clone()).with_response(msg);
            }
        };

        let mut params = Parameters::new();
        params.insert("html".to_string(), serde_json::Value::String(html));
        let envelope = CommandEnvelope::new(device.device_id, Action::DisplayScene.as_str(), params);
        let command_id = envelope.command_id;
        let dispatch = self.bridge.send(envelope).await;

        if dispatch.ok {
            IntentResult::ok(format!("Displaying it on {}.", device.device_name))
                .with_command(command_id)
                .with_debug(format!("score={:.2}", result.final_score))
        } else {
            IntentResult::failed(dispatch.error.unwrap_or_else(|| "device dispatch failed".to_string()))
        }
    }

    fn conversation(&self, i: &intent::ConversationIntent) -> IntentResult {
        let text = i.response_hint.clone().unwrap_or_else(|| "Got it.".to_string());
        IntentResult::ok(text.clone()).with_response(text)
    }

    fn unknown(&self, i: &intent::UnknownIntent) -> IntentResult {
        let text = "I'm not sure what you're asking for — could you rephrase that?".to_string();
        IntentResult::failed(text.clone()).with_response(text).with_debug(i.reasoning.clone().unwrap_or_default())
    }
}

/// Content types with nothing to click or type are declared static (4.J:
/// "skips Phase 5 interaction testing, declared by the caller per content
/// type") rather than inferred from the generated markup.
fn is_static_info_type(info_type: Option<&str>) -> bool {
    matches!(info_type, Some("clock") | Some("weather") | Some("calendar_summary") | Some("photo") | Some("quote"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::mock::{MockCalendar, MockDispatcher};
    use common_types::DeviceType;
    use intent::{DeviceCommandIntent, UnknownIntent};
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
    async fn device_command_resolves_and_dispatches() {
        let devices = vec![device("Living Room TV")];
        let bridge = MockDispatcher::default();
        let calendar = MockCalendar::default();
        let dispatcher = IntentDispatcher::new(&devices, &bridge, &calendar);

        let intent = Intent::DeviceCommand(DeviceCommandIntent {
            confidence: 0.9,
            original_text: "turn on the tv".to_string(),
            reasoning: None,
            device_name: "living room tv".to_string(),
            action: Some(Action::PowerOn),
            parameters: Default::default(),
            device_id: None,
            matched_device_name: None,
        });

        let result = dispatcher.dispatch("r1", &intent, None, None).await;
        assert!(result.ok);
        assert!(result.command_sent);
        assert_eq!(bridge.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn device_command_ambiguous_name_asks_for_clarification() {
        let devices = vec![device("Living Room TV"), device("Bedroom TV")];
        let bridge = MockDispatcher::default();
        let calendar = MockCalendar::default();
        let dispatcher = IntentDispatcher::new(&devices, &bridge, &calendar);

        let intent = Intent::DeviceCommand(DeviceCommandIntent {
            confidence: 0.9,
            original_text: "turn on the tv".to_string(),
            reasoning: None,
            device_name: "tv".to_string(),
            action: Some(Action::PowerOn),
            parameters: Default::default(),
            device_id: None,
            matched_device_name: None,
        });

        let result = dispatcher.dispatch("r1", &intent, None, None).await;
        assert!(!result.ok);
        assert!(result.message.contains("more than one device"));
    }

    #[tokio::test]
    async fn calendar_query_counts_events() {
        let devices: Vec<DeviceInfo> = Vec::new();
        let bridge = MockDispatcher::default();
        let calendar = MockCalendar { event_count: 2, events: Vec::new() };
        let dispatcher = IntentDispatcher::new(&devices, &bridge, &calendar);

        let intent = Intent::CalendarQuery(intent::CalendarQueryIntent {
            confidence: 0.9,
            original_text: "how many events today".to_string(),
            reasoning: None,
            action: Some(Action::CountEvents),
            date_range: Some("2026-07-29".to_string()),
            search_term: None,
        });

        let result = dispatcher.dispatch("r1", &intent, None, None).await;
        assert!(result.ok);
        assert!(result.user_visible_text.unwrap().contains('2'));
    }

    #[tokio::test]
    async fn display_content_without_page_fails_gracefully() {
        let devices: Vec<DeviceInfo> = Vec::new();
        let bridge = MockDispatcher::default();
        let calendar = MockCalendar::default();
        let dispatcher = IntentDispatcher::new(&devices, &bridge, &calendar);

        let intent = Intent::DisplayContent(intent::DisplayContentIntent {
            confidence: 0.9,
            original_text: "show trivia".to_string(),
            reasoning: None,
            layout_hints: Vec::new(),
            info_type: Some("trivia".to_string()),
            request_text: "show trivia".to_string(),
            device_name: None,
        });

        let result = dispatcher.dispatch("r1", &intent, None, None).await;
        assert!(!result.ok);
    }

    #[tokio::test]
    async fn unknown_intent_asks_to_rephrase() {
        let devices: Vec<DeviceInfo> = Vec::new();
        let bridge = MockDispatcher::default();
        let calendar = MockCalendar::default();
        let dispatcher = IntentDispatcher::new(&devices, &bridge, &calendar);

        let intent = Intent::Unknown(UnknownIntent { confidence: 0.0, original_text: "asdf".to_string(), reasoning: None });
        let result = dispatcher.dispatch("r1", &intent, None, None).await;
        assert!(!result.ok);
        assert!(result.user_visible_text.unwrap().contains("rephrase"));
    }
}
