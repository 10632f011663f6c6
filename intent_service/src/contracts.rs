use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form parameters attached to a dispatched command.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// Outcome of dispatching a single intent, returned by every handler in
/// [`crate::dispatcher`]. Mirrors the original's per-handler response shape;
/// `debug` carries non-user-facing diagnostics (which handler ran, match
/// score, etc.) for the Monitor and for tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentResult {
    pub ok: bool,
    pub message: String,
    pub user_visible_text: Option<String>,
    pub command_sent: bool,
    pub command_id: Option<Uuid>,
    pub debug: Option<String>,
}

impl IntentResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            user_visible_text: None,
            command_sent: false,
            command_id: None,
            debug: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            user_visible_text: None,
            command_sent: false,
            command_id: None,
            debug: None,
        }
    }

    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.user_visible_text = Some(text.into());
        self
    }

    pub fn with_command(mut self, command_id: Uuid) -> Self {
        self.command_sent = true;
        self.command_id = Some(command_id);
        self
    }

    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }
}

/// The fully resolved, post-dispatch record (§3.1) the intent service hands
/// back as `IntentResponse.parsed_command` — the bridge between "what the
/// model said" (`Intent`) and "what the system executed or tried to".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub request_id: String,
    pub device_id: Option<Uuid>,
    pub device_name: Option<String>,
    pub action: String,
    #[serde(default)]
    pub parameters: Parameters,
    pub can_execute: bool,
    pub error: Option<String>,
    pub provider_used: Option<String>,
    pub processing_time_ms: u64,
}

impl ParsedCommand {
    pub fn executable(
        request_id: impl Into<String>,
        device_id: Uuid,
        device_name: impl Into<String>,
        action: impl Into<String>,
        parameters: Parameters,
        provider_used: Option<String>,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            device_id: Some(device_id),
            device_name: Some(device_name.into()),
            action: action.into(),
            parameters,
            can_execute: true,
            error: None,
            provider_used,
            processing_time_ms,
        }
    }

    pub fn unexecutable(
        request_id: impl Into<String>,
        action: impl Into<String>,
        error: impl Into<String>,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            device_id: None,
            device_name: None,
            action: action.into(),
            parameters: Parameters::new(),
            can_execute: false,
            error: Some(error.into()),
            provider_used: None,
            processing_time_ms,
        }
    }
}

/// Wire envelope pushed to the WebSocket/bridge collaborator (§6). The
/// collaborator itself is outside the core; this crate only builds the
/// envelope and reports whatever the collaborator's `send` returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub device_id: Uuid,
    pub command_type: String,
    pub parameters: Option<Parameters>,
    pub command_id: Uuid,
    pub issued_at: String,
}

impl CommandEnvelope {
    pub fn new(device_id: Uuid, command_type: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            device_id,
            command_type: command_type.into(),
            parameters: if parameters.is_empty() { None } else { Some(parameters) },
            command_id: Uuid::new_v4(),
            issued_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Result of handing a [`CommandEnvelope`] to the dispatch collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub ok: bool,
    pub command_id: Uuid,
    pub error: Option<String>,
}

/// Abstraction over the device-dispatch collaborator (§6: "pushed via a
/// collaborator send function"). Kept as a trait so handler tests never
/// touch a real WebSocket.
#[async_trait::async_trait]
pub trait DeviceDispatcher: Send + Sync {
    async fn send(&self, envelope: CommandEnvelope) -> DispatchResult;
}

/// Narrow read/write calendar collaborator (§6: "out of scope" wire format,
/// but the intent service still needs a seam to call through). Handlers
/// treat every method as fallible-but-never-panicking; failures fold into
/// an `IntentResult::failed`.
#[async_trait::async_trait]
pub trait CalendarCollaborator: Send + Sync {
    async fn count_events(&self, date_range: Option<&str>) -> Result<usize, String>;
    async fn list_events(&self, date_range: Option<&str>) -> Result<Vec<String>, String>;
    async fn find_events(&self, search_term: &str, date_filter: Option<&str>) -> Result<Vec<String>, String>;
    async fn create_event(&self, title: &str, date: Option<&str>, time: Option<&str>) -> Result<String, String>;
    async fn edit_event(&self, selection: Option<u32>, changes: &Parameters) -> Result<String, String>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockDispatcher {
        pub fail: bool,
        pub sent: Mutex<Vec<CommandEnvelope>>,
    }

    #[async_trait::async_trait]
    impl DeviceDispatcher for MockDispatcher {
        async fn send(&self, envelope: CommandEnvelope) -> DispatchResult {
            let command_id = envelope.command_id;
            if self.fail {
                return DispatchResult { ok: false, command_id, error: Some("bridge unreachable".to_string()) };
            }
            self.sent.lock().unwrap().push(envelope);
            DispatchResult { ok: true, command_id, error: None }
        }
    }

    #[derive(Default)]
    pub struct MockCalendar {
        pub event_count: usize,
        pub events: Vec<String>,
    }

    #[async_trait::async_trait]
    impl CalendarCollaborator for MockCalendar {
        async fn count_events(&self, _date_range: Option<&str>) -> Result<usize, String> {
            Ok(self.event_count)
        }

        async fn list_events(&self, _date_range: Option<&str>) -> Result<Vec<String>, String> {
            Ok(self.events.clone())
        }

        async fn find_events(&self, search_term: &str, _date_filter: Option<&str>) -> Result<Vec<String>, String> {
            Ok(self.events.iter().filter(|e| e.to_lowercase().contains(&search_term.to_lowercase())).cloned().collect())
        }

        async fn create_event(&self, title: &str, _date: Option<&str>, _time: Option<&str>) -> Result<String, String> {
            Ok(format!("created '{title}'"))
        }

        async fn edit_event(&self, _selection: Option<u32>, _changes: &Parameters) -> Result<String, String> {
            Ok("updated".to_string())
        }
    }
}
