use crate::action::Action;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-controlled display/bridge device as referenced by the parser.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceCommandIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    pub device_name: String,
    pub action: Option<Action>,
    #[serde(default)]
    pub parameters: Parameters,
    pub device_id: Option<Uuid>,
    pub matched_device_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceQueryIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    pub device_name: String,
    pub action: Option<Action>,
    pub device_id: Option<Uuid>,
    pub matched_device_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemQueryIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    pub action: Option<Action>,
    #[serde(default)]
    pub parameters: Parameters,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarQueryIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    pub action: Option<Action>,
    pub date_range: Option<String>,
    pub search_term: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarCreateIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    pub action: Option<Action>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub recurrence: Option<String>,
    pub doc_url: Option<String>,
    /// Set only for `edit_pending_event`: which field of the pending event
    /// to overwrite (`event_time`, `event_date`, `duration_minutes`, `location`,
    /// `event_title`, `recurrence`, `doc_url`).
    pub edit_field: Option<String>,
    pub edit_value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarEditIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    pub action: Option<Action>,
    pub search_term: Option<String>,
    pub date_filter: Option<String>,
    #[serde(default)]
    pub changes: Parameters,
    pub selection_index: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocQueryIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    pub action: Option<Action>,
    pub doc_url: Option<String>,
    pub meeting_search: Option<String>,
    #[serde(default)]
    pub also_display: bool,
    pub display_device: Option<String>,
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayContentIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    #[serde(default)]
    pub layout_hints: Vec<String>,
    pub info_type: Option<String>,
    pub request_text: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
    pub action: Option<Action>,
    pub response_hint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnknownIntent {
    pub confidence: f32,
    pub original_text: String,
    pub reasoning: Option<String>,
}

/// Tagged sum over every intent the parser can produce (§3). Unlike the
/// dynamic dataclass hierarchy it is grounded on, this is a closed enum:
/// there is no `isinstance` check downstream, only a `match`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "intent_type", rename_all = "snake_case")]
pub enum Intent {
    DeviceCommand(DeviceCommandIntent),
    DeviceQuery(DeviceQueryIntent),
    SystemQuery(SystemQueryIntent),
    CalendarQuery(CalendarQueryIntent),
    CalendarCreate(CalendarCreateIntent),
    CalendarEdit(CalendarEditIntent),
    DocQuery(DocQueryIntent),
    DisplayContent(DisplayContentIntent),
    Conversation(ConversationIntent),
    Unknown(UnknownIntent),
}

impl Intent {
    pub fn confidence(&self) -> f32 {
        match self {
            Intent::DeviceCommand(i) => i.confidence,
            Intent::DeviceQuery(i) => i.confidence,
            Intent::SystemQuery(i) => i.confidence,
            Intent::CalendarQuery(i) => i.confidence,
            Intent::CalendarCreate(i) => i.confidence,
            Intent::CalendarEdit(i) => i.confidence,
            Intent::DocQuery(i) => i.confidence,
            Intent::DisplayContent(i) => i.confidence,
            Intent::Conversation(i) => i.confidence,
            Intent::Unknown(i) => i.confidence,
        }
    }

    pub fn original_text(&self) -> &str {
        match self {
            Intent::DeviceCommand(i) => &i.original_text,
            Intent::DeviceQuery(i) => &i.original_text,
            Intent::SystemQuery(i) => &i.original_text,
            Intent::CalendarQuery(i) => &i.original_text,
            Intent::CalendarCreate(i) => &i.original_text,
            Intent::CalendarEdit(i) => &i.original_text,
            Intent::DocQuery(i) => &i.original_text,
            Intent::DisplayContent(i) => &i.original_text,
            Intent::Conversation(i) => &i.original_text,
            Intent::Unknown(i) => &i.original_text,
        }
    }

    /// Label used in monitor events and logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Intent::DeviceCommand(_) => "device_command",
            Intent::DeviceQuery(_) => "device_query",
            Intent::SystemQuery(_) => "system_query",
            Intent::CalendarQuery(_) => "calendar_query",
            Intent::CalendarCreate(_) => "calendar_create",
            Intent::CalendarEdit(_) => "calendar_edit",
            Intent::DocQuery(_) => "doc_query",
            Intent::DisplayContent(_) => "display_content",
            Intent::Conversation(_) => "conversation",
            Intent::Unknown(_) => "unknown",
        }
    }

    pub fn unknown(original_text: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Intent::Unknown(UnknownIntent {
            confidence: 0.0,
            original_text: original_text.into(),
            reasoning: Some(reasoning.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_preserves_variant_action_and_confidence() {
        let intent = Intent::DeviceCommand(DeviceCommandIntent {
            confidence: 0.87654321,
            original_text: "turn on the tv".to_string(),
            reasoning: Some("direct command".to_string()),
            device_name: "tv".to_string(),
            action: Some(Action::PowerOn),
            parameters: Parameters::new(),
            device_id: None,
            matched_device_name: None,
        });

        let json = serde_json::to_string(&intent).unwrap();
        let restored: Intent = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.type_name(), intent.type_name());
        assert!((restored.confidence() - intent.confidence()).abs() < 1e-9);
        match restored {
            Intent::DeviceCommand(d) => assert_eq!(d.action, Some(Action::PowerOn)),
            _ => panic!("wrong variant after round trip"),
        }
    }

    #[test]
    fn unknown_has_zero_confidence() {
        let intent = Intent::unknown("", "empty utterance");
        assert_eq!(intent.confidence(), 0.0);
        assert_eq!(intent.type_name(), "unknown");
    }
}
