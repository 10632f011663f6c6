use serde::{Deserialize, Serialize};

/// Closed action vocabulary shared by every intent variant that carries one.
/// Unknown strings collapse to [`Action::Status`] per the mapping table (4.D
/// point 2) rather than failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // Power
    PowerOn,
    PowerOff,
    // Input / volume
    SetInput,
    VolumeUp,
    VolumeDown,
    VolumeSet,
    Mute,
    Unmute,
    // Content display
    ShowContent,
    ShowCalendar,
    ClearContent,
    // Device/system queries
    Status,
    Capabilities,
    IsOnline,
    ListDevices,
    Help,
    // Conversation
    Greeting,
    Thanks,
    Question,
    // Calendar query
    CountEvents,
    NextEvent,
    ListEvents,
    FindEvent,
    // Calendar create
    CreateEvent,
    ConfirmCreate,
    CancelCreate,
    EditPendingEvent,
    // Calendar edit
    EditExistingEvent,
    DeleteExistingEvent,
    SelectEvent,
    ConfirmEdit,
    ConfirmDelete,
    CancelEdit,
    // Doc query
    LinkDoc,
    OpenDoc,
    ReadDoc,
    SummarizeMeetingDoc,
    CreateEventFromDoc,
    // Display content
    DisplayScene,
    RefreshDisplay,
}

impl Action {
    /// Maps a raw action string from a model response to the closed enum.
    /// Unrecognized values collapse to [`Action::Status`] (4.D point 2).
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "power_on" => Action::PowerOn,
            "power_off" => Action::PowerOff,
            "set_input" => Action::SetInput,
            "volume_up" => Action::VolumeUp,
            "volume_down" => Action::VolumeDown,
            "volume_set" => Action::VolumeSet,
            "mute" => Action::Mute,
            "unmute" => Action::Unmute,
            "show_content" => Action::ShowContent,
            "show_calendar" => Action::ShowCalendar,
            "clear_content" => Action::ClearContent,
            "status" => Action::Status,
            "capabilities" => Action::Capabilities,
            "is_online" => Action::IsOnline,
            "list_devices" => Action::ListDevices,
            "help" => Action::Help,
            "greeting" => Action::Greeting,
            "thanks" => Action::Thanks,
            "question" => Action::Question,
            "count_events" => Action::CountEvents,
            "next_event" => Action::NextEvent,
            "list_events" => Action::ListEvents,
            "find_event" => Action::FindEvent,
            "create_event" => Action::CreateEvent,
            "confirm_create" => Action::ConfirmCreate,
            "cancel_create" => Action::CancelCreate,
            "edit_pending_event" => Action::EditPendingEvent,
            "edit_existing_event" => Action::EditExistingEvent,
            "delete_existing_event" => Action::DeleteExistingEvent,
            "select_event" => Action::SelectEvent,
            "confirm_edit" => Action::ConfirmEdit,
            "confirm_delete" => Action::ConfirmDelete,
            "cancel_edit" => Action::CancelEdit,
            "link_doc" => Action::LinkDoc,
            "open_doc" => Action::OpenDoc,
            "read_doc" => Action::ReadDoc,
            "summarize_meeting_doc" => Action::SummarizeMeetingDoc,
            "create_event_from_doc" => Action::CreateEventFromDoc,
            "display_scene" => Action::DisplayScene,
            "refresh_display" => Action::RefreshDisplay,
            _ => Action::Status,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::PowerOn => "power_on",
            Action::PowerOff => "power_off",
            Action::SetInput => "set_input",
            Action::VolumeUp => "volume_up",
            Action::VolumeDown => "volume_down",
            Action::VolumeSet => "volume_set",
            Action::Mute => "mute",
            Action::Unmute => "unmute",
            Action::ShowContent => "show_content",
            Action::ShowCalendar => "show_calendar",
            Action::ClearContent => "clear_content",
            Action::Status => "status",
            Action::Capabilities => "capabilities",
            Action::IsOnline => "is_online",
            Action::ListDevices => "list_devices",
            Action::Help => "help",
            Action::Greeting => "greeting",
            Action::Thanks => "thanks",
            Action::Question => "question",
            Action::CountEvents => "count_events",
            Action::NextEvent => "next_event",
            Action::ListEvents => "list_events",
            Action::FindEvent => "find_event",
            Action::CreateEvent => "create_event",
            Action::ConfirmCreate => "confirm_create",
            Action::CancelCreate => "cancel_create",
            Action::EditPendingEvent => "edit_pending_event",
            Action::EditExistingEvent => "edit_existing_event",
            Action::DeleteExistingEvent => "delete_existing_event",
            Action::SelectEvent => "select_event",
            Action::ConfirmEdit => "confirm_edit",
            Action::ConfirmDelete => "confirm_delete",
            Action::CancelEdit => "cancel_edit",
            Action::LinkDoc => "link_doc",
            Action::OpenDoc => "open_doc",
            Action::ReadDoc => "read_doc",
            Action::SummarizeMeetingDoc => "summarize_meeting_doc",
            Action::CreateEventFromDoc => "create_event_from_doc",
            Action::DisplayScene => "display_scene",
            Action::RefreshDisplay => "refresh_display",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_action_collapses_to_status() {
        assert_eq!(Action::from_raw("teleport"), Action::Status);
        assert_eq!(Action::from_raw(""), Action::Status);
    }

    #[test]
    fn round_trips_through_str() {
        for a in [Action::PowerOn, Action::EditExistingEvent, Action::CreateEventFromDoc, Action::DisplayScene] {
            assert_eq!(Action::from_raw(a.as_str()), a);
        }
    }
}
