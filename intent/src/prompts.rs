//! Intent-extraction prompt text. Prompt text is data, not code (§9): it is
//! shipped as a versioned constant and tests only assert it contains the
//! expected anchors, never match it verbatim.

pub const INTENT_PROMPT_VERSION: u32 = 1;

/// System prompt enumerating the closed intent taxonomy, the action
/// vocabulary, and the pending-operation disambiguation rules.
pub const INTENT_SYSTEM_PROMPT: &str = r#"You are the intent parser for a smart-display control system.

Extract one structured intent as JSON from the user's utterance. Always
respond with a single JSON object, no markdown fences, no prose.

intent_type is one of: device_command, device_query, system_query,
calendar_query, calendar_create, calendar_edit, doc_query, display_content,
conversation, unknown.

Every intent carries: confidence (0-1), original_text, reasoning (short).

device_command / device_query require device_name and action. Actions:
power_on, power_off, set_input, volume_up, volume_down, volume_set, mute,
unmute, show_content, show_calendar, clear_content, status, capabilities,
is_online.

system_query carries action in {list_devices, help, capabilities} and no
device_name.

calendar_query answers QUESTIONS (count_events, next_event, list_events,
find_event) with date_range (today/tomorrow/this_week/YYYY-MM-DD) and an
optional search_term.

calendar_create covers new-event requests: create_event, confirm_create,
cancel_create, edit_pending_event. When a pending_operation of type
"create" is present in context, ambiguous replies ("yes", "3pm", "make it
weekly") resolve here, never to calendar_edit. edit_pending_event carries
edit_field (event_time, event_date, duration_minutes, location,
event_title, recurrence, doc_url) and edit_value.

calendar_edit covers edit_existing_event, delete_existing_event,
select_event, confirm_edit, confirm_delete, cancel_edit for an
already-existing event. Resolve "from X to Y" phrasing by keeping Y only.

doc_query covers link_doc, open_doc, read_doc, summarize_meeting_doc,
create_event_from_doc, with doc_url and/or meeting_search. Set
also_display=true and display_device when the user also wants the result
shown on a screen.

display_content covers creative/dashboard/interactive layout requests
(display_scene, refresh_display) with layout_hints and info_type.

conversation covers greeting, thanks, question, and any affirmative or
negative reply with no pending_operation in context.

If nothing fits, or the utterance is empty, return unknown with
confidence 0."#;

/// Builds the per-request analysis prompt: the utterance plus an optional
/// JSON-serialized context blob (devices, pending operation, resolved
/// references, conversation history).
pub fn build_analysis_prompt(utterance: &str, context: Option<&serde_json::Value>) -> String {
    match context {
        Some(ctx) if !ctx.is_null() => {
            format!("Utterance: {utterance}\n\nContext:\n{ctx}")
        }
        _ => format!("Utterance: {utterance}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_every_intent_type() {
        for anchor in [
            "device_command",
            "device_query",
            "system_query",
            "calendar_query",
            "calendar_create",
            "calendar_edit",
            "doc_query",
            "display_content",
            "conversation",
            "unknown",
        ] {
            assert!(INTENT_SYSTEM_PROMPT.contains(anchor), "missing anchor: {anchor}");
        }
    }

    #[test]
    fn analysis_prompt_includes_utterance() {
        let p = build_analysis_prompt("turn on the tv", None);
        assert!(p.contains("turn on the tv"));
    }
}
