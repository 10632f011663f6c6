//! Intent extraction & disambiguation (4.D): converts an utterance plus
//! optional conversational context into one of a closed taxonomy of typed
//! intents with confidence, resolving relative dates, bare-value edit
//! fields, selection ordinals, and search terms along the way.

mod action;
mod dates;
mod extract;
mod intent;
mod parser;
mod prompts;

pub use action::Action;
pub use dates::{infer_bare_value_kind, is_iso_date, resolve_date_range, BareValueKind};
pub use extract::{detect_selection_index, extract_search_term};
pub use intent::{
    CalendarCreateIntent, CalendarEditIntent, CalendarQueryIntent, ConversationIntent, DeviceCommandIntent,
    DeviceQueryIntent, DisplayContentIntent, DocQueryIntent, Intent, Parameters, SystemQueryIntent, UnknownIntent,
};
pub use parser::{IntentParser, DIAGNOSIS_TIER};
pub use prompts::{build_analysis_prompt, INTENT_SYSTEM_PROMPT, INTENT_PROMPT_VERSION};
