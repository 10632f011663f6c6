//! The public response envelope returned by [`crate::process`] (§6).

use intent_service::ParsedCommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `process()`'s return value. Never an exception: every failure mode in §7
/// folds into `ok=false` plus a `message`/`response` explaining why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    pub ok: bool,
    pub parsed_command: Option<ParsedCommand>,
    pub message: Option<String>,
    pub response: Option<String>,
    pub command_sent: bool,
    pub command_id: Option<Uuid>,
    pub debug: Option<String>,
}

impl IntentResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            parsed_command: None,
            message: Some(message.into()),
            response: None,
            command_sent: false,
            command_id: None,
            debug: None,
        }
    }
}
