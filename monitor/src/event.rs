use chrono::{DateTime, Utc};
use common_types::ProviderTier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ProviderCall,
    Intent,
    Routing,
    Command,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warn,
    Error,
}

/// One entry in the Monitor's bounded history ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub kind: EventKind,
    pub severity: EventSeverity,
    pub provider: Option<ProviderTier>,
    pub detail: serde_json::Value,
}
