use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device categories surfaced by the bridge layer. Unknown device types collapse to
/// `Unknown` rather than failing deserialization — the core never refuses a command
/// just because a bridge reports a type it doesn't recognize yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Tv,
    Speaker,
    Display,
    Light,
    Thermostat,
    Sensor,
    #[serde(other)]
    Unknown,
}

/// Static description of a device as reported by the bridge/collaborator, supplied
/// to the core via `process()`'s `context.devices` and consumed by the device mapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: Uuid,
    pub device_name: String,
    pub device_type: DeviceType,
    pub bridge_type: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub online: bool,
}

/// Live state snapshot for a device, as reported by the bridge on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: Uuid,
    pub device_name: Option<String>,
    pub device_type: DeviceType,
    pub state: serde_json::Value,
    pub bridge_type: String,
    pub online: bool,
}
