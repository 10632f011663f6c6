//! Helpers for pulling typed pieces out of `process()`'s open `context` map
//! (§6): `devices`, the conversation block handed to the HTML generator, and
//! a best-effort device-name lookup for the compound generate-and-display
//! case (§4.C).

use common_types::DeviceInfo;
use serde_json::Value;

/// Deserializes `context.devices` into the device list the intent service's
/// device mapper needs. Missing or malformed entries are dropped rather than
/// failing the whole request — a bridge that reports one bad device shouldn't
/// take down device resolution for every other device.
pub fn extract_devices(context: Option<&Value>) -> Vec<DeviceInfo> {
    let Some(arr) = context.and_then(|c| c.get("devices")).and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    arr.iter().filter_map(|v| serde_json::from_value::<DeviceInfo>(v.clone()).ok()).collect()
}

/// Pulls `context.conversation` through unchanged for the HTML generator's
/// "conversation context" prompt section (§4.F).
pub fn extract_conversation(context: Option<&Value>) -> Option<Value> {
    context.and_then(|c| c.get("conversation")).cloned()
}

/// Best-effort device-name match for a request that doesn't carry an
/// explicit `device_name` field (the compound generate-and-display case):
/// returns the first device whose name appears in the utterance.
pub fn find_device_mentioned<'a>(text: &str, devices: &'a [DeviceInfo]) -> Option<&'a str> {
    let lower = text.to_lowercase();
    devices
        .iter()
        .find(|d| lower.contains(&d.device_name.to_lowercase()))
        .map(|d| d.device_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_devices_and_skips_malformed_entries() {
        let context = json!({
            "devices": [
                {"device_id": "11111111-1111-1111-1111-111111111111", "device_name": "Living Room TV", "device_type": "tv", "bridge_type": "ws", "online": true},
                {"not_a_device": true},
            ]
        });
        let devices = extract_devices(Some(&context));
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_name, "Living Room TV");
    }

    #[test]
    fn no_devices_key_returns_empty() {
        assert!(extract_devices(None).is_empty());
        assert!(extract_devices(Some(&json!({}))).is_empty());
    }

    #[test]
    fn finds_device_mentioned_in_text_case_insensitively() {
        let devices = vec![DeviceInfo {
            device_id: uuid::Uuid::new_v4(),
            device_name: "Living Room TV".to_string(),
            device_type: common_types::DeviceType::Tv,
            bridge_type: "ws".to_string(),
            capabilities: Vec::new(),
            online: true,
        }];
        assert_eq!(find_device_mentioned("show it on the living room tv", &devices), Some("Living Room TV"));
        assert_eq!(find_device_mentioned("show it somewhere", &devices), None);
    }
}
