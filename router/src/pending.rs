//! Pending-operation resolution (4.C): a prior turn's create/edit/delete
//! flow awaiting confirmation forces the next ambiguous utterance into the
//! corresponding sub-action rather than a brand-new intent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOpType {
    Create,
    Edit,
    Delete,
}

impl PendingOpType {
    fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "create" => Some(PendingOpType::Create),
            "edit" => Some(PendingOpType::Edit),
            "delete" => Some(PendingOpType::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOperation {
    pub pending_op_type: PendingOpType,
    pub timestamp: DateTime<Utc>,
}

/// Resolves the single pending operation that should govern disambiguation
/// of the current utterance.
///
/// `context.pending_operation` may be a single object or an array of
/// candidates (one per in-flight flow). When more than one candidate is
/// present, the **most recent by timestamp** wins, unless `explicit_phrasing`
/// names a type ("confirm the create", "cancel the edit") that overrides the
/// recency rule.
pub fn resolve_pending_operation(context: Option<&Value>, explicit_phrasing: Option<&str>) -> Option<PendingOperation> {
    let raw = context?.get("pending_operation")?;

    let candidates: Vec<PendingOperation> = if raw.is_array() {
        raw.as_array()?
            .iter()
            .filter_map(parse_pending_operation)
            .collect()
    } else {
        parse_pending_operation(raw).into_iter().collect()
    };

    if candidates.is_empty() {
        return None;
    }

    if let Some(phrase) = explicit_phrasing {
        if let Some(explicit_type) = infer_explicit_type(phrase) {
            if let Some(matching) = candidates.iter().find(|c| c.pending_op_type == explicit_type) {
                return Some(matching.clone());
            }
        }
    }

    candidates.into_iter().max_by_key(|c| c.timestamp)
}

fn parse_pending_operation(value: &Value) -> Option<PendingOperation> {
    let op_type = value.get("pending_op_type")?.as_str().and_then(PendingOpType::from_raw)?;
    let timestamp = value
        .get("timestamp")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    Some(PendingOperation {
        pending_op_type: op_type,
        timestamp,
    })
}

fn infer_explicit_type(phrase: &str) -> Option<PendingOpType> {
    let lower = phrase.to_lowercase();
    if lower.contains("create") {
        Some(PendingOpType::Create)
    } else if lower.contains("edit") {
        Some(PendingOpType::Edit)
    } else if lower.contains("delete") {
        Some(PendingOpType::Delete)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_pending_operation_returns_none() {
        assert!(resolve_pending_operation(None, None).is_none());
        let ctx = json!({});
        assert!(resolve_pending_operation(Some(&ctx), None).is_none());
    }

    #[test]
    fn single_pending_operation_resolves_directly() {
        let ctx = json!({"pending_operation": {"pending_op_type": "create", "timestamp": "2026-07-28T00:00:00Z"}});
        let resolved = resolve_pending_operation(Some(&ctx), None).unwrap();
        assert_eq!(resolved.pending_op_type, PendingOpType::Create);
    }

    #[test]
    fn most_recent_by_timestamp_wins_among_candidates() {
        let ctx = json!({"pending_operation": [
            {"pending_op_type": "create", "timestamp": "2026-07-28T00:00:00Z"},
            {"pending_op_type": "edit", "timestamp": "2026-07-28T01:00:00Z"},
        ]});
        let resolved = resolve_pending_operation(Some(&ctx), None).unwrap();
        assert_eq!(resolved.pending_op_type, PendingOpType::Edit);
    }

    #[test]
    fn explicit_phrasing_overrides_recency() {
        let ctx = json!({"pending_operation": [
            {"pending_op_type": "create", "timestamp": "2026-07-28T00:00:00Z"},
            {"pending_op_type": "edit", "timestamp": "2026-07-28T01:00:00Z"},
        ]});
        let resolved = resolve_pending_operation(Some(&ctx), Some("confirm the create")).unwrap();
        assert_eq!(resolved.pending_op_type, PendingOpType::Create);
    }
}
