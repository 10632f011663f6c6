//! Relative-date resolution and bare-value type inference (4.D points 3 and 5).

use chrono::{Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_12H: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\d{1,2}(:\d{2})?\s*(am|pm)$").unwrap());
static TIME_24H: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}$").unwrap());
static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\d+(\.\d+)?\s*(minute|minutes|min|hour|hours|hr|hrs)s?$").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://\S+$").unwrap());

/// Resolves a raw `date_range` token to an ISO date where possible.
/// `today`/`tomorrow` are computed against the current UTC date; `this_week`
/// and other open-ended tokens pass through unchanged; already-ISO values
/// pass through unchanged.
pub fn resolve_date_range(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    match lower.as_str() {
        "today" => Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        "tomorrow" => (Utc::now().date_naive() + Duration::days(1))
            .format("%Y-%m-%d")
            .to_string(),
        _ if ISO_DATE.is_match(&lower) => lower,
        _ => raw.trim().to_string(),
    }
}

/// Attempts to parse `YYYY-MM-DD`; used to validate that a resolved date range
/// is a real calendar date rather than an opaque token like `this_week`.
pub fn is_iso_date(s: &str) -> bool {
    ISO_DATE.is_match(s) && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Bare-value edit field a raw user value should target, by shape (4.D point 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BareValueKind {
    Time,
    Date,
    Duration,
    DocUrl,
}

/// Infers which edit field a bare value (no explicit "change X to" framing)
/// should target, purely from its shape. Returns `None` when the value
/// matches none of the known shapes, so the caller can fall back to treating
/// it as free text.
pub fn infer_bare_value_kind(value: &str) -> Option<BareValueKind> {
    let trimmed = value.trim();
    if URL.is_match(trimmed) {
        return Some(BareValueKind::DocUrl);
    }
    if TIME_12H.is_match(trimmed) || TIME_24H.is_match(trimmed) {
        return Some(BareValueKind::Time);
    }
    if DURATION.is_match(trimmed) {
        return Some(BareValueKind::Duration);
    }
    if ISO_DATE.is_match(trimmed) || is_weekday_or_relative_date(trimmed) {
        return Some(BareValueKind::Date);
    }
    None
}

fn is_weekday_or_relative_date(value: &str) -> bool {
    const TOKENS: &[&str] = &[
        "today", "tomorrow", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    ];
    let lower = value.to_lowercase();
    TOKENS.iter().any(|t| lower.contains(t))
}

impl BareValueKind {
    pub fn edit_field(&self) -> &'static str {
        match self {
            BareValueKind::Time => "event_time",
            BareValueKind::Date => "event_date",
            BareValueKind::Duration => "duration_minutes",
            BareValueKind::DocUrl => "doc_url",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_today_and_tomorrow_to_iso() {
        assert!(is_iso_date(&resolve_date_range("today")));
        assert!(is_iso_date(&resolve_date_range("tomorrow")));
    }

    #[test]
    fn passes_through_open_ended_tokens() {
        assert_eq!(resolve_date_range("this_week"), "this_week");
    }

    #[test]
    fn passes_through_explicit_iso() {
        assert_eq!(resolve_date_range("2025-12-11"), "2025-12-11");
    }

    #[test]
    fn infers_bare_value_kinds() {
        assert_eq!(infer_bare_value_kind("3pm"), Some(BareValueKind::Time));
        assert_eq!(infer_bare_value_kind("15:00"), Some(BareValueKind::Time));
        assert_eq!(infer_bare_value_kind("2 hours"), Some(BareValueKind::Duration));
        assert_eq!(infer_bare_value_kind("30 minutes"), Some(BareValueKind::Duration));
        assert_eq!(infer_bare_value_kind("tomorrow"), Some(BareValueKind::Date));
        assert_eq!(infer_bare_value_kind("2025-12-11"), Some(BareValueKind::Date));
        assert_eq!(
            infer_bare_value_kind("https://docs.google.com/document/d/abc"),
            Some(BareValueKind::DocUrl)
        );
        assert_eq!(infer_bare_value_kind("Conference Room A"), None);
    }

    #[test]
    fn edit_field_mapping() {
        assert_eq!(BareValueKind::Time.edit_field(), "event_time");
        assert_eq!(BareValueKind::Date.edit_field(), "event_date");
        assert_eq!(BareValueKind::Duration.edit_field(), "duration_minutes");
        assert_eq!(BareValueKind::DocUrl.edit_field(), "doc_url");
    }
}
