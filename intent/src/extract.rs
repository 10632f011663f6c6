//! Search-term extraction and selection-ordinal detection (4.D points 4 and 6).

use once_cell::sync::Lazy;
use regex::Regex;

static SEARCH_PROBES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)when\s+is\s+my\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i)find\s+my\s+(.+?)\s*\??$").unwrap(),
        Regex::new(r"(?i)any\s+(.+?)\s+(?:today|tomorrow)\s*\??$").unwrap(),
        Regex::new(r"(?i)show\s+my\s+(.+?)\s*\??$").unwrap(),
    ]
});

/// Extracts a search term from free text via the ordered regex probes
/// ("when is my X", "find my X", "any X today/tomorrow", "show my X").
/// Returns `None` when no probe matches.
pub fn extract_search_term(text: &str) -> Option<String> {
    for probe in SEARCH_PROBES.iter() {
        if let Some(caps) = probe.captures(text) {
            if let Some(m) = caps.get(1) {
                let term = m.as_str().trim();
                if !term.is_empty() {
                    return Some(term.to_lowercase());
                }
            }
        }
    }
    None
}

static ORDINAL_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)\b").unwrap()
});
static NUMBER_PHRASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:number|option)\s+(\d+)\b").unwrap());
static ORDINAL_ABBR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)(st|nd|rd|th)\b").unwrap());
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*$").unwrap());

const ORDINAL_WORDS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

/// Detects a 1-based selection index from phrasing like "the first one",
/// "number 2", "1st", or a bare "3". Returns `None` when no selection
/// reference is present.
pub fn detect_selection_index(text: &str) -> Option<u32> {
    let lower = text.trim().to_lowercase();

    if let Some(caps) = ORDINAL_WORD.captures(&lower) {
        let word = caps.get(1).unwrap().as_str();
        if let Some(pos) = ORDINAL_WORDS.iter().position(|w| *w == word) {
            return Some((pos + 1) as u32);
        }
    }
    if let Some(caps) = NUMBER_PHRASE.captures(&lower) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = ORDINAL_ABBR.captures(&lower) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = BARE_NUMBER.captures(&lower) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_search_terms() {
        assert_eq!(extract_search_term("when is my birthday?"), Some("birthday".to_string()));
        assert_eq!(extract_search_term("find my dentist appointment"), Some("dentist appointment".to_string()));
        assert_eq!(extract_search_term("any meetings today?"), Some("meetings".to_string()));
        assert_eq!(extract_search_term("show my standup"), Some("standup".to_string()));
        assert_eq!(extract_search_term("hello there"), None);
    }

    #[test]
    fn detects_ordinal_words_and_numbers() {
        assert_eq!(detect_selection_index("the first one"), Some(1));
        assert_eq!(detect_selection_index("first"), Some(1));
        assert_eq!(detect_selection_index("the second one"), Some(2));
        assert_eq!(detect_selection_index("the third"), Some(3));
        assert_eq!(detect_selection_index("number 1"), Some(1));
        assert_eq!(detect_selection_index("option 3"), Some(3));
        assert_eq!(detect_selection_index("1"), Some(1));
        assert_eq!(detect_selection_index("1st"), Some(1));
        assert_eq!(detect_selection_index("2nd"), Some(2));
        assert_eq!(detect_selection_index("3rd"), Some(3));
    }

    #[test]
    fn no_match_returns_none() {
        assert_eq!(detect_selection_index("hello"), None);
        assert_eq!(detect_selection_index("yes"), None);
        assert_eq!(detect_selection_index("reschedule"), None);
    }
}
