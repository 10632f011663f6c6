//! Generate-and-display compound request detection (§4.C): "create a plan
//! AND show it on screen" routes as `Conversation` (the routing prompt itself
//! says so, §4.C/router prompt), and the auto-display follow-up is
//! synthesized here rather than by the router or the parser.

/// `true` when `text` reads like a request to both generate something and
/// put it on a screen. Deliberately conservative (requires both a
/// conjunction and a screen target) since a false positive would silently
/// trigger an unwanted layout-generation pipeline run.
pub fn wants_auto_display(text: &str) -> bool {
    let lower = text.to_lowercase();
    let has_conjunction = [" and show", " and display", "then show", "then display", " also show", " also display"]
        .iter()
        .any(|needle| lower.contains(needle));
    let has_screen_target = ["on screen", "on the screen", "on display", "on the display", "on the tv", "on my tv"]
        .iter()
        .any(|needle| lower.contains(needle));
    has_conjunction && has_screen_target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_canonical_compound_phrasing() {
        assert!(wants_auto_display("create a plan and show it on screen"));
        assert!(wants_auto_display("write a trivia quiz then display it on the tv"));
    }

    #[test]
    fn plain_conversation_is_not_compound() {
        assert!(!wants_auto_display("what's the weather like"));
        assert!(!wants_auto_display("show me the living room tv status"));
    }

    #[test]
    fn conjunction_without_screen_target_is_not_compound() {
        assert!(!wants_auto_display("create a plan and save it"));
    }
}
