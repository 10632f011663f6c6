//! Deterministic + LLM HTML fixer (4.H). Addresses failures surfaced by the
//! sandbox validator's Phase 5/6 in two tiers: a zero-cost rule registry for
//! `ElementInvisible` failures, and an LLM fixer for everything else, split
//! into a Tailwind/CSS domain and a JavaScript domain.
//!
//! Patch application never touches the document outside the attribute or
//! script region it was asked to change — there's no DOM-mutation crate in
//! this stack, so both appliers work directly on the HTML text.

mod class_applier;
mod contracts;
mod js_applier;
mod llm_fixer;
mod prompts;
mod rules;
mod validators;

pub use class_applier::inject as inject_class_patches;
pub use contracts::{
    ClassPatch, ClassifiedError, ErrorType, FixContext, InjectionResult, JSApplyResult, JSPatch, JSPatchType, LLMFixResult, PatchSet,
};
pub use js_applier::apply as apply_js_patches;
pub use llm_fixer::LlmFixer;
pub use rules::run as deterministic_fix;
pub use validators::{validate_class_patches, validate_js_patches};

use error_types::FixerError;

/// Runs the deterministic registry against every `ElementInvisible` error in
/// `errors`, given each target's current class list (looked up by selector
/// from `html`). Errors that aren't deterministic are left for the caller to
/// route to [`LlmFixer`].
pub fn run_deterministic_rules(html: &str, errors: &[ClassifiedError]) -> PatchSet {
    let mut set = PatchSet::new("deterministic");
    for error in errors.iter().filter(|e| e.error_type.is_deterministic()) {
        if let Some(classes) = class_applier::classes_for(html, &error.selector) {
            if let Some(patch) = rules::run(error, &classes) {
                set.add(patch);
            }
        }
    }
    set
}

/// Runs the deterministic registry and applies whatever it produces in one
/// step. Returns `Err` only when every `ElementInvisible` error had no
/// matching rule or failed to apply — the pipeline falls through to the LLM
/// fixer and then vision repair in that case.
pub fn fix_deterministic(html: &str, errors: &[ClassifiedError]) -> Result<InjectionResult, FixerError> {
    let set = run_deterministic_rules(html, errors);
    if set.patches.is_empty() {
        return Err(FixerError::PatchApplicationFailed("no deterministic rule matched".to_string()));
    }
    let result = class_applier::inject(html, &set);
    if result.applied.is_empty() {
        let reasons: Vec<String> = result.failed.iter().map(|(_, reason)| reason.clone()).collect();
        return Err(FixerError::SelectorNotFound(reasons.join("; ")));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_pass_fixes_hidden_element() {
        let html = r#"<button id="go" class="hidden px-4">Go</button>"#;
        let error = ClassifiedError::new(ErrorType::ElementInvisible, "#go", "button");
        let set = run_deterministic_rules(html, &[error]);
        assert_eq!(set.patches.len(), 1);
        assert!(set.patches[0].remove_classes.contains(&"hidden".to_string()));

        let result = inject_class_patches(html, &set);
        assert!(!result.html.contains("hidden"));
    }

    #[test]
    fn deterministic_pass_skips_llm_routed_errors() {
        let html = r#"<button id="go" class="px-4">Go</button>"#;
        let error = ClassifiedError::new(ErrorType::FeedbackMissing, "#go", "button");
        let set = run_deterministic_rules(html, &[error]);
        assert!(set.patches.is_empty());
    }

    #[test]
    fn fix_deterministic_errs_when_no_rule_matches() {
        let html = r#"<button id="go" class="px-4">Go</button>"#;
        let error = ClassifiedError::new(ErrorType::ElementInvisible, "#go", "button");
        let result = fix_deterministic(html, &[error]);
        assert!(result.is_err());
    }

    #[test]
    fn fix_deterministic_applies_matching_rule() {
        let html = r#"<button id="go" class="hidden px-4">Go</button>"#;
        let error = ClassifiedError::new(ErrorType::ElementInvisible, "#go", "button");
        let result = fix_deterministic(html, &[error]).unwrap();
        assert!(!result.html.contains("hidden"));
    }
}
