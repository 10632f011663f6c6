//! Data model for the deterministic + LLM fixer (4.H).
//!
//! `ErrorType` is the dispatch key the prompt builders and the deterministic
//! rule registry both index on; `ClassifiedError` is what Phase 5/6 failures
//! get turned into before repair. `ClassPatch` and `JSPatch` are the two
//! patch kinds the fixer ever produces — one edits `class=` attribute text,
//! the other edits inline `<script>` content or handler attributes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Classification of a validation failure, used to route it to a rule or a
/// prompt builder. Feedback variants come from Phase 5 (click produced no or
/// too-subtle visual change); JS variants come from console errors captured
/// during interaction testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    FeedbackMissing,
    FeedbackTooSubtle,
    ElementInvisible,
    JsSyntaxError,
    JsMissingFunction,
    JsMissingDomElement,
    JsUndefinedVariable,
    JsRuntimeError,
}

impl ErrorType {
    /// Whether this error type is addressed by a Tailwind/CSS class patch.
    pub fn is_feedback_related(self) -> bool {
        matches!(self, ErrorType::FeedbackMissing | ErrorType::FeedbackTooSubtle)
    }

    /// Whether this error type is addressed by a JavaScript patch.
    pub fn is_js_related(self) -> bool {
        matches!(
            self,
            ErrorType::JsSyntaxError | ErrorType::JsMissingFunction | ErrorType::JsMissingDomElement | ErrorType::JsUndefinedVariable | ErrorType::JsRuntimeError
        )
    }

    /// Whether the deterministic registry has a rule for this error type
    /// (visibility issues are handled without calling a model at all).
    pub fn is_deterministic(self) -> bool {
        matches!(self, ErrorType::ElementInvisible)
    }

    /// Whether this error type needs an LLM call to resolve (everything that
    /// isn't handled deterministically).
    pub fn requires_llm(self) -> bool {
        !self.is_deterministic()
    }
}

/// One failure, already tied to a concrete element, ready to be routed to a
/// rule or a prompt builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub error_type: ErrorType,
    pub selector: String,
    pub element_tag: String,
    pub line_number: Option<usize>,
    pub detail: Option<String>,
}

impl ClassifiedError {
    pub fn new(error_type: ErrorType, selector: impl Into<String>, element_tag: impl Into<String>) -> Self {
        Self {
            error_type,
            selector: selector.into(),
            element_tag: element_tag.into(),
            line_number: None,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }
}

/// A patch that adds/removes `class=` tokens on one element, selected by CSS
/// selector. The z-order-token invariant (§8): when an added class is a
/// `z-<n>`/`-z-<n>` token, every pre-existing z-order token on the same
/// element is implicitly removed by the applier, not by this struct — the
/// patch just records what the caller asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassPatch {
    pub selector: String,
    #[serde(default)]
    pub add_classes: Vec<String>,
    #[serde(default)]
    pub remove_classes: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ClassPatch {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            add_classes: Vec::new(),
            remove_classes: Vec::new(),
            reason: None,
        }
    }

    pub fn is_additive(&self) -> bool {
        !self.add_classes.is_empty() && self.remove_classes.is_empty()
    }

    pub fn is_removal(&self) -> bool {
        self.add_classes.is_empty() && !self.remove_classes.is_empty()
    }

    pub fn is_replacement(&self) -> bool {
        !self.add_classes.is_empty() && !self.remove_classes.is_empty()
    }

    /// Merges another patch targeting the same selector into this one. Added
    /// classes win over a conflicting removal from the other patch (§8: "add
    /// wins").
    pub fn merge_with(&mut self, other: &ClassPatch) {
        let mut add: HashSet<String> = self.add_classes.drain(..).collect();
        add.extend(other.add_classes.iter().cloned());
        let mut remove: HashSet<String> = self.remove_classes.drain(..).collect();
        remove.extend(other.remove_classes.iter().cloned());
        remove.retain(|c| !add.contains(c));
        self.add_classes = add.into_iter().collect();
        self.remove_classes = remove.into_iter().collect();
        if self.reason.is_none() {
            self.reason = other.reason.clone();
        }
    }
}

/// A deduplicated collection of [`ClassPatch`]es — patches targeting the same
/// selector are merged on insert rather than applied twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchSet {
    pub patches: Vec<ClassPatch>,
    pub source: String,
}

impl PatchSet {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            patches: Vec::new(),
            source: source.into(),
        }
    }

    pub fn add(&mut self, patch: ClassPatch) {
        if let Some(existing) = self.patches.iter_mut().find(|p| p.selector == patch.selector) {
            existing.merge_with(&patch);
        } else {
            self.patches.push(patch);
        }
    }

    pub fn from_patches(source: impl Into<String>, patches: Vec<ClassPatch>) -> Self {
        let mut set = PatchSet::new(source);
        for patch in patches {
            set.add(patch);
        }
        set
    }
}

/// Result of running [`crate::class_applier::ClassPatchApplier::inject`].
#[derive(Debug, Clone)]
pub struct InjectionResult {
    pub success: bool,
    pub html: String,
    pub applied: Vec<ClassPatch>,
    pub failed: Vec<(ClassPatch, String)>,
}

/// Types of JavaScript patches the LLM fixer can emit (mirrors the Tailwind
/// applier's class-only scope, but for inline `<script>` content and handler
/// attributes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JSPatchType {
    AddFunction,
    ReplaceFunction,
    FixSyntax,
    FixDomReference,
    AddVariable,
    ModifyHandler,
}

/// A single JavaScript modification. Which fields are populated depends on
/// `patch_type`; the applier and validator each only read the fields their
/// variant uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSPatch {
    pub patch_type: JSPatchType,
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub function_code: Option<String>,
    #[serde(default)]
    pub old_reference: Option<String>,
    #[serde(default)]
    pub new_reference: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub old_handler: Option<String>,
    #[serde(default)]
    pub new_handler: Option<String>,
    #[serde(default)]
    pub script_index: Option<usize>,
    #[serde(default)]
    pub line_start: Option<usize>,
    #[serde(default)]
    pub line_end: Option<usize>,
    #[serde(default)]
    pub replacement_code: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl JSPatch {
    pub fn describe(&self) -> String {
        let detail = match self.patch_type {
            JSPatchType::AddFunction => format!("add function '{}'", self.function_name.as_deref().unwrap_or("?")),
            JSPatchType::ReplaceFunction => format!("replace function '{}'", self.function_name.as_deref().unwrap_or("?")),
            JSPatchType::FixSyntax => format!("fix syntax at line {}", self.line_start.unwrap_or(0)),
            JSPatchType::FixDomReference => format!(
                "change '{}' -> '{}'",
                self.old_reference.as_deref().unwrap_or("?"),
                self.new_reference.as_deref().unwrap_or("?")
            ),
            JSPatchType::AddVariable => "add variable declaration".to_string(),
            JSPatchType::ModifyHandler => format!("modify handler on {}", self.selector.as_deref().unwrap_or("?")),
        };
        match &self.reason {
            Some(r) => format!("[{:?}] {detail} ({r})", self.patch_type),
            None => format!("[{:?}] {detail}", self.patch_type),
        }
    }

    pub fn is_function_patch(&self) -> bool {
        matches!(self.patch_type, JSPatchType::AddFunction | JSPatchType::ReplaceFunction)
    }

    pub fn is_reference_patch(&self) -> bool {
        matches!(self.patch_type, JSPatchType::FixDomReference)
    }

    pub fn is_handler_patch(&self) -> bool {
        matches!(self.patch_type, JSPatchType::ModifyHandler)
    }
}

/// Result of applying a batch of [`JSPatch`]es.
#[derive(Debug, Clone)]
pub struct JSApplyResult {
    pub success: bool,
    pub html: String,
    pub applied: Vec<JSPatch>,
    pub failed: Vec<(JSPatch, String)>,
}

/// Context handed to a prompt builder: the HTML, the errors it must address,
/// and whatever static analysis the orchestrator already extracted.
#[derive(Debug, Clone, Default)]
pub struct FixContext {
    pub html: String,
    pub errors: Vec<ClassifiedError>,
    pub defined_functions: HashSet<String>,
    pub called_functions: HashSet<String>,
    pub dom_ids: HashSet<String>,
    pub previous_patches: Vec<String>,
    pub attempt_number: u32,
}

impl FixContext {
    pub fn missing_functions(&self) -> HashSet<String> {
        self.called_functions.difference(&self.defined_functions).cloned().collect()
    }
}

/// Outcome of one `LlmFixer::fix` call (4.H).
#[derive(Debug, Clone, Default)]
pub struct LLMFixResult {
    pub success: bool,
    pub fixed_html: Option<String>,
    pub class_patches: Vec<ClassPatch>,
    pub js_patches: Vec<JSPatch>,
    pub llm_calls_made: u32,
    pub tokens_used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_with_add_wins_over_conflicting_remove() {
        let mut a = ClassPatch::new("#x");
        a.remove_classes.push("hidden".to_string());
        let b = ClassPatch::new("#x");
        let mut b = b;
        b.add_classes.push("hidden".to_string());
        a.merge_with(&b);
        assert!(a.add_classes.contains(&"hidden".to_string()));
        assert!(!a.remove_classes.contains(&"hidden".to_string()));
    }

    #[test]
    fn patch_set_dedups_by_selector() {
        let mut set = PatchSet::new("llm");
        let mut p1 = ClassPatch::new("#x");
        p1.add_classes.push("hover:scale-105".to_string());
        let mut p2 = ClassPatch::new("#x");
        p2.add_classes.push("transition-all".to_string());
        set.add(p1);
        set.add(p2);
        assert_eq!(set.patches.len(), 1);
        assert_eq!(set.patches[0].add_classes.len(), 2);
    }

    #[test]
    fn error_type_routing() {
        assert!(ErrorType::FeedbackMissing.is_feedback_related());
        assert!(!ErrorType::FeedbackMissing.is_js_related());
        assert!(ErrorType::JsSyntaxError.is_js_related());
        assert!(ErrorType::ElementInvisible.is_deterministic());
        assert!(!ErrorType::ElementInvisible.requires_llm());
        assert!(ErrorType::JsSyntaxError.requires_llm());
    }
}
