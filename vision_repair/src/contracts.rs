//! Data model for two-step vision repair (4.I), grounded on
//! `validation/fixer.py::DirectFixer` and `validation/contracts.py`.

use sandbox_validator::SandboxResult;
use serde::{Deserialize, Serialize};

/// One previously-failed repair attempt, kept so the repair prompt can tell
/// the model "this was already tried and didn't work."
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepairAttempt {
    pub cycle: u32,
    pub css_rules_tried: Vec<String>,
    pub outcome: String,
}

/// Everything one repair call needs: the document as it stands, why it
/// failed validation, an optional screenshot for vision mode, and the record
/// of what's already been tried.
#[derive(Debug, Clone, Default)]
pub struct VisionRepairContext {
    pub html: String,
    pub validation: Option<SandboxResult>,
    pub screenshot: Option<Vec<u8>>,
    pub repair_history: Vec<RepairAttempt>,
}

impl VisionRepairContext {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            validation: None,
            screenshot: None,
            repair_history: Vec::new(),
        }
    }

    pub fn with_validation(mut self, validation: SandboxResult) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_screenshot(mut self, screenshot: Vec<u8>) -> Self {
        self.screenshot = Some(screenshot);
        self
    }
}

/// One element-level finding from Step 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDiagnosis {
    pub selector: String,
    pub line_number: Option<usize>,
    pub problem: String,
    pub concrete_fix: String,
}

/// Outcome of the diagnosis call (Step 1).
#[derive(Debug, Clone, Default)]
pub struct DiagnosisResult {
    pub success: bool,
    pub diagnoses: Vec<ElementDiagnosis>,
    pub raw_text: Option<String>,
    pub tokens_used: u32,
    pub latency_ms: u64,
}

/// Outcome of the repair call (Step 2). Per the cleaner's contract this never
/// carries a hard failure — `html` always holds *something* renderable, even
/// if that is just the input HTML unchanged.
#[derive(Debug, Clone)]
pub struct RepairResult {
    pub success: bool,
    pub html: String,
    pub changed: bool,
    pub tokens_used: u32,
    pub latency_ms: u64,
}
