//! Value types shared by every phase of the sandbox validator (§3: scene graph,
//! visual snapshot/delta, input candidate, interaction result, phase result,
//! sandbox result).

use common_types::BoundingBox;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classification of a scene-graph node, used by the input detector and by
/// repair-stage prompts that describe failing elements to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Text,
    Button,
    Input,
    Container,
    Image,
    Unknown,
}

/// One visible, rendered DOM element as captured by Phase 3's scene-graph script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub selector: String,
    pub tag: String,
    pub node_type: NodeType,
    pub bounding_box: BoundingBox,
    pub visible: bool,
    pub z_index: i32,
    pub text: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// When a child inherits clickability from a parent via event delegation,
    /// this names the parent proposed as the true event owner.
    pub event_owner_candidate: Option<String>,
}

/// Geometric + attribute summary of the rendered DOM at one point in time (§3,
/// GLOSSARY "Scene graph"). Nodes with zero area or `display:none` are excluded
/// by the extraction script itself (Phase 3), not filtered here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub capture_time_ms: u64,
}

impl SceneGraph {
    pub fn empty(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            nodes: Vec::new(),
            viewport_width,
            viewport_height,
            capture_time_ms: 0,
        }
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().filter(|n| n.visible)
    }

    pub fn interactive_nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes
            .iter()
            .filter(|n| n.visible && matches!(n.node_type, NodeType::Button | NodeType::Input))
    }

    pub fn find_by_selector(&self, selector: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.selector == selector)
    }
}

/// 256-bin grayscale histogram + derived statistics over one PNG screenshot (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualSnapshot {
    #[serde(skip)]
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub histogram: [u32; 256],
    pub mean: f64,
    pub variance: f64,
    pub non_background_ratio: f64,
}

impl VisualSnapshot {
    /// `is_blank(t)` := non_background_ratio < 1-t AND variance < 100 (§3).
    /// Monotone decreasing in variance, monotone increasing in `t`: raising the
    /// threshold (being more tolerant of uniform pages) or lowering variance both
    /// push a snapshot toward "blank".
    pub fn is_blank(&self, threshold: f64) -> bool {
        self.non_background_ratio < 1.0 - threshold && self.variance < 100.0
    }
}

/// Per-pixel comparison between two screenshots, optionally constrained to a
/// region (§3, GLOSSARY "Visual delta").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualDelta {
    pub pixel_diff_ratio: f64,
    pub structural_change: bool,
    pub region_analyzed: Option<BoundingBox>,
    pub diff_count: u64,
    pub total_pixels: u64,
    pub element_pixels: Option<u64>,
    pub element_diff_ratio: Option<f64>,
}

impl VisualDelta {
    pub fn new(diff_count: u64, total_pixels: u64, region_analyzed: Option<BoundingBox>) -> Self {
        let pixel_diff_ratio = if total_pixels == 0 {
            0.0
        } else {
            diff_count as f64 / total_pixels as f64
        };
        Self {
            pixel_diff_ratio,
            structural_change: pixel_diff_ratio > 0.05,
            region_analyzed,
            diff_count,
            total_pixels,
            element_pixels: None,
            element_diff_ratio: None,
        }
    }

    pub fn with_element_stats(mut self, element_pixels: u64, element_diff_ratio: f64) -> Self {
        self.element_pixels = Some(element_pixels);
        self.element_diff_ratio = Some(element_diff_ratio);
        self
    }

    /// `has_visible_change(t, element_t)` := ratio > t OR (element bound given
    /// AND element_diff_ratio > element_t) (§3).
    pub fn has_visible_change(&self, viewport_threshold: f64, element_threshold: f64) -> bool {
        self.pixel_diff_ratio > viewport_threshold
            || self
                .element_diff_ratio
                .map(|r| r > element_threshold)
                .unwrap_or(false)
    }
}

/// Kind of clickable surface an input candidate represents, used to decide
/// whether it is testable and how to describe it in repair prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Button,
    Link,
    FormControl,
    DataHook,
    AriaControl,
    PointerCursor,
    Label,
}

/// Broad category used for early-stop bookkeeping and to mark navigation /
/// display-only elements non-testable (4.G Phase 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionCategory {
    Actionable,
    Navigation,
    DisplayOnly,
}

/// A candidate clickable element surfaced by Phase 4's rule table (§3).
/// Ordering: ascending priority, then descending confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputCandidate {
    pub selector: String,
    pub node: SceneNode,
    pub confidence: f32,
    pub input_type: InputType,
    pub priority: u8,
    /// When this candidate resulted from merging several matching rules (e.g. a
    /// `<button>` that is also `role=button`), every selector that contributed.
    pub source_elements: Vec<String>,
    pub testable: bool,
    pub interaction_category: InteractionCategory,
    /// Finer-grained clickable sub-regions within this candidate (e.g. each
    /// option in an event-delegated multi-choice panel).
    pub interaction_units: Vec<String>,
}

impl PartialEq for InputCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.selector == other.selector
    }
}

impl InputCandidate {
    /// Comparator implementing the ordering invariant: ascending priority, then
    /// descending confidence. `f32` isn't `Ord`, so callers sort with
    /// `slice::sort_by` and this function rather than deriving `Ord`.
    pub fn cmp_priority_then_confidence(a: &InputCandidate, b: &InputCandidate) -> std::cmp::Ordering {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Why an interaction attempt did not count as a pass (§3, derived field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    Passed,
    NoChange,
    UnderThreshold,
    Error,
}

/// Outcome of clicking one candidate (or interaction unit) during Phase 5 (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResult {
    pub input: InputCandidate,
    pub action: String,
    pub visual_delta: Option<VisualDelta>,
    #[serde(skip)]
    pub scene_before: Option<SceneGraph>,
    #[serde(skip)]
    pub scene_after: Option<SceneGraph>,
    pub responsive: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
    #[serde(skip)]
    pub screenshot_before: Option<Vec<u8>>,
    #[serde(skip)]
    pub screenshot_after: Option<Vec<u8>>,
    pub cascade_level: u8,
    pub cascade_trigger: Option<String>,
}

impl InteractionResult {
    /// Derived `failure_type` (§3).
    pub fn failure_type(&self) -> FailureType {
        if self.error.is_some() {
            return FailureType::Error;
        }
        if self.responsive {
            return FailureType::Passed;
        }
        match &self.visual_delta {
            Some(d) if d.pixel_diff_ratio > 0.0 => FailureType::UnderThreshold,
            _ => FailureType::NoChange,
        }
    }
}

/// One phase's outcome (§3). `details` is a free-form map so each phase can
/// attach whatever diagnostics are useful without widening this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: u8,
    pub name: String,
    pub passed: bool,
    pub details: serde_json::Value,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl PhaseResult {
    pub fn ok(phase: u8, name: impl Into<String>, details: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            phase,
            name: name.into(),
            passed: true,
            details,
            duration_ms,
            error: None,
        }
    }

    pub fn fail(phase: u8, name: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            phase,
            name: name.into(),
            passed: false,
            details: serde_json::Value::Null,
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// Aggregated result of a full validation run (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxResult {
    pub valid: bool,
    pub phases: Vec<PhaseResult>,
    pub inputs_tested: usize,
    pub inputs_responsive: usize,
    pub confidence: f32,
    pub layout_type: String,
    pub total_duration_ms: u64,
    pub failure_summary: Option<String>,
    pub interaction_results: Vec<InteractionResult>,
    #[serde(skip)]
    pub page_screenshot: Option<Vec<u8>>,
    pub invisible_elements_count: usize,
}

impl SandboxResult {
    /// Non-static validation invariant (§8): 0 <= responsive <= tested <= max.
    pub fn respects_tested_bounds(&self, max_inputs_to_test: usize) -> bool {
        self.inputs_responsive <= self.inputs_tested && self.inputs_tested <= max_inputs_to_test
    }
}
