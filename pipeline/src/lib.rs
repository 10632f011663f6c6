//! Custom-layout pipeline (4.J): wires the HTML generator (4.F), sandbox
//! validator (4.G), deterministic + LLM fixer (4.H) and two-step vision
//! repair (4.I) into one generate -> validate -> repair loop scored by a
//! best-result tracker that only upgrades on strictly-greater scores.

mod contracts;
mod error_mapping;
mod human_feedback;
mod pipeline;
mod static_analysis;

pub use contracts::{BestResultTracker, PipelineConfig, PipelineResult};
pub use human_feedback::{build_feedback_prompt, parse_feedback, strip_annotations, ElementFeedback};
pub use pipeline::CustomLayoutPipeline;
