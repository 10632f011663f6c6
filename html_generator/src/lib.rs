//! HTML Generator (4.F): one reasoner-tier call with a fixed system prompt,
//! content-type hints, markdown-fence-stripped extraction, and a structural
//! validity check before downstream phases ever see the document.
//!
//! Rendered over this workspace's `Provider` trait instead of a concrete
//! vendor client, so the same generation path runs against any configured
//! model tier.

mod contracts;
mod generator;
mod prompts;

pub use contracts::{GenerationContext, GenerationResult};
pub use generator::{infer_info_type, HtmlGenerator};
pub use prompts::{build_user_prompt, content_type_hint, SYSTEM_PROMPT};
