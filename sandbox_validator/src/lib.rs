//! Seven-phase headless-browser sandbox validator (§4.G): render, visual
//! analysis, scene graph extraction, input detection, interaction testing
//! (with cascading), and aggregation into a scored [`types::SandboxResult`].
//!
//! Every browser interaction goes through [`page::PageHandle`], so phases run
//! hermetically against [`page::mock::MockPage`] in tests and against a real
//! [`browser_driver::BrowserSession`] in production.

mod config;
mod page;
mod phase1_render;
mod phase2_visual;
mod phase3_scene;
mod phase4_inputs;
mod phase5_interaction;
mod phase6_aggregate;
mod scene_script;
mod types;
mod validator;

pub use config::SandboxConfig;
pub use page::PageHandle;
pub use types::{
    FailureType, InputCandidate, InputType, InteractionCategory, InteractionResult, NodeType, PhaseResult, SandboxResult, SceneGraph,
    SceneNode, VisualDelta, VisualSnapshot,
};
pub use validator::SandboxValidator;

#[cfg(any(test, feature = "test-util"))]
pub use page::mock::MockPage;
