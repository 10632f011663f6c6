//! Model router / orchestrator (4.C): two-stage complexity classification
//! plus device-command flagging, with a fixed complexity→provider table and
//! pending-operation disambiguation.

mod decision;
mod pending;
mod prompts;
mod router;

pub use decision::{Complexity, RoutingDecision};
pub use pending::{resolve_pending_operation, PendingOpType, PendingOperation};
pub use prompts::{build_routing_prompt, ROUTING_SYSTEM_PROMPT};
pub use router::Router;
