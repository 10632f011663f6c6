//! Provider abstraction (4.A): a uniform `complete`/`complete_json`/
//! `complete_with_vision`/`complete_with_grounding` interface over the cheap,
//! coder and reasoner back-ends, with markdown-fence stripping, token
//! accounting and a JSON self-repair loop.

mod http_provider;
mod json_repair;
mod mock;
mod provider_trait;
mod response;

pub use http_provider::HttpProvider;
pub use json_repair::JsonRepairLoop;
pub use mock::MockProvider;
pub use provider_trait::{strip_markdown_fence, Provider};
pub use response::{CompletionOptions, ProviderResponse};
