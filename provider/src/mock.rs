use crate::provider_trait::Provider;
use crate::response::{CompletionOptions, ProviderResponse};
use async_trait::async_trait;
use common_types::{ProviderTier, TokenUsage};
use std::sync::Mutex;

/// Deterministic test double for [`Provider`]. Every test that exercises provider
/// behavior should use this rather than speaking to a real endpoint — per the
/// design notes, only integration tests (none included here) hit a live back-end.
pub struct MockProvider {
    tier: ProviderTier,
    responses: Mutex<Vec<String>>,
    fail: bool,
}

impl MockProvider {
    pub fn with_fixed_response(tier: ProviderTier, response: impl Into<String>) -> Self {
        Self {
            tier,
            responses: Mutex::new(vec![response.into()]),
            fail: false,
        }
    }

    /// Each call to `complete` pops the next response in order; the last response
    /// repeats once the list is exhausted.
    pub fn with_sequence(tier: ProviderTier, responses: Vec<String>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            tier,
            responses: Mutex::new(responses),
            fail: false,
        }
    }

    pub fn failing(tier: ProviderTier) -> Self {
        Self {
            tier,
            responses: Mutex::new(vec![]),
            fail: true,
        }
    }

    fn next_response(&self) -> String {
        let mut guard = self.responses.lock().unwrap();
        if guard.len() > 1 {
            guard.pop().unwrap()
        } else {
            guard.last().cloned().unwrap_or_default()
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn tier(&self) -> ProviderTier {
        self.tier
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        prompt: &str,
        _system: Option<&str>,
        _temperature: f32,
        _max_tokens: Option<u32>,
        _options: &CompletionOptions,
    ) -> ProviderResponse {
        if self.fail {
            return ProviderResponse::failure(self.tier, self.model_id(), "mock provider configured to fail", 0);
        }
        let content = self.next_response();
        let usage = TokenUsage::new(prompt.split_whitespace().count() as u32, content.split_whitespace().count() as u32);
        ProviderResponse::success(content, self.tier, self.model_id(), usage, 1)
    }
}
