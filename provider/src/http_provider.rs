use crate::provider_trait::Provider;
use crate::response::{CompletionOptions, ProviderResponse};
use async_trait::async_trait;
use common_types::{ProviderTier, TokenUsage};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: ChatContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrlPayload },
}

#[derive(Debug, Serialize)]
struct ImageUrlPayload {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: Option<u32>,
}

/// An OpenAI-compatible chat-completions back-end, serving one of the three
/// model tiers. One `HttpProvider` per tier is constructed at process start
/// (per §9's "global singletons become explicit collaborators" note) and
/// shared across requests via a cloneable `reqwest::Client`.
pub struct HttpProvider {
    client: reqwest::Client,
    tier: ProviderTier,
    base_url: String,
    api_key: Option<String>,
    model: String,
    supports_vision: bool,
    supports_grounding: bool,
}

impl HttpProvider {
    pub fn new(
        tier: ProviderTier,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        supports_vision: bool,
        supports_grounding: bool,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            tier,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            supports_vision,
            supports_grounding,
        }
    }

    async fn call(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
        options: &CompletionOptions,
        images: &[Vec<u8>],
    ) -> ProviderResponse {
        let started = Instant::now();
        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: ChatContent::Text(sys.to_string()),
            });
        }

        let user_content = if images.is_empty() {
            ChatContent::Text(prompt.to_string())
        } else {
            let mut parts = vec![ContentPart::Text { text: prompt.to_string() }];
            for image in images {
                use base64::{engine::general_purpose::STANDARD, Engine as _};
                let encoded = STANDARD.encode(image);
                parts.push(ContentPart::ImageUrl {
                    image_url: ImageUrlPayload {
                        url: format!("data:image/png;base64,{encoded}"),
                    },
                });
            }
            ChatContent::Parts(parts)
        };
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user_content,
        });

        let tools = if options.use_search && self.supports_grounding {
            Some(serde_json::json!([{"type": "web_search"}]))
        } else {
            None
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            temperature: Some(temperature),
            max_tokens,
            reasoning_effort: options.reasoning_effort.clone(),
            tools,
        };

        let mut builder = self.client.post(&self.base_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let latency_ms = || started.elapsed().as_millis() as u64;

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(provider = %self.tier, error = %e, "provider request failed");
                return ProviderResponse::failure(self.tier, &self.model, format!("network error: {e}"), latency_ms());
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(500).collect();
            let msg = if status.as_u16() == 401 || status.as_u16() == 403 {
                format!("missing or invalid API key: {snippet}")
            } else if status.as_u16() == 429 {
                format!("quota exceeded: {snippet}")
            } else {
                format!("http error {status}: {snippet}")
            };
            tracing::warn!(provider = %self.tier, status = %status, "provider returned error status");
            return ProviderResponse::failure(self.tier, &self.model, msg, latency_ms());
        }

        let parsed: ChatApiResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                return ProviderResponse::failure(
                    self.tier,
                    &self.model,
                    format!("invalid response body: {e}"),
                    latency_ms(),
                )
            }
        };

        let Some(choice) = parsed.choices.into_iter().next() else {
            return ProviderResponse::failure(self.tier, &self.model, "no choices in response", latency_ms());
        };

        let truncated = matches!(choice.finish_reason.as_deref(), Some("length"));
        if truncated {
            tracing::warn!(provider = %self.tier, "response truncated before completion");
        }

        let content = choice.message.content.unwrap_or_default();
        if content.is_empty() {
            return ProviderResponse::failure(self.tier, &self.model, "empty content in response", latency_ms());
        }

        let usage = match parsed.usage {
            Some(u) => TokenUsage::from_parts(u.prompt_tokens, u.completion_tokens, u.total_tokens),
            None => TokenUsage::new(
                prompt.split_whitespace().count() as u32,
                content.split_whitespace().count() as u32,
            ),
        };

        let mut resp = ProviderResponse::success(content, self.tier, &self.model, usage, latency_ms());
        if truncated {
            resp.metadata = serde_json::json!({"truncated": true});
        }
        resp
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn tier(&self) -> ProviderTier {
        self.tier
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
        options: &CompletionOptions,
    ) -> ProviderResponse {
        self.call(prompt, system, temperature, max_tokens, options, &[]).await
    }

    async fn complete_with_vision(
        &self,
        prompt: &str,
        images: &[Vec<u8>],
        system: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
        options: &CompletionOptions,
    ) -> ProviderResponse {
        if !self.supports_vision {
            return ProviderResponse::failure(self.tier, &self.model, "provider does not support vision", 0);
        }
        self.call(prompt, system, temperature, max_tokens, options, images).await
    }

    async fn complete_with_grounding(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
        options: &CompletionOptions,
    ) -> ProviderResponse {
        self.call(prompt, system, temperature, max_tokens, options, &[]).await
    }
}
