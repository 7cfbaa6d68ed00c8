//! Anthropic Claude provider implementation

use async_trait::async_trait;
use reqwest::Client;

use super::provider_trait::{
    ChatMessage, ChatRequest, LLMProviderTrait, MessageRole, ProviderError, ProviderResponse,
    ProviderType, TokenUsage, retry_after_ms,
};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        if api_key.is_some() {
            tracing::info!("Anthropic provider initialized with API key");
        } else {
            tracing::warn!(
                "Anthropic provider created without API key - ANTHROPIC_API_KEY not set"
            );
        }

        Self {
            client: Client::new(),
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Anthropic takes the system prompt as a separate parameter; additional
    /// system messages are appended to it.
    fn messages_to_anthropic(messages: &[ChatMessage]) -> (Option<String>, Vec<serde_json::Value>) {
        let mut system_prompt: Option<String> = None;
        let mut api_messages: Vec<serde_json::Value> = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => match system_prompt {
                    Some(ref mut s) => {
                        s.push_str("\n\n");
                        s.push_str(&msg.content);
                    }
                    None => system_prompt = Some(msg.content.clone()),
                },
                MessageRole::User | MessageRole::Assistant => {
                    api_messages.push(serde_json::json!({
                        "role": msg.role.as_str(),
                        "content": msg.content
                    }));
                }
            }
        }

        (system_prompt, api_messages)
    }

    fn parse_response(json: &serde_json::Value) -> Result<ProviderResponse, ProviderError> {
        let blocks = json["content"].as_array().ok_or_else(|| {
            ProviderError::ParseError("Invalid Anthropic response format".to_string())
        })?;

        let content = blocks
            .iter()
            .filter_map(|block| {
                if block["type"].as_str()? == "text" {
                    block["text"].as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<String>>()
            .join("");

        let usage = json.get("usage").and_then(|u| {
            Some(TokenUsage {
                input_tokens: u["input_tokens"].as_u64()? as u32,
                output_tokens: u["output_tokens"].as_u64()? as u32,
                total_tokens: (u["input_tokens"].as_u64()? + u["output_tokens"].as_u64()?) as u32,
            })
        });

        Ok(ProviderResponse {
            content: content.trim().to_string(),
            usage,
        })
    }
}

#[async_trait]
impl LLMProviderTrait for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn name(&self) -> &'static str {
        "Anthropic"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn default_model(&self) -> &str {
        "claude-3-5-haiku-20241022"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ProviderResponse, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::AuthError("No Anthropic API key configured".to_string())
        })?;

        let (system_prompt, messages) = Self::messages_to_anthropic(&request.messages);

        if messages.is_empty() {
            return Err(ProviderError::ConfigError(
                "At least one non-system message is required".to_string(),
            ));
        }

        let mut payload = serde_json::json!({
            "model": request.config.model,
            "max_tokens": request.config.max_tokens,
            "temperature": request.config.temperature,
            "messages": messages
        });

        if let Some(system) = system_prompt {
            payload["system"] = serde_json::json!(system);
        }

        tracing::debug!(
            "[Anthropic] Sending request: model={}, messages={}",
            request.config.model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .timeout(request.config.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, request.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = retry_after_ms(response.headers());
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("[Anthropic] Rate limited: {}", body);
                return Err(ProviderError::RateLimited {
                    retry_after_ms,
                    message: body,
                });
            }

            if status.as_u16() == 529 {
                return Err(ProviderError::NotAvailable(format!(
                    "Anthropic API is overloaded: {}",
                    body
                )));
            }

            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::parse_response(&json)
    }
}
