//! OpenAI provider implementation

use async_trait::async_trait;
use reqwest::Client;

use super::provider_trait::{
    ChatMessage, ChatRequest, LLMProviderTrait, ProviderError, ProviderResponse, ProviderType,
    TokenUsage, retry_after_ms,
};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat completions provider. Works with any OpenAI-compatible endpoint.
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl OpenAIProvider {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        if api_key.is_some() {
            tracing::info!("OpenAI provider initialized with API key");
        } else {
            tracing::warn!("OpenAI provider created without API key - OPENAI_API_KEY not set");
        }

        Self {
            client: Client::new(),
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Point at a custom endpoint (e.g., Azure OpenAI or a local proxy)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn message_to_openai(msg: &ChatMessage) -> serde_json::Value {
        serde_json::json!({
            "role": msg.role.as_str(),
            "content": msg.content
        })
    }

    /// Pull `choices[0].message.content` out of the response envelope.
    fn parse_response(json: &serde_json::Value) -> Result<ProviderResponse, ProviderError> {
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                ProviderError::ParseError("Invalid OpenAI response format".to_string())
            })?
            .trim()
            .to_string();

        let usage = json.get("usage").and_then(|u| {
            Some(TokenUsage {
                input_tokens: u["prompt_tokens"].as_u64()? as u32,
                output_tokens: u["completion_tokens"].as_u64()? as u32,
                total_tokens: u["total_tokens"].as_u64()? as u32,
            })
        });

        Ok(ProviderResponse { content, usage })
    }
}

#[async_trait]
impl LLMProviderTrait for OpenAIProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn default_model(&self) -> &str {
        "gpt-4o-mini"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ProviderResponse, ProviderError> {
        let auth_header = self
            .api_key
            .as_ref()
            .map(|k| format!("Bearer {}", k))
            .ok_or_else(|| ProviderError::AuthError("No OpenAI API key configured".to_string()))?;

        let messages: Vec<serde_json::Value> =
            request.messages.iter().map(Self::message_to_openai).collect();

        let payload = serde_json::json!({
            "model": request.config.model,
            "temperature": request.config.temperature,
            "max_tokens": request.config.max_tokens,
            "messages": messages
        });

        tracing::debug!(
            "[OpenAI] Sending request: model={}, messages={}",
            request.config.model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json")
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
                tracing::warn!("[OpenAI] Rate limited: {}", body);
                return Err(ProviderError::RateLimited {
                    retry_after_ms,
                    message: body,
                });
            }

            if status.as_u16() == 401 {
                return Err(ProviderError::AuthError(body));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::providers::{ChatConfig, provider_trait::stub};

    #[test]
    fn parses_choice_content_and_usage() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  {\"action\":\"none\"}\n"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });

        let response = OpenAIProvider::parse_response(&json).unwrap();
        assert_eq!(response.text(), "{\"action\":\"none\"}");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn missing_content_is_a_parse_error() {
        let json = serde_json::json!({"choices": []});
        let err = OpenAIProvider::parse_response(&json).unwrap_err();
        assert!(matches!(err, ProviderError::ParseError(_)));
    }

    #[tokio::test]
    async fn chat_without_key_fails_before_any_request() {
        let provider = OpenAIProvider::new(Some("  ".to_string()));
        assert!(!provider.is_configured());

        let err = provider
            .chat(ChatRequest {
                messages: vec![ChatMessage::user("hi")],
                config: ChatConfig::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthError(_)));
    }

    #[tokio::test]
    async fn rate_limit_keeps_the_upstream_body() {
        let (url, server) = stub::serve_once(
            "429 Too Many Requests",
            &[("Retry-After", "2")],
            "quota exceeded for org-xyz",
        )
        .await;

        let err = OpenAIProvider::new(Some("sk-test".to_string()))
            .with_endpoint(url)
            .chat(ChatRequest {
                messages: vec![ChatMessage::user("hi")],
                config: ChatConfig::default(),
            })
            .await
            .unwrap_err();

        match &err {
            ProviderError::RateLimited {
                retry_after_ms,
                message,
            } => {
                assert_eq!(*retry_after_ms, Some(2000));
                assert_eq!(message, "quota exceeded for org-xyz");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Rate limited: quota exceeded for org-xyz");

        let request = server.await.unwrap();
        assert!(request.contains("Bearer sk-test"));
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let (url, _server) =
            stub::serve_once("500 Internal Server Error", &[], "upstream exploded").await;

        let err = OpenAIProvider::new(Some("sk-test".to_string()))
            .with_endpoint(url)
            .chat(ChatRequest {
                messages: vec![ChatMessage::user("hi")],
                config: ChatConfig::default(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "API error (500): upstream exploded");
    }
}
