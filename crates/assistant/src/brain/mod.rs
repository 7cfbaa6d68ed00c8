use std::{sync::Arc, time::Duration};

pub mod providers;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use providers::{
    AnthropicProvider, ChatConfig, ChatMessage, ChatRequest, LLMProviderTrait, MessageRole,
    OpenAIProvider, ProviderError, ProviderType,
};

/// Which flow a completion belongs to. Each kind has its own token and time
/// limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Chat,
    Analyzer,
    Agent,
    Document,
}

impl CallKind {
    fn max_tokens(&self) -> u32 {
        match self {
            CallKind::Analyzer => 500,
            CallKind::Chat | CallKind::Agent | CallKind::Document => 2048,
        }
    }
}

/// Configuration for the completion client
#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub provider: ProviderType,
    /// `None` uses the provider's default model.
    pub model: Option<String>,
    pub temperature: f32,
    pub chat_timeout: Duration,
    pub analyzer_timeout: Duration,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::OpenAI,
            model: None,
            temperature: 0.3,
            chat_timeout: Duration::from_secs(60),
            analyzer_timeout: Duration::from_secs(30),
            openai_api_key: None,
            openai_base_url: None,
            anthropic_api_key: None,
        }
    }
}

/// Thin wrapper around the configured completion provider
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    provider: Arc<dyn LLMProviderTrait>,
}

impl std::fmt::Debug for LLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMClient")
            .field("provider", &self.provider.name())
            .field("model", &self.model())
            .finish()
    }
}

impl LLMClient {
    pub fn new(config: LLMConfig) -> Self {
        let provider: Arc<dyn LLMProviderTrait> = match config.provider {
            ProviderType::Anthropic => {
                Arc::new(AnthropicProvider::new(config.anthropic_api_key.clone()))
            }
            #[cfg(any(test, feature = "test-utils"))]
            ProviderType::Scripted => Arc::new(testing::ScriptedProvider::new()),
            ProviderType::OpenAI => {
                let provider = OpenAIProvider::new(config.openai_api_key.clone());
                match config.openai_base_url.as_deref() {
                    Some(base) => Arc::new(provider.with_endpoint(chat_completions_url(base))),
                    None => Arc::new(provider),
                }
            }
        };

        Self::with_provider(config, provider)
    }

    pub fn with_provider(config: LLMConfig, provider: Arc<dyn LLMProviderTrait>) -> Self {
        Self { config, provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn model(&self) -> String {
        self.config
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    fn chat_config(&self, kind: CallKind) -> ChatConfig {
        let timeout = match kind {
            CallKind::Analyzer => self.config.analyzer_timeout,
            CallKind::Chat | CallKind::Agent | CallKind::Document => self.config.chat_timeout,
        };

        ChatConfig {
            model: self.model(),
            temperature: self.config.temperature,
            max_tokens: kind.max_tokens(),
            timeout,
        }
    }

    /// Send one completion request and return the raw text.
    pub async fn complete(
        &self,
        kind: CallKind,
        messages: Vec<ChatMessage>,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            messages,
            config: self.chat_config(kind),
        };

        let start = std::time::Instant::now();
        let response = self.provider.chat(request).await?;

        tracing::debug!(
            "[{}] {:?} completion in {:?} ({} chars)",
            self.provider.name(),
            kind,
            start.elapsed(),
            response.content.len()
        );

        Ok(response.content)
    }
}

/// Accept either a base URL (`https://host/v1`) or a full chat completions URL.
fn chat_completions_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::testing::ScriptedProvider;

    #[test]
    fn base_url_is_completed() {
        assert_eq!(
            chat_completions_url("http://localhost:11434/v1/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://proxy.local/v1/chat/completions"),
            "https://proxy.local/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn call_kind_selects_limits() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_reply("ok");
        provider.push_reply("ok");
        let client = LLMClient::with_provider(
            LLMConfig {
                model: Some("test-model".to_string()),
                ..Default::default()
            },
            provider.clone(),
        );

        client
            .complete(CallKind::Analyzer, vec![ChatMessage::user("a")])
            .await
            .unwrap();
        client
            .complete(CallKind::Chat, vec![ChatMessage::user("b")])
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests[0].config.max_tokens, 500);
        assert_eq!(requests[0].config.timeout, Duration::from_secs(30));
        assert_eq!(requests[1].config.max_tokens, 2048);
        assert_eq!(requests[1].config.timeout, Duration::from_secs(60));
        assert_eq!(requests[1].config.model, "test-model");
    }

    #[test]
    fn scripted_config_builds_a_scripted_provider() {
        let client = LLMClient::new(LLMConfig {
            provider: ProviderType::Scripted,
            ..Default::default()
        });
        assert_eq!(client.provider_name(), "Scripted");

        let client = LLMClient::new(LLMConfig::default());
        assert_eq!(client.provider_name(), "OpenAI");
        assert!("scripted".parse::<ProviderType>().is_err());
    }
}
