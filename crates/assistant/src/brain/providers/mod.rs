//! Completion provider abstraction
//!
//! Every provider takes a role-tagged message list and returns one text
//! completion; the response envelope stays inside the provider.

mod anthropic;
mod openai;
mod provider_trait;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;
pub use provider_trait::{
    ChatConfig, ChatMessage, ChatRequest, LLMProviderTrait, MessageRole, ProviderError,
    ProviderResponse, ProviderType, TokenUsage,
};
