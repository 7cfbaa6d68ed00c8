//! In-process provider that replays queued completions.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use super::{
    LLMClient, LLMConfig,
    providers::{
        ChatRequest, LLMProviderTrait, ProviderError, ProviderResponse, ProviderType,
    },
};

enum Scripted {
    Reply(String),
    Failure(ProviderError),
}

/// Returns queued replies in order and records every request it receives.
/// An exhausted script answers with `ProviderError::NotAvailable`.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.lock_script().push_back(Scripted::Reply(text.into()));
    }

    pub fn push_failure(&self, error: ProviderError) {
        self.lock_script().push_back(Scripted::Failure(error));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.lock_script().len()
    }

    /// Wrap this provider in an [`LLMClient`] with default limits.
    pub fn client(self: &Arc<Self>) -> LLMClient {
        LLMClient::with_provider(
            LLMConfig {
                provider: ProviderType::Scripted,
                ..Default::default()
            },
            self.clone(),
        )
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl LLMProviderTrait for ScriptedProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Scripted
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ProviderResponse, ProviderError> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }

        match self.lock_script().pop_front() {
            Some(Scripted::Reply(content)) => Ok(ProviderResponse {
                content,
                usage: None,
            }),
            Some(Scripted::Failure(error)) => Err(error),
            None => Err(ProviderError::NotAvailable(
                "scripted provider has no replies left".to_string(),
            )),
        }
    }
}
