//! One chat turn: prompt, completion, interpretation.

use chrono::{DateTime, Utc};
use db::models::{task::Task, user::User};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use ts_rs::TS;

use crate::{
    Result,
    actions::ActionInterpreter,
    analyzer::TaskAnalyzer,
    brain::{CallKind, LLMClient},
    extract::{Extracted, extract, preview, strip_fences},
    intent::ParsedIntent,
    prompt::{ConversationTurn, build_chat_messages},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatReply {
    pub message: String,
    pub actions_taken: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    llm: LLMClient,
    analyzer: TaskAnalyzer,
}

impl ChatSession {
    pub fn new(llm: LLMClient) -> Self {
        let analyzer = TaskAnalyzer::new(llm.clone());
        Self { llm, analyzer }
    }

    /// Answer `message` for `user`. A completion that holds no JSON object is
    /// returned to the user as-is and nothing is changed.
    pub async fn respond(
        &self,
        pool: &SqlitePool,
        user: &User,
        message: &str,
        history: &[ConversationTurn],
        now: DateTime<Utc>,
    ) -> Result<ChatReply> {
        let snapshot = Task::find_by_user(pool, user.id).await?;
        let messages =
            build_chat_messages(&user.name, &snapshot, history, message, now.date_naive());

        let raw = self
            .llm
            .complete(CallKind::Chat, messages)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    "[CHAT] user={} completion failed ({} history turns): {}",
                    user.id,
                    history.len(),
                    e
                )
            })?;

        tracing::debug!("[CHAT] user={} raw response: {}", user.id, preview(&raw, 500));

        let outcome = match extract(&raw) {
            Extracted::Plain(text) => {
                tracing::debug!("[CHAT] user={} plain text reply", user.id);
                return Ok(ChatReply {
                    message: text,
                    actions_taken: vec![],
                    timestamp: now,
                });
            }
            Extracted::Structured(value) => {
                let parsed = ParsedIntent::from_value(&value);
                ActionInterpreter::new(pool, &self.analyzer, user.id, now)
                    .execute(parsed, &snapshot, &strip_fences(&raw))
                    .await?
            }
        };

        Ok(ChatReply {
            message: outcome.message,
            actions_taken: outcome.actions_taken,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use db::{
        DBService,
        models::{task::CreateTask, user::CreateUser},
    };
    use serde_json::json;

    use super::*;
    use crate::{
        AssistantError,
        brain::{MessageRole, ProviderError, testing::ScriptedProvider},
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 26, 9, 0, 0).unwrap()
    }

    async fn setup() -> (DBService, User, Arc<ScriptedProvider>) {
        let db = DBService::new_in_memory().await.unwrap();
        let user = User::create(
            &db.pool,
            &CreateUser {
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
                password_hash: "x".to_string(),
            },
        )
        .await
        .unwrap();
        (db, user, Arc::new(ScriptedProvider::new()))
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let (db, user, provider) = setup().await;
        provider.push_reply("Sure, I can help!");

        let reply = ChatSession::new(provider.client())
            .respond(&db.pool, &user, "hi", &[], now())
            .await
            .unwrap();

        assert_eq!(reply.message, "Sure, I can help!");
        assert!(reply.actions_taken.is_empty());
        assert_eq!(reply.timestamp, now());
    }

    #[tokio::test]
    async fn fenced_list_tasks_reads_the_snapshot() {
        let (db, user, provider) = setup().await;
        Task::create(
            &db.pool,
            user.id,
            &CreateTask {
                title: "Buy milk".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        provider.push_reply("```json\n{\"action\":\"list_tasks\",\"response\":\"Here\"}\n```");

        let reply = ChatSession::new(provider.client())
            .respond(&db.pool, &user, "what do I have?", &[], now())
            .await
            .unwrap();

        assert!(reply.message.contains("Buy milk"));
        assert_eq!(reply.actions_taken, vec!["Listed all tasks"]);
    }

    #[tokio::test]
    async fn history_is_replayed_between_system_and_message() {
        let (db, user, provider) = setup().await;
        provider.push_reply(r#"{"action":"none","response":"Noted."}"#);
        let history = ConversationTurn::parse_history(&[
            json!({"role": "user", "content": "I have a meeting tomorrow"}),
            json!({"role": "assistant", "content": "What time?"}),
        ]);

        let reply = ChatSession::new(provider.client())
            .respond(&db.pool, &user, "3pm", &history, now())
            .await
            .unwrap();
        assert_eq!(reply.message, "Noted.");

        let request = &provider.requests()[0];
        let roles: Vec<MessageRole> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
            ]
        );
        assert_eq!(request.messages[3].content, "3pm");
        assert!(request.messages[0].content.contains("2026-02-26"));
    }

    #[tokio::test]
    async fn create_intent_runs_the_analyzer() {
        let (db, user, provider) = setup().await;
        provider.push_reply(
            r#"{"action":"create_task_smart","task_title":"File taxes","due_date":"2026-02-27","response":"On it"}"#,
        );
        provider.push_reply(r#"{"priority":"high","estimated_hours":3,"reasoning":"Due soon"}"#);

        let reply = ChatSession::new(provider.client())
            .respond(&db.pool, &user, "remind me to file taxes tomorrow", &[], now())
            .await
            .unwrap();

        assert_eq!(reply.actions_taken.len(), 1);
        let stored = Task::find_by_user(&db.pool, user.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "File taxes");
        assert_eq!(stored[0].estimated_hours, Some(3));
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn intent_without_response_falls_back_to_unfenced_text() {
        let (db, user, provider) = setup().await;
        provider.push_reply("```json\n{\"action\":\"none\"}\n```");

        let reply = ChatSession::new(provider.client())
            .respond(&db.pool, &user, "hello", &[], now())
            .await
            .unwrap();

        assert_eq!(reply.message, "{\"action\":\"none\"}");
        assert!(!reply.message.contains("```"));
        assert!(reply.actions_taken.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error() {
        let (db, user, provider) = setup().await;
        provider.push_failure(ProviderError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        });

        let err = ChatSession::new(provider.client())
            .respond(&db.pool, &user, "hi", &[], now())
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::Upstream(_)));
        assert!(err.to_string().contains("overloaded"));
    }
}
