//! Turns free-form document text into tasks.

use db::models::task::{CreateTask, Task, TaskPriority};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use ts_rs::TS;
use utils::dates::parse_due_date;

use crate::{
    AssistantError, Result,
    brain::{CallKind, ChatMessage, LLMClient},
    extract::{Extracted, extract, preview},
};

/// Only the head of a document is sent to the model.
pub const MAX_DOCUMENT_CHARS: usize = 4000;
const DEFAULT_SUMMARY: &str = "Document analyzed";
const STAGE: &str = "document extractor";

const SYSTEM_PROMPT: &str = r#"You are a task extraction AI. Analyze the following document and extract actionable tasks.

RULES:
1. Identify specific action items, deliverables, or things that need to be done
2. Each task should be clear and actionable
3. Extract deadlines if mentioned
4. Categorize by priority if possible (high/medium/low)
5. Return ONLY a JSON object, no markdown, no explanation

Respond with this EXACT JSON structure:
{
  "summary": "Brief summary of the document",
  "tasks": [
    {
      "title": "Clear, actionable task title",
      "description": "Optional details or context",
      "priority": "high" | "medium" | "low",
      "deadline": "YYYY-MM-DD or null"
    }
  ]
}

Extract between 3-10 tasks. Focus on the most important actionable items."#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExtractedTask {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentAnalysis {
    pub summary: String,
    pub tasks: Vec<ExtractedTask>,
}

#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    llm: LLMClient,
}

impl DocumentExtractor {
    pub fn new(llm: LLMClient) -> Self {
        Self { llm }
    }

    /// Extract tasks from `text` and create them for `user_id` in one
    /// transaction. Entries without a title are skipped.
    pub async fn analyze(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        text: &str,
    ) -> Result<DocumentAnalysis> {
        let head = preview(text, MAX_DOCUMENT_CHARS);
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("DOCUMENT TEXT:\n\n{}", head)),
        ];

        let raw = self
            .llm
            .complete(CallKind::Document, messages)
            .await
            .inspect_err(|e| {
                tracing::error!("[DOCUMENTS] user={} completion failed: {}", user_id, e)
            })?;

        let value = match extract(&raw) {
            Extracted::Structured(value) => value,
            Extracted::Plain(text) => {
                tracing::error!(
                    "[DOCUMENTS] user={} unparseable response: {}",
                    user_id,
                    preview(&text, 500)
                );
                return Err(AssistantError::malformed(STAGE, "an invalid format"));
            }
        };

        let Some(entries) = value.get("tasks").and_then(Value::as_array) else {
            tracing::error!(
                "[DOCUMENTS] user={} response has no tasks list: {}",
                user_id,
                preview(&raw, 500)
            );
            return Err(AssistantError::malformed(STAGE, "an invalid format"));
        };

        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(entries.len());

        for entry in entries {
            let Some(title) = entry
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
            else {
                continue;
            };

            let description = entry
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
            let priority = entry
                .get("priority")
                .and_then(Value::as_str)
                .and_then(|p| p.parse().ok())
                .unwrap_or_default();
            let deadline = entry
                .get("deadline")
                .and_then(Value::as_str)
                .filter(|d| !d.eq_ignore_ascii_case("null"))
                .map(str::to_string);

            let task = Task::create(
                &mut *tx,
                user_id,
                &CreateTask {
                    title: title.to_string(),
                    description: description.clone(),
                    due_date: deadline.as_deref().and_then(parse_due_date),
                    priority: Some(priority),
                    ..Default::default()
                },
            )
            .await?;

            created.push(ExtractedTask {
                id: task.id,
                title: task.title,
                description,
                priority,
                deadline,
            });
        }

        tx.commit().await?;

        let summary = value
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SUMMARY)
            .to_string();

        tracing::info!(
            "[DOCUMENTS] user={} created {} tasks from {} chars",
            user_id,
            created.len(),
            head.chars().count()
        );

        Ok(DocumentAnalysis {
            summary,
            tasks: created,
        })
    }
}
