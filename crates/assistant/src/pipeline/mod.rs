//! Four-stage planning pipeline: planner, executor, reviewer, coordinator.
//!
//! Stages run strictly one after another and each one receives the JSON of
//! the stages before it. The run is all-or-nothing: a failed call, an
//! unparseable stage result or a coordinator without `final_tasks` aborts the
//! pipeline before any task is written.

mod conversation;
mod prompts;

use std::fmt;

use db::models::task::{CreateTask, Task};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use ts_rs::TS;

pub use conversation::AgentTurn;
use conversation::scalar_text;

use crate::{
    AssistantError, Result,
    brain::{CallKind, ChatMessage, LLMClient},
    extract::{Extracted, extract, preview},
};

const DEFAULT_PRIORITY: &str = "medium";
const DEFAULT_PHASE: &str = "Phase 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planner,
    Executor,
    Reviewer,
    Coordinator,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Planner => "planner",
            Stage::Executor => "executor",
            Stage::Reviewer => "reviewer",
            Stage::Coordinator => "coordinator",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatedPlanTask {
    pub id: i64,
    pub title: String,
    pub priority: String,
    pub phase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PipelineReport {
    pub goal: String,
    #[ts(type = "Record<string, unknown>")]
    pub planner_analysis: Value,
    #[ts(type = "Record<string, unknown>")]
    pub executor_analysis: Value,
    #[ts(type = "Record<string, unknown>")]
    pub reviewer_suggestions: Value,
    #[ts(type = "Record<string, unknown>")]
    pub final_plan: Value,
    pub tasks_created: Vec<CreatedPlanTask>,
    pub agent_conversation: Vec<AgentTurn>,
}

#[derive(Debug, Clone)]
pub struct PipelineOrchestrator {
    llm: LLMClient,
}

impl PipelineOrchestrator {
    pub fn new(llm: LLMClient) -> Self {
        Self { llm }
    }

    pub async fn process(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        goal: &str,
        context: Option<&str>,
    ) -> Result<PipelineReport> {
        let snapshot = Task::find_by_user(pool, user_id).await?;
        let context = context.unwrap_or_default();

        tracing::info!(
            "[PIPELINE] user={} starting with {} current tasks",
            user_id,
            snapshot.len()
        );

        let planner = self
            .run_stage(user_id, Stage::Planner, prompts::planner(goal, context, &snapshot))
            .await?;
        let executor = self
            .run_stage(user_id, Stage::Executor, prompts::executor(&planner, &snapshot))
            .await?;
        let reviewer = self
            .run_stage(user_id, Stage::Reviewer, prompts::reviewer(&planner, &executor))
            .await?;
        let coordinator = self
            .run_stage(
                user_id,
                Stage::Coordinator,
                prompts::coordinator(goal, &planner, &executor, &reviewer),
            )
            .await?;

        let tasks_created = materialize(pool, user_id, &coordinator).await?;
        let agent_conversation =
            conversation::build_log(&planner, &executor, &reviewer, &coordinator);

        tracing::info!(
            "[PIPELINE] user={} created {} tasks",
            user_id,
            tasks_created.len()
        );

        Ok(PipelineReport {
            goal: goal.to_string(),
            planner_analysis: planner,
            executor_analysis: executor,
            reviewer_suggestions: reviewer,
            final_plan: coordinator,
            tasks_created,
            agent_conversation,
        })
    }

    async fn run_stage(&self, user_id: i64, stage: Stage, prompt: String) -> Result<Value> {
        let messages = vec![
            ChatMessage::system(prompts::AGENT_SYSTEM_MESSAGE),
            ChatMessage::user(prompt),
        ];

        let raw = self
            .llm
            .complete(CallKind::Agent, messages)
            .await
            .map_err(|source| {
                tracing::error!(
                    "[PIPELINE] user={} agent={} call failed: {}",
                    user_id,
                    stage,
                    source
                );
                AssistantError::AgentUpstream {
                    stage: stage.to_string(),
                    source,
                }
            })?;

        tracing::debug!(
            "[PIPELINE] user={} agent={} raw response: {}",
            user_id,
            stage,
            preview(&raw, 500)
        );

        if raw.trim().is_empty() {
            tracing::error!("[PIPELINE] user={} agent={} returned nothing", user_id, stage);
            return Err(AssistantError::malformed(
                format!("{} agent", stage),
                "an empty response",
            ));
        }

        match extract(&raw) {
            Extracted::Structured(value) => Ok(value),
            Extracted::Plain(text) => {
                tracing::error!(
                    "[PIPELINE] user={} agent={} final parse failed: {}",
                    user_id,
                    stage,
                    preview(&text, 500)
                );
                Err(AssistantError::malformed(
                    format!("{} agent", stage),
                    "unparseable JSON",
                ))
            }
        }
    }
}

/// Create one task per `final_tasks` entry inside a single transaction.
/// Priority, phase and estimate are appended to the description text.
async fn materialize(
    pool: &SqlitePool,
    user_id: i64,
    coordinator: &Value,
) -> Result<Vec<CreatedPlanTask>> {
    let Some(entries) = coordinator.get("final_tasks").and_then(Value::as_array) else {
        tracing::error!(
            "[PIPELINE] user={} coordinator returned no final_tasks list",
            user_id
        );
        return Err(AssistantError::MissingFinalTasks);
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
            tracing::warn!("[PIPELINE] user={} skipping untitled final task", user_id);
            continue;
        };

        let priority = scalar_text(entry.get("priority"));
        let phase = scalar_text(entry.get("phase"));
        let hours = scalar_text(entry.get("estimated_hours"));

        let mut description = entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(priority) = &priority {
            description.push_str(&format!("\n\nPriority: {}", priority));
        }
        if let Some(phase) = &phase {
            description.push_str(&format!("\nPhase: {}", phase));
        }
        if let Some(hours) = &hours {
            description.push_str(&format!("\nEstimated: {} hours", hours));
        }
        let description = description.trim().to_string();

        let task = Task::create(
            &mut *tx,
            user_id,
            &CreateTask {
                title: title.to_string(),
                description: (!description.is_empty()).then_some(description),
                ..Default::default()
            },
        )
        .await?;

        created.push(CreatedPlanTask {
            id: task.id,
            title: task.title,
            priority: priority.unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
            phase: phase.unwrap_or_else(|| DEFAULT_PHASE.to_string()),
        });
    }

    tx.commit().await?;
    Ok(created)
}
