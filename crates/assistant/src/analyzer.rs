//! Priority and effort estimation for a single task.
//!
//! The model is asked first; any upstream failure or unusable output falls
//! back to a rule keyed on days until the due date, so analysis always
//! produces a result and never blocks task creation.

use chrono::{DateTime, Utc};
use db::models::task::{Task, TaskPriority};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use ts_rs::TS;
use utils::dates::days_until;

use crate::{
    Result,
    brain::{CallKind, ChatMessage, LLMClient},
    extract::{Extracted, extract, preview},
    prompt::PromptTemplate,
};

pub const FALLBACK_REASONING: &str = "Auto-determined based on due date";
const DEFAULT_REASONING: &str = "AI analysis complete";
const DEFAULT_HOURS: i64 = 2;

const SYSTEM_MESSAGE: &str = "You are a task analysis AI. Respond only with valid JSON.";

const ANALYSIS_PROMPT: PromptTemplate = PromptTemplate::new(
    r#"Analyze this task and determine priority and estimated hours.

TASK: {{title}}
DUE: {{due}}
WORKLOAD: {{pending}} pending tasks

PRIORITY RULES:
- HIGH: Due in 0-2 days OR urgent keywords
- MEDIUM: Due in 3-7 days OR moderate task
- LOW: Due in 8+ days OR simple task

ESTIMATION RULES:
- Simple tasks: 0.5-2 hours
- Medium tasks: 2-8 hours
- Complex tasks: 8-40 hours

Respond ONLY with this JSON (no markdown, no explanation):
{
  "priority": "high",
  "estimated_hours": 2,
  "reasoning": "Brief explanation"
}"#,
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskAnalysis {
    pub priority: TaskPriority,
    pub estimated_hours: i64,
    pub reasoning: String,
}

impl TaskAnalysis {
    /// Deterministic estimate from the due date alone.
    pub fn fallback(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let (priority, estimated_hours) = match due.map(|due| days_until(due, now)) {
            Some(days) if days <= 2 => (TaskPriority::High, 1),
            Some(days) if days <= 7 => (TaskPriority::Medium, 2),
            _ => (TaskPriority::Low, 1),
        };

        TaskAnalysis {
            priority,
            estimated_hours,
            reasoning: FALLBACK_REASONING.to_string(),
        }
    }

    /// Normalise the model's object: unknown priorities become medium and
    /// hours become a positive integer, rounding fractions up.
    fn from_model(value: &Value) -> Self {
        let priority = value
            .get("priority")
            .and_then(Value::as_str)
            .and_then(|p| p.parse().ok())
            .unwrap_or_default();

        let estimated_hours = value
            .get("estimated_hours")
            .and_then(|hours| match hours {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|hours| hours.is_finite())
            .map(|hours| (hours.ceil() as i64).max(1))
            .unwrap_or(DEFAULT_HOURS);

        let reasoning = value
            .get("reasoning")
            .and_then(Value::as_str)
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_REASONING)
            .to_string();

        TaskAnalysis {
            priority,
            estimated_hours,
            reasoning,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskAnalyzer {
    llm: LLMClient,
}

impl TaskAnalyzer {
    pub fn new(llm: LLMClient) -> Self {
        Self { llm }
    }

    /// Analyse a task for `user_id`. Only a database failure while counting
    /// the owner's pending tasks is returned as an error.
    pub async fn analyze(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        title: &str,
        due: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<TaskAnalysis> {
        let pending = Task::count_pending(pool, user_id).await?;

        let due_text = match due {
            Some(due) => format!("{} days", days_until(due, now)),
            None => "Not set".to_string(),
        };
        let pending_text = pending.to_string();
        let prompt = ANALYSIS_PROMPT.render(&[
            ("title", title),
            ("due", &due_text),
            ("pending", &pending_text),
        ]);

        let messages = vec![ChatMessage::system(SYSTEM_MESSAGE), ChatMessage::user(prompt)];

        match self.llm.complete(CallKind::Analyzer, messages).await {
            Ok(raw) => match extract(&raw) {
                Extracted::Structured(value) => {
                    let analysis = TaskAnalysis::from_model(&value);
                    tracing::debug!(
                        "[ANALYZER] user={} title={:?} -> {} / {}h",
                        user_id,
                        title,
                        analysis.priority,
                        analysis.estimated_hours
                    );
                    Ok(analysis)
                }
                Extracted::Plain(text) => {
                    tracing::warn!(
                        "[ANALYZER] user={} unparseable analysis, using fallback. Response: {}",
                        user_id,
                        preview(&text, 500)
                    );
                    Ok(TaskAnalysis::fallback(due, now))
                }
            },
            Err(e) => {
                tracing::warn!(
                    "[ANALYZER] user={} analysis call failed, using fallback: {}",
                    user_id,
                    e
                );
                Ok(TaskAnalysis::fallback(due, now))
            }
        }
    }
}
