//! Executes a parsed chat intent against the owner's tasks.
//!
//! Every lookup is scoped to the requesting user. A task that cannot be
//! resolved never becomes an error; it turns into a message for the user and
//! nothing is written.

use chrono::{DateTime, Utc};
use db::models::task::{CreateTask, Task, TaskError};
use sqlx::SqlitePool;
use utils::dates::parse_due_date;

use crate::{
    Result,
    analyzer::{TaskAnalysis, TaskAnalyzer},
    intent::{DeleteCriteria, Intent, ParsedIntent, TaskDraft, TaskRef},
    prompt::TaskCounts,
};

/// What the user sees after a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub message: String,
    pub actions_taken: Vec<String>,
}

pub struct ActionInterpreter<'a> {
    pool: &'a SqlitePool,
    analyzer: &'a TaskAnalyzer,
    user_id: i64,
    now: DateTime<Utc>,
}

/// A confirmation that replaces the model's own `response`, if any.
struct Effect {
    actions: Vec<String>,
    response: Option<String>,
}

impl Effect {
    fn nothing() -> Self {
        Effect {
            actions: vec![],
            response: None,
        }
    }

    fn say(response: String) -> Self {
        Effect {
            actions: vec![],
            response: Some(response),
        }
    }
}

impl<'a> ActionInterpreter<'a> {
    pub fn new(
        pool: &'a SqlitePool,
        analyzer: &'a TaskAnalyzer,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            pool,
            analyzer,
            user_id,
            now,
        }
    }

    /// Run `parsed` against the store. `snapshot` is the task list the prompt
    /// was built from; `fallback` is the fence-stripped completion, used when
    /// the model gave no `response` of its own.
    pub async fn execute(
        &self,
        parsed: ParsedIntent,
        snapshot: &[Task],
        fallback: &str,
    ) -> Result<ActionOutcome> {
        let effect = match &parsed.intent {
            Intent::AskForDetails | Intent::None => Effect::nothing(),
            Intent::Unknown(name) => {
                tracing::debug!("[CHAT] user={} unknown action {:?}", self.user_id, name);
                Effect::nothing()
            }
            Intent::CreateTaskSmart(None) | Intent::CreateMultipleTasks(None) => Effect::nothing(),
            Intent::CreateTaskSmart(Some(draft)) => self.create_one(draft).await?,
            Intent::CreateMultipleTasks(Some(drafts)) => self.create_many(drafts).await,
            Intent::ListTasks => list_tasks(snapshot),
            Intent::CompleteTask(None) => Effect::nothing(),
            Intent::CompleteTask(Some(task_ref)) => self.complete(task_ref).await?,
            Intent::DeleteTask {
                task_id,
                task_title,
            } => self.delete_one(task_id.as_ref(), task_title.as_deref()).await?,
            Intent::DeleteMultiple { criteria, task_ids } => {
                self.delete_many(*criteria, task_ids.as_deref()).await?
            }
        };

        tracing::info!(
            "[CHAT] user={} action={} actions_taken={:?}",
            self.user_id,
            parsed.intent.name(),
            effect.actions
        );

        let message = effect
            .response
            .or(parsed.response)
            .unwrap_or_else(|| fallback.to_string());

        Ok(ActionOutcome {
            message,
            actions_taken: effect.actions,
        })
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<(Task, TaskAnalysis)> {
        let due = draft.due_date.as_deref().and_then(parse_due_date);
        let analysis = self
            .analyzer
            .analyze(self.pool, self.user_id, &draft.title, due, self.now)
            .await?;

        let task = Task::create(
            self.pool,
            self.user_id,
            &CreateTask {
                title: draft.title.clone(),
                due_date: due,
                priority: Some(analysis.priority),
                estimated_hours: Some(analysis.estimated_hours),
                ..Default::default()
            },
        )
        .await?;

        Ok((task, analysis))
    }

    async fn create_one(&self, draft: &TaskDraft) -> Result<Effect> {
        let (task, analysis) = self.create_task(draft).await?;

        Ok(Effect {
            actions: vec![format!("Created task: {}", task.title)],
            response: Some(format!(
                "✅ I've added '{}' to your tasks!\n\n🤖 AI Analysis:\n- Priority: {}\n- Estimated: {} hours\n- Reason: {}",
                task.title,
                analysis.priority.label(),
                analysis.estimated_hours,
                analysis.reasoning
            )),
        })
    }

    /// One task per draft. A failing item is logged and skipped.
    async fn create_many(&self, drafts: &[TaskDraft]) -> Effect {
        let mut lines = Vec::with_capacity(drafts.len());

        for draft in drafts {
            match self.create_task(draft).await {
                Ok((task, analysis)) => lines.push(format!(
                    "✅ {} ({} {}, {}h)",
                    task.title,
                    analysis.priority.glyph(),
                    analysis.priority.label(),
                    analysis.estimated_hours
                )),
                Err(e) => tracing::warn!(
                    "[CHAT] user={} failed to create {:?}: {}",
                    self.user_id,
                    draft.title,
                    e
                ),
            }
        }

        let count = lines.len();
        Effect {
            actions: vec![format!("Created {} tasks", count)],
            response: Some(format!(
                "🎉 I've created {} tasks with AI analysis!\n\n{}",
                count,
                lines.join("\n")
            )),
        }
    }

    async fn complete(&self, task_ref: &TaskRef) -> Result<Effect> {
        let not_found = || Effect::say(format!("I couldn't find task ID {}.", task_ref));

        let Some(id) = task_ref.id else {
            return Ok(not_found());
        };

        match Task::set_completed(self.pool, id, self.user_id, true).await {
            Ok(task) => Ok(Effect {
                actions: vec![format!("Completed task: {}", task.title)],
                response: None,
            }),
            Err(TaskError::NotFound) => Ok(not_found()),
            Err(TaskError::Database(e)) => Err(e.into()),
        }
    }

    async fn delete_one(&self, task_id: Option<&TaskRef>, task_title: Option<&str>) -> Result<Effect> {
        let mut task = None;

        if let Some(id) = task_id.and_then(|r| r.id) {
            task = Task::find_by_id_for_user(self.pool, id, self.user_id).await?;
        }

        if task.is_none()
            && let Some(title) = task_title
        {
            task = Task::find_by_title_for_user(self.pool, title, self.user_id).await?;
        }

        match task {
            Some(task) => {
                Task::delete(self.pool, task.id, self.user_id).await?;
                Ok(Effect {
                    actions: vec![format!("Deleted task: {}", task.title)],
                    response: Some(format!("I've deleted '{}' from your tasks!", task.title)),
                })
            }
            None => {
                let term = task_title
                    .map(str::to_string)
                    .or_else(|| task_id.map(ToString::to_string))
                    .unwrap_or_else(|| "that task".to_string());
                Ok(Effect::say(format!(
                    "I couldn't find a task matching '{}'. Could you be more specific?",
                    term
                )))
            }
        }
    }

    /// A recognised criteria wins over `task_ids`. An empty id list is a no-op.
    async fn delete_many(
        &self,
        criteria: Option<DeleteCriteria>,
        task_ids: Option<&[i64]>,
    ) -> Result<Effect> {
        let targets = match (criteria, task_ids) {
            (Some(DeleteCriteria::Completed), _) => {
                Task::find_by_completion(self.pool, self.user_id, true).await?
            }
            (Some(DeleteCriteria::Pending), _) => {
                Task::find_by_completion(self.pool, self.user_id, false).await?
            }
            (Some(DeleteCriteria::All), _) => Task::find_by_user(self.pool, self.user_id).await?,
            (None, Some(ids)) if !ids.is_empty() => {
                Task::find_by_ids_for_user(self.pool, ids, self.user_id).await?
            }
            (None, _) => vec![],
        };

        if targets.is_empty() {
            return Ok(Effect::say(
                "I couldn't find any tasks matching that criteria.".to_string(),
            ));
        }

        let ids: Vec<i64> = targets.iter().map(|t| t.id).collect();
        Task::delete_many(self.pool, &ids, self.user_id).await?;

        let titles: Vec<&str> = targets.iter().map(|t| t.title.as_str()).collect();
        let count = titles.len();
        let joined = titles.join(", ");

        Ok(Effect {
            actions: vec![format!("Deleted {} tasks: {}", count, joined)],
            response: Some(format!(
                "I've deleted {} task{}: {}",
                count,
                if count > 1 { "s" } else { "" },
                joined
            )),
        })
    }
}

fn list_tasks(snapshot: &[Task]) -> Effect {
    let response = if snapshot.is_empty() {
        "You don't have any tasks yet! 🎉 Would you like me to create one?".to_string()
    } else {
        let counts = TaskCounts::from_tasks(snapshot);
        let lines = snapshot
            .iter()
            .map(|task| {
                format!(
                    "{} {} {} - {}",
                    if task.is_completed { "✅" } else { "⬜" },
                    task.priority.glyph(),
                    task.priority.label(),
                    task.title
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Here are your tasks:\n\n{}\n\nTotal: {} tasks ({} pending, {} completed)",
            lines, counts.total, counts.pending, counts.completed
        )
    };

    Effect {
        actions: vec!["Listed all tasks".to_string()],
        response: Some(response),
    }
}
