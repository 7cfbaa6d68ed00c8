//! Typed view of the JSON intent object the chat model returns.
//!
//! The model's output has no fixed shape, so every field is read leniently:
//! a field with the wrong JSON type counts as absent and unknown fields are
//! ignored. Whether an absent field makes the action a no-op is decided by the
//! interpreter.

use std::fmt;

use serde_json::Value;

/// Reference to a task as the model wrote it. `id` is `None` when the value
/// was not an integer; `raw` keeps the original text for messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub id: Option<i64>,
    pub raw: String,
}

impl TaskRef {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(TaskRef {
                id: number
                    .as_i64()
                    .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
                raw: number.to_string(),
            }),
            Value::String(text) => Some(TaskRef {
                id: text.trim().parse().ok(),
                raw: text.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A task the model asked to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    /// Unparsed; the interpreter decides what a usable date is.
    pub due_date: Option<String>,
}

impl TaskDraft {
    fn from_fields(title: Option<&Value>, due_date: Option<&Value>) -> Option<Self> {
        let title = title?.as_str()?.trim();
        if title.is_empty() {
            return None;
        }
        Some(TaskDraft {
            title: title.to_string(),
            due_date: due_date.and_then(Value::as_str).map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCriteria {
    Completed,
    All,
    Pending,
}

impl DeleteCriteria {
    fn parse(value: &Value) -> Option<Self> {
        match value.as_str()?.trim().to_lowercase().as_str() {
            "completed" => Some(DeleteCriteria::Completed),
            "all" => Some(DeleteCriteria::All),
            "pending" => Some(DeleteCriteria::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    AskForDetails,
    /// `None` when the title is missing; the action is then a no-op.
    CreateTaskSmart(Option<TaskDraft>),
    /// `None` when `tasks` is not a list. Items without a title are dropped.
    CreateMultipleTasks(Option<Vec<TaskDraft>>),
    ListTasks,
    CompleteTask(Option<TaskRef>),
    DeleteTask {
        task_id: Option<TaskRef>,
        task_title: Option<String>,
    },
    DeleteMultiple {
        criteria: Option<DeleteCriteria>,
        /// `None` when `task_ids` is absent or not a list.
        task_ids: Option<Vec<i64>>,
    },
    /// `"none"` or no action at all.
    None,
    /// An action name outside the vocabulary.
    Unknown(String),
}

impl Intent {
    pub fn name(&self) -> &str {
        match self {
            Intent::AskForDetails => "ask_for_details",
            Intent::CreateTaskSmart(_) => "create_task_smart",
            Intent::CreateMultipleTasks(_) => "create_multiple_tasks",
            Intent::ListTasks => "list_tasks",
            Intent::CompleteTask(_) => "complete_task",
            Intent::DeleteTask { .. } => "delete_task",
            Intent::DeleteMultiple { .. } => "delete_multiple",
            Intent::None => "none",
            Intent::Unknown(name) => name,
        }
    }
}

/// An intent plus the model's own user-facing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIntent {
    pub intent: Intent,
    pub response: Option<String>,
}

impl ParsedIntent {
    pub fn from_value(value: &Value) -> Self {
        let response = value
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string);

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .map(|a| a.trim().to_lowercase())
            .unwrap_or_else(|| "none".to_string());

        let intent = match action.as_str() {
            "ask_for_details" => Intent::AskForDetails,
            "create_task_smart" => Intent::CreateTaskSmart(TaskDraft::from_fields(
                value.get("task_title"),
                value.get("due_date"),
            )),
            "create_multiple_tasks" => Intent::CreateMultipleTasks(
                value.get("tasks").and_then(Value::as_array).map(|items| {
                    items
                        .iter()
                        .filter_map(|item| {
                            TaskDraft::from_fields(item.get("title"), item.get("due_date"))
                        })
                        .collect()
                }),
            ),
            "list_tasks" => Intent::ListTasks,
            "complete_task" => {
                Intent::CompleteTask(value.get("task_id").and_then(TaskRef::from_value))
            }
            "delete_task" => Intent::DeleteTask {
                task_id: value.get("task_id").and_then(TaskRef::from_value),
                task_title: value
                    .get("task_title")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            "delete_multiple" => Intent::DeleteMultiple {
                criteria: value.get("delete_criteria").and_then(DeleteCriteria::parse),
                task_ids: value.get("task_ids").and_then(Value::as_array).map(|ids| {
                    ids.iter()
                        .filter_map(TaskRef::from_value)
                        .filter_map(|r| r.id)
                        .collect()
                }),
            },
            "none" | "" => Intent::None,
            other => Intent::Unknown(other.to_string()),
        };

        ParsedIntent { intent, response }
    }
}
