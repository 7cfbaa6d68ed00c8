use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Task not found")]
    NotFound,
}

#[derive(
    Debug, Clone, Copy, Default, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    /// Upper-case label used in chat confirmations.
    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            TaskPriority::Low => "🟢",
            TaskPriority::Medium => "🟡",
            TaskPriority::High => "🔴",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub estimated_hours: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn status_label(&self) -> &'static str {
        if self.is_completed { "completed" } else { "pending" }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub estimated_hours: Option<i64>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub estimated_hours: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Completed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum DueFilter {
    Overdue,
    Today,
    Upcoming,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<StatusFilter>,
    pub priority: Option<TaskPriority>,
    pub due: Option<DueFilter>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub overdue: i64,
    pub due_today: i64,
    pub high_priority: i64,
    pub total_hours_estimated: i64,
}

/// Bounds of the UTC calendar day containing `now`.
fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

impl Task {
    /// Full task list for one owner, oldest first. This is the snapshot the
    /// assistant reasons over.
    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE user_id = ?1 ORDER BY id ASC")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_filtered(
        pool: &SqlitePool,
        user_id: i64,
        filter: &TaskFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM tasks WHERE user_id = ");
        builder.push_bind(user_id);

        match filter.status {
            Some(StatusFilter::Completed) => {
                builder.push(" AND is_completed = 1");
            }
            Some(StatusFilter::Pending) => {
                builder.push(" AND is_completed = 0");
            }
            None => {}
        }

        if let Some(priority) = filter.priority {
            builder.push(" AND priority = ").push_bind(priority);
        }

        match filter.due {
            Some(DueFilter::Overdue) => {
                builder
                    .push(" AND due_date IS NOT NULL AND due_date < ")
                    .push_bind(now)
                    .push(" AND is_completed = 0");
            }
            Some(DueFilter::Today) => {
                let (start, end) = day_bounds(now);
                builder
                    .push(" AND due_date >= ")
                    .push_bind(start)
                    .push(" AND due_date < ")
                    .push_bind(end);
            }
            Some(DueFilter::Upcoming) => {
                builder.push(" AND due_date > ").push_bind(now);
            }
            None => {}
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            builder
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        if filter.due == Some(DueFilter::Upcoming) {
            builder.push(" ORDER BY due_date ASC, id ASC");
        } else {
            builder.push(" ORDER BY created_at DESC, id DESC");
        }

        builder.build_query_as::<Task>().fetch_all(pool).await
    }

    pub async fn find_by_id_for_user(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive exact title match within one owner's tasks.
    ///
    /// Compared in Rust so non-ASCII titles fold the same way as ASCII ones.
    pub async fn find_by_title_for_user(
        pool: &SqlitePool,
        title: &str,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let needle = title.trim().to_lowercase();
        let tasks = Self::find_by_user(pool, user_id).await?;
        Ok(tasks
            .into_iter()
            .find(|task| task.title.trim().to_lowercase() == needle))
    }

    pub async fn find_by_ids_for_user(
        pool: &SqlitePool,
        ids: &[i64],
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM tasks WHERE user_id = ");
        builder.push_bind(user_id).push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        builder.build_query_as::<Task>().fetch_all(pool).await
    }

    pub async fn find_by_completion(
        pool: &SqlitePool,
        user_id: i64,
        is_completed: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE user_id = ?1 AND is_completed = ?2 ORDER BY id ASC",
        )
        .bind(user_id)
        .bind(is_completed)
        .fetch_all(pool)
        .await
    }

    pub async fn count_pending(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND is_completed = 0",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Insert a task. Accepts a pool or an open transaction.
    pub async fn create<'e, E>(
        executor: E,
        user_id: i64,
        data: &CreateTask,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, Task>(
            r#"INSERT INTO tasks (
                user_id, title, description, is_completed, due_date, reminder_date,
                priority, estimated_hours, created_at, updated_at
               )
               VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7, ?8, ?8)
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(data.due_date)
        .bind(data.reminder_date)
        .bind(data.priority.unwrap_or_default())
        .bind(data.estimated_hours)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        data: &UpdateTask,
    ) -> Result<Self, TaskError> {
        sqlx::query_as::<_, Task>(
            r#"UPDATE tasks SET
                title = COALESCE(?3, title),
                description = COALESCE(?4, description),
                is_completed = COALESCE(?5, is_completed),
                due_date = COALESCE(?6, due_date),
                reminder_date = COALESCE(?7, reminder_date),
                priority = COALESCE(?8, priority),
                estimated_hours = COALESCE(?9, estimated_hours),
                updated_at = ?10
               WHERE id = ?1 AND user_id = ?2
               RETURNING *"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.title.as_deref().map(str::trim))
        .bind(&data.description)
        .bind(data.is_completed)
        .bind(data.due_date)
        .bind(data.reminder_date)
        .bind(data.priority)
        .bind(data.estimated_hours)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?
        .ok_or(TaskError::NotFound)
    }

    pub async fn set_completed(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        is_completed: bool,
    ) -> Result<Self, TaskError> {
        Self::update(
            pool,
            id,
            user_id,
            &UpdateTask {
                is_completed: Some(is_completed),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: i64, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a set of tasks in one statement, scoped to the owner.
    pub async fn delete_many(
        pool: &SqlitePool,
        ids: &[i64],
        user_id: i64,
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM tasks WHERE user_id = ");
        builder.push_bind(user_id).push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn stats(
        pool: &SqlitePool,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<TaskStats, sqlx::Error> {
        let (day_start, day_end) = day_bounds(now);
        sqlx::query_as::<_, TaskStats>(
            r#"SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN is_completed = 1 THEN 1 ELSE 0 END), 0) AS completed,
                COALESCE(SUM(CASE WHEN is_completed = 0 THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN is_completed = 0 AND due_date IS NOT NULL AND due_date < ?2
                    THEN 1 ELSE 0 END), 0) AS overdue,
                COALESCE(SUM(CASE WHEN due_date >= ?3 AND due_date < ?4
                    THEN 1 ELSE 0 END), 0) AS due_today,
                COALESCE(SUM(CASE WHEN is_completed = 0 AND priority = 'high'
                    THEN 1 ELSE 0 END), 0) AS high_priority,
                COALESCE(SUM(CASE WHEN is_completed = 0 THEN COALESCE(estimated_hours, 0) ELSE 0 END), 0)
                    AS total_hours_estimated
               FROM tasks
               WHERE user_id = ?1"#,
        )
        .bind(user_id)
        .bind(now)
        .bind(day_start)
        .bind(day_end)
        .fetch_one(pool)
        .await
    }
}

/// Escape `LIKE` wildcards so user input matches literally under `ESCAPE '\'`.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
