use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;
use ts_rs::TS;

use super::task::Task;

pub const DEFAULT_COLOR: &str = "#007bff";

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Category not found")]
    NotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Unknown category ids: {0:?}")]
    UnknownCategories(Vec<i64>),
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub color: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryWithTaskCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    #[ts(flatten)]
    pub category: Category,
    pub tasks_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskWithCategories {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateCategory {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl Category {
    pub async fn find_by_user_with_counts(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<CategoryWithTaskCount>, sqlx::Error> {
        sqlx::query_as::<_, CategoryWithTaskCount>(
            r#"SELECT c.*, COUNT(tc.id) AS tasks_count
               FROM categories c
               LEFT JOIN task_category tc ON tc.category_id = c.id
               WHERE c.user_id = ?1
               GROUP BY c.id
               ORDER BY c.id ASC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id_for_user(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        data: &CreateCategory,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (user_id, name, color, icon, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?5)
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(data.name.trim())
        .bind(data.color.as_deref().unwrap_or(DEFAULT_COLOR))
        .bind(&data.icon)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        data: &UpdateCategory,
    ) -> Result<Self, CategoryError> {
        sqlx::query_as::<_, Category>(
            r#"UPDATE categories SET
                name = COALESCE(?3, name),
                color = COALESCE(?4, color),
                icon = COALESCE(?5, icon),
                updated_at = ?6
               WHERE id = ?1 AND user_id = ?2
               RETURNING *"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.color)
        .bind(&data.icon)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?
        .ok_or(CategoryError::NotFound)
    }

    pub async fn delete(pool: &SqlitePool, id: i64, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_for_task(pool: &SqlitePool, task_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"SELECT c.*
               FROM categories c
               JOIN task_category tc ON tc.category_id = c.id
               WHERE tc.task_id = ?1
               ORDER BY c.id ASC"#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the category set of a task. Both the task and every category
    /// must belong to `user_id`; nothing is written otherwise.
    pub async fn sync_task_categories(
        pool: &SqlitePool,
        task_id: i64,
        user_id: i64,
        category_ids: &[i64],
    ) -> Result<TaskWithCategories, CategoryError> {
        let task = Task::find_by_id_for_user(pool, task_id, user_id)
            .await?
            .ok_or(CategoryError::TaskNotFound)?;

        let mut wanted: Vec<i64> = category_ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        if !wanted.is_empty() {
            let mut builder =
                QueryBuilder::<Sqlite>::new("SELECT id FROM categories WHERE user_id = ");
            builder.push_bind(user_id).push(" AND id IN (");
            let mut separated = builder.separated(", ");
            for id in &wanted {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            let owned: Vec<i64> = builder
                .build_query_scalar::<i64>()
                .fetch_all(pool)
                .await?;

            let unknown: Vec<i64> = wanted
                .iter()
                .copied()
                .filter(|id| !owned.contains(id))
                .collect();
            if !unknown.is_empty() {
                return Err(CategoryError::UnknownCategories(unknown));
            }
        }

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM task_category WHERE task_id = ?1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        if !wanted.is_empty() {
            let now = Utc::now();
            let mut builder = QueryBuilder::<Sqlite>::new(
                "INSERT INTO task_category (task_id, category_id, created_at, updated_at) ",
            );
            builder.push_values(wanted.iter(), |mut b, category_id| {
                b.push_bind(task_id)
                    .push_bind(*category_id)
                    .push_bind(now)
                    .push_bind(now);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        let categories = Self::find_for_task(pool, task_id).await?;
        Ok(TaskWithCategories { task, categories })
    }
}
