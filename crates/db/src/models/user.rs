use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("A user with this email already exists")]
    EmailTaken,
    #[error("User not found")]
    NotFound,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub async fn create(pool: &SqlitePool, data: &CreateUser) -> Result<Self, UserError> {
        let email = data.email.trim().to_lowercase();
        if Self::find_by_email(pool, &email).await?.is_some() {
            return Err(UserError::EmailTaken);
        }

        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (name, email, password_hash, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?4)
               RETURNING *"#,
        )
        .bind(data.name.trim())
        .bind(&email)
        .bind(&data.password_hash)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn create_normalises_email_and_rejects_duplicates() {
        let db = DBService::new_in_memory().await.unwrap();
        let data = CreateUser {
            name: "Ada".to_string(),
            email: "  Ada@Example.com ".to_string(),
            password_hash: "hash".to_string(),
        };

        let user = User::create(&db.pool, &data).await.unwrap();
        assert_eq!(user.email, "ada@example.com");

        let found = User::find_by_email(&db.pool, "ADA@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let err = User::create(&db.pool, &data).await.unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[tokio::test]
    async fn password_hash_is_never_serialized() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = User::create(
            &db.pool,
            &CreateUser {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                password_hash: "secret-hash".to_string(),
            },
        )
        .await
        .unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["name"], "Grace");
    }
}
