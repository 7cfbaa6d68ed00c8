use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqlitePool};

use super::user::User;
use crate::services::AuthService;

/// A bearer-token session. Only the SHA-256 of the token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Issue a new session for `user_id` and return the plaintext token.
    pub async fn issue(
        pool: &SqlitePool,
        user_id: i64,
        ttl: Duration,
    ) -> Result<(Session, String), sqlx::Error> {
        let token = AuthService::generate_session_id();
        let now = Utc::now();

        let session = sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions (user_id, token_hash, expires_at, created_at)
               VALUES (?1, ?2, ?3, ?4)
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(AuthService::hash_session_token(&token))
        .bind(now + ttl)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok((session, token))
    }

    /// Resolve a plaintext bearer token to its owner, ignoring expired sessions.
    pub async fn find_user_by_token(
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT u.*
               FROM sessions s
               JOIN users u ON s.user_id = u.id
               WHERE s.token_hash = ?1 AND s.expires_at > ?2"#,
        )
        .bind(AuthService::hash_session_token(token))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Delete session (logout)
    pub async fn revoke(pool: &SqlitePool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?1")
            .bind(AuthService::hash_session_token(token))
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DBService, models::user::CreateUser};

    async fn user(pool: &SqlitePool) -> User {
        User::create(
            pool,
            &CreateUser {
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
                password_hash: "x".to_string(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn issued_token_resolves_until_revoked() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = user(&db.pool).await;

        let (session, token) = Session::issue(&db.pool, owner.id, Duration::days(1))
            .await
            .unwrap();
        assert_ne!(session.token_hash, token);

        let found = Session::find_user_by_token(&db.pool, &token).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(owner.id));

        assert!(Session::revoke(&db.pool, &token).await.unwrap());
        assert!(
            Session::find_user_by_token(&db.pool, &token)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored_and_cleaned() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = user(&db.pool).await;

        let (_, token) = Session::issue(&db.pool, owner.id, Duration::seconds(-5))
            .await
            .unwrap();
        assert!(
            Session::find_user_by_token(&db.pool, &token)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(Session::cleanup_expired(&db.pool).await.unwrap(), 1);
    }
}
