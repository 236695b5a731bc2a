//! Session repository for refresh token management
//!
//! Refresh tokens are stored as SHA-256 hashes; the raw token only ever lives
//! on the client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::Session;

/// Session repository error types
#[derive(Debug, thiserror::Error)]
pub enum SessionRepositoryError {
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Hash a token using SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Refresh session storage used by the auth service
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session for a raw refresh token
    async fn create(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionRepositoryError>;

    /// Find a session by token hash
    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, SessionRepositoryError>;

    /// Delete a session by ID
    async fn delete(&self, id: Uuid) -> Result<bool, SessionRepositoryError>;

    /// Delete a session by token hash
    async fn delete_by_token_hash(&self, token_hash: &str) -> Result<bool, SessionRepositoryError>;

    /// Delete all sessions for a user (logout from all devices)
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, SessionRepositoryError>;

    /// Delete every lapsed session, returning how many were removed
    async fn cleanup_expired(&self) -> Result<u64, SessionRepositoryError>;

    /// Validate a raw token and return its session.
    ///
    /// Returns `Ok(None)` when the token is unknown and `Expired` (after
    /// removing the row) when the session has lapsed.
    async fn validate_token(
        &self,
        raw_token: &str,
    ) -> Result<Option<Session>, SessionRepositoryError> {
        let Some(session) = self.find_by_token_hash(&hash_token(raw_token)).await? else {
            return Ok(None);
        };

        if session.expires_at < Utc::now() {
            self.delete(session.id).await?;
            return Err(SessionRepositoryError::Expired);
        }

        Ok(Some(session))
    }

    /// Delete a session by raw token
    async fn delete_by_token(&self, raw_token: &str) -> Result<bool, SessionRepositoryError> {
        self.delete_by_token_hash(&hash_token(raw_token)).await
    }
}

/// PostgreSQL session repository
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionRepositoryError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(hash_token(raw_token))
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, SessionRepositoryError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at
            FROM sessions
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, SessionRepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> Result<bool, SessionRepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, SessionRepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn cleanup_expired(&self) -> Result<u64, SessionRepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Token Hashing Tests (don't require database)
    // ========================================================================

    #[test]
    fn test_hash_token_is_deterministic() {
        assert_eq!(hash_token("refresh_abc"), hash_token("refresh_abc"));
    }

    #[test]
    fn test_hash_token_differs_per_token() {
        assert_ne!(hash_token("token_one"), hash_token("token_two"));
    }

    #[test]
    fn test_hash_token_is_64_char_hex() {
        let hash = hash_token("any_token");

        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_token_known_vector() {
        assert_eq!(
            hash_token(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(SessionRepositoryError::NotFound.to_string(), "Session not found");
        assert_eq!(SessionRepositoryError::Expired.to_string(), "Session expired");
    }
}
