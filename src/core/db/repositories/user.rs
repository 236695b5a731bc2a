//! User persistence
//!
//! [`UserStore`] is the contract the auth layer depends on. [`UserRepository`]
//! implements it on PostgreSQL; emails are stored already normalized and the
//! `users.email` unique index settles concurrent signups.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{CreateUser, User};
use crate::core::db::pool::{DbError, health_check};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, \
     is_email_verified, is_active, created_at, updated_at";

/// User repository error types
#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("User not found")]
    NotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<DbError> for UserRepositoryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionError(e) => UserRepositoryError::DatabaseError(e),
            _ => UserRepositoryError::DatabaseError(sqlx::Error::Protocol(err.to_string())),
        }
    }
}

/// Account storage used by the auth service
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepositoryError>;

    /// Insert a new user; fails with `EmailAlreadyExists` on a taken email
    async fn create(&self, user: CreateUser) -> Result<User, UserRepositoryError>;

    /// Whether no account uses this normalized email yet
    async fn is_email_unique(&self, email: &str) -> Result<bool, UserRepositoryError> {
        Ok(self.find_by_email(email).await?.is_none())
    }

    /// Check that the backing store is reachable
    async fn ping(&self) -> Result<(), UserRepositoryError> {
        Ok(())
    }
}

/// PostgreSQL user repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: CreateUser) -> Result<User, UserRepositoryError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                UserRepositoryError::EmailAlreadyExists
            } else {
                UserRepositoryError::DatabaseError(e)
            }
        })?;

        Ok(created)
    }

    async fn ping(&self) -> Result<(), UserRepositoryError> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::Role;
    use crate::core::config::Config;
    use crate::core::db::pool::{DbConfig, create_pool_with_migrations};

    #[test]
    fn test_user_columns_cover_model() {
        for column in [
            "id",
            "email",
            "password_hash",
            "first_name",
            "last_name",
            "phone",
            "role",
            "is_email_verified",
            "is_active",
            "created_at",
            "updated_at",
        ] {
            assert!(USER_COLUMNS.contains(column), "missing column {column}");
        }
    }

    #[test]
    fn test_error_display() {
        assert_eq!(UserRepositoryError::NotFound.to_string(), "User not found");
        assert_eq!(
            UserRepositoryError::EmailAlreadyExists.to_string(),
            "Email already exists"
        );
    }

    #[test]
    fn test_from_db_error() {
        let err: UserRepositoryError = DbError::ConnectionError(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, UserRepositoryError::DatabaseError(_)));
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    // ========================================================================
    // Integration Tests (require real database)
    // ========================================================================

    fn test_db_config() -> DbConfig {
        Config::from_env()
            .expect("JWT secrets must be set")
            .db_config()
            .expect("DATABASE_URL must be set")
    }

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            password_hash: "$2b$12$placeholderplaceholderplaceholderplaceholderplace".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lopez".to_string(),
            phone: None,
            role: Role::Doctor,
        }
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_create_and_find_user() {
        let pool = create_pool_with_migrations(&test_db_config()).await.unwrap();
        let repo = UserRepository::new(pool);

        let email = format!("{}@test.local", Uuid::new_v4());
        let created = repo.create(new_user(&email)).await.unwrap();

        assert_eq!(created.role, Role::Doctor);
        assert!(created.is_active);
        assert!(!created.is_email_verified);

        let by_email = repo.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, email);

        assert!(!repo.is_email_unique(&email).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_duplicate_email_rejected() {
        let pool = create_pool_with_migrations(&test_db_config()).await.unwrap();
        let repo = UserRepository::new(pool);

        let email = format!("{}@test.local", Uuid::new_v4());
        repo.create(new_user(&email)).await.unwrap();

        let result = repo.create(new_user(&email)).await;
        assert!(matches!(result, Err(UserRepositoryError::EmailAlreadyExists)));
    }
}
