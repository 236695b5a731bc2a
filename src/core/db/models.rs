//! Database models for medportal
//!
//! This module defines the database entity structs that map to PostgreSQL tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::auth::Role;

// ============================================================================
// User Model
// ============================================================================

/// User entity representing a portal account
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User data for creation (password already hashed, email already normalized)
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// User without sensitive data (for API responses)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            is_email_verified: user.is_email_verified,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

// ============================================================================
// Session Model
// ============================================================================

/// Session entity for refresh tokens
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuuN0tArealHashButLongEnoughForTests12"
                .to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lopez".to_string(),
            phone: None,
            role: Role::Patient,
            is_email_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_user_response_drops_password_hash() {
        let user = sample_user();
        let hash = user.password_hash.clone();

        let response: UserResponse = user.into();
        let json = serde_json::to_string(&response).unwrap();

        assert!(!json.contains(&hash));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_user_response_camel_case() {
        let response: UserResponse = sample_user().into();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["firstName"], "Ana");
        assert_eq!(json["lastName"], "Lopez");
        assert_eq!(json["role"], "PATIENT");
        assert_eq!(json["isEmailVerified"], false);
        assert_eq!(json["isActive"], true);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("first_name").is_none());
    }
}
