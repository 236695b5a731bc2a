//! In-memory stores
//!
//! Used when no `DATABASE_URL` is configured and throughout the test suites.
//! Email uniqueness is enforced under the `DashMap` entry lock, which gives the
//! same guarantee as the unique index on PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::core::db::models::{CreateUser, Session, User};
use crate::core::db::repositories::session::hash_token;
use crate::core::db::repositories::{
    SessionRepositoryError, SessionStore, UserRepositoryError, UserStore,
};

/// In-memory [`UserStore`]
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
    /// normalized email -> user id
    emails: DashMap<String, Uuid>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Apply an in-place change to a stored user
    pub fn update(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut User),
    ) -> Result<(), UserRepositoryError> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or(UserRepositoryError::NotFound)?;
        let user = entry.value_mut();
        change(user);
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn create(&self, user: CreateUser) -> Result<User, UserRepositoryError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(UserRepositoryError::EmailAlreadyExists),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let created = User {
                    id: Uuid::new_v4(),
                    email: user.email,
                    password_hash: user.password_hash,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    phone: user.phone,
                    role: user.role,
                    is_email_verified: false,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };

                self.users.insert(created.id, created.clone());
                slot.insert(created.id);

                Ok(created)
            }
        }
    }
}

/// In-memory [`SessionStore`], keyed by token hash
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        user_id: Uuid,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionRepositoryError> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_token(raw_token),
            expires_at,
            created_at: Utc::now(),
        };

        self.sessions
            .insert(session.token_hash.clone(), session.clone());

        Ok(session)
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, SessionRepositoryError> {
        Ok(self
            .sessions
            .get(token_hash)
            .map(|session| session.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, SessionRepositoryError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.id != id);
        Ok(self.sessions.len() < before)
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> Result<bool, SessionRepositoryError> {
        Ok(self.sessions.remove(token_hash).is_some())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, SessionRepositoryError> {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = session.user_id != user_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn cleanup_expired(&self) -> Result<u64, SessionRepositoryError> {
        let now = Utc::now();
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = session.expires_at >= now;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::Role;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lopez".to_string(),
            phone: Some("+1 555 010 2030".to_string()),
            role: Role::Patient,
        }
    }

    // ========================================================================
    // MemoryUserStore Tests
    // ========================================================================

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = MemoryUserStore::new();
        let created = store.create(new_user("a@x.com")).await.unwrap();

        assert!(created.is_active);
        assert!(!created.is_email_verified);
        assert_eq!(store.len(), 1);

        let by_email = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@x.com");

        assert!(store.find_by_email("b@x.com").await.unwrap().is_none());
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com")).await.unwrap();

        let result = store.create(new_user("a@x.com")).await;
        assert!(matches!(result, Err(UserRepositoryError::EmailAlreadyExists)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_is_email_unique() {
        let store = MemoryUserStore::new();
        assert!(store.is_email_unique("a@x.com").await.unwrap());

        store.create(new_user("a@x.com")).await.unwrap();
        assert!(!store.is_email_unique("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_signups_same_email_single_winner() {
        let store = Arc::new(MemoryUserStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create(new_user("race@x.com")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_user() {
        let store = MemoryUserStore::new();
        let created = store.create(new_user("a@x.com")).await.unwrap();

        store.update(created.id, |u| u.is_active = false).unwrap();
        assert!(!store.find_by_id(created.id).await.unwrap().unwrap().is_active);

        assert!(matches!(
            store.update(Uuid::new_v4(), |_| {}),
            Err(UserRepositoryError::NotFound)
        ));
    }

    // ========================================================================
    // MemorySessionStore Tests
    // ========================================================================

    #[tokio::test]
    async fn test_session_create_and_validate() {
        let store = MemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::days(7);

        let session = store.create(user_id, "raw_token", expires_at).await.unwrap();
        assert_eq!(session.token_hash, hash_token("raw_token"));
        assert_ne!(session.token_hash, "raw_token");

        let found = store.validate_token("raw_token").await.unwrap().unwrap();
        assert_eq!(found.id, session.id);

        assert!(store.validate_token("other_token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let store = MemorySessionStore::new();
        let expires_at = Utc::now() - Duration::seconds(1);
        store
            .create(Uuid::new_v4(), "stale", expires_at)
            .await
            .unwrap();

        let result = store.validate_token("stale").await;
        assert!(matches!(result, Err(SessionRepositoryError::Expired)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_expired_drops_only_lapsed_sessions() {
        let store = MemorySessionStore::new();
        let user_id = Uuid::new_v4();

        for token in ["old1", "old2", "old3"] {
            store
                .create(user_id, token, Utc::now() - Duration::minutes(5))
                .await
                .unwrap();
        }
        store
            .create(user_id, "live", Utc::now() + Duration::days(1))
            .await
            .unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 3);
        assert_eq!(store.len(), 1);
        assert!(store.validate_token("live").await.unwrap().is_some());

        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_session_deletes() {
        let store = MemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::days(1);

        let first = store.create(user_id, "t1", expires_at).await.unwrap();
        store.create(user_id, "t2", expires_at).await.unwrap();
        store.create(user_id, "t3", expires_at).await.unwrap();
        store.create(other_user, "t4", expires_at).await.unwrap();

        assert!(store.delete(first.id).await.unwrap());
        assert!(!store.delete(first.id).await.unwrap());

        assert!(store.delete_by_token("t2").await.unwrap());
        assert!(!store.delete_by_token("t2").await.unwrap());

        assert_eq!(store.delete_all_for_user(user_id).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.validate_token("t4").await.unwrap().is_some());
    }
}
