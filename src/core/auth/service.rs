//! Authentication service
//!
//! Provides business logic for signup, login, logout, and token refresh.
//! Coordinates between the user store, session store, password hasher, and
//! token issuer.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::core::auth::guard::AuthenticatedUser;
use crate::core::auth::jwt::{JwtError, TokenIssuer, TokenPair, TokenSubject};
use crate::core::auth::password::{PasswordError, PasswordHasher};
use crate::core::db::models::{CreateUser, User, UserResponse};
use crate::core::db::repositories::{
    SessionRepositoryError, SessionStore, UserRepositoryError, UserStore,
};
use crate::core::validation::{self, ValidationError};

/// Plaintext hashed once per process and verified against on unknown-email logins
const DUMMY_PASSWORD: &str = "medportal-dummy-password-1";

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Email address is not verified")]
    EmailNotVerified,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::Validation(err.to_string())
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Empty => AuthError::Validation(err.to_string()),
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            JwtError::Malformed | JwtError::InvalidSignature | JwtError::WrongTokenType => {
                AuthError::TokenInvalid
            }
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<UserRepositoryError> for AuthError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::EmailAlreadyExists => AuthError::DuplicateEmail,
            UserRepositoryError::NotFound => AuthError::Unauthenticated,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<SessionRepositoryError> for AuthError {
    fn from(err: SessionRepositoryError) -> Self {
        match err {
            SessionRepositoryError::NotFound => AuthError::SessionNotFound,
            SessionRepositoryError::Expired => AuthError::TokenExpired,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

/// Signup request data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Login request data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh and logout request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Authentication response with user data and tokens
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    issuer: TokenIssuer,
    hasher: PasswordHasher,
    dummy_hash: Arc<OnceCell<String>>,
}

fn subject_of(user: &User) -> TokenSubject {
    TokenSubject {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        issuer: TokenIssuer,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            sessions,
            issuer,
            hasher,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Register a new account and open a session for it
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AuthError> {
        let email = validation::validate_email(&request.email)?;
        let first_name = validation::validate_name("First name", &request.first_name)?;
        let last_name = validation::validate_name("Last name", &request.last_name)?;
        let phone = validation::validate_phone(request.phone.as_deref())?;
        validation::validate_password(&request.password)?;
        let role = validation::validate_signup_role(request.role.as_deref())?;

        if !self.users.is_email_unique(&email).await? {
            tracing::info!(email = %email, "Signup rejected: email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash_blocking(request.password).await?;

        // A concurrent signup can still win the race; the store reports it as a duplicate
        let user = self
            .users
            .create(CreateUser {
                email,
                password_hash,
                first_name,
                last_name,
                phone,
                role,
            })
            .await?;

        tracing::info!(
            user_id = %user.id,
            email = %user.email,
            role = %user.role,
            "User registered"
        );

        self.start_session(user).await
    }

    /// Authenticate with email and password
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = validation::normalize_email(&request.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            // Unknown emails cost the same bcrypt work as known ones
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| self.hasher.hash_blocking(DUMMY_PASSWORD.to_string()))
                .await?;
            self.hasher
                .verify_blocking(request.password, dummy.clone())
                .await?;

            tracing::info!(email = %email, "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        let valid = self
            .hasher
            .verify_blocking(request.password, user.password_hash.clone())
            .await?;

        if !valid {
            tracing::info!(email = %email, "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Login refused for disabled account");
            return Err(AuthError::AccountDisabled);
        }

        tracing::info!(user_id = %user.id, email = %user.email, "User logged in");

        self.start_session(user).await
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The presented token's session is deleted before the new pair is
    /// stored, so each refresh token can be used at most once.
    pub async fn refresh(&self, request: RefreshRequest) -> Result<TokenPair, AuthError> {
        let claims = self.issuer.verify_refresh(&request.refresh_token)?;

        let session = self
            .sessions
            .validate_token(&request.refresh_token)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.user_id != claims.sub {
            return Err(AuthError::TokenInvalid);
        }

        if !self.sessions.delete(session.id).await? {
            // Lost a race with another refresh of the same token
            return Err(AuthError::SessionNotFound);
        }

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let tokens = self.open_session(&subject_of(&user)).await?;

        tracing::debug!(user_id = %user.id, "Refresh token rotated");

        Ok(tokens)
    }

    /// Revoke the session of a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let revoked = self.sessions.delete_by_token(refresh_token).await?;
        tracing::debug!(revoked, "Logout");
        Ok(())
    }

    /// Revoke every session of a user
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let count = self.sessions.delete_all_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, count, "All sessions revoked");
        Ok(count)
    }

    /// Resolve an access token to the identity it belongs to.
    ///
    /// Unknown and disabled accounts are treated as unauthenticated.
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.issuer.verify_access(access_token)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !user.is_active {
            return Err(AuthError::Unauthenticated);
        }

        Ok(AuthenticatedUser::from(&user))
    }

    /// Sanitized profile of a user
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserResponse, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        Ok(user.into())
    }

    /// Check that the account store is reachable
    pub async fn health_check(&self) -> Result<(), AuthError> {
        self.users.ping().await?;
        Ok(())
    }

    async fn start_session(&self, user: User) -> Result<AuthResponse, AuthError> {
        let tokens = self.open_session(&subject_of(&user)).await?;

        Ok(AuthResponse {
            user: user.into(),
            tokens,
        })
    }

    /// Issue a token pair and store its refresh session
    async fn open_session(&self, subject: &TokenSubject) -> Result<TokenPair, AuthError> {
        let tokens = self.issuer.issue_pair(subject)?;

        let expires_at = DateTime::from_timestamp(tokens.refresh_expires_at, 0)
            .ok_or_else(|| AuthError::Internal("refresh expiry out of range".to_string()))?;

        self.sessions
            .create(subject.user_id, &tokens.refresh_token, expires_at)
            .await?;

        Ok(tokens)
    }
}
