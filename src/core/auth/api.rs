//! Auth API endpoints
//!
//! Provides REST API endpoints for authentication:
//! - POST /api/v1/auth/signup - Create an account and get tokens
//! - POST /api/v1/auth/login - Login and get tokens
//! - POST /api/v1/auth/refresh - Rotate the refresh token
//! - POST /api/v1/auth/logout - Revoke a refresh token
//! - POST /api/v1/auth/logout-all - Revoke every session of the caller
//! - GET /api/v1/auth/me - Current user profile
//!
//! Every response carries a `success` flag; errors are `{success:false, message}`.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::core::auth::guard::{AuthenticatedUser, GuardPipeline, RequireIdentity, enforce_guards};
use crate::core::auth::jwt::TokenPair;
use crate::core::auth::middleware::authenticate;
use crate::core::auth::service::{
    AuthError, AuthResponse, AuthService, LoginRequest, RefreshRequest, SignupRequest,
};
use crate::core::db::models::UserResponse;
use crate::core::validation::ValidationError;

/// Error and plain acknowledgement body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::Unauthenticated
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::SessionNotFound => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden | AuthError::EmailNotVerified | AuthError::AccountDisabled => {
                StatusCode::FORBIDDEN
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AuthError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error while handling auth request");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(MessageResponse::error(message))).into_response()
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedBody(rejection.body_text()).into()
    }
}

/// `data` member of user-bearing responses
#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserResponse,
}

/// Signup and login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
    /// Access token expiration (Unix timestamp)
    pub expires_at: i64,
    pub data: UserData,
}

impl From<AuthResponse> for SessionResponse {
    fn from(resp: AuthResponse) -> Self {
        Self {
            success: true,
            token: resp.tokens.access_token,
            refresh_token: resp.tokens.refresh_token,
            expires_at: resp.tokens.access_expires_at,
            data: UserData { user: resp.user },
        }
    }
}

/// Response for token refresh
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl From<TokenPair> for RefreshResponse {
    fn from(tokens: TokenPair) -> Self {
        Self {
            success: true,
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.access_expires_at,
        }
    }
}

/// Response for the current user's profile
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub data: UserData,
}

/// Create the auth API router.
///
/// Only `/me` and `/logout-all` read a bearer token. Signup, login, refresh
/// and logout ignore the `Authorization` header entirely, so a stale access
/// token sent along with a refresh request does not get in the way.
pub fn auth_api_router(service: AuthService) -> Router {
    let signed_in = GuardPipeline::new().then(RequireIdentity);

    let protected = Router::new()
        .route("/api/v1/auth/me", get(me_handler))
        .route("/api/v1/auth/logout-all", post(logout_all_handler))
        .route_layer(middleware::from_fn_with_state(signed_in, enforce_guards))
        .route_layer(middleware::from_fn_with_state(service.clone(), authenticate));

    Router::new()
        .route("/api/v1/auth/signup", post(signup_handler))
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/refresh", post(refresh_handler))
        .route("/api/v1/auth/logout", post(logout_handler))
        .merge(protected)
        .with_state(service)
}

/// POST /api/v1/auth/signup
async fn signup_handler(
    State(service): State<AuthService>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AuthError> {
    let Json(request) = payload?;

    let response = service.signup(request).await?;

    Ok((StatusCode::CREATED, Json(response.into())))
}

/// POST /api/v1/auth/login
async fn login_handler(
    State(service): State<AuthService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AuthError> {
    let Json(request) = payload?;

    let response = service.login(request).await?;

    Ok(Json(response.into()))
}

/// POST /api/v1/auth/refresh
async fn refresh_handler(
    State(service): State<AuthService>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, AuthError> {
    let Json(request) = payload?;

    let tokens = service.refresh(request).await?;

    Ok(Json(tokens.into()))
}

/// POST /api/v1/auth/logout
async fn logout_handler(
    State(service): State<AuthService>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Json(request) = payload?;

    service.logout(&request.refresh_token).await?;

    Ok(Json(MessageResponse::ok("Logged out successfully")))
}

/// POST /api/v1/auth/logout-all
async fn logout_all_handler(
    State(service): State<AuthService>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>, AuthError> {
    let count = service.logout_all(user.id).await?;

    Ok(Json(MessageResponse::ok(format!(
        "Logged out of {count} session(s)"
    ))))
}

/// GET /api/v1/auth/me
async fn me_handler(
    State(service): State<AuthService>,
    user: AuthenticatedUser,
) -> Result<Json<ProfileResponse>, AuthError> {
    let user = service.current_user(user.id).await?;

    Ok(Json(ProfileResponse {
        success: true,
        data: UserData { user },
    }))
}
