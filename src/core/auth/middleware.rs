//! Bearer token authentication middleware
//!
//! Verifies `Authorization: Bearer <token>` and attaches an
//! [`AuthenticatedUser`] to the request. Requests without the header pass
//! through anonymously; whether that is acceptable is up to the guards.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::core::auth::guard::AuthenticatedUser;
use crate::core::auth::service::{AuthError, AuthService};

/// Extract the bearer token from the `Authorization` header.
///
/// Returns `Ok(None)` when the header is absent and `TokenInvalid` when it is
/// present but not a usable bearer credential.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::TokenInvalid)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::TokenInvalid)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::TokenInvalid);
    }

    Ok(Some(token))
}

/// Authentication middleware
pub async fn authenticate(
    State(service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(request.headers()) {
        Ok(token) => token.map(str::to_owned),
        Err(err) => return err.into_response(),
    };

    if let Some(token) = token {
        match service.authenticate(&token).await {
            Ok(identity) => {
                request.extensions_mut().insert::<AuthenticatedUser>(identity);
            }
            Err(err) => {
                tracing::debug!(error = %err, "Bearer token rejected");
                return err.into_response();
            }
        }
    }

    next.run(request).await
}
