//! Route guards
//!
//! A [`GuardPipeline`] evaluates an ordered list of [`Guard`]s against the
//! identity attached by the authentication middleware and stops at the first
//! rejection. [`enforce_guards`] runs a pipeline as an axum middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::auth::roles::Role;
use crate::core::auth::service::AuthError;
use crate::core::db::models::User;

/// Identity of the caller, attached to request extensions after token verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub is_active: bool,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_email_verified: user.is_email_verified,
            is_active: user.is_active,
        }
    }
}

// Handlers behind a guard pipeline extract the identity directly; 401 when none
// was attached.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Result of evaluating a single guard
#[derive(Debug)]
pub enum GuardOutcome {
    Continue,
    Reject(AuthError),
}

/// A single authorization check
pub trait Guard: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn check(&self, identity: Option<&AuthenticatedUser>) -> GuardOutcome;
}

/// Requires any authenticated identity
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireIdentity;

impl Guard for RequireIdentity {
    fn name(&self) -> &'static str {
        "require_identity"
    }

    fn check(&self, identity: Option<&AuthenticatedUser>) -> GuardOutcome {
        match identity {
            Some(_) => GuardOutcome::Continue,
            None => GuardOutcome::Reject(AuthError::Unauthenticated),
        }
    }
}

/// Restricts a route to a set of roles.
///
/// No identity is `Unauthenticated` (401); a role outside the set is
/// `Forbidden` (403).
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Vec<Role>,
}

impl RoleGuard {
    pub fn allow(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
        }
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }
}

impl Guard for RoleGuard {
    fn name(&self) -> &'static str {
        "role"
    }

    fn check(&self, identity: Option<&AuthenticatedUser>) -> GuardOutcome {
        match identity {
            None => GuardOutcome::Reject(AuthError::Unauthenticated),
            Some(user) if !self.allowed.contains(&user.role) => {
                GuardOutcome::Reject(AuthError::Forbidden)
            }
            Some(_) => GuardOutcome::Continue,
        }
    }
}

/// Requires a verified email address
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifiedEmailGuard;

impl Guard for VerifiedEmailGuard {
    fn name(&self) -> &'static str {
        "verified_email"
    }

    fn check(&self, identity: Option<&AuthenticatedUser>) -> GuardOutcome {
        match identity {
            None => GuardOutcome::Reject(AuthError::Unauthenticated),
            Some(user) if !user.is_email_verified => {
                GuardOutcome::Reject(AuthError::EmailNotVerified)
            }
            Some(_) => GuardOutcome::Continue,
        }
    }
}

/// Ordered list of guards
#[derive(Clone, Default)]
pub struct GuardPipeline {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a guard; guards run in insertion order
    pub fn then(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Run every guard until one rejects
    pub fn evaluate(&self, identity: Option<&AuthenticatedUser>) -> Result<(), AuthError> {
        for guard in &self.guards {
            if let GuardOutcome::Reject(err) = guard.check(identity) {
                tracing::debug!(
                    guard = guard.name(),
                    user_id = ?identity.map(|user| user.id),
                    "Request rejected by guard"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Middleware running a [`GuardPipeline`] against the request's identity.
///
/// ```rust,ignore
/// let doctors_only = GuardPipeline::new().then(RoleGuard::allow([Role::Doctor]));
/// router.route_layer(middleware::from_fn_with_state(doctors_only, enforce_guards));
/// ```
pub async fn enforce_guards(
    State(pipeline): State<GuardPipeline>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(err) = pipeline.evaluate(request.extensions().get::<AuthenticatedUser>()) {
        return err.into_response();
    }

    next.run(request).await
}
