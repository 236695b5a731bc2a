//! Authentication module for medportal
//!
//! This module provides authentication functionality including:
//! - Password hashing (bcrypt) and JWT access/refresh tokens
//! - Signup, login, refresh rotation and logout
//! - Bearer token middleware and role guards for downstream routes
//! - REST API endpoints for auth operations

pub mod api;
pub mod guard;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod service;

pub use api::auth_api_router;
pub use guard::{
    AuthenticatedUser, Guard, GuardOutcome, GuardPipeline, RequireIdentity, RoleGuard,
    VerifiedEmailGuard, enforce_guards,
};
pub use jwt::{Claims, JwtConfig, JwtError, TokenIssuer, TokenPair, TokenSubject, TokenType};
pub use middleware::authenticate;
pub use password::{PasswordError, PasswordHasher};
pub use roles::Role;
pub use service::{
    AuthError, AuthResponse, AuthService, LoginRequest, RefreshRequest, SignupRequest,
};
