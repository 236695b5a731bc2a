//! medportal - Healthcare Portal Auth API
//!
//! Account signup and login, JWT access and refresh tokens, and role-based
//! guards for the patient/doctor portal, served with axum.

pub mod app;
pub mod core;
