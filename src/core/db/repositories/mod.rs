//! Repositories for account and session persistence

pub mod session;
pub mod user;

pub use session::{SessionRepository, SessionRepositoryError, SessionStore};
pub use user::{UserRepository, UserRepositoryError, UserStore};
