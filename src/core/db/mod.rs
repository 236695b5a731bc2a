//! Database module for medportal
//!
//! Persistence contracts for accounts and refresh sessions, with PostgreSQL
//! (SQLx) and in-memory implementations.

pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

pub use memory::{MemorySessionStore, MemoryUserStore};
pub use models::*;
pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations};
pub use repositories::{
    SessionRepository, SessionRepositoryError, SessionStore, UserRepository, UserRepositoryError,
    UserStore,
};
