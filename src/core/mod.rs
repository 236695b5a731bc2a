//! Core domain: authentication, persistence, validation and configuration

pub mod auth;
pub mod config;
pub mod db;
pub mod validation;
