//! # Contacts Shared Library
//!
//! This crate contains the domain types, persistence, and authentication
//! logic used by the contacts API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users and contacts) and their queries
//! - `db`: Connection pool and schema migrations
//! - `auth`: Password hashing, JWT tokens, request authentication, roles
//! - `services`: Outbound integrations (email delivery, avatar hosting)
//! - `redis`: Redis client used for rate limiting

pub mod auth;
pub mod db;
pub mod models;
pub mod redis;
pub mod services;

/// Current version of the contacts shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
