/// API route handlers
///
/// Organized by resource:
///
/// - `health`: service root and health check
/// - `auth`: registration, login, password reset, email confirmation
/// - `users`: current user profile, avatar, roles
/// - `contacts`: contact CRUD, search, upcoming birthdays

pub mod auth;
pub mod contacts;
pub mod health;
pub mod users;

use serde::{Deserialize, Serialize};

/// `{"message": ...}` body shared by endpoints with nothing else to return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
