/// User model and database operations
///
/// A user owns zero or more contacts. Users are created on registration and
/// mutated by password reset, email confirmation, avatar upload, or a role
/// change. There is no delete operation.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'user');
///
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     hashed_password VARCHAR(255) NOT NULL,
///     is_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     confirmed BOOLEAN NOT NULL DEFAULT FALSE,
///     avatar_url VARCHAR(512),
///     roles user_role NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use contacts_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(
///     &pool,
///     CreateUser {
///         email: "user@example.com".to_string(),
///         hashed_password: "$argon2id$...".to_string(),
///         role: None,
///     },
/// )
/// .await?;
///
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const USER_COLUMNS: &str =
    "id, email, hashed_password, is_verified, confirmed, avatar_url, roles, created_at";

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May upload avatars and manage roles
    Admin,

    /// Regular account
    User,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    /// Unique email address, also the JWT subject
    pub email: String,

    /// Argon2id hash in PHC format
    #[serde(skip_serializing)]
    pub hashed_password: String,

    pub is_verified: bool,

    /// Set once the email confirmation link is followed
    pub confirmed: bool,

    pub avatar_url: Option<String>,

    pub roles: Role,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub hashed_password: String,

    /// Defaults to [`Role::User`]
    pub role: Option<Role>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error carrying the `users_email_key` constraint if
    /// the email is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (email, hashed_password, roles) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.email)
            .bind(data.hashed_password)
            .bind(data.role.unwrap_or_default())
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Replaces the password hash of the user with `email`
    ///
    /// Returns the updated user, or `None` if no user has that email.
    pub async fn update_password(
        pool: &PgPool,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET hashed_password = $2 WHERE email = $1 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(hashed_password)
            .fetch_optional(pool)
            .await
    }

    /// Marks the email address of the user with `email` as confirmed
    ///
    /// Returns `false` if no user has that email.
    pub async fn confirm_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE, confirmed = TRUE
            WHERE email = $1
            "#,
        )
        .bind(email)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a new avatar URL
    pub async fn update_avatar(
        pool: &PgPool,
        id: i64,
        avatar_url: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET avatar_url = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(avatar_url)
            .fetch_optional(pool)
            .await
    }

    /// Changes a user's role
    pub async fn update_role(pool: &PgPool, id: i64, role: Role) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET roles = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            email: "test@example.com".to_string(),
            hashed_password: "$argon2id$secret".to_string(),
            is_verified: false,
            confirmed: false,
            avatar_url: None,
            roles: Role::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_default_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::from_str::<Role>("\"user\"").unwrap(), Role::User);
    }

    #[test]
    fn test_hashed_password_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["roles"], "user");
    }
}
