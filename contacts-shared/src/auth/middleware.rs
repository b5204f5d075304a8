/// Bearer-token request authentication
///
/// Resolves the `Authorization: Bearer <JWT>` header of a request to the
/// stored [`User`] it belongs to. The API server calls [`authenticate`] from
/// its middleware and inserts the resulting [`AuthContext`] into request
/// extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use contacts_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user.email)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;

use super::jwt::{get_email_from_token, JwtKeys, TokenError};
use crate::models::user::User;

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The user the bearer token belongs to
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header, or not a Bearer scheme
    #[error("Not authenticated")]
    MissingCredentials,

    /// Token failed verification, or its subject no longer exists
    #[error("Could not validate credentials")]
    InvalidToken(#[source] Option<TokenError>),

    /// Database error while loading the user
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            AuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `AuthError::MissingCredentials` if there is no bearer token
/// - `AuthError::InvalidToken` if the token does not verify as an access
///   token or names an unknown user
/// - `AuthError::DatabaseError` if the user lookup fails
pub async fn authenticate(
    pool: &PgPool,
    keys: &JwtKeys,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingCredentials)?;

    let email = get_email_from_token(token, keys).map_err(|e| {
        tracing::debug!(error = %e, "Bearer token rejected");
        AuthError::InvalidToken(Some(e))
    })?;

    let user = User::find_by_email(pool, &email)
        .await?
        .ok_or(AuthError::InvalidToken(None))?;

    Ok(AuthContext { user })
}
