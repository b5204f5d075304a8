/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Create an account
/// - `POST /auth/login` - Exchange credentials for an access token
/// - `POST /auth/reset-password-request` - Email a password reset link
/// - `POST /auth/reset-password` - Set a new password with a reset token
/// - `POST /auth/request-email` - Email an address confirmation link
/// - `GET /auth/confirmed-email/:token` - Confirm an email address
///
/// Reset and confirmation failures report an unknown user (404) separately
/// from a bad token (400).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    routes::MessageResponse,
};
use axum::{extract::State, http::StatusCode};
use contacts_shared::{
    auth::{
        jwt::{self, RESET_TOKEN_EXPIRE_MINUTES},
        password,
    },
    models::user::{CreateUser, User},
    services::email,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6 to 128 characters"))]
    pub password: String,
}

/// Login request
///
/// `username` is accepted as an alias for `email`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Access token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Always `bearer`
    pub token_type: String,
}

/// Body naming an account by email
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Password reset body
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6 to 128 characters"))]
    pub new_password: String,
}

/// Register a new user
///
/// ```text
/// POST /auth/register
/// {"email": "user@example.com", "password": "secret123"}
/// ```
///
/// # Errors
///
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    let hashed_password = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            hashed_password,
            role: None,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with email and password
///
/// ```text
/// POST /auth/login
/// {"email": "user@example.com", "password": "secret123"}
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Incorrect email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.hashed_password)? {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Err(invalid());
    }

    let access_token = jwt::create_access_token(
        &user.email,
        state.config.jwt.access_token_expire_minutes,
        &state.jwt,
    )?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// Email a password reset link
///
/// # Errors
///
/// - `404 Not Found`: no user with that email
/// - `500 Internal Server Error`: the email could not be sent
pub async fn reset_password_request(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let token = jwt::create_reset_token(&user.email, RESET_TOKEN_EXPIRE_MINUTES, &state.jwt)?;

    email::send_reset_password_email(
        state.mailer.as_ref(),
        &state.config.api.public_url,
        &user.email,
        &token,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = user.id, "Failed to send reset email");
        ApiError::Upstream("Failed to send reset email".to_string())
    })?;

    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// Set a new password using a reset token
///
/// # Errors
///
/// - `400 Bad Request`: token invalid, expired, or not a reset token
/// - `404 Not Found`: the token's user no longer exists
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let email = jwt::verify_reset_token(&req.token, &state.jwt)?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let hashed_password = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, &user.email, &hashed_password).await?;

    tracing::info!(user_id = user.id, "Password reset");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Email an address confirmation link
///
/// Answers the same way whether or not the address is registered.
pub async fn request_email(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let Some(user) = User::find_by_email(&state.db, &req.email).await? else {
        return Ok(Json(MessageResponse::new("Check your email for confirmation")));
    };

    if user.confirmed {
        return Ok(Json(MessageResponse::new("Your email is already confirmed")));
    }

    let token = jwt::create_email_token(&user.email, &state.jwt)?;

    email::send_confirmation_email(
        state.mailer.as_ref(),
        &state.config.api.public_url,
        &user.email,
        &token,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = user.id, "Failed to send confirmation email");
        ApiError::Upstream("Failed to send confirmation email".to_string())
    })?;

    Ok(Json(MessageResponse::new("Check your email for confirmation")))
}

/// Confirm an email address from a link
///
/// # Errors
///
/// - `400 Bad Request`: token invalid, expired, or not a confirmation token
/// - `404 Not Found`: the token's user no longer exists
pub async fn confirmed_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let email = jwt::verify_email_token(&token, &state.jwt)?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.confirmed {
        return Ok(Json(MessageResponse::new("Your email is already confirmed")));
    }

    User::confirm_email(&state.db, &user.email).await?;

    tracing::info!(user_id = user.id, "Email confirmed");
    Ok(Json(MessageResponse::new("Email confirmed")))
}
