/// User profile endpoints
///
/// # Endpoints
///
/// - `GET /users/me` - Current user (rate limited)
/// - `PATCH /users/avatar` - Upload a new avatar (admin only)
/// - `PATCH /users/:id/role` - Change a user's role (admin only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{Json, Path},
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension,
};
use contacts_shared::{
    auth::{
        authorization::{require_role, AVATAR_UPDATE_ROLES, ROLE_MANAGEMENT_ROLES},
        middleware::AuthContext,
    },
    models::user::{Role, User},
    services::avatar::ImageUpload,
};
use serde::Deserialize;

/// Multipart field carrying the avatar image
const AVATAR_FIELD: &str = "file";

/// Role change body
#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

/// Current user
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<User> {
    Json(auth.user)
}

/// Upload an avatar and store its URL on the current user
///
/// ```text
/// PATCH /users/avatar
/// Content-Type: multipart/form-data; boundary=...
///
/// file=<image bytes>
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: body is not `multipart/form-data`
/// - `403 Forbidden`: caller is not an admin
/// - `422 Unprocessable Entity`: no `file` field
/// - `500 Internal Server Error`: the image host rejected the upload
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<User>> {
    require_role(auth.user.roles, AVATAR_UPDATE_ROLES)?;

    let upload = read_avatar(multipart?).await?;
    tracing::debug!(
        user_id = auth.user_id(),
        bytes = upload.bytes.len(),
        "Uploading avatar"
    );

    let url = state.images.upload(upload).await?;

    let user = User::update_avatar(&state.db, auth.user_id(), &url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

async fn read_avatar(mut multipart: Multipart) -> ApiResult<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("avatar").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;

        if bytes.is_empty() {
            break;
        }

        return Ok(ImageUpload::avatar(file_name, content_type, bytes.to_vec()));
    }

    Err(ApiError::ValidationError(vec![ValidationErrorDetail {
        field: AVATAR_FIELD.to_string(),
        message: "An image file is required".to_string(),
    }]))
}

/// Change another user's role
///
/// # Errors
///
/// - `403 Forbidden`: caller is not an admin
/// - `404 Not Found`: no such user
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i64>,
    Json(req): Json<RoleUpdate>,
) -> ApiResult<Json<User>> {
    require_role(auth.user.roles, ROLE_MANAGEMENT_ROLES)?;

    let user = User::update_role(&state.db, user_id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        admin_id = auth.user_id(),
        user_id,
        role = ?req.role,
        "User role changed"
    );
    Ok(Json(user))
}
