/// Service root and health check
///
/// # Endpoints
///
/// ```text
/// GET /        -> 200 {"message": "Welcome to the contacts API"}
/// GET /health  -> 200 {"message": "API is ready to work"}
///              -> 503 {"error": "service_unavailable", "detail": "Database is not available"}
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::Json,
    routes::MessageResponse,
};
use axum::extract::State;
use contacts_shared::db::pool;

/// Welcome message
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome to the contacts API"))
}

/// Reports whether the database answers a trivial query
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    pool::health_check(&state.db).await.map_err(|e| {
        tracing::warn!(error = %e, "Health check failed");
        ApiError::ServiceUnavailable("Database is not available".to_string())
    })?;

    Ok(Json(MessageResponse::new("API is ready to work")))
}
