/// Request extractors whose rejections render as [`ApiError`]
///
/// Drop-in replacements for `axum::Json`, `axum::extract::Path`, and
/// `axum::extract::Query`. A malformed body, path segment, or query string
/// answers with the usual `{"error", "detail"}` JSON body instead of axum's
/// plain-text rejection.
///
/// ```text
/// GET /contacts/abc
/// 422 {"error": "validation_error", "detail": "Request validation failed",
///      "errors": [{"field": "path", "message": "Invalid URL: ..."}]}
/// ```

use crate::error::ApiError;
use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON body extractor and response
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameter extractor
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

/// Query string extractor
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);
