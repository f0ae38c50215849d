use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::{
    dtos::ApiResponse,
    error::HttpError,
    middleware::{auth, JWTAuthMiddeware},
    service::storage::{UploadKind, MAX_UPLOAD_BYTES},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub kind: UploadKind,
}

pub fn uploads_handler() -> Router {
    Router::new()
        .route("/", post(upload))
        // Headroom so the handler can report oversize bodies itself.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024))
        .layer(middleware::from_fn(auth))
}

pub async fn upload(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    if !app_state.storage.is_enabled() {
        return Err(HttpError::service_unavailable("File uploads are not configured"));
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| HttpError::bad_request("Content-Type header is required"))?;

    let url = app_state
        .storage
        .upload(query.kind, user.profile.id, content_type, body.to_vec())
        .await?;

    tracing::info!("Profile {} uploaded {:?} image", user.profile.id, query.kind);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Upload stored",
            serde_json::json!({ "url": url }),
        )),
    ))
}
