use std::sync::Arc;

use axum::{
    http::HeaderMap,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use subtle::ConstantTimeEq;
use validator::Validate;

use crate::{
    db::profiledb::ProfileExt,
    dtos::profiledtos::{MakeAdminDto, ProfileResponseDto},
    error::{db_error, ErrorMessage, HttpError},
    middleware::{
        optional_auth,
        rate_limit::{admin_bootstrap_rate_limiter, rate_limit_middleware},
        JWTAuthMiddeware,
    },
    AppState,
};

pub const BOOTSTRAP_HEADER: &str = "x-admin-bootstrap";

pub fn system_handler() -> Router {
    let make_admin_route = Router::new()
        .route("/make-admin", post(make_admin))
        .layer(middleware::from_fn(optional_auth))
        .layer(middleware::from_fn_with_state(
            Arc::new(admin_bootstrap_rate_limiter()),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/test-db", get(test_db))
        .merge(make_admin_route)
}

/// True when the header carries the configured bootstrap secret. Without a
/// configured secret nothing matches.
pub fn bootstrap_secret_matches(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let (Some(secret), Some(provided)) = (
        secret,
        headers.get(BOOTSTRAP_HEADER).and_then(|h| h.to_str().ok()),
    ) else {
        return false;
    };
    bool::from(secret.as_bytes().ct_eq(provided.as_bytes()))
}

pub async fn make_admin(
    Extension(app_state): Extension<Arc<AppState>>,
    caller: Option<Extension<JWTAuthMiddeware>>,
    headers: HeaderMap,
    Json(body): Json<MakeAdminDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let caller_is_admin = caller
        .as_ref()
        .map_or(false, |Extension(c)| c.profile.is_admin);
    let bootstrapped =
        bootstrap_secret_matches(&headers, app_state.env.admin_bootstrap_secret.as_deref());

    if !caller_is_admin && !bootstrapped {
        tracing::warn!("Refused make-admin request for {}", body.email);
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    let profile = app_state
        .db_client
        .grant_admin_by_email(&body.email)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::not_found("No profile with that email"))?;

    tracing::info!(
        "Profile {} granted admin ({})",
        profile.id,
        if bootstrapped { "bootstrap secret" } else { "by admin" }
    );

    Ok(Json(ProfileResponseDto::from_profile(&profile)))
}

pub async fn test_db(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&app_state.db_client.pool)
        .await
        .map_err(|e| HttpError::service_unavailable(format!("Database unreachable: {}", e)))?;

    let profiles = app_state
        .db_client
        .count_profiles()
        .await
        .map_err(db_error)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "database": "connected",
        "cache": app_state.db_client.cache_status(),
        "profiles": profiles,
    })))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "taskify",
        "timestamp": chrono::Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bootstrap_needs_configured_secret() {
        let mut headers = HeaderMap::new();
        headers.insert(BOOTSTRAP_HEADER, HeaderValue::from_static("letmein"));
        assert!(!bootstrap_secret_matches(&headers, None));
        assert!(!bootstrap_secret_matches(&headers, Some("other")));
        assert!(bootstrap_secret_matches(&headers, Some("letmein")));
        assert!(!bootstrap_secret_matches(&HeaderMap::new(), Some("letmein")));
    }
}
