pub mod rate_limit;

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    db::profiledb::ProfileExt,
    error::{ErrorMessage, HttpError},
    models::profilemodel::{Profile, ProfileRole},
    utils::token,
    AppState,
};

#[derive(Debug, Clone)]
pub struct JWTAuthMiddeware {
    pub profile: Profile,
}

/// Session token from the `token` cookie, falling back to a Bearer header.
fn extract_token(cookie_jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_owned())
        })
        .filter(|token| !token.is_empty())
}

async fn resolve_profile(app_state: &AppState, token: String) -> Result<Profile, HttpError> {
    let subject = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let profile_id = Uuid::parse_str(&subject)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let profile = app_state
        .db_client
        .get_profile(profile_id)
        .await
        .map_err(|_| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    profile.ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = extract_token(&cookie_jar, req.headers())
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let profile = resolve_profile(&app_state, token).await?;

    req.extensions_mut().insert(JWTAuthMiddeware { profile });

    Ok(next.run(req).await)
}

/// Attaches the viewer when a valid session is present and lets anonymous
/// requests through unchanged.
pub async fn optional_auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> impl IntoResponse {
    if let Some(token) = extract_token(&cookie_jar, req.headers()) {
        match resolve_profile(&app_state, token).await {
            Ok(profile) => {
                req.extensions_mut().insert(JWTAuthMiddeware { profile });
            }
            Err(e) => tracing::debug!("Ignoring invalid session on public route: {}", e),
        }
    }

    next.run(req).await
}

/// Passes when the caller holds any of `required_roles`.
pub async fn role_check(
    Extension(_app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
    required_roles: Vec<ProfileRole>,
) -> Result<impl IntoResponse, HttpError> {
    let auth = req
        .extensions()
        .get::<JWTAuthMiddeware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles
        .iter()
        .any(|role| auth.profile.has_role(*role))
    {
        return Err(HttpError::new(
            ErrorMessage::PermissionDenied.to_string(),
            StatusCode::FORBIDDEN,
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn cookie_wins_over_bearer_header() {
        let jar = CookieJar::new().add(Cookie::new("token", "from-cookie"));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&jar, &headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn bearer_header_is_used_without_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(
            extract_token(&CookieJar::new(), &headers).as_deref(),
            Some("abc.def")
        );
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_token(&CookieJar::new(), &headers), None);
    }
}
