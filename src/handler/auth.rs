use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use validator::Validate;

use crate::{
    db::profiledb::ProfileExt,
    dtos::{
        profiledtos::{AuthResponseDto, LoginProfileDto, RegisterProfileDto},
        Response as MessageResponse,
    },
    error::{db_error, ErrorMessage, HttpError},
    middleware::{
        auth,
        rate_limit::{auth_rate_limiter, rate_limit_middleware},
        JWTAuthMiddeware,
    },
    models::profilemodel::Profile,
    utils::{password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    let credentials = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(middleware::from_fn_with_state(
            Arc::new(auth_rate_limiter()),
            rate_limit_middleware,
        ));

    Router::new()
        .merge(credentials)
        .route("/logout", post(logout))
        .route("/refresh", post(refresh).layer(middleware::from_fn(auth)))
}

fn session_cookie(value: String, max_age_minutes: i64) -> Result<HeaderValue, HttpError> {
    let cookie = Cookie::build(("token", value))
        .path("/")
        .max_age(time::Duration::minutes(max_age_minutes))
        .http_only(true)
        .build();

    cookie
        .to_string()
        .parse()
        .map_err(|_| HttpError::server_error("Failed to build session cookie"))
}

fn session_response(app_state: &AppState, profile: &Profile) -> Result<Response, HttpError> {
    let token = token::create_token(
        &profile.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cookie = session_cookie(token.clone(), app_state.env.jwt_maxage)?;

    let mut response = Json(AuthResponseDto::new(token, profile)).into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

/// Rejections of the password itself are the caller's fault; anything else
/// is a hashing failure.
fn password_error(e: ErrorMessage) -> HttpError {
    match e {
        ErrorMessage::EmptyPassword | ErrorMessage::ExceededMaxPasswordLength(_) => {
            HttpError::bad_request(e.to_string())
        }
        _ => HttpError::server_error(e.to_string()),
    }
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let existing = app_state
        .db_client
        .get_profile_by_email(&body.email)
        .await
        .map_err(db_error)?;

    if existing.is_some() {
        return Err(HttpError::unique_constraint_violation(
            ErrorMessage::EmailExist.to_string(),
        ));
    }

    let hashed_password = password::hash(&body.password).map_err(password_error)?;

    let profile = app_state
        .db_client
        .create_profile(
            body.email.trim().to_string(),
            hashed_password,
            body.full_name.trim().to_string(),
            body.is_poster,
            body.is_worker,
        )
        .await
        .map_err(db_error)?;

    tracing::info!("Registered profile {}", profile.id);

    session_response(&app_state, &profile)
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .db_client
        .get_profile_by_email(&body.email)
        .await
        .map_err(db_error)?;

    let profile = result.ok_or(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &profile.password_hash)
        .map_err(|_| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    if !password_matched {
        return Err(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()));
    }

    session_response(&app_state, &profile)
}

pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let cookie = session_cookie(String::new(), 0)?;

    let mut response = Json(MessageResponse {
        status: "success",
        message: "Logged out".to_string(),
    })
    .into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

pub async fn refresh(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    session_response(&app_state, &user.profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn overlong_password_is_a_bad_request() {
        let err = password::hash("p".repeat(80)).unwrap_err();
        assert_eq!(password_error(err).status, StatusCode::BAD_REQUEST);
        assert_eq!(
            password_error(ErrorMessage::HashingError).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
