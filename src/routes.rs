use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, auth::auth_handler, catalog::catalog_handler,
        messages::messages_handler, offers::offers_handler, payments::payments_handler,
        profiles::profiles_handler, reviews::reviews_handler,
        system::{health, system_handler},
        tasks::tasks_handler, uploads::uploads_handler,
    },
    AppState,
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/profiles", profiles_handler())
        .nest("/catalog", catalog_handler())
        .nest("/tasks", tasks_handler())
        .nest("/offers", offers_handler())
        .nest("/reviews", reviews_handler())
        .nest("/messages", messages_handler())
        .nest("/admin", admin_handler())
        .nest("/stripe", payments_handler())
        .nest("/uploads", uploads_handler())
        .merge(system_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::{config::test_config, db::DBClient, service::storage::StorageService};

    fn test_app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let state = AppState::new(DBClient::new(pool), config, StorageService::disabled());
        create_router(Arc::new(state))
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        test_app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn health_is_public() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn private_routes_require_a_token() {
        for uri in [
            "/api/profiles/me",
            "/api/tasks/mine",
            "/api/messages/unread",
            "/api/admin/dashboard",
            "/api/stripe/payments",
        ] {
            let request = Request::get(uri).body(Body::empty()).unwrap();
            assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let request = Request::get("/api/offers/mine")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_without_signature_is_bad_request() {
        let request = Request::post("/api/stripe/webhook")
            .body(Body::from("{}"))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_with_forged_signature_is_bad_request() {
        let request = Request::post("/api/stripe/webhook")
            .header("stripe-signature", "t=1700000000,v1=deadbeef")
            .body(Body::from(r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{}}}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn make_admin_without_credentials_is_forbidden() {
        let request = Request::post("/api/make-admin")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"someone@example.com"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn make_admin_with_wrong_bootstrap_secret_is_forbidden() {
        let request = Request::post("/api/make-admin")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-admin-bootstrap", "guess")
            .body(Body::from(r#"{"email":"someone@example.com"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn checkout_config_is_public() {
        let request = Request::get("/api/stripe/config").body(Body::empty()).unwrap();
        assert_eq!(status_of(request).await, StatusCode::OK);
    }
}
