use std::sync::Arc;

use axum::{
    body::Bytes,
    http::HeaderMap,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::{
    db::{paymentdb::PaymentExt, taskdb::TaskExt},
    dtos::{
        paymentdtos::{CheckoutResponseDto, CreateCheckoutDto, WebhookAckDto},
        ListResponse,
    },
    error::{db_error, HttpError},
    middleware::{
        auth,
        rate_limit::{rate_limit_middleware, webhook_rate_limiter},
        JWTAuthMiddeware,
    },
    models::{paymentmodel::PaymentType, taskmodel::TaskStatus},
    service::{error::ServiceError, payment_provider::CheckoutRequest, webhook::StripeEvent},
    AppState,
};

pub fn payments_handler() -> Router {
    let private = Router::new()
        .route("/create-checkout", post(create_checkout))
        .route("/payments", get(my_payments))
        .layer(middleware::from_fn(auth));

    let webhook = Router::new()
        .route("/webhook", post(stripe_webhook))
        .layer(middleware::from_fn_with_state(
            Arc::new(webhook_rate_limiter()),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/config", get(stripe_config))
        .merge(private)
        .merge(webhook)
}

pub async fn stripe_config(
    Extension(app_state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "publishable_key": app_state.env.stripe_publishable_key,
        "currency": app_state.env.payment_currency,
        "task_posting_fee_cents": app_state.env.task_posting_fee_cents,
        "featured_task_fee_cents": app_state.env.featured_task_fee_cents,
        "featured_task_days": app_state.env.featured_task_days,
    }))
}

pub async fn create_checkout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateCheckoutDto>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = &user.profile;

    let task_title = if body.payment_type.requires_task() {
        let task_id = body
            .task_id
            .ok_or_else(|| HttpError::bad_request("taskId is required for this payment"))?;

        let task = app_state
            .db_client
            .get_task(task_id)
            .await
            .map_err(db_error)?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        if task.poster_id != profile.id {
            return Err(ServiceError::UnauthorizedTaskAccess(profile.id, task_id).into());
        }
        if matches!(task.status, TaskStatus::Rejected | TaskStatus::Cancelled | TaskStatus::Completed) {
            return Err(HttpError::conflict("This task can no longer be promoted"));
        }
        if body.payment_type == PaymentType::TaskPosting && task.is_paid {
            return Err(HttpError::conflict("The posting fee for this task is already paid"));
        }
        Some(task.title)
    } else {
        if !profile.is_worker {
            return Err(HttpError::forbidden(
                "Apply as a worker before subscribing",
            ));
        }
        if profile.has_running_stripe_subscription(chrono::Utc::now()) {
            return Err(HttpError::conflict("You already have an active subscription"));
        }
        None
    };

    let request = CheckoutRequest {
        payment_type: body.payment_type,
        user_id: profile.id,
        user_email: profile.email.clone(),
        task_id: if body.payment_type.requires_task() { body.task_id } else { None },
        task_title,
    };

    let session = app_state.payments.create_checkout_session(&request).await?;
    let url = session.url.ok_or_else(|| {
        HttpError::from(ServiceError::PaymentProvider(
            "Checkout session has no URL".to_string(),
        ))
    })?;

    tracing::info!(
        "Checkout session {} created for {} ({})",
        session.id,
        profile.id,
        body.payment_type.to_str()
    );

    Ok(Json(CheckoutResponseDto { url }))
}

/// Stripe webhook. The body must stay raw for signature verification, so it
/// is read as bytes and parsed only once the signature checks out.
pub async fn stripe_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| HttpError::bad_request("Missing Stripe signature"))?;

    if let Err(e) = app_state.payments.verify_webhook(&body, signature) {
        tracing::warn!("Rejected Stripe webhook: {}", e);
        return Err(HttpError::bad_request("Invalid webhook signature"));
    }

    let event: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Malformed Stripe webhook payload: {}", e);
        HttpError::bad_request("Malformed webhook payload")
    })?;

    tracing::info!("Stripe webhook {} ({})", event.id, event.event_type);

    if let Err(e) = app_state.webhook_service.handle(&event).await {
        tracing::error!("Stripe webhook {} failed: {}", event.id, e);
        return Err(HttpError::server_error("Webhook handler failed"));
    }

    Ok(Json(WebhookAckDto { received: true }))
}

pub async fn my_payments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state
        .db_client
        .get_user_payments(user.profile.id)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(payments)))
}
