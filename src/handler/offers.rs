use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{offerdb::OfferExt, taskdb::TaskExt},
    dtos::{offerdtos::CreateOfferDto, ApiResponse, ListResponse},
    error::{db_error, HttpError},
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::{
        offermodel::{Offer, OfferStatus},
        profilemodel::ProfileRole,
        taskmodel::{Task, TaskStatus},
    },
    service::{access, error::ServiceError},
    AppState,
};

const TASK_ALREADY_ASSIGNED: &str = "This task already has an accepted offer";

pub fn offers_handler() -> Router {
    let bidding = Router::new()
        .route("/mine", get(my_offers))
        .route("/task/:task_id", post(create_offer))
        .route("/:id/withdraw", post(withdraw_offer))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![ProfileRole::Worker])
        }))
        .layer(middleware::from_fn(auth));

    let deciding = Router::new()
        .route("/task/:task_id", get(list_task_offers))
        .route("/:id/accept", post(accept_offer))
        .route("/:id/reject", post(reject_offer))
        .layer(middleware::from_fn(auth));

    Router::new().merge(bidding).merge(deciding)
}

async fn load_task(app_state: &AppState, task_id: Uuid) -> Result<Task, HttpError> {
    let task = app_state
        .db_client
        .get_task(task_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::TaskNotFound(task_id))?;
    Ok(task)
}

/// Loads a still-pending offer together with its task.
async fn load_pending_offer(
    app_state: &AppState,
    offer_id: Uuid,
) -> Result<(Offer, Task), HttpError> {
    let offer = app_state
        .db_client
        .get_offer(offer_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::OfferNotFound(offer_id))?;

    if offer.status.is_final() {
        return Err(ServiceError::OfferAlreadyDecided(offer_id, offer.status).into());
    }

    let task = load_task(app_state, offer.task_id).await?;
    Ok((offer, task))
}

pub async fn create_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<CreateOfferDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = load_task(&app_state, task_id).await?;
    access::authorize_offer(&user.profile, &task)?;

    let assigned = app_state
        .db_client
        .get_accepted_worker(task_id)
        .await
        .map_err(db_error)?;
    if assigned.is_some() {
        return Err(HttpError::conflict(TASK_ALREADY_ASSIGNED));
    }

    let offer = app_state
        .db_client
        .create_offer(task_id, user.profile.id, body.amount, body.message.trim().to_string())
        .await
        .map_err(|e| match db_error(e) {
            err if err.status == StatusCode::CONFLICT => {
                HttpError::conflict("You already have a pending offer on this task")
            }
            err => err,
        })?
        .ok_or_else(|| HttpError::conflict(TASK_ALREADY_ASSIGNED))?;

    tracing::info!("Worker {} offered {} on task {}", user.profile.id, offer.amount, task_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Offer submitted", offer)),
    ))
}

pub async fn list_task_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = load_task(&app_state, task_id).await?;

    let offers = app_state
        .db_client
        .get_offers_for_task(task_id)
        .await
        .map_err(db_error)?;

    let offers = if access::is_owner(&user.profile, &task) || user.profile.is_admin {
        offers
    } else {
        offers
            .into_iter()
            .filter(|o| o.offer.worker_id == user.profile.id)
            .collect()
    };

    Ok(Json(ListResponse::new(offers)))
}

pub async fn accept_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let (_offer, task) = load_pending_offer(&app_state, offer_id).await?;

    if !access::is_owner(&user.profile, &task) {
        return Err(ServiceError::UnauthorizedTaskAccess(user.profile.id, task.id).into());
    }
    if task.status != TaskStatus::Approved {
        return Err(HttpError::conflict("Offers can only be accepted on open tasks"));
    }

    // The unique index on accepted offers catches two accepts racing.
    let accepted = app_state
        .db_client
        .accept_offer(offer_id)
        .await
        .map_err(|e| match db_error(e) {
            err if err.status == StatusCode::CONFLICT => HttpError::conflict(TASK_ALREADY_ASSIGNED),
            err => err,
        })?
        .ok_or_else(|| {
            HttpError::conflict("Offer is no longer pending or the task already has a worker")
        })?;

    tracing::info!("Offer {} accepted on task {}", offer_id, task.id);

    Ok(Json(ApiResponse::success("Offer accepted", accepted)))
}

pub async fn reject_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let (_offer, task) = load_pending_offer(&app_state, offer_id).await?;

    if !access::is_owner(&user.profile, &task) {
        return Err(ServiceError::UnauthorizedTaskAccess(user.profile.id, task.id).into());
    }

    let rejected = app_state
        .db_client
        .decide_offer(offer_id, OfferStatus::Rejected)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::conflict("Offer is no longer pending"))?;

    Ok(Json(ApiResponse::success("Offer rejected", rejected)))
}

pub async fn withdraw_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let (offer, _task) = load_pending_offer(&app_state, offer_id).await?;

    if offer.worker_id != user.profile.id {
        return Err(HttpError::forbidden("Only the offering worker can withdraw an offer"));
    }

    let withdrawn = app_state
        .db_client
        .decide_offer(offer_id, OfferStatus::Withdrawn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::conflict("Offer is no longer pending"))?;

    Ok(Json(ApiResponse::success("Offer withdrawn", withdrawn)))
}

pub async fn my_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let offers = app_state
        .db_client
        .get_offers_by_worker(user.profile.id)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(offers)))
}
