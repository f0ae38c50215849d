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
    db::{offerdb::OfferExt, reviewdb::ReviewExt, taskdb::TaskExt},
    dtos::{
        reviewdtos::{CreateReviewDto, ReviewListResponseDto},
        ApiResponse,
    },
    error::{db_error, HttpError},
    middleware::{auth, JWTAuthMiddeware},
    models::taskmodel::TaskStatus,
    service::error::ServiceError,
    AppState,
};

pub fn reviews_handler() -> Router {
    Router::new()
        .route("/", post(create_review).layer(middleware::from_fn(auth)))
        .route("/profile/:profile_id", get(list_reviews))
}

/// The two sides of a completed task are its poster and the worker whose
/// offer was accepted; each may review the other once.
fn is_review_pair(poster_id: Uuid, worker_id: Uuid, reviewer_id: Uuid, reviewee_id: Uuid) -> bool {
    (reviewer_id == poster_id && reviewee_id == worker_id)
        || (reviewer_id == worker_id && reviewee_id == poster_id)
}

pub async fn create_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = app_state
        .db_client
        .get_task(body.task_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::TaskNotFound(body.task_id))?;

    if task.status != TaskStatus::Completed {
        return Err(HttpError::conflict("Only completed tasks can be reviewed"));
    }

    let worker_id = app_state
        .db_client
        .get_accepted_worker(task.id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::conflict("This task has no accepted worker"))?;

    if !is_review_pair(task.poster_id, worker_id, user.profile.id, body.reviewee_id) {
        return Err(HttpError::forbidden(
            "Only the poster and the hired worker can review each other",
        ));
    }

    let comment = body
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let review = app_state
        .db_client
        .create_review(task.id, user.profile.id, body.reviewee_id, body.rating, comment)
        .await
        .map_err(|e| match db_error(e) {
            err if err.status == StatusCode::CONFLICT => {
                HttpError::conflict("You have already reviewed this person for this task")
            }
            err => err,
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Review submitted", review)),
    ))
}

pub async fn list_reviews(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(profile_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let reviews = app_state
        .db_client
        .get_reviews_for_profile(profile_id)
        .await
        .map_err(db_error)?;

    let summary = app_state
        .db_client
        .get_rating_summary(profile_id)
        .await
        .map_err(db_error)?;

    Ok(Json(ReviewListResponseDto {
        status: "success".to_string(),
        reviews,
        summary,
    }))
}
