use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{catalogdb::CatalogExt, profiledb::ProfileExt, reviewdb::ReviewExt},
    dtos::{
        profiledtos::{ProfileResponseDto, UpdateProfileDto, WorkerApplicationDto},
        ApiResponse, ListResponse,
    },
    error::{db_error, HttpError},
    middleware::{auth, JWTAuthMiddeware},
    models::profilemodel::WorkerStatus,
    service::task_filter::WorkerFilter,
    AppState,
};

pub fn profiles_handler() -> Router {
    let private = Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/worker", post(apply_as_worker))
        .layer(middleware::from_fn(auth));

    Router::new()
        .route("/workers", get(list_workers))
        .route("/workers/:id", get(get_worker))
        .merge(private)
}

pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(ProfileResponseDto::from_profile(&user.profile)))
}

pub async fn update_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let profile = app_state
        .db_client
        .update_profile(
            user.profile.id,
            body.full_name.map(|n| n.trim().to_string()),
            body.phone,
            body.avatar_url,
            body.is_poster,
        )
        .await
        .map_err(db_error)?;

    Ok(Json(ProfileResponseDto::from_profile(&profile)))
}

/// Drops repeated ids, keeping first-seen order.
fn distinct_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

pub async fn apply_as_worker(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<WorkerApplicationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if user.profile.worker_status == Some(WorkerStatus::Rejected) {
        tracing::info!("Profile {} is re-applying after rejection", user.profile.id);
    }

    let location_ids = distinct_ids(body.location_ids);
    let known_locations = app_state
        .db_client
        .count_locations(&location_ids)
        .await
        .map_err(db_error)?;
    if known_locations != location_ids.len() as i64 {
        return Err(HttpError::bad_request("Unknown location in application"));
    }

    let skills: Vec<String> = body
        .skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let profile = app_state
        .db_client
        .submit_worker_application(
            user.profile.id,
            body.bio.trim().to_string(),
            skills,
            location_ids,
            body.hourly_rate,
        )
        .await
        .map_err(db_error)?;

    tracing::info!(
        "Worker application from {} is {}",
        profile.id,
        profile.worker_status.map(|s| s.to_str().to_string()).unwrap_or_default()
    );

    Ok(Json(ProfileResponseDto::from_profile(&profile)))
}

pub async fn list_workers(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(filter): Query<WorkerFilter>,
) -> Result<impl IntoResponse, HttpError> {
    let workers = app_state
        .db_client
        .get_approved_workers()
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(filter.apply(workers))))
}

pub async fn get_worker(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(worker_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let worker = app_state
        .db_client
        .get_worker_listing(worker_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::not_found("Worker not found"))?;

    let reviews = app_state
        .db_client
        .get_reviews_for_profile(worker_id)
        .await
        .map_err(db_error)?;

    Ok(Json(ApiResponse::success(
        "Worker retrieved",
        serde_json::json!({ "worker": worker, "reviews": reviews }),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_locations_collapse_in_order() {
        let split = Uuid::new_v4();
        let zagreb = Uuid::new_v4();
        assert_eq!(distinct_ids(vec![split, zagreb, split, split]), vec![split, zagreb]);
    }
}
