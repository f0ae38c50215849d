use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{catalogdb::CatalogExt, taskdb::TaskExt},
    dtos::{
        taskdtos::{CreateTaskDto, TaskResponseDto, UpdateTaskDto},
        ApiResponse, ListResponse, Response as MessageResponse,
    },
    error::{db_error, HttpError},
    middleware::{auth, optional_auth, role_check, JWTAuthMiddeware},
    models::{profilemodel::ProfileRole, taskmodel::TaskStatus},
    service::{access, error::ServiceError, task_filter::TaskFilter},
    AppState,
};

pub fn tasks_handler() -> Router {
    let public = Router::new()
        .route("/", get(list_tasks))
        .route("/:id", get(get_task))
        .layer(middleware::from_fn(optional_auth));

    let posting = Router::new()
        .route("/", post(create_task))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![ProfileRole::Poster])
        }))
        .layer(middleware::from_fn(auth));

    let private = Router::new()
        .route("/mine", get(my_tasks))
        .route("/:id", put(update_task).delete(delete_task))
        .route("/:id/complete", post(complete_task))
        .route("/:id/cancel", post(cancel_task))
        .layer(middleware::from_fn(auth));

    Router::new().merge(public).merge(posting).merge(private)
}

async fn ensure_catalog_refs(
    app_state: &AppState,
    category_id: Option<Uuid>,
    location_id: Option<Uuid>,
) -> Result<(), HttpError> {
    if let Some(category_id) = category_id {
        app_state
            .db_client
            .get_category(category_id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| HttpError::bad_request("Unknown category"))?;
    }
    if let Some(location_id) = location_id {
        app_state
            .db_client
            .get_location(location_id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| HttpError::bad_request("Unknown location"))?;
    }
    Ok(())
}

pub async fn list_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    viewer: Option<Extension<JWTAuthMiddeware>>,
    Query(filter): Query<TaskFilter>,
) -> Result<impl IntoResponse, HttpError> {
    let now = Utc::now();
    let viewer = viewer.map(|Extension(v)| v.profile);

    let listings = app_state
        .db_client
        .get_approved_listings()
        .await
        .map_err(db_error)?;

    let tasks: Vec<TaskResponseDto> = filter
        .apply(listings, now)
        .into_iter()
        .map(|listing| {
            let visible = access::can_view_contact(viewer.as_ref(), &listing.task, now);
            TaskResponseDto::for_viewer(listing, visible, now)
        })
        .collect();

    Ok(Json(ListResponse::new(tasks)))
}

pub async fn get_task(
    Extension(app_state): Extension<Arc<AppState>>,
    viewer: Option<Extension<JWTAuthMiddeware>>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let now = Utc::now();
    let viewer = viewer.map(|Extension(v)| v.profile);

    let mut listing = app_state
        .db_client
        .get_task_listing(task_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::not_found("Task not found"))?;

    // Hidden tasks are reported as missing rather than forbidden.
    if !access::can_view_task(viewer.as_ref(), &listing.task) {
        return Err(HttpError::not_found("Task not found"));
    }

    app_state
        .db_client
        .increment_views(task_id)
        .await
        .map_err(db_error)?;
    listing.task.views_count += 1;

    let visible = access::can_view_contact(viewer.as_ref(), &listing.task, now);

    Ok(Json(ApiResponse::success(
        "Task retrieved",
        TaskResponseDto::for_viewer(listing, visible, now),
    )))
}

pub async fn create_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateTaskDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    ensure_catalog_refs(&app_state, Some(body.category_id), Some(body.location_id)).await?;

    let task = app_state
        .db_client
        .create_task(body.into_new_task(user.profile.id))
        .await
        .map_err(db_error)?;

    tracing::info!("Task {} created by {} and awaiting approval", task.id, user.profile.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Task submitted for approval", task)),
    ))
}

pub async fn update_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateTaskDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = app_state
        .db_client
        .get_task(task_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::TaskNotFound(task_id))?;

    access::authorize_edit(&user.profile, &task)?;
    ensure_catalog_refs(&app_state, body.category_id, body.location_id).await?;

    let updated = app_state
        .db_client
        .update_pending_task(task_id, body.into())
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::conflict("Task is no longer awaiting approval"))?;

    Ok(Json(ApiResponse::success("Task updated", updated)))
}

async fn close_task(
    app_state: &AppState,
    user: &JWTAuthMiddeware,
    task_id: Uuid,
    next: TaskStatus,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state
        .db_client
        .get_task(task_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::TaskNotFound(task_id))?;

    access::authorize_transition(&user.profile, &task, next)?;

    let closed = app_state
        .db_client
        .close_task(task_id, next)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::InvalidTaskTransition(task_id, task.status, next))?;

    tracing::info!("Task {} is now {}", task_id, next.to_str());

    Ok(Json(ApiResponse::success(
        &format!("Task {}", next.to_str()),
        closed,
    )))
}

pub async fn complete_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    close_task(&app_state, &user, task_id, TaskStatus::Completed).await
}

pub async fn cancel_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    close_task(&app_state, &user, task_id, TaskStatus::Cancelled).await
}

pub async fn delete_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state
        .db_client
        .get_task(task_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::TaskNotFound(task_id))?;

    access::authorize_delete(&user.profile, &task)?;

    let deleted = app_state
        .db_client
        .delete_task(task_id)
        .await
        .map_err(db_error)?;
    if deleted == 0 {
        return Err(HttpError::not_found("Task not found"));
    }

    tracing::info!("Task {} deleted by {}", task_id, user.profile.id);

    Ok(Json(MessageResponse {
        status: "success",
        message: "Task deleted".to_string(),
    }))
}

pub async fn my_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let now = Utc::now();
    let tasks: Vec<TaskResponseDto> = app_state
        .db_client
        .get_listings_by_poster(user.profile.id)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(|listing| TaskResponseDto::for_viewer(listing, true, now))
        .collect();

    Ok(Json(ListResponse::new(tasks)))
}
