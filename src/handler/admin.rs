use std::sync::Arc;

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
    db::{paymentdb::PaymentExt, profiledb::ProfileExt, taskdb::TaskExt},
    dtos::{
        profiledtos::{FilterProfileDto, ProfileResponseDto, WorkerStatusQuery},
        taskdtos::{RejectTaskDto, TaskStatusQuery},
        ApiResponse, ListResponse,
    },
    error::{db_error, HttpError},
    mail::mails::{send_task_approved_email, send_task_rejected_email, send_worker_decision_email},
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::{
        profilemodel::{ProfileRole, WorkerStatus},
        taskmodel::{Task, TaskStatus},
    },
    service::{access, error::ServiceError},
    AppState,
};

const ADMIN_PAYMENTS_LIMIT: i64 = 200;

pub fn admin_handler() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id/approve", post(approve_task))
        .route("/tasks/:id/reject", post(reject_task))
        .route("/workers", get(list_workers))
        .route("/workers/:id/approve", post(approve_worker))
        .route("/workers/:id/reject", post(reject_worker))
        .route("/workers/:id/suspend", post(suspend_worker))
        .route("/payments", get(list_payments))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![ProfileRole::Admin])
        }))
        .layer(middleware::from_fn(auth))
}

pub async fn dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let db = &app_state.db_client;

    let task_counts = db.count_tasks().await.map_err(db_error)?;
    let pending_tasks = db
        .get_listings_by_status(Some(TaskStatus::Pending))
        .await
        .map_err(db_error)?;
    let pending_workers = db
        .get_workers_by_status(Some(WorkerStatus::Pending))
        .await
        .map_err(db_error)?;
    let total_profiles = db.count_profiles().await.map_err(db_error)?;
    let revenue_cents = db.get_total_revenue_cents().await.map_err(db_error)?;

    Ok(Json(ApiResponse::success(
        "Dashboard retrieved",
        serde_json::json!({
            "task_counts": task_counts,
            "total_profiles": total_profiles,
            "revenue_cents": revenue_cents,
            "currency": app_state.env.payment_currency,
            "pending_tasks": pending_tasks,
            "pending_workers": FilterProfileDto::filter_profiles(&pending_workers),
        }),
    )))
}

pub async fn list_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<TaskStatusQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let tasks = app_state
        .db_client
        .get_listings_by_status(query.status)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(tasks)))
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

pub async fn approve_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = load_task(&app_state, task_id).await?;
    access::authorize_transition(&admin.profile, &task, TaskStatus::Approved)?;

    let approved = app_state
        .db_client
        .approve_task(task_id, admin.profile.id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::InvalidTaskTransition(
            task_id,
            task.status,
            TaskStatus::Approved,
        ))?;

    tracing::info!("Task {} approved by {}", task_id, admin.profile.id);

    if let Ok(Some(poster)) = app_state.db_client.get_profile(approved.poster_id).await {
        let task_link = format!("{}/tasks/{}", app_state.env.site_url, approved.id);
        let title = approved.title.clone();
        tokio::spawn(async move {
            if let Err(e) =
                send_task_approved_email(&poster.email, &poster.full_name, &title, &task_link).await
            {
                tracing::error!("Failed to send task approval email: {}", e);
            }
        });
    }

    Ok(Json(ApiResponse::success("Task approved", approved)))
}

pub async fn reject_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
    body: Option<Json<RejectTaskDto>>,
) -> Result<impl IntoResponse, HttpError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = load_task(&app_state, task_id).await?;
    access::authorize_transition(&admin.profile, &task, TaskStatus::Rejected)?;

    let reason = body
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let rejected = app_state
        .db_client
        .reject_task(task_id, reason.clone())
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::InvalidTaskTransition(
            task_id,
            task.status,
            TaskStatus::Rejected,
        ))?;

    tracing::info!("Task {} rejected by {}", task_id, admin.profile.id);

    if let Ok(Some(poster)) = app_state.db_client.get_profile(rejected.poster_id).await {
        let title = rejected.title.clone();
        tokio::spawn(async move {
            if let Err(e) =
                send_task_rejected_email(&poster.email, &poster.full_name, &title, reason.as_deref())
                    .await
            {
                tracing::error!("Failed to send task rejection email: {}", e);
            }
        });
    }

    Ok(Json(ApiResponse::success("Task rejected", rejected)))
}

pub async fn list_workers(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<WorkerStatusQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let workers = app_state
        .db_client
        .get_workers_by_status(query.status)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(FilterProfileDto::filter_profiles(&workers))))
}

async fn decide_worker(
    app_state: &AppState,
    admin: &JWTAuthMiddeware,
    worker_id: Uuid,
    next: WorkerStatus,
) -> Result<ProfileResponseDto, HttpError> {
    let worker = app_state
        .db_client
        .get_profile(worker_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::ProfileNotFound(worker_id))?;

    let current = match (worker.is_worker, worker.worker_status) {
        (true, Some(status)) => status,
        _ => return Err(HttpError::bad_request("Profile has not applied as a worker")),
    };

    if !current.can_transition_to(next) {
        return Err(HttpError::conflict(format!(
            "Worker is {} and cannot become {}",
            current.to_str(),
            next.to_str()
        )));
    }

    let updated = app_state
        .db_client
        .update_worker_status(worker_id, current, next)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::conflict("Worker status changed concurrently"))?;

    tracing::info!(
        "Worker {} moved from {} to {} by {}",
        worker_id,
        current.to_str(),
        next.to_str(),
        admin.profile.id
    );

    let email = updated.email.clone();
    let full_name = updated.full_name.clone();
    let decision = next.to_str().to_string();
    tokio::spawn(async move {
        if let Err(e) = send_worker_decision_email(&email, &full_name, &decision).await {
            tracing::error!("Failed to send worker decision email: {}", e);
        }
    });

    Ok(ProfileResponseDto::from_profile(&updated))
}

pub async fn approve_worker(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddeware>,
    Path(worker_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = decide_worker(&app_state, &admin, worker_id, WorkerStatus::Approved).await?;
    Ok(Json(response))
}

pub async fn reject_worker(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddeware>,
    Path(worker_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = decide_worker(&app_state, &admin, worker_id, WorkerStatus::Rejected).await?;
    Ok(Json(response))
}

pub async fn suspend_worker(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddeware>,
    Path(worker_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let response = decide_worker(&app_state, &admin, worker_id, WorkerStatus::Suspended).await?;
    Ok(Json(response))
}

pub async fn list_payments(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state
        .db_client
        .get_all_payments(ADMIN_PAYMENTS_LIMIT)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(payments)))
}
