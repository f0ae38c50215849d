use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{messagedb::MessageExt, profiledb::ProfileExt, taskdb::TaskExt},
    dtos::{
        messagedtos::{MarkReadResponseDto, SendMessageDto, UnreadCountResponseDto},
        ApiResponse, ListResponse,
    },
    error::{db_error, HttpError},
    mail::mails::send_new_message_email,
    middleware::{auth, JWTAuthMiddeware},
    models::taskmodel::Task,
    service::{access, error::ServiceError, realtime::is_visible_to},
    AppState,
};

pub fn messages_handler() -> Router {
    Router::new()
        .route("/unread", get(unread_count))
        .route("/:task_id", get(list_messages).post(send_message))
        .route("/:task_id/read", post(mark_read))
        .route("/:task_id/stream", get(stream_messages))
        .layer(middleware::from_fn(auth))
}

/// Chat text is stored as plain text: markup is stripped, and the entities
/// ammonia writes when serialising text nodes are turned back into the
/// characters the sender typed.
pub fn sanitize_content(raw: &str) -> String {
    let cleaned = ammonia::Builder::empty()
        .clean_content_tags(["script", "style"].into_iter().collect())
        .clean(raw.trim())
        .to_string();
    unescape_text(&cleaned).trim().to_string()
}

// `&amp;` goes last so an escaped entity is not decoded twice.
fn unescape_text(serialized: &str) -> String {
    serialized
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

async fn load_visible_task(
    app_state: &AppState,
    user: &JWTAuthMiddeware,
    task_id: Uuid,
) -> Result<Task, HttpError> {
    let task = app_state
        .db_client
        .get_task(task_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::TaskNotFound(task_id))?;

    if !access::can_view_task(Some(&user.profile), &task) {
        return Err(ServiceError::TaskNotFound(task_id).into());
    }
    Ok(task)
}

pub async fn list_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    load_visible_task(&app_state, &user, task_id).await?;

    let messages = app_state
        .db_client
        .get_task_messages(task_id, user.profile.id)
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(messages)))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = load_visible_task(&app_state, &user, task_id).await?;

    let receiver = app_state
        .db_client
        .get_profile(body.receiver_id)
        .await
        .map_err(db_error)?
        .ok_or(ServiceError::ProfileNotFound(body.receiver_id))?;
    access::authorize_message(&user.profile, &task, &receiver, Utc::now())?;

    let content = sanitize_content(&body.content);
    if content.is_empty() {
        return Err(HttpError::bad_request("Message is empty"));
    }

    let message = app_state
        .db_client
        .create_message(task_id, user.profile.id, receiver.id, content)
        .await
        .map_err(db_error)?;

    let delivered = app_state.chat_hub.publish(message.clone());
    tracing::debug!("Message {} pushed to {} open streams", message.id, delivered);

    let sender_name = user.profile.full_name.clone();
    let task_link = format!("{}/tasks/{}/messages", app_state.env.site_url, task.id);
    tokio::spawn(async move {
        if let Err(e) =
            send_new_message_email(&receiver.email, &sender_name, &task.title, &task_link).await
        {
            tracing::error!("Failed to send new message email: {}", e);
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Message sent", message)),
    ))
}

pub async fn mark_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let updated = app_state
        .db_client
        .mark_messages_read(task_id, user.profile.id)
        .await
        .map_err(db_error)?;

    Ok(Json(MarkReadResponseDto {
        status: "success".to_string(),
        updated,
    }))
}

pub async fn unread_count(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let unread = app_state
        .db_client
        .count_unread(user.profile.id)
        .await
        .map_err(db_error)?;

    Ok(Json(UnreadCountResponseDto {
        status: "success".to_string(),
        unread,
    }))
}

pub async fn stream_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(task_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpError> {
    load_visible_task(&app_state, &user, task_id).await?;

    let viewer_id = user.profile.id;
    let receiver = app_state.chat_hub.subscribe();
    tracing::debug!(
        "Viewer {} streaming messages for task {} ({} open streams)",
        viewer_id,
        task_id,
        app_state.chat_hub.subscriber_count()
    );

    // Lagged receivers skip what they missed; clients reload history on reconnect.
    let stream = BroadcastStream::new(receiver).filter_map(move |result| {
        let message = result.ok()?;
        if !is_visible_to(&message, task_id, viewer_id) {
            return None;
        }
        Event::default().event("message").json_data(&message).ok().map(Ok::<Event, Infallible>)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
