use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    db::catalogdb::CatalogExt,
    dtos::ListResponse,
    error::{db_error, HttpError},
    AppState,
};

pub fn catalog_handler() -> Router {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/locations", get(list_locations))
}

pub async fn list_categories(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state
        .db_client
        .get_categories()
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(categories)))
}

pub async fn list_locations(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let locations = app_state
        .db_client
        .get_locations()
        .await
        .map_err(db_error)?;

    Ok(Json(ListResponse::new(locations)))
}
