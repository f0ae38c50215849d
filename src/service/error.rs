use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::{offermodel::OfferStatus, taskmodel::TaskStatus},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    #[error("Profile {0} not found")]
    ProfileNotFound(Uuid),

    #[error("Offer {0} not found")]
    OfferNotFound(Uuid),

    #[error("Task {0} cannot move from {1:?} to {2:?}")]
    InvalidTaskTransition(Uuid, TaskStatus, TaskStatus),

    #[error("Offer {0} is already {1:?}")]
    OfferAlreadyDecided(Uuid, OfferStatus),

    #[error("User {0} is not allowed to perform this action on task {1}")]
    UnauthorizedTaskAccess(Uuid, Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::TaskNotFound(_)
            | ServiceError::ProfileNotFound(_)
            | ServiceError::OfferNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::InvalidTaskTransition(_, _, _)
            | ServiceError::OfferAlreadyDecided(_, _)
            | ServiceError::Conflict(_) => StatusCode::CONFLICT,

            ServiceError::UnauthorizedTaskAccess(_, _) | ServiceError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }

            ServiceError::Validation(_) | ServiceError::InvalidSignature(_) => {
                StatusCode::BAD_REQUEST
            }

            ServiceError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,

            ServiceError::Storage(_) | ServiceError::Database(_) | ServiceError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        if let ServiceError::Database(ref e) = error {
            tracing::error!("Database error: {}", e);
        }
        HttpError::new(error.to_string(), error.status_code())
    }
}

impl From<String> for ServiceError {
    fn from(err: String) -> Self {
        ServiceError::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_status_race_maps_to_conflict() {
        let id = Uuid::new_v4();
        let http: HttpError =
            ServiceError::InvalidTaskTransition(id, TaskStatus::Approved, TaskStatus::Approved)
                .into();
        assert_eq!(http.status, StatusCode::CONFLICT);
        assert!(http.message.contains(&id.to_string()));
    }

    #[test]
    fn signature_failures_are_bad_requests() {
        let http: HttpError = ServiceError::InvalidSignature("no v1".to_string()).into();
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn access_failures_are_forbidden() {
        let http: HttpError =
            ServiceError::UnauthorizedTaskAccess(Uuid::new_v4(), Uuid::new_v4()).into();
        assert_eq!(http.status, StatusCode::FORBIDDEN);
    }
}
