use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "offer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl OfferStatus {
    pub fn to_str(&self) -> &str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Withdrawn => "withdrawn",
        }
    }

    /// Offers are decided once.
    pub fn is_final(&self) -> bool {
        !matches!(self, OfferStatus::Pending)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Offer {
    pub id: Uuid,
    pub task_id: Uuid,
    pub worker_id: Uuid,
    pub amount: f64,
    pub message: String,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An offer with the bidding worker's public details.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct OfferWithWorker {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub offer: Offer,
    pub worker_name: String,
    pub worker_avatar_url: Option<String>,
}
