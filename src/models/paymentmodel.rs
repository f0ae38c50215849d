use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    TaskPosting,
    FeaturedTask,
    WorkerSubscription,
}

impl PaymentType {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentType::TaskPosting => "task_posting",
            PaymentType::FeaturedTask => "featured_task",
            PaymentType::WorkerSubscription => "worker_subscription",
        }
    }

    pub fn from_metadata(value: &str) -> Option<PaymentType> {
        match value {
            "task_posting" => Some(PaymentType::TaskPosting),
            "featured_task" => Some(PaymentType::FeaturedTask),
            "worker_subscription" => Some(PaymentType::WorkerSubscription),
            _ => None,
        }
    }

    /// Whether checkout for this type is tied to one of the payer's tasks.
    pub fn requires_task(&self) -> bool {
        matches!(self, PaymentType::TaskPosting | PaymentType::FeaturedTask)
    }

    pub fn product_name(&self) -> &str {
        match self {
            PaymentType::TaskPosting => "Task posting fee",
            PaymentType::FeaturedTask => "Featured task boost",
            PaymentType::WorkerSubscription => "Worker subscription",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub stripe_session_id: String,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_type_names_match_checkout_metadata() {
        for kind in [
            PaymentType::TaskPosting,
            PaymentType::FeaturedTask,
            PaymentType::WorkerSubscription,
        ] {
            assert_eq!(PaymentType::from_metadata(kind.to_str()), Some(kind));
            let json = serde_json::to_value(kind).expect("json");
            assert_eq!(json, kind.to_str());
        }
        assert_eq!(PaymentType::from_metadata("donation"), None);
    }

    #[test]
    fn only_task_payments_need_a_task() {
        assert!(PaymentType::TaskPosting.requires_task());
        assert!(PaymentType::FeaturedTask.requires_task());
        assert!(!PaymentType::WorkerSubscription.requires_task());
    }
}
