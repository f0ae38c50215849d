use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::paymentmodel::PaymentType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutDto {
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[serde(rename = "taskId")]
    pub task_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponseDto {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAckDto {
    pub received: bool,
}
