use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageDto {
    pub receiver_id: Uuid,
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponseDto {
    pub status: String,
    pub updated: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponseDto {
    pub status: String,
    pub unread: i64,
}
