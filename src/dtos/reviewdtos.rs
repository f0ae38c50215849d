use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::reviewmodel::{RatingSummary, Review};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewDto {
    pub task_id: Uuid,
    pub reviewee_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 2000, message = "Comment is too long"))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewListResponseDto {
    pub status: String,
    pub reviews: Vec<Review>,
    #[serde(flatten)]
    pub summary: RatingSummary,
}
