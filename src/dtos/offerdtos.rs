use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateOfferDto {
    #[validate(range(min = 1.0, max = 1000000.0, message = "Amount is out of range"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
}
