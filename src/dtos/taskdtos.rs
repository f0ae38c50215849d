use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::taskdb::{NewTask, TaskChanges},
    models::taskmodel::{BudgetType, TaskListing, TaskStatus},
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskDto {
    pub category_id: Uuid,
    pub location_id: Uuid,
    #[validate(length(min = 5, max = 120, message = "Title must be 5-120 characters"))]
    pub title: String,
    #[validate(length(min = 20, max = 5000, message = "Description must be 20-5000 characters"))]
    pub description: String,
    #[validate(range(min = 1.0, max = 1000000.0, message = "Budget is out of range"))]
    pub budget_amount: f64,
    pub budget_type: BudgetType,
    #[validate(length(min = 5, max = 30, message = "Phone number is invalid"))]
    pub contact_phone: Option<String>,
    #[validate(email(message = "Contact email is invalid"))]
    pub contact_email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 images"))]
    pub image_urls: Vec<String>,
}

impl CreateTaskDto {
    pub fn into_new_task(self, poster_id: Uuid) -> NewTask {
        NewTask {
            poster_id,
            category_id: self.category_id,
            location_id: self.location_id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            budget_amount: self.budget_amount,
            budget_type: self.budget_type,
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            image_urls: self.image_urls,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateTaskDto {
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    #[validate(length(min = 5, max = 120, message = "Title must be 5-120 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 20, max = 5000, message = "Description must be 20-5000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1.0, max = 1000000.0, message = "Budget is out of range"))]
    pub budget_amount: Option<f64>,
    pub budget_type: Option<BudgetType>,
    #[validate(length(min = 5, max = 30, message = "Phone number is invalid"))]
    pub contact_phone: Option<String>,
    #[validate(email(message = "Contact email is invalid"))]
    pub contact_email: Option<String>,
    #[validate(length(max = 10, message = "At most 10 images"))]
    pub image_urls: Option<Vec<String>>,
}

impl From<UpdateTaskDto> for TaskChanges {
    fn from(dto: UpdateTaskDto) -> Self {
        TaskChanges {
            category_id: dto.category_id,
            location_id: dto.location_id,
            title: dto.title.map(|t| t.trim().to_string()),
            description: dto.description.map(|d| d.trim().to_string()),
            budget_amount: dto.budget_amount,
            budget_type: dto.budget_type,
            contact_phone: dto.contact_phone,
            contact_email: dto.contact_email,
            image_urls: dto.image_urls,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RejectTaskDto {
    #[validate(length(max = 500, message = "Reason is too long"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusQuery {
    pub status: Option<TaskStatus>,
}

/// A task as shown to one viewer. Contact fields are blanked unless
/// `contact_visible`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponseDto {
    #[serde(flatten)]
    pub listing: TaskListing,
    pub featured_now: bool,
    pub contact_visible: bool,
}

impl TaskResponseDto {
    pub fn for_viewer(mut listing: TaskListing, contact_visible: bool, now: DateTime<Utc>) -> Self {
        if !contact_visible {
            listing.task.contact_phone = None;
            listing.task.contact_email = None;
        }
        TaskResponseDto {
            featured_now: listing.task.is_featured_at(now),
            listing,
            contact_visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::taskmodel::sample_task;

    fn listing() -> TaskListing {
        TaskListing {
            task: sample_task(Uuid::new_v4()),
            category_name: "Moving".to_string(),
            category_slug: "moving".to_string(),
            location_name: "Split".to_string(),
            location_slug: "split".to_string(),
            poster_name: "Ivo".to_string(),
            poster_avatar_url: None,
        }
    }

    #[test]
    fn hidden_contact_never_reaches_the_payload() {
        let dto = TaskResponseDto::for_viewer(listing(), false, Utc::now());
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json["contact_phone"].is_null());
        assert!(json["contact_email"].is_null());
        assert_eq!(json["contact_visible"], false);
    }

    #[test]
    fn visible_contact_is_kept() {
        let dto = TaskResponseDto::for_viewer(listing(), true, Utc::now());
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["contact_email"], "poster@example.com");
    }

    #[test]
    fn create_task_rejects_short_title() {
        let dto = CreateTaskDto {
            category_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            title: "Fix".to_string(),
            description: "Replace a broken kitchen tap in a rented flat.".to_string(),
            budget_amount: 40.0,
            budget_type: BudgetType::Fixed,
            contact_phone: None,
            contact_email: None,
            image_urls: vec![],
        };
        assert!(dto.validate().is_err());
    }
}
