use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn to_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Approved => "approved",
            TaskStatus::Rejected => "rejected",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Transitions only move forward: moderation out of `pending`, then the
    /// poster closes an approved task.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Approved)
                | (TaskStatus::Pending, TaskStatus::Rejected)
                | (TaskStatus::Approved, TaskStatus::Completed)
                | (TaskStatus::Approved, TaskStatus::Cancelled)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "budget_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BudgetType {
    Fixed,
    Hourly,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Task {
    pub id: Uuid,
    pub poster_id: Uuid,
    pub category_id: Uuid,
    pub location_id: Uuid,
    pub title: String,
    pub description: String,
    pub budget_amount: f64,
    pub budget_type: BudgetType,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub image_urls: Vec<String>,
    pub status: TaskStatus,
    pub views_count: i32,
    pub is_paid: bool,
    pub is_featured: bool,
    pub featured_until: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task joined with its category, location and poster, as listed and shown
/// on the detail page.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct TaskListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,
    pub category_name: String,
    pub category_slug: String,
    pub location_name: String,
    pub location_slug: String,
    pub poster_name: String,
    pub poster_avatar_url: Option<String>,
}

impl Task {
    pub fn is_featured_at(&self, now: DateTime<Utc>) -> bool {
        self.is_featured && self.featured_until.map_or(true, |until| until > now)
    }
}

#[cfg(test)]
pub fn sample_task(poster_id: Uuid) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        poster_id,
        category_id: Uuid::new_v4(),
        location_id: Uuid::new_v4(),
        title: "Assemble a wardrobe".to_string(),
        description: "Flat-pack wardrobe, two doors, tools provided.".to_string(),
        budget_amount: 60.0,
        budget_type: BudgetType::Fixed,
        contact_phone: Some("+385 91 000 0000".to_string()),
        contact_email: Some("poster@example.com".to_string()),
        image_urls: Vec::new(),
        status: TaskStatus::Approved,
        views_count: 0,
        is_paid: true,
        is_featured: false,
        featured_until: None,
        approved_at: Some(now),
        approved_by: None,
        rejection_reason: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    #[rstest]
    #[case(TaskStatus::Pending, TaskStatus::Approved, true)]
    #[case(TaskStatus::Pending, TaskStatus::Rejected, true)]
    #[case(TaskStatus::Approved, TaskStatus::Completed, true)]
    #[case(TaskStatus::Approved, TaskStatus::Cancelled, true)]
    #[case(TaskStatus::Pending, TaskStatus::Completed, false)]
    #[case(TaskStatus::Rejected, TaskStatus::Approved, false)]
    #[case(TaskStatus::Completed, TaskStatus::Cancelled, false)]
    #[case(TaskStatus::Cancelled, TaskStatus::Approved, false)]
    #[case(TaskStatus::Approved, TaskStatus::Pending, false)]
    fn status_transitions(
        #[case] from: TaskStatus,
        #[case] to: TaskStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn featured_boost_expires() {
        let now = Utc::now();
        let mut task = sample_task(Uuid::new_v4());
        task.is_featured = true;
        task.featured_until = Some(now + Duration::days(1));
        assert!(task.is_featured_at(now));
        assert!(!task.is_featured_at(now + Duration::days(2)));
    }

    #[test]
    fn listing_serializes_flat() {
        let listing = TaskListing {
            task: sample_task(Uuid::new_v4()),
            category_name: "Handyman".to_string(),
            category_slug: "handyman".to_string(),
            location_name: "Zagreb".to_string(),
            location_slug: "zagreb".to_string(),
            poster_name: "Sam".to_string(),
            poster_avatar_url: None,
        };
        let json = serde_json::to_value(&listing).expect("json");
        assert_eq!(json["status"], "approved");
        assert_eq!(json["category_slug"], "handyman");
    }
}
