use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "worker_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl WorkerStatus {
    pub fn to_str(&self) -> &str {
        match self {
            WorkerStatus::Pending => "pending",
            WorkerStatus::Approved => "approved",
            WorkerStatus::Rejected => "rejected",
            WorkerStatus::Suspended => "suspended",
        }
    }

    /// Admin decisions on a worker account. Rejected applicants re-enter as
    /// `pending` by applying again, which is not an admin move.
    pub fn can_transition_to(&self, next: WorkerStatus) -> bool {
        matches!(
            (self, next),
            (WorkerStatus::Pending, WorkerStatus::Approved)
                | (WorkerStatus::Pending, WorkerStatus::Rejected)
                | (WorkerStatus::Approved, WorkerStatus::Suspended)
                | (WorkerStatus::Suspended, WorkerStatus::Approved)
        )
    }
}

/// The role flags a route can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileRole {
    Poster,
    Worker,
    Admin,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_poster: bool,
    pub is_worker: bool,
    pub is_admin: bool,

    // Worker fields
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub location_ids: Vec<Uuid>,
    pub hourly_rate: Option<f64>,
    pub worker_status: Option<WorkerStatus>,

    // Subscription
    pub subscription_active: bool,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing)]
    pub stripe_subscription_id: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn has_role(&self, role: ProfileRole) -> bool {
        match role {
            ProfileRole::Poster => self.is_poster,
            ProfileRole::Worker => self.is_worker,
            ProfileRole::Admin => self.is_admin,
        }
    }

    pub fn is_approved_worker(&self) -> bool {
        self.is_worker && self.worker_status == Some(WorkerStatus::Approved)
    }

    /// A subscription counts as active while the flag is set and the paid
    /// period, when recorded, has not run out.
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription_active
            && self
                .subscription_expires_at
                .map_or(true, |expires_at| expires_at > now)
    }

    /// True while a Stripe subscription is active and still renewing.
    pub fn has_running_stripe_subscription(&self, now: DateTime<Utc>) -> bool {
        self.has_active_subscription(now) && self.stripe_subscription_id.is_some()
    }
}

/// Public directory entry for an approved worker.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct WorkerListing {
    pub id: Uuid,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub location_ids: Vec<Uuid>,
    pub hourly_rate: Option<f64>,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
pub fn sample_profile() -> Profile {
    let now = Utc::now();
    Profile {
        id: Uuid::new_v4(),
        email: "someone@example.com".to_string(),
        password_hash: String::new(),
        full_name: "Sam Example".to_string(),
        phone: None,
        avatar_url: None,
        is_poster: true,
        is_worker: false,
        is_admin: false,
        bio: None,
        skills: Vec::new(),
        location_ids: Vec::new(),
        hourly_rate: None,
        worker_status: None,
        subscription_active: false,
        subscription_expires_at: None,
        stripe_customer_id: None,
        stripe_subscription_id: None,
        created_at: now,
        updated_at: now,
    }
}
