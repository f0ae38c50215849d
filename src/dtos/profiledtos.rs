use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::profilemodel::{Profile, WorkerStatus};

fn default_true() -> bool {
    true
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterProfileDto {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters"),
        length(max = 64, message = "Password must be at most 64 characters")
    )]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        length(max = 64, message = "Password must be at most 64 characters"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,

    #[serde(default = "default_true")]
    pub is_poster: bool,
    #[serde(default)]
    pub is_worker: bool,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginProfileDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: Option<String>,
    #[validate(length(min = 5, max = 30, message = "Phone number is invalid"))]
    pub phone: Option<String>,
    #[validate(url(message = "Avatar must be a URL"))]
    pub avatar_url: Option<String>,
    pub is_poster: Option<bool>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct WorkerApplicationDto {
    #[validate(length(min = 10, max = 2000, message = "Bio must be 10-2000 characters"))]
    pub bio: String,
    #[validate(length(min = 1, max = 20, message = "List between 1 and 20 skills"))]
    pub skills: Vec<String>,
    #[validate(length(min = 1, message = "Choose at least one location"))]
    pub location_ids: Vec<Uuid>,
    #[validate(range(min = 0.0, max = 10000.0, message = "Hourly rate is out of range"))]
    pub hourly_rate: Option<f64>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct MakeAdminDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct WorkerStatusQuery {
    pub status: Option<WorkerStatus>,
}

/// Profile as returned to its owner and to admins.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterProfileDto {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_poster: bool,
    pub is_worker: bool,
    pub is_admin: bool,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub location_ids: Vec<Uuid>,
    pub hourly_rate: Option<f64>,
    pub worker_status: Option<String>,
    pub subscription_active: bool,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterProfileDto {
    pub fn filter_profile(profile: &Profile) -> Self {
        FilterProfileDto {
            id: profile.id.to_string(),
            email: profile.email.to_owned(),
            full_name: profile.full_name.to_owned(),
            phone: profile.phone.clone(),
            avatar_url: profile.avatar_url.clone(),
            is_poster: profile.is_poster,
            is_worker: profile.is_worker,
            is_admin: profile.is_admin,
            bio: profile.bio.clone(),
            skills: profile.skills.clone(),
            location_ids: profile.location_ids.clone(),
            hourly_rate: profile.hourly_rate,
            worker_status: profile.worker_status.map(|s| s.to_str().to_string()),
            subscription_active: profile.has_active_subscription(Utc::now()),
            subscription_expires_at: profile.subscription_expires_at,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }

    pub fn filter_profiles(profiles: &[Profile]) -> Vec<FilterProfileDto> {
        profiles.iter().map(FilterProfileDto::filter_profile).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileData {
    pub profile: FilterProfileDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponseDto {
    pub status: String,
    pub data: ProfileData,
}

impl ProfileResponseDto {
    pub fn from_profile(profile: &Profile) -> Self {
        ProfileResponseDto {
            status: "success".to_string(),
            data: ProfileData {
                profile: FilterProfileDto::filter_profile(profile),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponseDto {
    pub status: String,
    pub token: String,
    pub data: ProfileData,
}

impl AuthResponseDto {
    pub fn new(token: String, profile: &Profile) -> Self {
        AuthResponseDto {
            status: "success".to_string(),
            token,
            data: ProfileData {
                profile: FilterProfileDto::filter_profile(profile),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profilemodel::sample_profile;

    #[test]
    fn register_requires_matching_passwords() {
        let dto = RegisterProfileDto {
            full_name: "Ana Horvat".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret123".to_string(),
            password_confirm: "secret124".to_string(),
            is_poster: true,
            is_worker: false,
        };
        assert!(dto.validate().is_err());

        let dto = RegisterProfileDto {
            password_confirm: "secret123".to_string(),
            ..dto
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn register_rejects_overlong_password() {
        let long = "p".repeat(80);
        let dto = RegisterProfileDto {
            full_name: "Ana Horvat".to_string(),
            email: "ana@example.com".to_string(),
            password: long.clone(),
            password_confirm: long,
            is_poster: true,
            is_worker: false,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn register_defaults_to_poster_only() {
        let dto: RegisterProfileDto = serde_json::from_value(serde_json::json!({
            "full_name": "Ana",
            "email": "ana@example.com",
            "password": "secret123",
            "passwordConfirm": "secret123"
        }))
        .unwrap();
        assert!(dto.is_poster);
        assert!(!dto.is_worker);
    }

    #[test]
    fn worker_application_needs_skills_and_locations() {
        let dto = WorkerApplicationDto {
            bio: "Ten years of carpentry experience.".to_string(),
            skills: vec![],
            location_ids: vec![Uuid::new_v4()],
            hourly_rate: Some(20.0),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn filtered_profile_hides_secrets() {
        let mut profile = sample_profile();
        profile.password_hash = "argon-hash".to_string();
        profile.stripe_customer_id = Some("cus_1".to_string());
        let json = serde_json::to_string(&FilterProfileDto::filter_profile(&profile)).unwrap();
        assert!(!json.contains("argon-hash"));
        assert!(!json.contains("cus_1"));
    }
}
