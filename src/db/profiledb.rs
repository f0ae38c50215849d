// db/profiledb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::models::profilemodel::{Profile, WorkerListing, WorkerStatus};

const WORKER_LISTING_SELECT: &str = r#"
    SELECT
        p.id, p.full_name, p.avatar_url, p.bio, p.skills, p.location_ids,
        p.hourly_rate, p.created_at,
        AVG(r.rating)::DOUBLE PRECISION AS average_rating,
        COUNT(r.id) AS review_count
    FROM profiles p
    LEFT JOIN reviews r ON r.reviewee_id = p.id
    WHERE p.is_worker = TRUE AND p.worker_status = 'approved'
"#;

#[async_trait]
pub trait ProfileExt {
    async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>, Error>;

    async fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>, Error>;

    async fn create_profile(
        &self,
        email: String,
        password_hash: String,
        full_name: String,
        is_poster: bool,
        is_worker: bool,
    ) -> Result<Profile, Error>;

    async fn update_profile(
        &self,
        profile_id: Uuid,
        full_name: Option<String>,
        phone: Option<String>,
        avatar_url: Option<String>,
        is_poster: Option<bool>,
    ) -> Result<Profile, Error>;

    async fn submit_worker_application(
        &self,
        profile_id: Uuid,
        bio: String,
        skills: Vec<String>,
        location_ids: Vec<Uuid>,
        hourly_rate: Option<f64>,
    ) -> Result<Profile, Error>;

    /// Moves a worker from `from` to `to`; `None` when the worker is no
    /// longer in `from`.
    async fn update_worker_status(
        &self,
        profile_id: Uuid,
        from: WorkerStatus,
        to: WorkerStatus,
    ) -> Result<Option<Profile>, Error>;

    async fn get_workers_by_status(
        &self,
        status: Option<WorkerStatus>,
    ) -> Result<Vec<Profile>, Error>;

    async fn get_approved_workers(&self) -> Result<Vec<WorkerListing>, Error>;

    async fn get_worker_listing(&self, profile_id: Uuid) -> Result<Option<WorkerListing>, Error>;

    async fn grant_admin_by_email(&self, email: &str) -> Result<Option<Profile>, Error>;

    async fn count_profiles(&self) -> Result<i64, Error>;

    async fn expire_lapsed_subscriptions(&self) -> Result<u64, Error>;
}

#[async_trait]
impl ProfileExt for DBClient {
    async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_profile(
        &self,
        email: String,
        password_hash: String,
        full_name: String,
        is_poster: bool,
        is_worker: bool,
    ) -> Result<Profile, Error> {
        // Worker accounts start in the approval queue.
        let worker_status = if is_worker { Some(WorkerStatus::Pending) } else { None };

        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (email, password_hash, full_name, is_poster, is_worker, worker_status)
            VALUES (LOWER($1), $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(is_poster)
        .bind(is_worker)
        .bind(worker_status)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_profile(
        &self,
        profile_id: Uuid,
        full_name: Option<String>,
        phone: Option<String>,
        avatar_url: Option<String>,
        is_poster: Option<bool>,
    ) -> Result<Profile, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                avatar_url = COALESCE($4, avatar_url),
                is_poster = COALESCE($5, is_poster),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(full_name)
        .bind(phone)
        .bind(avatar_url)
        .bind(is_poster)
        .fetch_one(&self.pool)
        .await
    }

    async fn submit_worker_application(
        &self,
        profile_id: Uuid,
        bio: String,
        skills: Vec<String>,
        location_ids: Vec<Uuid>,
        hourly_rate: Option<f64>,
    ) -> Result<Profile, Error> {
        // Approved and suspended workers keep their status when editing.
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET is_worker = TRUE,
                bio = $2,
                skills = $3,
                location_ids = $4,
                hourly_rate = $5,
                worker_status = CASE
                    WHEN worker_status IN ('approved', 'suspended') THEN worker_status
                    ELSE 'pending'::worker_status
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(bio)
        .bind(skills)
        .bind(location_ids)
        .bind(hourly_rate)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_worker_status(
        &self,
        profile_id: Uuid,
        from: WorkerStatus,
        to: WorkerStatus,
    ) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET worker_status = $3, updated_at = NOW()
            WHERE id = $1 AND is_worker = TRUE AND worker_status = $2
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_workers_by_status(
        &self,
        status: Option<WorkerStatus>,
    ) -> Result<Vec<Profile>, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT * FROM profiles
            WHERE is_worker = TRUE
              AND ($1::worker_status IS NULL OR worker_status = $1)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_approved_workers(&self) -> Result<Vec<WorkerListing>, Error> {
        let query = format!("{} GROUP BY p.id ORDER BY p.created_at DESC", WORKER_LISTING_SELECT);
        sqlx::query_as::<_, WorkerListing>(&query)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_worker_listing(&self, profile_id: Uuid) -> Result<Option<WorkerListing>, Error> {
        let query = format!("{} AND p.id = $1 GROUP BY p.id", WORKER_LISTING_SELECT);
        sqlx::query_as::<_, WorkerListing>(&query)
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn grant_admin_by_email(&self, email: &str) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET is_admin = TRUE, updated_at = NOW()
            WHERE LOWER(email) = LOWER($1)
            RETURNING *
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_profiles(&self) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await
    }

    async fn expire_lapsed_subscriptions(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET subscription_active = FALSE, updated_at = NOW()
            WHERE subscription_active = TRUE
              AND subscription_expires_at IS NOT NULL
              AND subscription_expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
