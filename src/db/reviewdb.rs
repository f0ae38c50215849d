// db/reviewdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::models::reviewmodel::{RatingSummary, Review};

#[async_trait]
pub trait ReviewExt {
    async fn create_review(
        &self,
        task_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, Error>;

    async fn get_reviews_for_profile(&self, reviewee_id: Uuid) -> Result<Vec<Review>, Error>;

    async fn get_rating_summary(&self, reviewee_id: Uuid) -> Result<RatingSummary, Error>;
}

#[async_trait]
impl ReviewExt for DBClient {
    async fn create_review(
        &self,
        task_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, Error> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (task_id, reviewer_id, reviewee_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(reviewer_id)
        .bind(reviewee_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_reviews_for_profile(&self, reviewee_id: Uuid) -> Result<Vec<Review>, Error> {
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE reviewee_id = $1 ORDER BY created_at DESC",
        )
        .bind(reviewee_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_rating_summary(&self, reviewee_id: Uuid) -> Result<RatingSummary, Error> {
        sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT AVG(rating)::DOUBLE PRECISION AS average_rating, COUNT(*) AS review_count
            FROM reviews
            WHERE reviewee_id = $1
            "#,
        )
        .bind(reviewee_id)
        .fetch_one(&self.pool)
        .await
    }
}
