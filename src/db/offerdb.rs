// db/offerdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::models::offermodel::{Offer, OfferStatus, OfferWithWorker};

const OFFER_WITH_WORKER_SELECT: &str = r#"
    SELECT o.*, p.full_name AS worker_name, p.avatar_url AS worker_avatar_url
    FROM offers o
    JOIN profiles p ON p.id = o.worker_id
"#;

#[async_trait]
pub trait OfferExt {
    /// `None` when the task already has an accepted offer.
    async fn create_offer(
        &self,
        task_id: Uuid,
        worker_id: Uuid,
        amount: f64,
        message: String,
    ) -> Result<Option<Offer>, Error>;

    async fn get_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    async fn get_offers_for_task(&self, task_id: Uuid) -> Result<Vec<OfferWithWorker>, Error>;

    async fn get_offers_by_worker(&self, worker_id: Uuid) -> Result<Vec<Offer>, Error>;

    /// Accepts a pending offer and rejects every other pending offer on the
    /// same task in one transaction. `None` when the offer was already decided
    /// or the task already has an accepted offer.
    async fn accept_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    /// Moves a pending offer to `next`; `None` when it is no longer pending.
    async fn decide_offer(&self, offer_id: Uuid, next: OfferStatus) -> Result<Option<Offer>, Error>;

    async fn get_accepted_worker(&self, task_id: Uuid) -> Result<Option<Uuid>, Error>;
}

#[async_trait]
impl OfferExt for DBClient {
    async fn create_offer(
        &self,
        task_id: Uuid,
        worker_id: Uuid,
        amount: f64,
        message: String,
    ) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            INSERT INTO offers (task_id, worker_id, amount, message)
            SELECT $1, $2, $3, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM offers WHERE task_id = $1 AND status = 'accepted'
            )
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(worker_id)
        .bind(amount)
        .bind(message)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1")
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_offers_for_task(&self, task_id: Uuid) -> Result<Vec<OfferWithWorker>, Error> {
        let query = format!(
            "{} WHERE o.task_id = $1 ORDER BY o.created_at DESC",
            OFFER_WITH_WORKER_SELECT
        );
        sqlx::query_as::<_, OfferWithWorker>(&query)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_offers_by_worker(&self, worker_id: Uuid) -> Result<Vec<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            "SELECT * FROM offers WHERE worker_id = $1 ORDER BY created_at DESC",
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn accept_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        let mut tx = self.pool.begin().await?;

        let accepted = sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
              AND NOT EXISTS (
                  SELECT 1 FROM offers accepted
                  WHERE accepted.task_id = offers.task_id AND accepted.status = 'accepted'
              )
            RETURNING *
            "#,
        )
        .bind(offer_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(accepted) = accepted else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE offers
            SET status = 'rejected', updated_at = NOW()
            WHERE task_id = $1 AND id <> $2 AND status = 'pending'
            "#,
        )
        .bind(accepted.task_id)
        .bind(accepted.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(accepted))
    }

    async fn decide_offer(&self, offer_id: Uuid, next: OfferStatus) -> Result<Option<Offer>, Error> {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(offer_id)
        .bind(next)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_accepted_worker(&self, task_id: Uuid) -> Result<Option<Uuid>, Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT worker_id FROM offers
            WHERE task_id = $1 AND status = 'accepted'
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
    }
}
