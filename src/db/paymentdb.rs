// db/paymentdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::{
    models::paymentmodel::{Payment, PaymentType},
    service::webhook::CompletedCheckout,
};

#[async_trait]
pub trait PaymentExt {
    /// Stores the payment and applies its effect in one transaction.
    /// Returns `false` when the checkout session was already recorded.
    async fn record_completed_checkout(
        &self,
        checkout: &CompletedCheckout,
        subscription_expires_at: DateTime<Utc>,
        featured_until: DateTime<Utc>,
    ) -> Result<bool, Error>;

    async fn extend_subscription(
        &self,
        subscription_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, Error>;

    async fn deactivate_subscription(&self, subscription_id: &str) -> Result<u64, Error>;

    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, Error>;

    async fn get_all_payments(&self, limit: i64) -> Result<Vec<Payment>, Error>;

    async fn get_total_revenue_cents(&self) -> Result<i64, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn record_completed_checkout(
        &self,
        checkout: &CompletedCheckout,
        subscription_expires_at: DateTime<Utc>,
        featured_until: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO payments (
                user_id, task_id, payment_type, status, amount_cents, currency,
                stripe_session_id, stripe_payment_intent_id
            )
            VALUES ($1, $2, $3, 'completed', $4, $5, $6, $7)
            ON CONFLICT (stripe_session_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(checkout.user_id)
        .bind(checkout.task_id)
        .bind(checkout.payment_type)
        .bind(checkout.amount_cents)
        .bind(&checkout.currency)
        .bind(&checkout.session_id)
        .bind(&checkout.payment_intent_id)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        match checkout.payment_type {
            PaymentType::TaskPosting => {
                sqlx::query("UPDATE tasks SET is_paid = TRUE, updated_at = NOW() WHERE id = $1")
                    .bind(checkout.task_id)
                    .execute(&mut *tx)
                    .await?;
            }
            PaymentType::FeaturedTask => {
                sqlx::query(
                    r#"
                    UPDATE tasks
                    SET is_featured = TRUE, featured_until = $2, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(checkout.task_id)
                .bind(featured_until)
                .execute(&mut *tx)
                .await?;
            }
            PaymentType::WorkerSubscription => {
                sqlx::query(
                    r#"
                    UPDATE profiles
                    SET subscription_active = TRUE,
                        subscription_expires_at = $2,
                        stripe_customer_id = COALESCE($3, stripe_customer_id),
                        stripe_subscription_id = COALESCE($4, stripe_subscription_id),
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(checkout.user_id)
                .bind(subscription_expires_at)
                .bind(&checkout.customer_id)
                .bind(&checkout.subscription_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn extend_subscription(
        &self,
        subscription_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET subscription_active = TRUE, subscription_expires_at = $2, updated_at = NOW()
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(subscription_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn deactivate_subscription(&self, subscription_id: &str) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET subscription_active = FALSE, updated_at = NOW()
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(subscription_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_all_payments(&self, limit: i64) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_total_revenue_cents(&self) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM payments WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::PgPool;

    use super::*;
    use crate::db::{fixtures, profiledb::ProfileExt};

    fn subscription_checkout(user_id: Uuid) -> CompletedCheckout {
        CompletedCheckout {
            session_id: "cs_test_sub".to_string(),
            payment_type: PaymentType::WorkerSubscription,
            user_id,
            task_id: None,
            amount_cents: 1500,
            currency: "eur".to_string(),
            payment_intent_id: None,
            customer_id: Some("cus_123".to_string()),
            subscription_id: Some("sub_123".to_string()),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn subscription_checkout_activates_worker(pool: PgPool) -> sqlx::Result<()> {
        let db = fixtures::client(pool);
        let worker = fixtures::approved_worker(&db, "worker@example.com").await;
        let now = Utc::now();
        let expires = now + Duration::days(30);

        let recorded = db
            .record_completed_checkout(&subscription_checkout(worker.id), expires, now)
            .await?;
        assert!(recorded);

        let worker = db.get_profile(worker.id).await?.unwrap();
        assert!(worker.subscription_active);
        assert_eq!(
            worker.subscription_expires_at.map(|t| t.timestamp()),
            Some(expires.timestamp())
        );
        assert_eq!(worker.stripe_subscription_id.as_deref(), Some("sub_123"));
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn replayed_checkout_changes_nothing(pool: PgPool) -> sqlx::Result<()> {
        let db = fixtures::client(pool);
        let worker = fixtures::approved_worker(&db, "worker@example.com").await;
        let now = Utc::now();
        let first_expiry = now + Duration::days(30);
        let checkout = subscription_checkout(worker.id);

        assert!(db.record_completed_checkout(&checkout, first_expiry, now).await?);
        let replayed = db
            .record_completed_checkout(&checkout, first_expiry + Duration::days(30), now)
            .await?;
        assert!(!replayed);

        let worker = db.get_profile(worker.id).await?.unwrap();
        assert_eq!(
            worker.subscription_expires_at.map(|t| t.timestamp()),
            Some(first_expiry.timestamp())
        );
        assert_eq!(db.get_user_payments(worker.id).await?.len(), 1);
        assert_eq!(db.get_total_revenue_cents().await?, 1500);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn posting_fee_marks_task_paid(pool: PgPool) -> sqlx::Result<()> {
        use crate::db::taskdb::TaskExt;

        let db = fixtures::client(pool);
        let poster = fixtures::profile(&db, "poster@example.com").await;
        let task = fixtures::pending_task(&db, poster.id, "Move a sofa").await;
        let checkout = CompletedCheckout {
            session_id: "cs_test_post".to_string(),
            payment_type: PaymentType::TaskPosting,
            user_id: poster.id,
            task_id: Some(task.id),
            amount_cents: 500,
            currency: "eur".to_string(),
            payment_intent_id: Some("pi_1".to_string()),
            customer_id: None,
            subscription_id: None,
        };

        let now = Utc::now();
        assert!(db.record_completed_checkout(&checkout, now, now).await?);
        assert!(db.get_task(task.id).await?.unwrap().is_paid);
        Ok(())
    }
}
