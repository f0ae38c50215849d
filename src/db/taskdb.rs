// db/taskdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::models::taskmodel::{BudgetType, Task, TaskListing, TaskStatus};

const TASK_LISTING_SELECT: &str = r#"
    SELECT
        t.*,
        c.name AS category_name,
        c.slug AS category_slug,
        l.name AS location_name,
        l.slug AS location_slug,
        p.full_name AS poster_name,
        p.avatar_url AS poster_avatar_url
    FROM tasks t
    JOIN categories c ON c.id = t.category_id
    JOIN locations l ON l.id = t.location_id
    JOIN profiles p ON p.id = t.poster_id
"#;

#[derive(Debug, Clone)]
pub struct NewTask {
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
}

/// Fields a poster may change while the task waits for moderation. `None`
/// keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget_amount: Option<f64>,
    pub budget_type: Option<BudgetType>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, sqlx::FromRow, serde::Serialize)]
pub struct TaskCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub completed: i64,
    pub cancelled: i64,
}

#[async_trait]
pub trait TaskExt {
    async fn create_task(&self, task: NewTask) -> Result<Task, Error>;

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, Error>;

    async fn get_task_listing(&self, task_id: Uuid) -> Result<Option<TaskListing>, Error>;

    async fn get_approved_listings(&self) -> Result<Vec<TaskListing>, Error>;

    async fn get_listings_by_poster(&self, poster_id: Uuid) -> Result<Vec<TaskListing>, Error>;

    async fn get_listings_by_status(
        &self,
        status: Option<TaskStatus>,
    ) -> Result<Vec<TaskListing>, Error>;

    /// Applies `changes` only while the task is still pending.
    async fn update_pending_task(
        &self,
        task_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, Error>;

    async fn approve_task(&self, task_id: Uuid, admin_id: Uuid) -> Result<Option<Task>, Error>;

    async fn reject_task(
        &self,
        task_id: Uuid,
        reason: Option<String>,
    ) -> Result<Option<Task>, Error>;

    /// Moves an approved task to `completed` or `cancelled`.
    async fn close_task(&self, task_id: Uuid, next: TaskStatus) -> Result<Option<Task>, Error>;

    async fn increment_views(&self, task_id: Uuid) -> Result<(), Error>;

    async fn delete_task(&self, task_id: Uuid) -> Result<u64, Error>;

    async fn clear_expired_features(&self) -> Result<u64, Error>;

    async fn count_tasks(&self) -> Result<TaskCounts, Error>;
}

#[async_trait]
impl TaskExt for DBClient {
    async fn create_task(&self, task: NewTask) -> Result<Task, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                poster_id, category_id, location_id, title, description,
                budget_amount, budget_type, contact_phone, contact_email, image_urls
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(task.poster_id)
        .bind(task.category_id)
        .bind(task.location_id)
        .bind(task.title)
        .bind(task.description)
        .bind(task.budget_amount)
        .bind(task.budget_type)
        .bind(task.contact_phone)
        .bind(task.contact_email)
        .bind(task.image_urls)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_task_listing(&self, task_id: Uuid) -> Result<Option<TaskListing>, Error> {
        let query = format!("{} WHERE t.id = $1", TASK_LISTING_SELECT);
        sqlx::query_as::<_, TaskListing>(&query)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_approved_listings(&self) -> Result<Vec<TaskListing>, Error> {
        let query = format!(
            "{} WHERE t.status = 'approved' ORDER BY t.created_at DESC",
            TASK_LISTING_SELECT
        );
        sqlx::query_as::<_, TaskListing>(&query)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_listings_by_poster(&self, poster_id: Uuid) -> Result<Vec<TaskListing>, Error> {
        let query = format!(
            "{} WHERE t.poster_id = $1 ORDER BY t.created_at DESC",
            TASK_LISTING_SELECT
        );
        sqlx::query_as::<_, TaskListing>(&query)
            .bind(poster_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_listings_by_status(
        &self,
        status: Option<TaskStatus>,
    ) -> Result<Vec<TaskListing>, Error> {
        let query = format!(
            "{} WHERE ($1::task_status IS NULL OR t.status = $1) ORDER BY t.created_at DESC",
            TASK_LISTING_SELECT
        );
        sqlx::query_as::<_, TaskListing>(&query)
            .bind(status)
            .fetch_all(&self.pool)
            .await
    }

    async fn update_pending_task(
        &self,
        task_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET category_id = COALESCE($2, category_id),
                location_id = COALESCE($3, location_id),
                title = COALESCE($4, title),
                description = COALESCE($5, description),
                budget_amount = COALESCE($6, budget_amount),
                budget_type = COALESCE($7, budget_type),
                contact_phone = COALESCE($8, contact_phone),
                contact_email = COALESCE($9, contact_email),
                image_urls = COALESCE($10, image_urls),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(changes.category_id)
        .bind(changes.location_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.budget_amount)
        .bind(changes.budget_type)
        .bind(changes.contact_phone)
        .bind(changes.contact_email)
        .bind(changes.image_urls)
        .fetch_optional(&self.pool)
        .await
    }

    async fn approve_task(&self, task_id: Uuid, admin_id: Uuid) -> Result<Option<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'approved', approved_at = NOW(), approved_by = $2,
                rejection_reason = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn reject_task(
        &self,
        task_id: Uuid,
        reason: Option<String>,
    ) -> Result<Option<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'rejected', rejection_reason = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    async fn close_task(&self, task_id: Uuid, next: TaskStatus) -> Result<Option<Task>, Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2,
                completed_at = CASE WHEN $2 = 'completed'::task_status THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = 'approved'
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(next)
        .fetch_optional(&self.pool)
        .await
    }

    async fn increment_views(&self, task_id: Uuid) -> Result<(), Error> {
        sqlx::query("UPDATE tasks SET views_count = views_count + 1 WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn clear_expired_features(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET is_featured = FALSE, updated_at = NOW()
            WHERE is_featured = TRUE
              AND featured_until IS NOT NULL
              AND featured_until < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_tasks(&self) -> Result<TaskCounts, Error> {
        sqlx::query_as::<_, TaskCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
            FROM tasks
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::db::fixtures;

    #[sqlx::test(migrations = "./migrations")]
    async fn approval_records_who_and_when(pool: PgPool) -> sqlx::Result<()> {
        let db = fixtures::client(pool);
        let poster = fixtures::profile(&db, "poster@example.com").await;
        let admin = fixtures::profile(&db, "admin@example.com").await;
        let task = fixtures::pending_task(&db, poster.id, "Clean my flat").await;
        assert!(task.approved_at.is_none());

        let approved = db.approve_task(task.id, admin.id).await?.unwrap();
        assert_eq!(approved.status, TaskStatus::Approved);
        assert_eq!(approved.approved_by, Some(admin.id));
        assert!(approved.approved_at.is_some());

        // A second approval loses the conditional update.
        assert!(db.approve_task(task.id, admin.id).await?.is_none());
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn public_listings_hold_only_approved_tasks(pool: PgPool) -> sqlx::Result<()> {
        let db = fixtures::client(pool);
        let poster = fixtures::profile(&db, "poster@example.com").await;
        let admin = fixtures::profile(&db, "admin@example.com").await;
        let pending = fixtures::pending_task(&db, poster.id, "Still waiting").await;
        let approved = fixtures::approved_task(&db, poster.id, admin.id, "Live task").await;

        let ids: Vec<Uuid> = db
            .get_approved_listings()
            .await?
            .into_iter()
            .map(|listing| listing.task.id)
            .collect();
        assert!(ids.contains(&approved.id));
        assert!(!ids.contains(&pending.id));
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleted_task_leaves_my_tasks(pool: PgPool) -> sqlx::Result<()> {
        let db = fixtures::client(pool);
        let poster = fixtures::profile(&db, "poster@example.com").await;
        let keep = fixtures::pending_task(&db, poster.id, "Keep me").await;
        let doomed = fixtures::pending_task(&db, poster.id, "Delete me").await;

        assert_eq!(db.delete_task(doomed.id).await?, 1);

        let ids: Vec<Uuid> = db
            .get_listings_by_poster(poster.id)
            .await?
            .into_iter()
            .map(|listing| listing.task.id)
            .collect();
        assert_eq!(ids, vec![keep.id]);
        assert_eq!(db.delete_task(doomed.id).await?, 0);
        Ok(())
    }
}
