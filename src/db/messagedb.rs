// db/messagedb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::DBClient;
use crate::models::messagemodel::Message;

#[async_trait]
pub trait MessageExt {
    async fn create_message(
        &self,
        task_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message, Error>;

    /// Messages on a task that `user_id` sent or received, oldest first.
    async fn get_task_messages(&self, task_id: Uuid, user_id: Uuid) -> Result<Vec<Message>, Error>;

    /// Marks everything addressed to `receiver_id` on the task as read.
    async fn mark_messages_read(&self, task_id: Uuid, receiver_id: Uuid) -> Result<u64, Error>;

    async fn count_unread(&self, receiver_id: Uuid) -> Result<i64, Error>;
}

#[async_trait]
impl MessageExt for DBClient {
    async fn create_message(
        &self,
        task_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (task_id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_task_messages(&self, task_id: Uuid, user_id: Uuid) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE task_id = $1 AND (sender_id = $2 OR receiver_id = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_messages_read(&self, task_id: Uuid, receiver_id: Uuid) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_read = TRUE
            WHERE task_id = $1 AND receiver_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(task_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_unread(&self, receiver_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND is_read = FALSE",
        )
        .bind(receiver_id)
        .fetch_one(&self.pool)
        .await
    }
}
