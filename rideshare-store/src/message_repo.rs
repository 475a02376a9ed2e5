use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rideshare_core::{CoreResult, Message, MessageStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::storage_error;

pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    body: String,
    sent_at: DateTime<Utc>,
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert_message(&self, message: &Message) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, body, sent_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.body)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> CoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_id, receiver_id, body, sent_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY sent_at ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows
            .into_iter()
            .map(|row| Message {
                id: row.id,
                sender_id: row.sender_id,
                receiver_id: row.receiver_id,
                body: row.body,
                sent_at: row.sent_at,
            })
            .collect())
    }
}
