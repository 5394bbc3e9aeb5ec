use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::FlashMessage;
use crate::db::types::FlashLevel;

pub(crate) async fn push(
    pool: &PgPool,
    session_id: &str,
    level: FlashLevel,
    message: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO flash_messages (id, session_id, level, message, created_at)
         VALUES ($1,$2,$3,$4,$5)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(session_id)
    .bind(level.as_str())
    .bind(message)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Removes and returns the session's pending messages, oldest first.
pub(crate) async fn take(pool: &PgPool, session_id: &str) -> Result<Vec<FlashMessage>, sqlx::Error> {
    let mut messages = sqlx::query_as::<_, FlashMessage>(
        "DELETE FROM flash_messages WHERE session_id = $1
         RETURNING id, session_id, level, message, created_at",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(messages)
}
