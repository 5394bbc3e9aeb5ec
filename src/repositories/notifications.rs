use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Notification;

const COLUMNS: &str = "id, user_id, message, link, is_read, created_at";

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    message: &str,
    link: Option<&str>,
    created_at: time::PrimitiveDateTime,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "INSERT INTO notifications (id, user_id, message, link, is_read, created_at)
         VALUES ($1,$2,$3,$4,FALSE,$5)
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(message)
    .bind(link)
    .bind(created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    unread_only: bool,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {COLUMNS} FROM notifications
         WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
         ORDER BY created_at DESC
         LIMIT 200"
    ))
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(pool)
    .await
}

pub(crate) async fn mark_read(pool: &PgPool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
