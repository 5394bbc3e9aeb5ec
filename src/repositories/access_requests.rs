use sqlx::{FromRow, PgPool};

use crate::db::models::AccessRequest;
use crate::db::types::AccessRequestStatus;

const COLUMNS: &str = "id, user_id, admin_id, comment, status, created_at, decided_at, decided_by";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AccessRequestRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) admin_id: String,
    pub(crate) comment: String,
    pub(crate) status: AccessRequestStatus,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) decided_at: Option<time::PrimitiveDateTime>,
    pub(crate) requester_username: String,
    pub(crate) admin_username: String,
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<AccessRequestRow>, sqlx::Error> {
    sqlx::query_as::<_, AccessRequestRow>(
        "SELECT ar.id, ar.user_id, ar.admin_id, ar.comment, ar.status, ar.created_at,
                ar.decided_at, u.username AS requester_username, a.username AS admin_username
         FROM access_requests ar
         JOIN users u ON u.id = ar.user_id
         JOIN users a ON a.id = ar.admin_id
         WHERE ar.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    status: Option<AccessRequestStatus>,
) -> Result<Vec<AccessRequestRow>, sqlx::Error> {
    sqlx::query_as::<_, AccessRequestRow>(
        "SELECT ar.id, ar.user_id, ar.admin_id, ar.comment, ar.status, ar.created_at,
                ar.decided_at, u.username AS requester_username, a.username AS admin_username
         FROM access_requests ar
         JOIN users u ON u.id = ar.user_id
         JOIN users a ON a.id = ar.admin_id
         WHERE ($1::accessrequeststatus IS NULL OR ar.status = $1)
         ORDER BY ar.created_at DESC",
    )
    .bind(status)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateAccessRequest<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub admin_id: &'a str,
    pub comment: &'a str,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAccessRequest<'_>,
) -> Result<AccessRequest, sqlx::Error> {
    sqlx::query_as::<_, AccessRequest>(&format!(
        "INSERT INTO access_requests (id, user_id, admin_id, comment, status, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.admin_id)
    .bind(params.comment)
    .bind(AccessRequestStatus::Pending)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Records a decision on a still pending request; `None` when it was already decided.
pub(crate) async fn decide(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: AccessRequestStatus,
    decided_by: &str,
    decided_at: time::PrimitiveDateTime,
) -> Result<Option<AccessRequest>, sqlx::Error> {
    sqlx::query_as::<_, AccessRequest>(&format!(
        "UPDATE access_requests SET status = $1, decided_by = $2, decided_at = $3
         WHERE id = $4 AND status = $5
         RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(decided_by)
    .bind(decided_at)
    .bind(id)
    .bind(AccessRequestStatus::Pending)
    .fetch_optional(executor)
    .await
}
