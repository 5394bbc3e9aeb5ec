use sqlx::{FromRow, PgPool};
use time::Date;

use crate::db::models::Rater;
use crate::db::types::{RaterStatus, RelationshipType};

const COLUMNS: &str = "\
    id, respondent_id, user_id, relationship_type, status, token_hash, \
    invitation_sent_at, created_at, completed_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct RaterRow {
    pub(crate) id: String,
    pub(crate) respondent_id: String,
    pub(crate) user_id: String,
    pub(crate) relationship_type: RelationshipType,
    pub(crate) status: RaterStatus,
    pub(crate) invitation_sent_at: Option<time::PrimitiveDateTime>,
    pub(crate) completed_at: Option<time::PrimitiveDateTime>,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
}

/// An open rating task shown on the rater's dashboard.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct RaterAssignment {
    pub(crate) rater_id: String,
    pub(crate) status: RaterStatus,
    pub(crate) relationship_type: RelationshipType,
    pub(crate) respondent_id: String,
    pub(crate) respondent_username: String,
    pub(crate) respondent_first_name: String,
    pub(crate) respondent_last_name: String,
    pub(crate) survey_id: String,
    pub(crate) survey_name: String,
    pub(crate) end_date: Date,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Rater>, sqlx::Error> {
    sqlx::query_as::<_, Rater>(&format!("SELECT {COLUMNS} FROM raters WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_token_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<Rater>, sqlx::Error> {
    sqlx::query_as::<_, Rater>(&format!("SELECT {COLUMNS} FROM raters WHERE token_hash = $1"))
        .bind(token_hash)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_for_survey(
    pool: &PgPool,
    survey_id: &str,
) -> Result<Vec<RaterRow>, sqlx::Error> {
    sqlx::query_as::<_, RaterRow>(
        "SELECT ra.id, ra.respondent_id, ra.user_id, ra.relationship_type, ra.status,
                ra.invitation_sent_at, ra.completed_at, u.username, u.first_name, u.last_name
         FROM raters ra
         JOIN respondents r ON r.id = ra.respondent_id
         JOIN users u ON u.id = ra.user_id
         WHERE r.survey_id = $1
         ORDER BY ra.created_at",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_open_for_user(
    pool: &PgPool,
    user_id: &str,
    today: Date,
) -> Result<Vec<RaterAssignment>, sqlx::Error> {
    sqlx::query_as::<_, RaterAssignment>(
        "SELECT ra.id AS rater_id, ra.status, ra.relationship_type,
                r.id AS respondent_id,
                u.username AS respondent_username,
                u.first_name AS respondent_first_name,
                u.last_name AS respondent_last_name,
                s.id AS survey_id, s.name AS survey_name, s.end_date
         FROM raters ra
         JOIN respondents r ON r.id = ra.respondent_id
         JOIN users u ON u.id = r.user_id
         JOIN surveys s ON s.id = r.survey_id
         WHERE ra.user_id = $1
           AND ra.status IN ('pending', 'started')
           AND s.end_date >= $2
         ORDER BY s.end_date, s.name",
    )
    .bind(user_id)
    .bind(today)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateRater<'a> {
    pub id: &'a str,
    pub respondent_id: &'a str,
    pub user_id: &'a str,
    pub relationship_type: RelationshipType,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateRater<'_>,
) -> Result<Rater, sqlx::Error> {
    sqlx::query_as::<_, Rater>(&format!(
        "INSERT INTO raters (id, respondent_id, user_id, relationship_type, status, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.respondent_id)
    .bind(params.user_id)
    .bind(params.relationship_type)
    .bind(RaterStatus::Pending)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn record_invitation(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    token_hash: &str,
    sent_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE raters SET token_hash = $1, invitation_sent_at = $2 WHERE id = $3")
        .bind(token_hash)
        .bind(sent_at)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn mark_started(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE raters SET status = $1 WHERE id = $2 AND status = $3")
        .bind(RaterStatus::Started)
        .bind(id)
        .bind(RaterStatus::Pending)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn mark_completed(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    completed_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE raters SET status = $1, completed_at = $2 WHERE id = $3")
        .bind(RaterStatus::Completed)
        .bind(completed_at)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Moves started raters back to pending.
pub(crate) async fn reset_started(executor: impl sqlx::PgExecutor<'_>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE raters SET status = $1 WHERE status = $2")
        .bind(RaterStatus::Pending)
        .bind(RaterStatus::Started)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn count_by_status(
    pool: &PgPool,
    respondent_id: &str,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'completed')
         FROM raters WHERE respondent_id = $1",
    )
    .bind(respondent_id)
    .fetch_one(pool)
    .await
}
