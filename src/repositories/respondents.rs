use sqlx::{FromRow, PgPool};

use crate::db::models::Respondent;
use crate::db::types::RespondentStatus;

const COLUMNS: &str = "id, survey_id, user_id, manager_id, status, created_at, completed_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct RespondentRow {
    pub(crate) id: String,
    pub(crate) survey_id: String,
    pub(crate) user_id: String,
    pub(crate) manager_id: Option<String>,
    pub(crate) status: RespondentStatus,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) completed_at: Option<time::PrimitiveDateTime>,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Respondent>, sqlx::Error> {
    sqlx::query_as::<_, Respondent>(&format!("SELECT {COLUMNS} FROM respondents WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_for_survey(
    pool: &PgPool,
    survey_id: &str,
) -> Result<Vec<RespondentRow>, sqlx::Error> {
    sqlx::query_as::<_, RespondentRow>(
        "SELECT r.id, r.survey_id, r.user_id, r.manager_id, r.status, r.created_at,
                r.completed_at, u.username, u.email, u.first_name, u.last_name
         FROM respondents r
         JOIN users u ON u.id = r.user_id
         WHERE r.survey_id = $1
         ORDER BY u.last_name, u.first_name, u.username",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_ids(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM respondents ORDER BY created_at")
        .fetch_all(pool)
        .await
}

pub(crate) struct CreateRespondent<'a> {
    pub id: &'a str,
    pub survey_id: &'a str,
    pub user_id: &'a str,
    pub manager_id: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateRespondent<'_>,
) -> Result<Respondent, sqlx::Error> {
    sqlx::query_as::<_, Respondent>(&format!(
        "INSERT INTO respondents (id, survey_id, user_id, manager_id, status, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.survey_id)
    .bind(params.user_id)
    .bind(params.manager_id)
    .bind(RespondentStatus::NotStarted)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn mark_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE respondents SET status = $1 WHERE id = $2 AND status = $3")
        .bind(RespondentStatus::InProgress)
        .bind(id)
        .bind(RespondentStatus::NotStarted)
        .execute(executor)
        .await?;
    Ok(())
}

/// Completes the respondent once none of its raters is still outstanding.
pub(crate) async fn complete_if_all_rated(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    completed_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE respondents SET status = $1, completed_at = $2
         WHERE id = $3
           AND status <> $1
           AND NOT EXISTS (
              SELECT 1 FROM raters WHERE respondent_id = $3 AND status <> 'completed'
           )",
    )
    .bind(RespondentStatus::Completed)
    .bind(completed_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves in-progress respondents back to not started.
pub(crate) async fn reset_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE respondents SET status = $1 WHERE status = $2")
        .bind(RespondentStatus::NotStarted)
        .bind(RespondentStatus::InProgress)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
