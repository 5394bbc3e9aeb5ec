use sqlx::PgPool;
use time::Date;

use crate::db::models::Survey;
use crate::db::types::SurveyStatus;

const COLUMNS: &str = "\
    id, name, description, template_id, start_date, end_date, status, \
    created_by, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Survey>, sqlx::Error> {
    sqlx::query_as::<_, Survey>(&format!("SELECT {COLUMNS} FROM surveys WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_page(
    pool: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Survey>, sqlx::Error> {
    sqlx::query_as::<_, Survey>(&format!(
        "SELECT {COLUMNS} FROM surveys ORDER BY start_date DESC, created_at DESC OFFSET $1 LIMIT $2"
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM surveys").fetch_one(pool).await
}

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<Survey>, sqlx::Error> {
    sqlx::query_as::<_, Survey>(&format!("SELECT {COLUMNS} FROM surveys ORDER BY created_at"))
        .fetch_all(pool)
        .await
}

/// Active surveys open on `today` in which `user_id` is being evaluated.
pub(crate) async fn list_active_for_respondent(
    pool: &PgPool,
    user_id: &str,
    today: Date,
) -> Result<Vec<Survey>, sqlx::Error> {
    sqlx::query_as::<_, Survey>(&format!(
        "SELECT {COLUMNS} FROM surveys
         WHERE status = $1
           AND start_date <= $2
           AND end_date >= $2
           AND EXISTS (
              SELECT 1 FROM respondents r WHERE r.survey_id = surveys.id AND r.user_id = $3
           )
         ORDER BY end_date, name"
    ))
    .bind(SurveyStatus::Active)
    .bind(today)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateSurvey<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub template_id: &'a str,
    pub start_date: Date,
    pub end_date: Date,
    pub status: SurveyStatus,
    pub created_by: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSurvey<'_>,
) -> Result<Survey, sqlx::Error> {
    sqlx::query_as::<_, Survey>(&format!(
        "INSERT INTO surveys (
            id, name, description, template_id, start_date, end_date, status,
            created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.template_id)
    .bind(params.start_date)
    .bind(params.end_date)
    .bind(params.status)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateSurvey<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub template_id: &'a str,
    pub start_date: Date,
    pub end_date: Date,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateSurvey<'_>,
) -> Result<Option<Survey>, sqlx::Error> {
    sqlx::query_as::<_, Survey>(&format!(
        "UPDATE surveys SET
            name = $1,
            description = $2,
            template_id = $3,
            start_date = $4,
            end_date = $5,
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}"
    ))
    .bind(params.name)
    .bind(params.description)
    .bind(params.template_id)
    .bind(params.start_date)
    .bind(params.end_date)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Sets the status and returns the status the row had before, under a row lock,
/// so concurrent updates observe each transition exactly once.
pub(crate) async fn transition_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: SurveyStatus,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<SurveyStatus>, sqlx::Error> {
    sqlx::query_scalar::<_, SurveyStatus>(
        "WITH previous AS (
            SELECT id, status FROM surveys WHERE id = $1 FOR UPDATE
         )
         UPDATE surveys SET status = $2, updated_at = $3
         FROM previous
         WHERE surveys.id = previous.id
         RETURNING previous.status",
    )
    .bind(id)
    .bind(status)
    .bind(updated_at)
    .fetch_optional(executor)
    .await
}
