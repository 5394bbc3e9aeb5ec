use sqlx::PgPool;

use crate::db::models::SurveyTemplate;

const COLUMNS: &str = "id, name, description, is_active, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<SurveyTemplate>, sqlx::Error> {
    sqlx::query_as::<_, SurveyTemplate>(&format!(
        "SELECT {COLUMNS} FROM survey_templates WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<SurveyTemplate>, sqlx::Error> {
    sqlx::query_as::<_, SurveyTemplate>(&format!(
        "SELECT {COLUMNS} FROM survey_templates ORDER BY created_at DESC, name"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateTemplate<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub is_active: bool,
    pub created_by: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTemplate<'_>,
) -> Result<SurveyTemplate, sqlx::Error> {
    sqlx::query_as::<_, SurveyTemplate>(&format!(
        "INSERT INTO survey_templates (
            id, name, description, is_active, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.is_active)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateTemplate,
) -> Result<Option<SurveyTemplate>, sqlx::Error> {
    sqlx::query_as::<_, SurveyTemplate>(&format!(
        "UPDATE survey_templates SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            is_active = COALESCE($3, is_active),
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.description)
    .bind(params.is_active)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Fails with a foreign key violation while surveys still reference the template.
pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM survey_templates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_surveys(pool: &PgPool, id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM surveys WHERE template_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_ids(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM survey_templates ORDER BY created_at")
        .fetch_all(pool)
        .await
}
