use sqlx::PgPool;

use crate::db::models::Competency;

const COLUMNS: &str = "id, template_id, name, category, weight, sort_order";

pub(crate) async fn list_for_template(
    pool: &PgPool,
    template_id: &str,
) -> Result<Vec<Competency>, sqlx::Error> {
    sqlx::query_as::<_, Competency>(&format!(
        "SELECT {COLUMNS} FROM competencies WHERE template_id = $1 ORDER BY sort_order, name"
    ))
    .bind(template_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateCompetency<'a> {
    pub id: &'a str,
    pub template_id: &'a str,
    pub name: &'a str,
    pub category: &'a str,
    pub weight: f64,
    pub sort_order: i32,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateCompetency<'_>,
) -> Result<Competency, sqlx::Error> {
    sqlx::query_as::<_, Competency>(&format!(
        "INSERT INTO competencies (id, template_id, name, category, weight, sort_order)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.template_id)
    .bind(params.name)
    .bind(params.category)
    .bind(params.weight)
    .bind(params.sort_order)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(pool: &PgPool, template_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM competencies WHERE template_id = $1 AND id = $2")
        .bind(template_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Distinct non-empty categories used by the template's competencies.
pub(crate) async fn categories_for_template(
    pool: &PgPool,
    template_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM competencies
         WHERE template_id = $1 AND category <> ''
         ORDER BY category",
    )
    .bind(template_id)
    .fetch_all(pool)
    .await
}
