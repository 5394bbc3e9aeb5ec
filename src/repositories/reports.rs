use sqlx::types::Json;

use crate::db::models::Report;

const COLUMNS: &str = "id, respondent_id, report_data, generated_at, generated_by";

pub(crate) async fn find_for_respondent(
    executor: impl sqlx::PgExecutor<'_>,
    respondent_id: &str,
) -> Result<Option<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>(&format!(
        "SELECT {COLUMNS} FROM reports WHERE respondent_id = $1"
    ))
    .bind(respondent_id)
    .fetch_optional(executor)
    .await
}

pub(crate) struct SaveReport<'a> {
    pub id: &'a str,
    pub respondent_id: &'a str,
    pub report_data: serde_json::Value,
    pub generated_by: Option<&'a str>,
    pub generated_at: time::PrimitiveDateTime,
}

/// Stores the aggregate; a respondent never has more than one report row.
pub(crate) async fn save(
    executor: impl sqlx::PgExecutor<'_>,
    params: SaveReport<'_>,
) -> Result<Report, sqlx::Error> {
    sqlx::query_as::<_, Report>(&format!(
        "INSERT INTO reports (id, respondent_id, report_data, generated_at, generated_by)
         VALUES ($1,$2,$3,$4,$5)
         ON CONFLICT (respondent_id) DO UPDATE SET
            report_data = EXCLUDED.report_data,
            generated_at = EXCLUDED.generated_at,
            generated_by = COALESCE(EXCLUDED.generated_by, reports.generated_by)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.respondent_id)
    .bind(Json(params.report_data))
    .bind(params.generated_at)
    .bind(params.generated_by)
    .fetch_one(executor)
    .await
}
