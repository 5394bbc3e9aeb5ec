use sqlx::{FromRow, PgPool};

use crate::db::models::Response;
use crate::db::types::RelationshipType;

const COLUMNS: &str =
    "id, rater_id, question_id, answer_value, answer_text, answered_at, updated_at";

/// One stored answer joined with the context a report needs.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ReportResponseRow {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) relationship_type: RelationshipType,
    pub(crate) answer_value: Option<f64>,
    pub(crate) answer_text: Option<String>,
}

pub(crate) struct UpsertResponse<'a> {
    pub id: &'a str,
    pub rater_id: &'a str,
    pub question_id: &'a str,
    pub answer_value: Option<f64>,
    pub answer_text: Option<&'a str>,
    pub now: time::PrimitiveDateTime,
}

/// Inserts the answer or overwrites the existing one for the same rater and question.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertResponse<'_>,
) -> Result<Response, sqlx::Error> {
    sqlx::query_as::<_, Response>(&format!(
        "INSERT INTO responses (
            id, rater_id, question_id, answer_value, answer_text, answered_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6)
        ON CONFLICT (rater_id, question_id) DO UPDATE SET
            answer_value = EXCLUDED.answer_value,
            answer_text = EXCLUDED.answer_text,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.rater_id)
    .bind(params.question_id)
    .bind(params.answer_value)
    .bind(params.answer_text)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_for_rater_question(
    pool: &PgPool,
    rater_id: &str,
    question_id: &str,
) -> Result<Option<Response>, sqlx::Error> {
    sqlx::query_as::<_, Response>(&format!(
        "SELECT {COLUMNS} FROM responses WHERE rater_id = $1 AND question_id = $2"
    ))
    .bind(rater_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn answered_question_ids(
    pool: &PgPool,
    rater_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT question_id FROM responses WHERE rater_id = $1")
        .bind(rater_id)
        .fetch_all(pool)
        .await
}

/// Answers `user_id` has given in `survey_id` across every respondent they rate.
pub(crate) async fn count_by_rater_user(
    pool: &PgPool,
    user_id: &str,
    survey_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM responses resp
         JOIN raters ra ON ra.id = resp.rater_id
         JOIN respondents r ON r.id = ra.respondent_id
         WHERE ra.user_id = $1 AND r.survey_id = $2",
    )
    .bind(user_id)
    .bind(survey_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_respondent(
    executor: impl sqlx::PgExecutor<'_>,
    respondent_id: &str,
) -> Result<Vec<ReportResponseRow>, sqlx::Error> {
    sqlx::query_as::<_, ReportResponseRow>(
        "SELECT resp.question_id, q.text AS question_text, ra.relationship_type,
                resp.answer_value, resp.answer_text
         FROM responses resp
         JOIN raters ra ON ra.id = resp.rater_id
         JOIN questions q ON q.id = resp.question_id
         LEFT JOIN competencies c ON c.id = q.competency_id
         WHERE ra.respondent_id = $1
         ORDER BY COALESCE(c.sort_order, 0), q.sort_order, q.id, ra.created_at",
    )
    .bind(respondent_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn delete_all(executor: impl sqlx::PgExecutor<'_>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM responses").execute(executor).await?;
    Ok(result.rows_affected())
}
