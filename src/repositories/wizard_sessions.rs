use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::WizardSession;

const COLUMNS: &str = "session_id, survey_id, question_ids, current_index, initialized, updated_at";

pub(crate) async fn find(
    pool: &PgPool,
    session_id: &str,
    survey_id: &str,
) -> Result<Option<WizardSession>, sqlx::Error> {
    sqlx::query_as::<_, WizardSession>(&format!(
        "SELECT {COLUMNS} FROM wizard_sessions WHERE session_id = $1 AND survey_id = $2"
    ))
    .bind(session_id)
    .bind(survey_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct SaveWizardSession<'a> {
    pub session_id: &'a str,
    pub survey_id: &'a str,
    pub question_ids: &'a [String],
    pub current_index: i32,
    pub initialized: bool,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn save(
    executor: impl sqlx::PgExecutor<'_>,
    params: SaveWizardSession<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO wizard_sessions (
            session_id, survey_id, question_ids, current_index, initialized, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6)
        ON CONFLICT (session_id, survey_id) DO UPDATE SET
            question_ids = EXCLUDED.question_ids,
            current_index = EXCLUDED.current_index,
            initialized = EXCLUDED.initialized,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(params.session_id)
    .bind(params.survey_id)
    .bind(Json(params.question_ids))
    .bind(params.current_index)
    .bind(params.initialized)
    .bind(params.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Records the step last shown. Position is always resolved from the request
/// or the first unanswered question, so this value is never read back.
pub(crate) async fn set_position(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    survey_id: &str,
    current_index: i32,
    updated_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE wizard_sessions SET current_index = $1, updated_at = $2
         WHERE session_id = $3 AND survey_id = $4",
    )
    .bind(current_index)
    .bind(updated_at)
    .bind(session_id)
    .bind(survey_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Drops the initialized flag so the next visit recomputes the question list.
pub(crate) async fn reset(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    survey_id: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE wizard_sessions SET initialized = FALSE, current_index = 0, updated_at = $1
         WHERE session_id = $2 AND survey_id = $3",
    )
    .bind(updated_at)
    .bind(session_id)
    .bind(survey_id)
    .execute(executor)
    .await?;
    Ok(())
}
