use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::{Choice, Question};
use crate::db::types::AnswerType;

const COLUMNS: &str = "\
    q.id, q.template_id, q.survey_id, q.competency_id, q.text, q.answer_type, \
    q.scale_min, q.scale_max, q.choices, q.is_required, q.sort_order, q.created_at";

const WIZARD_ORDER: &str = "COALESCE(c.sort_order, 0), q.sort_order, q.id";

/// A question belongs to exactly one template or one survey.
#[derive(Debug, Clone, Copy)]
pub(crate) enum QuestionOwner<'a> {
    Template(&'a str),
    Survey(&'a str),
}

impl QuestionOwner<'_> {
    fn column(&self) -> &'static str {
        match self {
            Self::Template(_) => "template_id",
            Self::Survey(_) => "survey_id",
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::Template(id) | Self::Survey(id) => id,
        }
    }
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions q WHERE q.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_for(
    executor: impl sqlx::PgExecutor<'_>,
    owner: QuestionOwner<'_>,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions q
         LEFT JOIN competencies c ON c.id = q.competency_id
         WHERE q.{} = $1
         ORDER BY {WIZARD_ORDER}",
        owner.column()
    ))
    .bind(owner.id())
    .fetch_all(executor)
    .await
}

/// Question ids a rater walks through: the survey's own copies when it has any,
/// the template's questions otherwise.
pub(crate) async fn ordered_ids_for_survey(
    pool: &PgPool,
    survey_id: &str,
    template_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let own = ordered_ids(pool, QuestionOwner::Survey(survey_id)).await?;
    if !own.is_empty() {
        return Ok(own);
    }
    ordered_ids(pool, QuestionOwner::Template(template_id)).await
}

async fn ordered_ids(pool: &PgPool, owner: QuestionOwner<'_>) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(&format!(
        "SELECT q.id FROM questions q
         LEFT JOIN competencies c ON c.id = q.competency_id
         WHERE q.{} = $1
         ORDER BY {WIZARD_ORDER}",
        owner.column()
    ))
    .bind(owner.id())
    .fetch_all(pool)
    .await
}

pub(crate) async fn max_sort_order(
    executor: impl sqlx::PgExecutor<'_>,
    owner: QuestionOwner<'_>,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(&format!(
        "SELECT COALESCE(MAX(sort_order), 0) FROM questions WHERE {} = $1",
        owner.column()
    ))
    .bind(owner.id())
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub id: &'a str,
    pub owner: QuestionOwner<'a>,
    pub competency_id: Option<&'a str>,
    pub text: &'a str,
    pub answer_type: AnswerType,
    pub scale_min: Option<i32>,
    pub scale_max: Option<i32>,
    pub choices: Vec<Choice>,
    pub is_required: bool,
    pub sort_order: i32,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    let (template_id, survey_id) = match params.owner {
        QuestionOwner::Template(id) => (Some(id), None),
        QuestionOwner::Survey(id) => (None, Some(id)),
    };

    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions AS q (
            id, template_id, survey_id, competency_id, text, answer_type,
            scale_min, scale_max, choices, is_required, sort_order, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(template_id)
    .bind(survey_id)
    .bind(params.competency_id)
    .bind(params.text)
    .bind(params.answer_type.as_str())
    .bind(params.scale_min)
    .bind(params.scale_max)
    .bind(Json(params.choices))
    .bind(params.is_required)
    .bind(params.sort_order)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateQuestion<'a> {
    pub competency_id: Option<&'a str>,
    pub text: &'a str,
    pub answer_type: AnswerType,
    pub scale_min: Option<i32>,
    pub scale_max: Option<i32>,
    pub choices: Vec<Choice>,
    pub is_required: bool,
    pub sort_order: i32,
}

/// Updates a question only when it belongs to `template_id`.
pub(crate) async fn update_for_template(
    executor: impl sqlx::PgExecutor<'_>,
    template_id: &str,
    id: &str,
    params: UpdateQuestion<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE questions SET
            competency_id = $1,
            text = $2,
            answer_type = $3,
            scale_min = $4,
            scale_max = $5,
            choices = $6,
            is_required = $7,
            sort_order = $8
         WHERE id = $9 AND template_id = $10",
    )
    .bind(params.competency_id)
    .bind(params.text)
    .bind(params.answer_type.as_str())
    .bind(params.scale_min)
    .bind(params.scale_max)
    .bind(Json(params.choices))
    .bind(params.is_required)
    .bind(params.sort_order)
    .bind(id)
    .bind(template_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete_for_template(
    executor: impl sqlx::PgExecutor<'_>,
    template_id: &str,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1 AND template_id = $2")
        .bind(id)
        .bind(template_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn ids_for_template(
    executor: impl sqlx::PgExecutor<'_>,
    template_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM questions WHERE template_id = $1")
        .bind(template_id)
        .fetch_all(executor)
        .await
}

/// Rewrites sort orders to 1..N keeping the current relative order.
pub(crate) async fn renumber(
    executor: impl sqlx::PgExecutor<'_>,
    owner: QuestionOwner<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE questions SET sort_order = ranked.position
         FROM (
            SELECT id, (ROW_NUMBER() OVER (ORDER BY sort_order, created_at, id))::int AS position
            FROM questions
            WHERE {} = $1
         ) AS ranked
         WHERE questions.id = ranked.id AND questions.sort_order <> ranked.position",
        owner.column()
    ))
    .bind(owner.id())
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
