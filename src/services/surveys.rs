use sqlx::PgConnection;
use time::Date;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Question, Rater, Respondent, Survey, SurveyTemplate, User};
use crate::db::types::{RelationshipType, SurveyStatus};
use crate::repositories::questions::QuestionOwner;
use crate::repositories::{self, questions};
use crate::schemas::survey::{RaterCreate, RespondentInput, SurveyCreate, SurveyUpdate};
use crate::schemas::template::QuestionRowInput;
use crate::services::answer_forms::FormErrors;
use crate::services::template_editing::{self, QuestionDraft};
use crate::services::{invitations, reports, ServiceError};

pub(crate) fn validate_window(start: Date, end: Date, errors: &mut FormErrors) {
    if start > end {
        errors.add("end_date", "End date must not be before the start date");
    }
}

/// Only superusers may schedule a survey on an inactive template.
pub(crate) fn validate_template_choice(
    template: &SurveyTemplate,
    actor: &User,
    errors: &mut FormErrors,
) {
    if !template.is_active && !actor.is_superuser {
        errors.add("template_id", "Select an active template");
    }
}

pub(crate) fn validate_self_rater(
    relationship: RelationshipType,
    rater_user_id: &str,
    respondent: &Respondent,
    errors: &mut FormErrors,
) {
    if relationship == RelationshipType::SelfAssessment && rater_user_id != respondent.user_id {
        errors.add(
            "relationship_type",
            "A self assessment can only be given by the respondent",
        );
    }
}

fn write_error(err: sqlx::Error, conflict: &str) -> ServiceError {
    if crate::db::is_unique_violation(&err) {
        ServiceError::Conflict(conflict.to_string())
    } else if crate::db::is_foreign_key_violation(&err) {
        ServiceError::NotFound("Referenced user not found")
    } else {
        ServiceError::Database(err)
    }
}

fn clean_rows(
    rows: &[QuestionRowInput],
    competency_ids: &[String],
    errors: &mut FormErrors,
) -> Vec<QuestionDraft> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| !row.delete)
        .filter_map(|(index, row)| {
            template_editing::clean_question(&format!("questions[{index}]"), row, competency_ids, errors)
        })
        .collect()
}

async fn competency_ids(state: &AppState, template_id: &str) -> Result<Vec<String>, ServiceError> {
    Ok(repositories::competencies::list_for_template(state.db(), template_id)
        .await?
        .into_iter()
        .map(|competency| competency.id)
        .collect())
}

async fn question_total(conn: &mut PgConnection, survey: &Survey) -> Result<i64, sqlx::Error> {
    let own = questions::list_for(&mut *conn, QuestionOwner::Survey(&survey.id)).await?;
    if !own.is_empty() {
        return Ok(own.len() as i64);
    }
    let inherited = questions::list_for(&mut *conn, QuestionOwner::Template(&survey.template_id)).await?;
    Ok(inherited.len() as i64)
}

/// Appends copies of the template's questions to the survey, keeping their order.
async fn copy_template_questions(
    conn: &mut PgConnection,
    survey: &Survey,
    now: time::PrimitiveDateTime,
) -> Result<usize, ServiceError> {
    let source: Vec<Question> =
        questions::list_for(&mut *conn, QuestionOwner::Template(&survey.template_id)).await?;
    let offset = questions::max_sort_order(&mut *conn, QuestionOwner::Survey(&survey.id)).await?;

    for (position, question) in source.iter().enumerate() {
        let draft = QuestionDraft {
            text: question.text.clone(),
            answer_type: question.kind(),
            scale_min: question.scale_min,
            scale_max: question.scale_max,
            choices: question.choices.0.clone(),
            competency_id: question.competency_id.clone(),
            is_required: question.is_required,
            sort_order: offset + position as i32 + 1,
        };
        template_editing::insert_draft(&mut *conn, QuestionOwner::Survey(&survey.id), &draft, now)
            .await?;
    }
    Ok(source.len())
}

async fn append_drafts(
    conn: &mut PgConnection,
    survey: &Survey,
    drafts: &[QuestionDraft],
    now: time::PrimitiveDateTime,
) -> Result<(), ServiceError> {
    let offset = questions::max_sort_order(&mut *conn, QuestionOwner::Survey(&survey.id)).await?;
    for (position, draft) in drafts.iter().enumerate() {
        let mut draft = draft.clone();
        draft.sort_order = offset + position as i32 + 1;
        template_editing::insert_draft(&mut *conn, QuestionOwner::Survey(&survey.id), &draft, now)
            .await?;
    }
    Ok(())
}

/// Creates the respondent together with its (still empty) report.
async fn insert_respondent(
    conn: &mut PgConnection,
    survey: &Survey,
    input: &RespondentInput,
    now: time::PrimitiveDateTime,
) -> Result<Respondent, ServiceError> {
    let respondent = repositories::respondents::create(
        &mut *conn,
        repositories::respondents::CreateRespondent {
            id: &Uuid::new_v4().to_string(),
            survey_id: &survey.id,
            user_id: input.user_id.trim(),
            manager_id: input.manager_id.as_deref().map(str::trim).filter(|id| !id.is_empty()),
            created_at: now,
        },
    )
    .await
    .map_err(|err| write_error(err, "User is already a respondent in this survey"))?;

    let total = question_total(&mut *conn, survey).await?;
    repositories::reports::save(
        &mut *conn,
        repositories::reports::SaveReport {
            id: &Uuid::new_v4().to_string(),
            respondent_id: &respondent.id,
            report_data: reports::empty_report_data(total),
            generated_by: None,
            generated_at: now,
        },
    )
    .await?;

    Ok(respondent)
}

pub(crate) async fn create_survey(
    state: &AppState,
    actor: &User,
    payload: &SurveyCreate,
) -> Result<Survey, ServiceError> {
    let mut errors = FormErrors::default();
    validate_window(payload.start_date, payload.end_date, &mut errors);

    let template = repositories::templates::find_by_id(state.db(), payload.template_id.trim()).await?;
    let competency_ids = match &template {
        Some(template) => {
            validate_template_choice(template, actor, &mut errors);
            competency_ids(state, &template.id).await?
        }
        None => {
            errors.add("template_id", "Select a valid template");
            Vec::new()
        }
    };
    let drafts = clean_rows(&payload.questions, &competency_ids, &mut errors);

    let Some(template) = template.filter(|_| errors.is_empty()) else {
        return Err(ServiceError::Invalid(errors));
    };

    let now = primitive_now_utc();
    let status = payload.status.unwrap_or(SurveyStatus::Draft);
    let mut tx = state.db().begin().await?;

    let survey = repositories::surveys::create(
        &mut *tx,
        repositories::surveys::CreateSurvey {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            description: payload.description.trim(),
            template_id: &template.id,
            start_date: payload.start_date,
            end_date: payload.end_date,
            status,
            created_by: Some(actor.id.as_str()),
            created_at: now,
        },
    )
    .await?;

    if payload.copy_template_questions {
        copy_template_questions(&mut *tx, &survey, now).await?;
    }
    append_drafts(&mut *tx, &survey, &drafts, now).await?;

    for respondent in &payload.respondents {
        insert_respondent(&mut *tx, &survey, respondent, now).await?;
    }

    tx.commit().await?;

    tracing::info!(
        action = "survey_created",
        survey_id = %survey.id,
        template_id = %template.id,
        respondents = payload.respondents.len(),
        "Survey created"
    );

    if status == SurveyStatus::Active {
        invitations::spawn_survey_invitations(state.clone(), survey.clone());
    }

    Ok(survey)
}

/// Applies the update; a transition into `active` dispatches invitations once.
pub(crate) async fn update_survey(
    state: &AppState,
    actor: &User,
    survey: Survey,
    payload: &SurveyUpdate,
) -> Result<Survey, ServiceError> {
    let start_date = payload.start_date.unwrap_or(survey.start_date);
    let end_date = payload.end_date.unwrap_or(survey.end_date);
    let mut errors = FormErrors::default();
    validate_window(start_date, end_date, &mut errors);

    let template_id = match payload.template_id.as_deref().map(str::trim) {
        Some(template_id) if template_id != survey.template_id => {
            match repositories::templates::find_by_id(state.db(), template_id).await? {
                Some(template) => {
                    validate_template_choice(&template, actor, &mut errors);
                    template.id
                }
                None => {
                    errors.add("template_id", "Select a valid template");
                    survey.template_id.clone()
                }
            }
        }
        _ => survey.template_id.clone(),
    };

    if !errors.is_empty() {
        return Err(ServiceError::Invalid(errors));
    }

    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;

    let name = payload.name.as_deref().map(str::trim).unwrap_or(&survey.name);
    let description =
        payload.description.as_deref().map(str::trim).unwrap_or(&survey.description);
    let mut updated = repositories::surveys::update(
        &mut *tx,
        &survey.id,
        repositories::surveys::UpdateSurvey {
            name,
            description,
            template_id: &template_id,
            start_date,
            end_date,
            updated_at: now,
        },
    )
    .await?
    .ok_or(ServiceError::NotFound("Survey not found"))?;

    let mut activated = false;
    if let Some(status) = payload.status {
        let previous = repositories::surveys::transition_status(&mut *tx, &survey.id, status, now)
            .await?
            .ok_or(ServiceError::NotFound("Survey not found"))?;
        activated = previous != SurveyStatus::Active && status == SurveyStatus::Active;
        if previous != status {
            tracing::info!(
                action = "survey_status_changed",
                survey_id = %survey.id,
                from = ?previous,
                to = ?status,
                "Survey status changed"
            );
        }
        updated.status = status;
    }

    tx.commit().await?;

    if activated {
        invitations::spawn_survey_invitations(state.clone(), updated.clone());
    }

    Ok(updated)
}

pub(crate) async fn add_questions(
    state: &AppState,
    survey: &Survey,
    rows: &[QuestionRowInput],
    copy_from_template: bool,
) -> Result<Vec<Question>, ServiceError> {
    let competency_ids = competency_ids(state, &survey.template_id).await?;
    let mut errors = FormErrors::default();
    let drafts = clean_rows(rows, &competency_ids, &mut errors);
    if !errors.is_empty() {
        return Err(ServiceError::Invalid(errors));
    }

    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;
    if copy_from_template {
        copy_template_questions(&mut *tx, survey, now).await?;
    }
    append_drafts(&mut *tx, survey, &drafts, now).await?;
    let questions = questions::list_for(&mut *tx, QuestionOwner::Survey(&survey.id)).await?;
    tx.commit().await?;

    Ok(questions)
}

pub(crate) async fn add_respondent(
    state: &AppState,
    survey: &Survey,
    input: &RespondentInput,
) -> Result<Respondent, ServiceError> {
    let mut tx = state.db().begin().await?;
    let respondent = insert_respondent(&mut *tx, survey, input, primitive_now_utc()).await?;
    tx.commit().await?;

    tracing::info!(
        action = "respondent_added",
        survey_id = %survey.id,
        respondent_id = %respondent.id,
        "Respondent added"
    );
    Ok(respondent)
}

pub(crate) async fn add_rater(
    state: &AppState,
    respondent: &Respondent,
    payload: &RaterCreate,
) -> Result<(Rater, Option<String>), ServiceError> {
    let rater_user_id = payload.user_id.trim();
    let mut errors = FormErrors::default();
    validate_self_rater(payload.relationship_type, rater_user_id, respondent, &mut errors);
    if !errors.is_empty() {
        return Err(ServiceError::Invalid(errors));
    }

    let rater = repositories::raters::create(
        state.db(),
        repositories::raters::CreateRater {
            id: &Uuid::new_v4().to_string(),
            respondent_id: &respondent.id,
            user_id: rater_user_id,
            relationship_type: payload.relationship_type,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|err| write_error(err, "Rater is already assigned to this respondent"))?;

    tracing::info!(
        action = "rater_assigned",
        respondent_id = %respondent.id,
        rater_id = %rater.id,
        relationship = rater.relationship_type.as_str(),
        "Rater assigned"
    );

    if !payload.send_invitation {
        return Ok((rater, None));
    }

    let survey = repositories::surveys::find_by_id(state.db(), &respondent.survey_id)
        .await?
        .ok_or(ServiceError::NotFound("Survey not found"))?;
    let respondent_user = repositories::users::find_by_id(state.db(), &respondent.user_id)
        .await?
        .ok_or(ServiceError::NotFound("Respondent user not found"))?;

    let token =
        invitations::invite_rater(state, &survey, &rater, &respondent_user.full_name()).await?;
    let rater = repositories::raters::find_by_id(state.db(), &rater.id).await?.unwrap_or(rater);

    Ok((rater, Some(token)))
}
