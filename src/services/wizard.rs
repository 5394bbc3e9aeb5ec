use thiserror::Error;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Question, Rater, Respondent, Survey, User};
use crate::db::types::RaterStatus;
use crate::repositories;
use crate::schemas::respond::{CompletionResponse, Direction, WizardQuestion, WizardStepResponse};
use crate::services::answer_forms::{AnswerForm, AnswerInput, FormErrors};
use crate::services::reports;

#[derive(Debug, Error)]
pub(crate) enum WizardError {
    #[error("rater not found")]
    RaterNotFound,
    #[error("survey has no questions")]
    NoQuestions,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub(crate) enum StepOutcome {
    Show(Box<WizardStepResponse>),
    Redirect(String),
}

#[derive(Debug)]
pub(crate) enum SubmitOutcome {
    Redirect(String),
    Invalid(FormErrors),
}

struct Assignment {
    rater: Rater,
    respondent: Respondent,
    survey: Survey,
    respondent_name: String,
}

enum Loaded {
    Open(Assignment),
    Completed,
}

/// Position shown to the rater: an explicit request clamped into range,
/// else the first unanswered question, else the last one. `answered` is non-empty.
pub(crate) fn resolve_position(requested: Option<i64>, answered: &[bool]) -> usize {
    let last = answered.len().saturating_sub(1);
    if let Some(requested) = requested {
        return requested.clamp(0, last as i64) as usize;
    }
    answered.iter().position(|done| !done).unwrap_or(last)
}

pub(crate) fn respond_path(state: &AppState, rater_id: &str, index: usize) -> String {
    format!("{}/respond/{rater_id}?q={index}", state.settings().api().api_v1_str)
}

pub(crate) fn complete_path(state: &AppState, rater_id: &str) -> String {
    format!("{}/respond/{rater_id}/complete", state.settings().api().api_v1_str)
}

async fn load_assignment(
    state: &AppState,
    user: &User,
    rater_id: &str,
) -> Result<Loaded, WizardError> {
    let rater = repositories::raters::find_by_id(state.db(), rater_id)
        .await?
        .filter(|rater| rater.user_id == user.id)
        .ok_or(WizardError::RaterNotFound)?;

    if rater.status == RaterStatus::Completed {
        return Ok(Loaded::Completed);
    }

    let respondent = repositories::respondents::find_by_id(state.db(), &rater.respondent_id)
        .await?
        .ok_or(WizardError::RaterNotFound)?;
    let survey = repositories::surveys::find_by_id(state.db(), &respondent.survey_id)
        .await?
        .ok_or(WizardError::RaterNotFound)?;
    let respondent_name = repositories::users::find_by_id(state.db(), &respondent.user_id)
        .await?
        .map(|user| user.full_name())
        .unwrap_or_default();

    Ok(Loaded::Open(Assignment { rater, respondent, survey, respondent_name }))
}

/// Ordered question ids for the survey, computed once per session and survey.
async fn question_ids(
    state: &AppState,
    session_id: &str,
    survey: &Survey,
    refresh: bool,
) -> Result<Vec<String>, WizardError> {
    if !refresh {
        if let Some(session) =
            repositories::wizard_sessions::find(state.db(), session_id, &survey.id).await?
        {
            if session.initialized && !session.question_ids.0.is_empty() {
                return Ok(session.question_ids.0);
            }
        }
    }

    let ids = repositories::questions::ordered_ids_for_survey(
        state.db(),
        &survey.id,
        &survey.template_id,
    )
    .await?;

    repositories::wizard_sessions::save(
        state.db(),
        repositories::wizard_sessions::SaveWizardSession {
            session_id,
            survey_id: &survey.id,
            question_ids: &ids,
            current_index: 0,
            initialized: true,
            updated_at: primitive_now_utc(),
        },
    )
    .await?;

    Ok(ids)
}

/// Resolves the current question; a cached id that no longer exists forces one recompute.
async fn current_question(
    state: &AppState,
    session_id: &str,
    assignment: &Assignment,
    requested: Option<i64>,
) -> Result<(usize, usize, Question), WizardError> {
    let answered_ids =
        repositories::responses::answered_question_ids(state.db(), &assignment.rater.id).await?;

    for refresh in [false, true] {
        let ids = question_ids(state, session_id, &assignment.survey, refresh).await?;
        if ids.is_empty() {
            return Err(WizardError::NoQuestions);
        }

        let answered: Vec<bool> = ids.iter().map(|id| answered_ids.contains(id)).collect();
        let index = resolve_position(requested, &answered);

        if let Some(question) = repositories::questions::find_by_id(state.db(), &ids[index]).await? {
            repositories::wizard_sessions::set_position(
                state.db(),
                session_id,
                &assignment.survey.id,
                index as i32,
                primitive_now_utc(),
            )
            .await?;
            return Ok((index, ids.len(), question));
        }
    }

    Err(WizardError::NoQuestions)
}

pub(crate) async fn show(
    state: &AppState,
    user: &User,
    session_id: &str,
    rater_id: &str,
    requested: Option<i64>,
) -> Result<StepOutcome, WizardError> {
    let assignment = match load_assignment(state, user, rater_id).await? {
        Loaded::Completed => return Ok(StepOutcome::Redirect(complete_path(state, rater_id))),
        Loaded::Open(assignment) => assignment,
    };

    let (index, total, question) = current_question(state, session_id, &assignment, requested).await?;
    let form = AnswerForm::for_question(&question);
    let existing = repositories::responses::find_for_rater_question(
        state.db(),
        &assignment.rater.id,
        &question.id,
    )
    .await?;

    Ok(StepOutcome::Show(Box::new(WizardStepResponse {
        rater_id: assignment.rater.id.clone(),
        survey_id: assignment.survey.id.clone(),
        survey_name: assignment.survey.name.clone(),
        respondent_name: assignment.respondent_name.clone(),
        relationship_type: assignment.rater.relationship_type,
        index,
        total,
        is_first: index == 0,
        is_last: index + 1 == total,
        question: WizardQuestion {
            id: question.id.clone(),
            text: question.text.clone(),
            answer_type: question.kind().as_str(),
            is_required: question.is_required,
        },
        form: form.spec(),
        initial: form.initial(existing.as_ref()),
    })))
}

pub(crate) async fn submit(
    state: &AppState,
    user: &User,
    session_id: &str,
    rater_id: &str,
    requested: Option<i64>,
    direction: Direction,
    input: &AnswerInput,
) -> Result<SubmitOutcome, WizardError> {
    let assignment = match load_assignment(state, user, rater_id).await? {
        Loaded::Completed => return Ok(SubmitOutcome::Redirect(complete_path(state, rater_id))),
        Loaded::Open(assignment) => assignment,
    };

    let (index, total, question) = current_question(state, session_id, &assignment, requested).await?;

    if direction == Direction::Back {
        let previous = index.saturating_sub(1);
        repositories::wizard_sessions::set_position(
            state.db(),
            session_id,
            &assignment.survey.id,
            previous as i32,
            primitive_now_utc(),
        )
        .await?;
        return Ok(SubmitOutcome::Redirect(respond_path(state, rater_id, previous)));
    }

    let clean = match AnswerForm::for_question(&question).validate(input) {
        Ok(clean) => clean,
        Err(errors) => return Ok(SubmitOutcome::Invalid(errors)),
    };

    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;
    repositories::responses::upsert(
        &mut *tx,
        repositories::responses::UpsertResponse {
            id: &Uuid::new_v4().to_string(),
            rater_id: &assignment.rater.id,
            question_id: &question.id,
            answer_value: clean.answer_value,
            answer_text: clean.answer_text.as_deref(),
            now,
        },
    )
    .await?;
    repositories::raters::mark_started(&mut *tx, &assignment.rater.id).await?;
    repositories::respondents::mark_in_progress(&mut *tx, &assignment.respondent.id).await?;
    tx.commit().await?;

    ::metrics::counter!(metrics::WIZARD_ANSWERS_SAVED).increment(1);

    if index + 1 < total {
        repositories::wizard_sessions::set_position(
            state.db(),
            session_id,
            &assignment.survey.id,
            (index + 1) as i32,
            now,
        )
        .await?;
        return Ok(SubmitOutcome::Redirect(respond_path(state, rater_id, index + 1)));
    }

    finish(state, session_id, &assignment).await?;
    Ok(SubmitOutcome::Redirect(complete_path(state, rater_id)))
}

async fn finish(
    state: &AppState,
    session_id: &str,
    assignment: &Assignment,
) -> Result<(), WizardError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;
    repositories::raters::mark_completed(&mut *tx, &assignment.rater.id, now).await?;
    repositories::wizard_sessions::reset(&mut *tx, session_id, &assignment.survey.id, now).await?;
    let respondent_completed =
        repositories::respondents::complete_if_all_rated(&mut *tx, &assignment.respondent.id, now)
            .await?;
    tx.commit().await?;

    ::metrics::counter!(metrics::WIZARD_COMPLETIONS).increment(1);
    tracing::info!(
        action = "rater_completed",
        rater_id = %assignment.rater.id,
        respondent_id = %assignment.respondent.id,
        respondent_completed,
        "Rater completed the survey"
    );

    if let Err(err) = reports::regenerate(state.db(), &assignment.respondent.id, None).await {
        tracing::error!(
            respondent_id = %assignment.respondent.id,
            error = ?err,
            "Failed to regenerate report after completion"
        );
    }
    Ok(())
}

pub(crate) async fn completion(
    state: &AppState,
    user: &User,
    rater_id: &str,
) -> Result<CompletionResponse, WizardError> {
    let rater = repositories::raters::find_by_id(state.db(), rater_id)
        .await?
        .filter(|rater| rater.user_id == user.id)
        .ok_or(WizardError::RaterNotFound)?;
    let respondent = repositories::respondents::find_by_id(state.db(), &rater.respondent_id)
        .await?
        .ok_or(WizardError::RaterNotFound)?;
    let survey = repositories::surveys::find_by_id(state.db(), &respondent.survey_id)
        .await?
        .ok_or(WizardError::RaterNotFound)?;
    let respondent_name = repositories::users::find_by_id(state.db(), &respondent.user_id)
        .await?
        .map(|user| user.full_name())
        .unwrap_or_default();

    Ok(CompletionResponse {
        rater_id: rater.id,
        survey_id: survey.id,
        survey_name: survey.name,
        respondent_name,
        status: rater.status,
        completed_at: rater.completed_at.map(format_primitive),
    })
}
