use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::SurveyTemplate;
use crate::repositories;
use crate::repositories::questions::QuestionOwner;
use crate::schemas::template::{
    CompetencyCreate, CompetencyResponse, QuestionResponse, StatusResponse, TemplateCreate,
    TemplateDetailResponse, TemplateQuestionsResponse, TemplateResponse, TemplateUpdate,
};
use crate::services::template_editing;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/:template_id", get(get_template).put(update_template).delete(delete_template))
        .route("/:template_id/competencies", post(create_competency))
        .route("/:template_id/competencies/:competency_id", delete(delete_competency))
        .route("/:template_id/questions", get(template_questions))
        .route("/:template_id/questions/:question_id", delete(delete_question))
}

async fn list_templates(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<TemplateResponse>>, ApiError> {
    let templates = repositories::templates::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list templates"))?;
    Ok(Json(templates.into_iter().map(TemplateResponse::from_db).collect()))
}

async fn create_template(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<TemplateCreate>,
) -> Result<(StatusCode, Json<TemplateDetailResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::from_validation(e, &payload))?;

    let plan = template_editing::plan(&[], &[], &payload.questions)
        .map_err(|errors| ApiError::invalid(errors, &payload))?;

    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let template = repositories::templates::create(
        &mut *tx,
        repositories::templates::CreateTemplate {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            description: payload.description.trim(),
            is_active: payload.is_active,
            created_by: Some(admin.user.id.as_str()),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Template with this name already exists", "Failed to create template"))?;

    template_editing::apply(&mut *tx, &template.id, &plan, now)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to save template questions"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit template"))?;

    tracing::info!(
        action = "template_created",
        template_id = %template.id,
        created_by = %admin.user.id,
        questions = plan.inserts.len(),
        "Template created"
    );

    Ok((StatusCode::CREATED, Json(template_detail(&state, template).await?)))
}

async fn get_template(
    Path(template_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<TemplateDetailResponse>, ApiError> {
    let template = fetch_template(&state, &template_id).await?;
    Ok(Json(template_detail(&state, template).await?))
}

/// Updates template fields and, when `questions` is present, applies the bulk question edit.
async fn update_template(
    Path(template_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<TemplateUpdate>,
) -> Result<Json<TemplateDetailResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::from_validation(e, &payload))?;
    let template = fetch_template(&state, &template_id).await?;

    let plan = match &payload.questions {
        Some(rows) => {
            let existing_ids =
                repositories::questions::ids_for_template(state.db(), &template.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to list template questions"))?;
            let competency_ids = competency_ids(&state, &template.id).await?;
            let plan = template_editing::plan(&existing_ids, &competency_ids, rows)
                .map_err(|errors| ApiError::invalid(errors, &payload))?;
            Some(plan)
        }
        None => None,
    };

    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let template = repositories::templates::update(
        &mut *tx,
        &template.id,
        repositories::templates::UpdateTemplate {
            name: payload.name.as_deref().map(|name| name.trim().to_string()),
            description: payload.description.as_deref().map(|value| value.trim().to_string()),
            is_active: payload.is_active,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Template with this name already exists", "Failed to update template"))?
    .ok_or_else(|| ApiError::NotFound("Template not found".to_string()))?;

    if let Some(plan) = &plan {
        template_editing::apply(&mut *tx, &template.id, plan, now)
            .await
            .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to save template questions"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit template"))?;

    tracing::info!(
        action = "template_updated",
        template_id = %template.id,
        updated_by = %admin.user.id,
        "Template updated"
    );

    Ok(Json(template_detail(&state, template).await?))
}

/// Templates referenced by surveys cannot be deleted.
async fn delete_template(
    Path(template_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let template = fetch_template(&state, &template_id).await?;

    let survey_count = repositories::templates::count_surveys(state.db(), &template.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count template surveys"))?;
    if survey_count > 0 {
        return Err(ApiError::Conflict(format!(
            "Template \"{}\" is used by {survey_count} survey(s) and cannot be deleted",
            template.name
        )));
    }

    repositories::templates::delete(state.db(), &template.id).await.map_err(|e| {
        ApiError::from_write(
            e,
            "Template is used by existing surveys and cannot be deleted",
            "Failed to delete template",
        )
    })?;

    tracing::info!(
        action = "template_deleted",
        template_id = %template.id,
        deleted_by = %admin.user.id,
        "Template deleted"
    );

    Ok(Json(StatusResponse::ok()))
}

async fn create_competency(
    Path(template_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CompetencyCreate>,
) -> Result<(StatusCode, Json<CompetencyResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::from_validation(e, &payload))?;
    let template = fetch_template(&state, &template_id).await?;

    let competency = repositories::competencies::create(
        state.db(),
        repositories::competencies::CreateCompetency {
            id: &Uuid::new_v4().to_string(),
            template_id: &template.id,
            name: payload.name.trim(),
            category: payload.category.trim(),
            weight: payload.weight,
            sort_order: payload.sort_order,
        },
    )
    .await
    .map_err(|e| {
        ApiError::from_write(e, "Competency with this name already exists", "Failed to create competency")
    })?;

    Ok((StatusCode::CREATED, Json(CompetencyResponse::from_db(competency))))
}

async fn delete_competency(
    Path((template_id, competency_id)): Path<(String, String)>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let deleted = repositories::competencies::delete(state.db(), &template_id, &competency_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete competency"))?;
    if !deleted {
        return Err(ApiError::NotFound("Competency not found".to_string()));
    }
    Ok(Json(StatusResponse::ok()))
}

/// Question list for client-side editors; any signed-in user may read it.
async fn template_questions(
    Path(template_id): Path<String>,
    CurrentUser(_auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let template = repositories::templates::find_by_id(state.db(), &template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch template"))?;
    let Some(template) = template else {
        return Ok(status_error(StatusCode::NOT_FOUND, "Template not found"));
    };

    let questions =
        repositories::questions::list_for(state.db(), QuestionOwner::Template(&template.id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list template questions"))?;

    Ok(Json(TemplateQuestionsResponse {
        questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
    })
    .into_response())
}

async fn delete_question(
    Path((template_id, question_id)): Path<(String, String)>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let deleted =
        repositories::questions::delete_for_template(&mut *tx, &template_id, &question_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;
    if !deleted {
        return Ok(status_error(StatusCode::NOT_FOUND, "Question not found"));
    }

    repositories::questions::renumber(&mut *tx, QuestionOwner::Template(&template_id))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to renumber questions"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit question delete"))?;

    tracing::info!(
        action = "question_deleted",
        template_id = %template_id,
        question_id = %question_id,
        deleted_by = %admin.user.id,
        "Template question deleted"
    );

    Ok(Json(StatusResponse::ok()).into_response())
}

fn status_error(status: StatusCode, message: &str) -> Response {
    (status, Json(StatusResponse { status: "error", message: Some(message.to_string()) }))
        .into_response()
}

async fn fetch_template(state: &AppState, template_id: &str) -> Result<SurveyTemplate, ApiError> {
    repositories::templates::find_by_id(state.db(), template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch template"))?
        .ok_or_else(|| ApiError::NotFound("Template not found".to_string()))
}

async fn competency_ids(state: &AppState, template_id: &str) -> Result<Vec<String>, ApiError> {
    let competencies = repositories::competencies::list_for_template(state.db(), template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list competencies"))?;
    Ok(competencies.into_iter().map(|competency| competency.id).collect())
}

async fn template_detail(
    state: &AppState,
    template: SurveyTemplate,
) -> Result<TemplateDetailResponse, ApiError> {
    let survey_count = repositories::templates::count_surveys(state.db(), &template.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count template surveys"))?;
    let competencies = repositories::competencies::list_for_template(state.db(), &template.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list competencies"))?;
    let questions =
        repositories::questions::list_for(state.db(), QuestionOwner::Template(&template.id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list template questions"))?;

    Ok(TemplateDetailResponse {
        template: TemplateResponse::from_db(template),
        survey_count,
        competencies: competencies.into_iter().map(CompetencyResponse::from_db).collect(),
        questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
    })
}
