use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{deny, Authenticated, CurrentLeader, CurrentUser};
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::core::state::AppState;
use crate::db::models::{Respondent, Survey};
use crate::repositories;
use crate::repositories::questions::QuestionOwner;
use crate::schemas::survey::{
    RaterCreate, RaterCreatedResponse, RaterResponse, RespondentInput, RespondentResponse,
    SurveyCreate, SurveyDetailResponse, SurveyQuestionsAdd, SurveyResponse, SurveyUpdate,
};
use crate::schemas::template::QuestionResponse;
use crate::services::surveys as survey_service;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/surveys", get(list_surveys).post(create_survey))
        .route("/surveys/:survey_id", get(get_survey).patch(update_survey))
        .route("/surveys/:survey_id/questions", post(add_questions))
        .route("/surveys/:survey_id/respondents", post(add_respondent))
        .route("/respondents/:respondent_id/raters", post(add_rater))
}

/// Administrators and leaders see every survey; everyone else gets an empty page.
async fn list_surveys(
    Query(params): Query<PageQuery>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SurveyResponse>>, ApiError> {
    let (skip, limit) = params.bounds();
    if !auth.access.has_admin_access {
        return Ok(Json(PaginatedResponse::empty(skip, limit)));
    }

    let surveys = repositories::surveys::list_page(state.db(), skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list surveys"))?;
    let total_count = repositories::surveys::count(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count surveys"))?;

    Ok(Json(PaginatedResponse {
        items: surveys.into_iter().map(SurveyResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn create_survey(
    CurrentLeader(auth): CurrentLeader,
    State(state): State<AppState>,
    Json(payload): Json<SurveyCreate>,
) -> Result<(StatusCode, Json<SurveyDetailResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::from_validation(e, &payload))?;

    let survey = survey_service::create_survey(&state, &auth.user, &payload)
        .await
        .map_err(|err| ApiError::from_service(err, &payload))?;

    Ok((StatusCode::CREATED, Json(survey_detail(&state, survey).await?)))
}

async fn get_survey(
    Path(survey_id): Path<String>,
    CurrentLeader(_auth): CurrentLeader,
    State(state): State<AppState>,
) -> Result<Json<SurveyDetailResponse>, ApiError> {
    let survey = fetch_survey(&state, &survey_id).await?;
    Ok(Json(survey_detail(&state, survey).await?))
}

async fn update_survey(
    Path(survey_id): Path<String>,
    CurrentLeader(auth): CurrentLeader,
    State(state): State<AppState>,
    Json(payload): Json<SurveyUpdate>,
) -> Result<Json<SurveyDetailResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::from_validation(e, &payload))?;
    let survey = fetch_survey(&state, &survey_id).await?;
    ensure_can_manage(&state, &auth, &survey).await?;

    let survey = survey_service::update_survey(&state, &auth.user, survey, &payload)
        .await
        .map_err(|err| ApiError::from_service(err, &payload))?;

    Ok(Json(survey_detail(&state, survey).await?))
}

async fn add_questions(
    Path(survey_id): Path<String>,
    CurrentLeader(auth): CurrentLeader,
    State(state): State<AppState>,
    Json(payload): Json<SurveyQuestionsAdd>,
) -> Result<(StatusCode, Json<Vec<QuestionResponse>>), ApiError> {
    let survey = fetch_survey(&state, &survey_id).await?;
    ensure_can_manage(&state, &auth, &survey).await?;

    if payload.questions.is_empty() && !payload.copy_template_questions {
        return Err(ApiError::BadRequest("No questions submitted".to_string()));
    }

    let questions = survey_service::add_questions(
        &state,
        &survey,
        &payload.questions,
        payload.copy_template_questions,
    )
    .await
    .map_err(|err| ApiError::from_service(err, &payload))?;

    Ok((StatusCode::CREATED, Json(questions.into_iter().map(QuestionResponse::from_db).collect())))
}

async fn add_respondent(
    Path(survey_id): Path<String>,
    CurrentLeader(auth): CurrentLeader,
    State(state): State<AppState>,
    Json(payload): Json<RespondentInput>,
) -> Result<(StatusCode, Json<RespondentResponse>), ApiError> {
    let survey = fetch_survey(&state, &survey_id).await?;
    ensure_can_manage(&state, &auth, &survey).await?;

    let respondent = survey_service::add_respondent(&state, &survey, &payload)
        .await
        .map_err(|err| ApiError::from_service(err, &payload))?;

    let row = repositories::respondents::list_for_survey(state.db(), &survey.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load respondents"))?
        .into_iter()
        .find(|row| row.id == respondent.id)
        .ok_or_else(|| ApiError::Internal("Respondent vanished after insert".to_string()))?;

    Ok((StatusCode::CREATED, Json(RespondentResponse::from_row(row, Vec::new()))))
}

async fn add_rater(
    Path(respondent_id): Path<String>,
    CurrentLeader(auth): CurrentLeader,
    State(state): State<AppState>,
    Json(payload): Json<RaterCreate>,
) -> Result<(StatusCode, Json<RaterCreatedResponse>), ApiError> {
    let respondent = fetch_respondent(&state, &respondent_id).await?;
    let survey = fetch_survey(&state, &respondent.survey_id).await?;
    ensure_can_manage(&state, &auth, &survey).await?;

    let (rater, invitation_token) = survey_service::add_rater(&state, &respondent, &payload)
        .await
        .map_err(|err| ApiError::from_service(err, &payload))?;

    Ok((
        StatusCode::CREATED,
        Json(RaterCreatedResponse { rater: RaterResponse::from_db(rater), invitation_token }),
    ))
}

/// Administrators manage every survey; leaders only the ones they created.
async fn ensure_can_manage(
    state: &AppState,
    auth: &Authenticated,
    survey: &Survey,
) -> Result<(), ApiError> {
    if auth.access.is_admin || survey.created_by.as_deref() == Some(auth.user.id.as_str()) {
        return Ok(());
    }
    Err(deny(state, &auth.session_id, "Only the survey author or an administrator can change it")
        .await)
}

async fn fetch_survey(state: &AppState, survey_id: &str) -> Result<Survey, ApiError> {
    repositories::surveys::find_by_id(state.db(), survey_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch survey"))?
        .ok_or_else(|| ApiError::NotFound("Survey not found".to_string()))
}

async fn fetch_respondent(state: &AppState, respondent_id: &str) -> Result<Respondent, ApiError> {
    repositories::respondents::find_by_id(state.db(), respondent_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch respondent"))?
        .ok_or_else(|| ApiError::NotFound("Respondent not found".to_string()))
}

async fn survey_detail(state: &AppState, survey: Survey) -> Result<SurveyDetailResponse, ApiError> {
    let template_name = repositories::templates::find_by_id(state.db(), &survey.template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch template"))?
        .map(|template| template.name)
        .unwrap_or_default();

    let mut questions =
        repositories::questions::list_for(state.db(), QuestionOwner::Survey(&survey.id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list survey questions"))?;
    if questions.is_empty() {
        questions =
            repositories::questions::list_for(state.db(), QuestionOwner::Template(&survey.template_id))
                .await
                .map_err(|e| ApiError::internal(e, "Failed to list template questions"))?;
    }

    let respondent_rows = repositories::respondents::list_for_survey(state.db(), &survey.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list respondents"))?;
    let mut rater_rows = repositories::raters::list_for_survey(state.db(), &survey.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list raters"))?;

    let respondents = respondent_rows
        .into_iter()
        .map(|row| {
            let (own, rest): (Vec<_>, Vec<_>) =
                rater_rows.drain(..).partition(|rater| rater.respondent_id == row.id);
            rater_rows = rest;
            let raters = own.into_iter().map(RaterResponse::from_row).collect();
            RespondentResponse::from_row(row, raters)
        })
        .collect();

    Ok(SurveyDetailResponse {
        survey: SurveyResponse::from_db(survey),
        template_name,
        questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
        respondents,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    use crate::db::types::{AnswerType, SurveyStatus};
    use crate::services::access::LEADER_ROLE;
    use crate::services::mail;
    use crate::test_support;

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn leader_creates_survey_with_respondent_and_report() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let leader = test_support::insert_user(db, "lena", "secret-password").await;
        test_support::grant_role(db, &leader.id, LEADER_ROLE).await;
        let employee = test_support::insert_user(db, "egor", "secret-password").await;
        let (template, _) =
            test_support::insert_template(db, "Base", &[("Q1", AnswerType::Scale)]).await;
        let token = test_support::bearer_token(&leader.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/surveys",
                Some(&token),
                Some(serde_json::json!({
                    "name": "Spring review",
                    "template_id": template.id,
                    "start_date": "2026-03-01",
                    "end_date": "2026-03-31",
                    "respondents": [{"user_id": employee.id}],
                })),
            ))
            .await
            .expect("create survey");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = test_support::read_json(response).await;
        assert_eq!(body["status"], "draft");
        assert_eq!(body["respondents"].as_array().map(Vec::len), Some(1));

        let reports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports").fetch_one(db).await.unwrap();
        assert_eq!(reports, 1);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn reversed_window_is_a_field_error() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let leader = test_support::insert_superuser(db, "root", "secret-password").await;
        let (template, _) =
            test_support::insert_template(db, "Base", &[("Q1", AnswerType::Scale)]).await;
        let token = test_support::bearer_token(&leader.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/surveys",
                Some(&token),
                Some(serde_json::json!({
                    "name": "Backwards",
                    "template_id": template.id,
                    "start_date": "2026-04-10",
                    "end_date": "2026-04-01",
                })),
            ))
            .await
            .expect("create survey");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = test_support::read_json(response).await;
        assert!(body["field_errors"]["end_date"].is_array());
        assert_eq!(body["input"]["name"], "Backwards");
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn blank_name_is_a_field_error() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let leader = test_support::insert_superuser(db, "root", "secret-password").await;
        let (template, _) =
            test_support::insert_template(db, "Base", &[("Q1", AnswerType::Scale)]).await;
        let token = test_support::bearer_token(&leader.id, ctx.state.settings());

        for name in ["", "   "] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::POST,
                    "/api/v1/surveys",
                    Some(&token),
                    Some(serde_json::json!({
                        "name": name,
                        "template_id": template.id,
                        "start_date": "2026-04-01",
                        "end_date": "2026-04-10",
                    })),
                ))
                .await
                .expect("create survey");

            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let body = test_support::read_json(response).await;
            assert!(body["field_errors"]["name"].is_array(), "{name:?}");
            assert_eq!(body["input"]["name"], name);
            assert_eq!(body["input"]["template_id"], template.id);
        }

        let surveys = crate::repositories::surveys::list_all(db).await.unwrap();
        assert!(surveys.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn activation_dispatches_one_invitation_per_respondent() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let leader = test_support::insert_superuser(db, "root", "secret-password").await;
        let first = test_support::insert_user(db, "first", "secret-password").await;
        let second = test_support::insert_user(db, "second", "secret-password").await;
        let (template, _) =
            test_support::insert_template(db, "Base", &[("Q1", AnswerType::Scale)]).await;
        let survey =
            test_support::insert_survey(db, &template, SurveyStatus::Draft, Some(leader.id.as_str())).await;
        test_support::insert_respondent(&ctx.state, &survey, &first, None).await;
        test_support::insert_respondent(&ctx.state, &survey, &second, None).await;
        let token = test_support::bearer_token(&leader.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/v1/surveys/{}", survey.id),
                Some(&token),
                Some(serde_json::json!({"status": "active"})),
            ))
            .await
            .expect("activate");
        assert_eq!(response.status(), StatusCode::OK);

        let mut sent = 0;
        for _ in 0..50 {
            sent = crate::repositories::email_outbox::count_for_survey(
                db,
                mail::SURVEY_INVITATION,
                &survey.id,
            )
            .await
            .expect("count invitations");
            if sent == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(sent, 2);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn other_leaders_cannot_edit_survey() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let author = test_support::insert_user(db, "author", "secret-password").await;
        let other = test_support::insert_user(db, "other", "secret-password").await;
        test_support::grant_role(db, &author.id, LEADER_ROLE).await;
        test_support::grant_role(db, &other.id, LEADER_ROLE).await;
        let (template, _) =
            test_support::insert_template(db, "Base", &[("Q1", AnswerType::Scale)]).await;
        let survey =
            test_support::insert_survey(db, &template, SurveyStatus::Draft, Some(author.id.as_str())).await;
        let token = test_support::bearer_token(&other.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/v1/surveys/{}", survey.id),
                Some(&token),
                Some(serde_json::json!({"name": "Hijacked"})),
            ))
            .await
            .expect("patch");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/api/v1/dashboard");
    }
}
