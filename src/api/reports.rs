use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{deny, Authenticated, CurrentUser};
use crate::core::state::AppState;
use crate::db::models::Respondent;
use crate::repositories;
use crate::schemas::report::ReportResponse;
use crate::services::reports;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route(
        "/respondents/:respondent_id/report",
        get(get_report).post(regenerate_report),
    )
}

/// Reports are visible to administrators, leaders and the respondent's manager.
async fn authorized_respondent(
    state: &AppState,
    auth: &Authenticated,
    respondent_id: &str,
) -> Result<Respondent, ApiError> {
    let respondent = repositories::respondents::find_by_id(state.db(), respondent_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch respondent"))?
        .ok_or_else(|| ApiError::NotFound("Respondent not found".to_string()))?;

    let is_manager = respondent.manager_id.as_deref() == Some(auth.user.id.as_str());
    if !auth.access.has_admin_access && !is_manager {
        return Err(deny(state, &auth.session_id, "You cannot view this report").await);
    }
    Ok(respondent)
}

async fn get_report(
    Path(respondent_id): Path<String>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ReportResponse>, ApiError> {
    let respondent = authorized_respondent(&state, &auth, &respondent_id).await?;

    let report = repositories::reports::find_for_respondent(state.db(), &respondent.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch report"))?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

    Ok(Json(ReportResponse::from_db(report, &respondent)))
}

async fn regenerate_report(
    Path(respondent_id): Path<String>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ReportResponse>, ApiError> {
    let respondent = authorized_respondent(&state, &auth, &respondent_id).await?;

    let report = reports::regenerate(state.db(), &respondent.id, Some(auth.user.id.as_str()))
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to regenerate report"))?
        .ok_or_else(|| ApiError::NotFound("Respondent not found".to_string()))?;

    Ok(Json(ReportResponse::from_db(report, &respondent)))
}

#[cfg(test)]
mod tests {
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    use crate::db::types::{AnswerType, RelationshipType, SurveyStatus};
    use crate::test_support;

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn manager_regenerates_report_with_mixed_answers() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let manager = test_support::insert_user(db, "boss", "secret-password").await;
        let employee = test_support::insert_user(db, "worker", "secret-password").await;
        let peer = test_support::insert_user(db, "peer", "secret-password").await;
        let (template, questions) = test_support::insert_template(
            db,
            "Mixed",
            &[
                ("Q1", AnswerType::Scale),
                ("Q2", AnswerType::Scale),
                ("Q3", AnswerType::Text),
            ],
        )
        .await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent =
            test_support::insert_respondent(&ctx.state, &survey, &employee, Some(manager.id.as_str()))
                .await;
        let rater = test_support::insert_rater(db, &respondent, &peer, RelationshipType::Peer).await;

        for (question, value, text) in [
            (&questions[0], Some(3.0), None),
            (&questions[1], Some(5.0), None),
            (&questions[2], None, Some("Listens well")),
        ] {
            sqlx::query(
                "INSERT INTO responses (id, rater_id, question_id, answer_value, answer_text, answered_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, NOW(), NOW())",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&rater.id)
            .bind(&question.id)
            .bind(value)
            .bind(text)
            .execute(db)
            .await
            .unwrap();
        }

        let token = test_support::bearer_token(&manager.id, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/respondents/{}/report", respondent.id),
                Some(&token),
                None,
            ))
            .await
            .expect("regenerate");

        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["data"]["average_score"], 4.0);
        assert_eq!(body["data"]["details"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["data"]["answered_questions"], 3);
        assert_eq!(body["data"]["scored_questions"], 2);
        assert_eq!(body["generated_by"], manager.id);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn unrelated_employee_is_redirected() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let employee = test_support::insert_user(db, "worker", "secret-password").await;
        let stranger = test_support::insert_user(db, "stranger", "secret-password").await;
        let (template, _) =
            test_support::insert_template(db, "Base", &[("Q1", AnswerType::Scale)]).await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent = test_support::insert_respondent(&ctx.state, &survey, &employee, None).await;
        let token = test_support::bearer_token(&stranger.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/respondents/{}/report", respondent.id),
                Some(&token),
                None,
            ))
            .await
            .expect("get report");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/api/v1/dashboard");
    }
}
