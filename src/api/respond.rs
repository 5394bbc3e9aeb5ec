use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{dashboard_path, Authenticated, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::FlashLevel;
use crate::repositories;
use crate::schemas::respond::{CompletionResponse, WizardQuery, WizardSubmit};
use crate::services::rater_tokens::hash_rater_token;
use crate::services::wizard::{self, StepOutcome, SubmitOutcome, WizardError};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/respond/:rater_id", get(show_step).post(submit_step))
        .route("/respond/:rater_id/complete", get(complete))
        .route("/invitations/:token", get(accept_invitation))
}

fn redirect(location: String) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
}

/// Unexpected wizard failures send the rater back to the dashboard with a message.
async fn wizard_failure(state: &AppState, auth: &Authenticated, err: WizardError) -> ApiError {
    match err {
        WizardError::RaterNotFound => ApiError::NotFound("Rater not found".to_string()),
        other => {
            tracing::error!(
                user_id = %auth.user.id,
                error = %other,
                "Survey wizard failed"
            );
            let message = "Internal error occurred";
            if let Err(err) = repositories::flash::push(
                state.db(),
                &auth.session_id,
                FlashLevel::Error,
                message,
                primitive_now_utc(),
            )
            .await
            {
                tracing::warn!(error = %err, "Failed to store flash message");
            }
            ApiError::see_other(dashboard_path(state), message)
        }
    }
}

async fn show_step(
    Path(rater_id): Path<String>,
    Query(query): Query<WizardQuery>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    match wizard::show(&state, &auth.user, &auth.session_id, &rater_id, query.position()).await {
        Ok(StepOutcome::Show(step)) => Ok(Json(*step).into_response()),
        Ok(StepOutcome::Redirect(location)) => Ok(redirect(location)),
        Err(err) => Err(wizard_failure(&state, &auth, err).await),
    }
}

async fn submit_step(
    Path(rater_id): Path<String>,
    Query(query): Query<WizardQuery>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<WizardSubmit>,
) -> Result<Response, ApiError> {
    let outcome = wizard::submit(
        &state,
        &auth.user,
        &auth.session_id,
        &rater_id,
        query.position(),
        payload.direction,
        &payload.answer,
    )
    .await;

    match outcome {
        Ok(SubmitOutcome::Redirect(location)) => Ok(redirect(location)),
        Ok(SubmitOutcome::Invalid(errors)) => Err(ApiError::invalid(errors, &payload)),
        Err(err) => Err(wizard_failure(&state, &auth, err).await),
    }
}

async fn complete(
    Path(rater_id): Path<String>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CompletionResponse>, ApiError> {
    match wizard::completion(&state, &auth.user, &rater_id).await {
        Ok(done) => Ok(Json(done)),
        Err(err) => Err(wizard_failure(&state, &auth, err).await),
    }
}

/// Opens the wizard behind an emailed invitation link; tokens are only valid for their rater.
async fn accept_invitation(
    Path(token): Path<String>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let rater = repositories::raters::find_by_token_hash(state.db(), &hash_rater_token(&token))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up invitation"))?
        .filter(|rater| rater.user_id == auth.user.id)
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    Ok(redirect(wizard::respond_path(&state, &rater.id, 0)))
}

#[cfg(test)]
mod tests {
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    use crate::db::types::{AnswerType, RaterStatus, RelationshipType, SurveyStatus};
    use crate::test_support;

    async fn post_step(
        app: &axum::Router,
        token: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> axum::response::Response {
        app.clone()
            .oneshot(test_support::json_request(Method::POST, uri, Some(token), Some(body)))
            .await
            .expect("submit step")
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn back_and_forward_navigation_updates_one_response() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let respondent_user = test_support::insert_user(db, "target", "secret-password").await;
        let rater_user = test_support::insert_user(db, "peer", "secret-password").await;
        let (template, questions) = test_support::insert_template(
            db,
            "Three steps",
            &[("Q1", AnswerType::Scale), ("Q2", AnswerType::Scale), ("Q3", AnswerType::Scale)],
        )
        .await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent =
            test_support::insert_respondent(&ctx.state, &survey, &respondent_user, None).await;
        let rater =
            test_support::insert_rater(db, &respondent, &rater_user, RelationshipType::Peer).await;
        let token = test_support::bearer_token(&rater_user.id, ctx.state.settings());
        let base = format!("/api/v1/respond/{}", rater.id);

        let response =
            post_step(&ctx.app, &token, &format!("{base}?q=0"), serde_json::json!({"answer_value": 3})).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], format!("{base}?q=1"));

        let response =
            post_step(&ctx.app, &token, &format!("{base}?q=1"), serde_json::json!({"answer_value": 2})).await;
        assert_eq!(response.headers()[header::LOCATION], format!("{base}?q=2"));

        let response =
            post_step(&ctx.app, &token, &format!("{base}?q=2"), serde_json::json!({"direction": "back"})).await;
        assert_eq!(response.headers()[header::LOCATION], format!("{base}?q=1"));

        let response =
            post_step(&ctx.app, &token, &format!("{base}?q=1"), serde_json::json!({"answer_value": 4})).await;
        assert_eq!(response.headers()[header::LOCATION], format!("{base}?q=2"));

        let values: Vec<f64> = sqlx::query_scalar(
            "SELECT answer_value FROM responses WHERE rater_id = $1 AND question_id = $2",
        )
        .bind(&rater.id)
        .bind(&questions[1].id)
        .fetch_all(db)
        .await
        .unwrap();
        assert_eq!(values, vec![4.0]);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, &base, Some(&token), None))
            .await
            .expect("show step");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["index"], 2);
        assert_eq!(body["is_last"], true);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn final_answer_completes_rater_and_refreshes_report() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let respondent_user = test_support::insert_user(db, "target", "secret-password").await;
        let rater_user = test_support::insert_user(db, "peer", "secret-password").await;
        let (template, _) =
            test_support::insert_template(db, "Single", &[("Q1", AnswerType::Scale)]).await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent =
            test_support::insert_respondent(&ctx.state, &survey, &respondent_user, None).await;
        let rater =
            test_support::insert_rater(db, &respondent, &rater_user, RelationshipType::Peer).await;
        let token = test_support::bearer_token(&rater_user.id, ctx.state.settings());
        let base = format!("/api/v1/respond/{}", rater.id);

        let response =
            post_step(&ctx.app, &token, &base, serde_json::json!({"answer_value": 5})).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], format!("{base}/complete"));

        let stored = crate::repositories::raters::find_by_id(db, &rater.id)
            .await
            .unwrap()
            .expect("rater");
        assert_eq!(stored.status, RaterStatus::Completed);
        assert!(stored.completed_at.is_some());

        let report = crate::repositories::reports::find_for_respondent(db, &respondent.id)
            .await
            .unwrap()
            .expect("report");
        assert_eq!(report.report_data.0["average_score"], 5.0);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, &base, Some(&token), None))
            .await
            .expect("show after completion");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], format!("{base}/complete"));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn invalid_answer_echoes_input() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let respondent_user = test_support::insert_user(db, "target", "secret-password").await;
        let rater_user = test_support::insert_user(db, "peer", "secret-password").await;
        let (template, _) =
            test_support::insert_template(db, "Single", &[("Q1", AnswerType::Scale)]).await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent =
            test_support::insert_respondent(&ctx.state, &survey, &respondent_user, None).await;
        let rater =
            test_support::insert_rater(db, &respondent, &rater_user, RelationshipType::Peer).await;
        let token = test_support::bearer_token(&rater_user.id, ctx.state.settings());

        let response = post_step(
            &ctx.app,
            &token,
            &format!("/api/v1/respond/{}", rater.id),
            serde_json::json!({"answer_value": 9}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = test_support::read_json(response).await;
        assert!(body["field_errors"]["answer_value"].is_array());
        assert_eq!(body["input"]["answer_value"], 9.0);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn malformed_index_is_clamped_or_ignored() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let respondent_user = test_support::insert_user(db, "target", "secret-password").await;
        let rater_user = test_support::insert_user(db, "peer", "secret-password").await;
        let (template, _) = test_support::insert_template(
            db,
            "Two steps",
            &[("Q1", AnswerType::Scale), ("Q2", AnswerType::Scale)],
        )
        .await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent =
            test_support::insert_respondent(&ctx.state, &survey, &respondent_user, None).await;
        let rater =
            test_support::insert_rater(db, &respondent, &rater_user, RelationshipType::Peer).await;
        let token = test_support::bearer_token(&rater_user.id, ctx.state.settings());

        for (query, expected) in [("99999999999999999999", 1), ("abc", 0)] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::GET,
                    &format!("/api/v1/respond/{}?q={query}", rater.id),
                    Some(&token),
                    None,
                ))
                .await
                .expect("show step");
            assert_eq!(response.status(), StatusCode::OK, "q={query}");
            let body = test_support::read_json(response).await;
            assert_eq!(body["index"], expected, "q={query}");
        }
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn stored_index_records_last_step_without_steering() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let respondent_user = test_support::insert_user(db, "target", "secret-password").await;
        let rater_user = test_support::insert_user(db, "peer", "secret-password").await;
        let (template, _) = test_support::insert_template(
            db,
            "Two steps",
            &[("Q1", AnswerType::Scale), ("Q2", AnswerType::Scale)],
        )
        .await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent =
            test_support::insert_respondent(&ctx.state, &survey, &respondent_user, None).await;
        let rater =
            test_support::insert_rater(db, &respondent, &rater_user, RelationshipType::Peer).await;
        let token = test_support::bearer_token(&rater_user.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/respond/{}?q=1", rater.id),
                Some(&token),
                None,
            ))
            .await
            .expect("show second step");
        assert_eq!(response.status(), StatusCode::OK);

        let stored: i32 =
            sqlx::query_scalar("SELECT current_index FROM wizard_sessions WHERE survey_id = $1")
                .bind(&survey.id)
                .fetch_one(db)
                .await
                .unwrap();
        assert_eq!(stored, 1);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/respond/{}", rater.id),
                Some(&token),
                None,
            ))
            .await
            .expect("show default step");
        let body = test_support::read_json(response).await;
        assert_eq!(body["index"], 0);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn foreign_rater_is_not_found() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let respondent_user = test_support::insert_user(db, "target", "secret-password").await;
        let rater_user = test_support::insert_user(db, "peer", "secret-password").await;
        let stranger = test_support::insert_user(db, "stranger", "secret-password").await;
        let (template, _) =
            test_support::insert_template(db, "Single", &[("Q1", AnswerType::Scale)]).await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent =
            test_support::insert_respondent(&ctx.state, &survey, &respondent_user, None).await;
        let rater =
            test_support::insert_rater(db, &respondent, &rater_user, RelationshipType::Peer).await;
        let token = test_support::bearer_token(&stranger.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/respond/{}", rater.id),
                Some(&token),
                None,
            ))
            .await
            .expect("show step");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
