use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::auth::current_user_response;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::today_utc;
use crate::repositories;
use crate::schemas::dashboard::{
    DashboardAssignment, DashboardQuery, DashboardResponse, DashboardSort, DashboardSurvey,
    FlashResponse,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

async fn dashboard(
    Query(params): Query<DashboardQuery>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let today = today_utc();
    let category = params.category.as_deref().map(str::trim).filter(|value| !value.is_empty());

    let surveys = repositories::surveys::list_active_for_respondent(state.db(), &auth.user.id, today)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list active surveys"))?;

    let mut all_categories = Vec::new();
    let mut entries = Vec::with_capacity(surveys.len());
    for survey in surveys {
        let categories =
            repositories::competencies::categories_for_template(state.db(), &survey.template_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load competency categories"))?;
        all_categories.extend(categories.iter().cloned());

        if let Some(category) = category {
            if !categories.iter().any(|value| value == category) {
                continue;
            }
        }

        let total = repositories::questions::ordered_ids_for_survey(
            state.db(),
            &survey.id,
            &survey.template_id,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count survey questions"))?
        .len() as i64;
        let answered =
            repositories::responses::count_by_rater_user(state.db(), &auth.user.id, &survey.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count answers"))?;

        entries.push(DashboardSurvey::new(survey, total, answered, categories));
    }

    if params.sort == DashboardSort::Progress {
        // Stable sort keeps the deadline order among equal progress values.
        entries.sort_by(|left, right| right.progress.cmp(&left.progress));
    }

    all_categories.sort();
    all_categories.dedup();

    let assignments = repositories::raters::list_open_for_user(state.db(), &auth.user.id, today)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list rater assignments"))?;

    let messages = repositories::flash::take(state.db(), &auth.session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load messages"))?;

    Ok(Json(DashboardResponse {
        user: current_user_response(auth),
        surveys: entries,
        assignments: assignments.into_iter().map(DashboardAssignment::from_row).collect(),
        categories: all_categories,
        messages: messages.into_iter().map(FlashResponse::from_db).collect(),
    }))
}
