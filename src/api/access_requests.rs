use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::access::{
    AccessRequestCreate, AccessRequestQuery, AccessRequestResponse, DecisionRequest,
};
use crate::services::access_requests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route("/:request_id", get(get_request))
        .route("/:request_id/decision", post(decide_request))
}

async fn create_request(
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AccessRequestCreate>,
) -> Result<(StatusCode, Json<AccessRequestResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::from_validation(e, &payload))?;

    let request =
        access_requests::submit(&state, &auth.user, &payload.admin_id, &payload.comment)
            .await
            .map_err(|err| ApiError::from_service(err, &payload))?;

    Ok((StatusCode::CREATED, Json(AccessRequestResponse::from_db(request))))
}

async fn list_requests(
    Query(params): Query<AccessRequestQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<AccessRequestResponse>>, ApiError> {
    let rows = repositories::access_requests::list(state.db(), params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list access requests"))?;

    Ok(Json(rows.into_iter().map(AccessRequestResponse::from_row).collect()))
}

async fn get_request(
    Path(request_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<AccessRequestResponse>, ApiError> {
    let row = repositories::access_requests::find_by_id(state.db(), &request_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch access request"))?
        .ok_or_else(|| ApiError::NotFound("Access request not found".to_string()))?;

    Ok(Json(AccessRequestResponse::from_row(row)))
}

async fn decide_request(
    Path(request_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<AccessRequestResponse>, ApiError> {
    let request = access_requests::decide(&state, &request_id, payload.decision, &admin.user)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(AccessRequestResponse::from_db(request)))
}
