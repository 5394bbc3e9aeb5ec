use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::access::{NotificationQuery, NotificationResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:notification_id/read", post(mark_read))
}

async fn list_notifications(
    Query(params): Query<NotificationQuery>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications =
        repositories::notifications::list_for_user(state.db(), &auth.user.id, params.unread)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list notifications"))?;

    Ok(Json(notifications.into_iter().map(NotificationResponse::from_db).collect()))
}

async fn mark_read(
    Path(notification_id): Path<String>,
    CurrentUser(auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated =
        repositories::notifications::mark_read(state.db(), &auth.user.id, &notification_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update notification"))?;

    if !updated {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::core::time::primitive_now_utc;
    use crate::test_support;

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn read_notifications_drop_out_of_unread_list() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let user = test_support::insert_user(db, "reader", "secret-password").await;
        let other = test_support::insert_user(db, "other", "secret-password").await;
        let notification = crate::repositories::notifications::create(
            db,
            &user.id,
            "Survey starts tomorrow",
            None,
            primitive_now_utc(),
        )
        .await
        .unwrap();
        let token = test_support::bearer_token(&user.id, ctx.state.settings());
        let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
        let uri = format!("/api/v1/notifications/{}/read", notification.id);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::POST, &uri, Some(&other_token), None))
            .await
            .expect("foreign mark read");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::POST, &uri, Some(&token), None))
            .await
            .expect("mark read");
        assert_eq!(response.status(), StatusCode::OK);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/notifications?unread=true",
                Some(&token),
                None,
            ))
            .await
            .expect("list unread");
        let body = test_support::read_json(response).await;
        assert_eq!(body.as_array().map(Vec::len), Some(0));
    }
}
