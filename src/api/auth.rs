use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{Authenticated, CurrentUser};
use crate::core::security;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::auth::TokenResponse;
use crate::schemas::user::{CurrentUserResponse, UserLogin, UserResponse};
use crate::services::access::AccessFlags;

const INVALID_CREDENTIALS: &str = "Incorrect username or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/login", post(login)).route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Username and password are required".to_string()));
    }

    let security_settings = state.settings().security();
    let rate_key = format!("rl:login:{}", username.to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(
            &rate_key,
            security_settings.login_rate_limit,
            security_settings.login_rate_window_seconds,
        )
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = fetch_user_by_username(&state, username).await?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;

    if !verified {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let session_id = security::new_session_id();
    let token = security::create_access_token(&user.id, &session_id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let roles = repositories::roles::names_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user roles"))?;
    let access = AccessFlags::derive(user.is_superuser, &roles);

    tracing::info!(action = "login", user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
        expires_in: security_settings.access_token_expire_minutes * 60,
        user: CurrentUserResponse { user: UserResponse::from_db(user), roles, access },
    }))
}

async fn me(CurrentUser(auth): CurrentUser) -> Json<CurrentUserResponse> {
    Json(current_user_response(auth))
}

pub(crate) fn current_user_response(auth: Authenticated) -> CurrentUserResponse {
    CurrentUserResponse { user: UserResponse::from_db(auth.user), roles: auth.roles, access: auth.access }
}

async fn fetch_user_by_username(state: &AppState, username: &str) -> Result<User, ApiError> {
    repositories::users::find_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::services::access::ADMIN_ROLE;
    use crate::test_support;

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn login_returns_token_with_role_flags() {
        let ctx = test_support::setup_test_context().await;
        let user = test_support::insert_user(ctx.state.db(), "olga", "secret-password").await;
        test_support::grant_role(ctx.state.db(), &user.id, ADMIN_ROLE).await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(serde_json::json!({"username": "olga", "password": "secret-password"})),
            ))
            .await
            .expect("login");

        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["username"], "olga");
        assert_eq!(body["user"]["access"]["is_admin"], true);
        assert_eq!(body["user"]["access"]["is_employee"], false);

        let token = body["access_token"].as_str().expect("token").to_string();
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
            .await
            .expect("me");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["roles"], serde_json::json!([ADMIN_ROLE]));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn login_rejects_wrong_password() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_user(ctx.state.db(), "pavel", "secret-password").await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(serde_json::json!({"username": "pavel", "password": "wrong-password"})),
            ))
            .await
            .expect("login");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
