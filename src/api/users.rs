use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::auth::current_user_response;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user::{AdminUserCreate, CurrentUserResponse, UserResponse, UserRolesUpdate};
use crate::services::access::AccessFlags;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/admins", get(list_admins))
        .route("/", get(list_users).post(create_user))
        .route("/:user_id", get(get_user))
        .route("/:user_id/roles", put(update_roles))
}

async fn me(CurrentUser(auth): CurrentUser) -> Json<CurrentUserResponse> {
    Json(current_user_response(auth))
}

/// Active administrators an access request can be addressed to.
async fn list_admins(
    CurrentUser(_auth): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let admins = repositories::users::list_admins(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list administrators"))?;
    Ok(Json(admins.into_iter().map(UserResponse::from_db).collect()))
}

async fn list_users(
    Query(params): Query<PageQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let (skip, limit) = params.bounds();

    let users = repositories::users::list(state.db(), skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;
    let total_count = repositories::users::count(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count users"))?;

    Ok(Json(PaginatedResponse {
        items: users.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_user(
    Path(user_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let Some(user) = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
    else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    let roles = repositories::roles::names_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user roles"))?;
    let access = AccessFlags::derive(user.is_superuser, &roles);

    Ok(Json(CurrentUserResponse { user: UserResponse::from_db(user), roles, access }))
}

async fn create_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserCreate>,
) -> Result<(StatusCode, Json<CurrentUserResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::from_validation(e, &payload))?;

    let username = payload.username.trim();
    let existing = repositories::users::exists_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("User with this username already exists".to_string()));
    }

    let role_ids = resolve_roles(&state, &payload.roles).await?;

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;
    let now = primitive_now_utc();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let user = repositories::users::create(
        &mut *tx,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            email: payload.email.as_deref().map(str::trim).unwrap_or(""),
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            position: payload.position.trim(),
            department: payload.department.trim(),
            hashed_password,
            is_superuser: payload.is_superuser,
            is_active: payload.is_active,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "User with this username already exists", "Failed to create user"))?;

    for (role_id, _) in &role_ids {
        repositories::roles::grant(&mut *tx, &user.id, role_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to grant role"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit user"))?;

    tracing::info!(
        action = "user_created",
        user_id = %user.id,
        created_by = %admin.user.id,
        "User created"
    );

    let roles: Vec<String> = role_ids.into_iter().map(|(_, name)| name).collect();
    let access = AccessFlags::derive(user.is_superuser, &roles);
    Ok((
        StatusCode::CREATED,
        Json(CurrentUserResponse { user: UserResponse::from_db(user), roles, access }),
    ))
}

/// Replaces the user's role set.
async fn update_roles(
    Path(user_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<UserRolesUpdate>,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let Some(user) = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
    else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    let role_ids = resolve_roles(&state, &payload.roles).await?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    repositories::roles::clear_for_user(&mut *tx, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to clear roles"))?;
    for (role_id, _) in &role_ids {
        repositories::roles::grant(&mut *tx, &user.id, role_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to grant role"))?;
    }
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit roles"))?;

    let roles: Vec<String> = role_ids.into_iter().map(|(_, name)| name).collect();
    tracing::info!(
        action = "roles_updated",
        user_id = %user.id,
        updated_by = %admin.user.id,
        roles = ?roles,
        "User roles updated"
    );

    let access = AccessFlags::derive(user.is_superuser, &roles);
    Ok(Json(CurrentUserResponse { user: UserResponse::from_db(user), roles, access }))
}

/// Looks up `(id, name)` for every requested role; unknown names are a 400.
async fn resolve_roles(state: &AppState, names: &[String]) -> Result<Vec<(String, String)>, ApiError> {
    let mut wanted: Vec<String> = names.iter().map(|name| name.trim().to_string()).collect();
    wanted.retain(|name| !name.is_empty());
    wanted.sort();
    wanted.dedup();

    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let found = repositories::roles::find_ids_by_names(state.db(), &wanted)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load roles"))?;

    let missing: Vec<&str> = wanted
        .iter()
        .filter(|name| !found.iter().any(|(_, found_name)| found_name == *name))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!("Unknown roles: {}", missing.join(", "))));
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    use crate::services::access::{ADMIN_ROLE, LEADER_ROLE};
    use crate::test_support;

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn admin_creates_user_with_roles() {
        let ctx = test_support::setup_test_context().await;
        let admin = test_support::insert_superuser(ctx.state.db(), "root", "secret-password").await;
        test_support::grant_role(ctx.state.db(), &admin.id, LEADER_ROLE).await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/users",
                Some(&token),
                Some(serde_json::json!({
                    "username": "maria",
                    "password": "long-enough",
                    "first_name": "Maria",
                    "roles": [LEADER_ROLE],
                })),
            ))
            .await
            .expect("create user");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = test_support::read_json(response).await;
        assert_eq!(body["username"], "maria");
        assert_eq!(body["access"]["is_leader"], true);

        let duplicate = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/users",
                Some(&token),
                Some(serde_json::json!({"username": "maria", "password": "long-enough"})),
            ))
            .await
            .expect("duplicate");
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn employee_is_redirected_from_user_list() {
        let ctx = test_support::setup_test_context().await;
        let employee = test_support::insert_user(ctx.state.db(), "ivan", "secret-password").await;
        let token = test_support::bearer_token(&employee.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/users", Some(&token), None))
            .await
            .expect("list users");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/api/v1/dashboard");

        let dashboard = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/dashboard", Some(&token), None))
            .await
            .expect("dashboard");
        let body = test_support::read_json(dashboard).await;
        assert_eq!(body["messages"][0]["message"], "Administrator access required");
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn unknown_role_names_are_rejected() {
        let ctx = test_support::setup_test_context().await;
        let admin = test_support::insert_user(ctx.state.db(), "boss", "secret-password").await;
        test_support::grant_role(ctx.state.db(), &admin.id, ADMIN_ROLE).await;
        let target = test_support::insert_user(ctx.state.db(), "worker", "secret-password").await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/v1/users/{}/roles", target.id),
                Some(&token),
                Some(serde_json::json!({"roles": ["Wizard"]})),
            ))
            .await
            .expect("update roles");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
