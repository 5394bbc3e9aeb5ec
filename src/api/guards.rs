use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::time::primitive_now_utc;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::db::types::FlashLevel;
use crate::repositories;
use crate::services::access::AccessFlags;

/// The requesting account, its login session and the role flags derived for it.
#[derive(Debug, Clone)]
pub(crate) struct Authenticated {
    pub(crate) user: User,
    pub(crate) session_id: String,
    pub(crate) roles: Vec<String>,
    pub(crate) access: AccessFlags,
}

pub(crate) struct CurrentUser(pub(crate) Authenticated);
pub(crate) struct CurrentAdmin(pub(crate) Authenticated);
pub(crate) struct CurrentLeader(pub(crate) Authenticated);

pub(crate) fn dashboard_path(state: &AppState) -> String {
    format!("{}/dashboard", state.settings().api().api_v1_str)
}

/// Queues a flash message for the session and redirects it to the dashboard.
pub(crate) async fn deny(state: &AppState, session_id: &str, message: &str) -> ApiError {
    if let Err(err) =
        repositories::flash::push(state.db(), session_id, FlashLevel::Error, message, primitive_now_utc())
            .await
    {
        tracing::warn!(error = %err, "Failed to store flash message");
    }
    ApiError::see_other(dashboard_path(state), message)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        let roles = repositories::roles::names_for_user(app_state.db(), &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user roles"))?;
        let access = AccessFlags::derive(user.is_superuser, &roles);

        Ok(CurrentUser(Authenticated {
            user,
            session_id: claims.session_id().to_string(),
            roles,
            access,
        }))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(auth) = CurrentUser::from_request_parts(parts, state).await?;

        if auth.access.is_admin {
            Ok(CurrentAdmin(auth))
        } else {
            Err(deny(state, &auth.session_id, "Administrator access required").await)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentLeader {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(auth) = CurrentUser::from_request_parts(parts, state).await?;

        if auth.access.has_admin_access {
            Ok(CurrentLeader(auth))
        } else {
            Err(deny(state, &auth.session_id, "Leader or administrator access required").await)
        }
    }
}
