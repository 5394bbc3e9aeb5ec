use serde::Deserialize;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{AccessRequest, User};
use crate::db::types::AccessRequestStatus;
use crate::repositories;
use crate::services::access::{AccessFlags, LEADER_ROLE};
use crate::services::answer_forms::FormErrors;
use crate::services::{mail, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub(crate) fn status(self) -> AccessRequestStatus {
        match self {
            Self::Approve => AccessRequestStatus::Approved,
            Self::Reject => AccessRequestStatus::Rejected,
        }
    }

    fn requester_message(self) -> &'static str {
        match self {
            Self::Approve => "Your access request was approved. Leader access is now enabled.",
            Self::Reject => "Your access request was rejected.",
        }
    }
}

fn requests_path(state: &AppState, id: &str) -> String {
    format!("{}/access-requests/{id}", state.settings().api().api_v1_str)
}

async fn load_admin(state: &AppState, admin_id: &str) -> Result<Option<User>, ServiceError> {
    let Some(user) = repositories::users::find_by_id(state.db(), admin_id).await? else {
        return Ok(None);
    };
    let roles = repositories::roles::names_for_user(state.db(), &user.id).await?;
    let flags = AccessFlags::derive(user.is_superuser, &roles);
    Ok((flags.is_admin && user.is_active).then_some(user))
}

/// Files a request addressed to one administrator and tells them about it.
pub(crate) async fn submit(
    state: &AppState,
    requester: &User,
    admin_id: &str,
    comment: &str,
) -> Result<AccessRequest, ServiceError> {
    let Some(admin) = load_admin(state, admin_id.trim()).await? else {
        return Err(ServiceError::Invalid(FormErrors::field(
            "admin_id",
            "Select an administrator",
        )));
    };

    let now = primitive_now_utc();
    let id = Uuid::new_v4().to_string();
    let mut tx = state.db().begin().await?;

    let request = repositories::access_requests::create(
        &mut *tx,
        repositories::access_requests::CreateAccessRequest {
            id: &id,
            user_id: &requester.id,
            admin_id: &admin.id,
            comment: comment.trim(),
            created_at: now,
        },
    )
    .await?;

    let message = format!("New access request from {}", requester.full_name());
    repositories::notifications::create(
        &mut *tx,
        &admin.id,
        &message,
        Some(requests_path(state, &request.id).as_str()),
        now,
    )
    .await?;

    let email = mail::access_request(state.settings(), &request, requester, &admin);
    match mail::queue(&mut *tx, state.settings(), &email).await {
        Ok(()) | Err(mail::MailError::MissingRecipient(_)) => {}
        Err(mail::MailError::Storage(err)) => return Err(err.into()),
    }

    tx.commit().await?;

    tracing::info!(
        action = "access_requested",
        request_id = %request.id,
        requester_id = %requester.id,
        admin_id = %admin.id,
        "Access request submitted"
    );
    Ok(request)
}

/// Records the decision; approving grants the Leader role. Both outcomes notify the requester.
pub(crate) async fn decide(
    state: &AppState,
    request_id: &str,
    decision: Decision,
    decided_by: &User,
) -> Result<AccessRequest, ServiceError> {
    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;

    let Some(request) = repositories::access_requests::decide(
        &mut *tx,
        request_id,
        decision.status(),
        &decided_by.id,
        now,
    )
    .await?
    else {
        let exists = repositories::access_requests::find_by_id(state.db(), request_id).await?;
        return Err(match exists {
            Some(_) => ServiceError::Conflict("Access request was already decided".to_string()),
            None => ServiceError::NotFound("Access request not found"),
        });
    };

    if decision == Decision::Approve {
        let role = repositories::roles::ensure(&mut *tx, LEADER_ROLE, "").await?;
        repositories::roles::grant(&mut *tx, &request.user_id, &role.id).await?;
    }

    repositories::notifications::create(
        &mut *tx,
        &request.user_id,
        decision.requester_message(),
        None,
        now,
    )
    .await?;

    if let Some(requester) = repositories::users::find_by_id(state.db(), &request.user_id).await? {
        let email = mail::access_decision(&request, &requester);
        match mail::queue(&mut *tx, state.settings(), &email).await {
            Ok(()) | Err(mail::MailError::MissingRecipient(_)) => {}
            Err(mail::MailError::Storage(err)) => return Err(err.into()),
        }
    }

    tx.commit().await?;

    tracing::info!(
        action = "access_request_decided",
        request_id = %request.id,
        decision = ?decision,
        decided_by = %decided_by.id,
        "Access request decided"
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_map_to_statuses() {
        assert_eq!(Decision::Approve.status(), AccessRequestStatus::Approved);
        assert_eq!(Decision::Reject.status(), AccessRequestStatus::Rejected);
        let parsed: Decision = serde_json::from_str("\"approve\"").unwrap();
        assert_eq!(parsed, Decision::Approve);
        assert!(serde_json::from_str::<Decision>("\"maybe\"").is_err());
    }
}
