use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{AccessRequest, Notification};
use crate::db::types::AccessRequestStatus;
use crate::repositories::access_requests::AccessRequestRow;
use crate::services::access_requests::Decision;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct AccessRequestCreate {
    #[serde(alias = "adminId")]
    pub(crate) admin_id: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "comment is too long"))]
    pub(crate) comment: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) decision: Decision,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AccessRequestQuery {
    #[serde(default)]
    pub(crate) status: Option<AccessRequestStatus>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessRequestResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) admin_id: String,
    pub(crate) comment: String,
    pub(crate) status: AccessRequestStatus,
    pub(crate) created_at: String,
    pub(crate) decided_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) requester_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) admin_username: Option<String>,
}

impl AccessRequestResponse {
    pub(crate) fn from_db(request: AccessRequest) -> Self {
        Self {
            id: request.id,
            user_id: request.user_id,
            admin_id: request.admin_id,
            comment: request.comment,
            status: request.status,
            created_at: format_primitive(request.created_at),
            decided_at: request.decided_at.map(format_primitive),
            requester_username: None,
            admin_username: None,
        }
    }

    pub(crate) fn from_row(row: AccessRequestRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            admin_id: row.admin_id,
            comment: row.comment,
            status: row.status,
            created_at: format_primitive(row.created_at),
            decided_at: row.decided_at.map(format_primitive),
            requester_username: Some(row.requester_username),
            admin_username: Some(row.admin_username),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NotificationResponse {
    pub(crate) id: String,
    pub(crate) message: String,
    pub(crate) link: Option<String>,
    pub(crate) is_read: bool,
    pub(crate) created_at: String,
}

impl NotificationResponse {
    pub(crate) fn from_db(notification: Notification) -> Self {
        Self {
            id: notification.id,
            message: notification.message,
            link: notification.link,
            is_read: notification.is_read,
            created_at: format_primitive(notification.created_at),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NotificationQuery {
    #[serde(default)]
    pub(crate) unread: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_request_parses_lowercase() {
        let payload: DecisionRequest = serde_json::from_str(r#"{"decision":"reject"}"#).unwrap();
        assert_eq!(payload.decision, Decision::Reject);
    }

    #[test]
    fn access_request_comment_is_optional() {
        let payload: AccessRequestCreate = serde_json::from_str(r#"{"adminId":"a1"}"#).unwrap();
        assert_eq!(payload.admin_id, "a1");
        assert!(payload.comment.is_empty());
        assert!(payload.validate().is_ok());
    }
}
