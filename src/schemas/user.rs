use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::services::access::AccessFlags;

#[derive(Debug, Deserialize)]
pub(crate) struct UserLogin {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct AdminUserCreate {
    #[validate(length(min = 1, max = 150, message = "username must not be empty"))]
    pub(crate) username: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 8, message = "password must be at least 8 characters long"))]
    pub(crate) password: String,
    #[serde(default)]
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: Option<String>,
    #[serde(default, alias = "firstName")]
    pub(crate) first_name: String,
    #[serde(default, alias = "lastName")]
    pub(crate) last_name: String,
    #[serde(default)]
    pub(crate) position: String,
    #[serde(default)]
    pub(crate) department: String,
    #[serde(default, alias = "isSuperuser")]
    pub(crate) is_superuser: bool,
    #[serde(default = "default_true", alias = "isActive")]
    pub(crate) is_active: bool,
    #[serde(default)]
    pub(crate) roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRolesUpdate {
    pub(crate) roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) full_name: String,
    pub(crate) position: String,
    pub(crate) department: String,
    pub(crate) is_superuser: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: crate::db::models::User) -> Self {
        let full_name = user.full_name();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            full_name,
            position: user.position,
            department: user.department,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CurrentUserResponse {
    #[serde(flatten)]
    pub(crate) user: UserResponse,
    pub(crate) roles: Vec<String>,
    pub(crate) access: AccessFlags,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_create_defaults_to_active_non_superuser() {
        let payload: AdminUserCreate =
            serde_json::from_str(r#"{"username":"ivan","password":"long-enough"}"#).unwrap();
        assert!(payload.is_active);
        assert!(!payload.is_superuser);
        assert!(payload.roles.is_empty());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn admin_create_rejects_short_password_and_bad_email() {
        let payload: AdminUserCreate = serde_json::from_str(
            r#"{"username":"ivan","password":"short","email":"not-an-email"}"#,
        )
        .unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("email"));
    }
}
