use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::access::{ADMIN_ROLE, EMPLOYEE_ROLE, LEADER_ROLE, MANAGER_ROLE};

const DEFAULT_ROLES: [(&str, &str); 4] = [
    (ADMIN_ROLE, "Full access to templates, surveys and reports"),
    (LEADER_ROLE, "Creates surveys and reviews team results"),
    (MANAGER_ROLE, "Reviews reports of managed respondents"),
    (EMPLOYEE_ROLE, "Takes part in surveys as respondent or rater"),
];

pub(crate) async fn ensure_roles(state: &AppState) -> anyhow::Result<()> {
    for (name, description) in DEFAULT_ROLES {
        repositories::roles::ensure(state.db(), name, description).await?;
    }
    tracing::debug!(count = DEFAULT_ROLES.len(), "Default roles ensured");
    Ok(())
}

pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = &admin.first_superuser_username;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_username(state.db(), username).await? {
        let verified =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);
        let email_matches = admin.first_superuser_email.is_empty()
            || user.email == admin.first_superuser_email;

        if verified && email_matches && user.is_superuser && user.is_active {
            tracing::info!("Default superuser already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            user.hashed_password.clone()
        } else {
            security::hash_password(&admin.first_superuser_password)?
        };
        let email = if admin.first_superuser_email.is_empty() {
            user.email.clone()
        } else {
            admin.first_superuser_email.clone()
        };

        repositories::users::update_account(
            state.db(),
            &user.id,
            repositories::users::UpdateAccount {
                hashed_password,
                email,
                is_superuser: true,
                is_active: true,
                updated_at: now,
            },
        )
        .await?;

        tracing::info!(username = %username, "Updated default superuser");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;
    let user_id = Uuid::new_v4().to_string();
    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &user_id,
            username,
            email: &admin.first_superuser_email,
            first_name: "Super",
            last_name: "Admin",
            position: "",
            department: "",
            hashed_password,
            is_superuser: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    let admin_role = repositories::roles::ensure(state.db(), ADMIN_ROLE, DEFAULT_ROLES[0].1).await?;
    repositories::roles::grant(state.db(), &user_id, &admin_role.id).await?;

    tracing::info!(username = %username, "Created default superuser");
    Ok(())
}
