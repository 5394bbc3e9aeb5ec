use thiserror::Error;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::time::{format_date, primitive_now_utc};
use crate::db::models::{AccessRequest, Survey, User};
use crate::db::types::AccessRequestStatus;

pub(crate) const SURVEY_INVITATION: &str = "survey_invitation";
pub(crate) const RATER_INVITATION: &str = "rater_invitation";
pub(crate) const ACCESS_REQUEST: &str = "access_request";
pub(crate) const ACCESS_DECISION: &str = "access_decision";

#[derive(Debug, Error)]
pub(crate) enum MailError {
    #[error("recipient {0} has no email address")]
    MissingRecipient(String),
    #[error("failed to queue email: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OutgoingEmail {
    pub(crate) kind: &'static str,
    pub(crate) recipient: String,
    pub(crate) subject: String,
    pub(crate) body: String,
    pub(crate) survey_id: Option<String>,
}

pub(crate) fn survey_invitation(settings: &Settings, survey: &Survey, user: &User) -> OutgoingEmail {
    let body = format!(
        "Hello, {name}!\n\n\
         You are invited to take part in the survey \"{survey}\".\n\
         The survey is open from {start} to {end}.\n\n\
         Open your dashboard to get started: {link}\n",
        name = user.full_name(),
        survey = survey.name,
        start = format_date(survey.start_date),
        end = format_date(survey.end_date),
        link = settings.mail().link(&format!("{}/dashboard", settings.api().api_v1_str)),
    );

    OutgoingEmail {
        kind: SURVEY_INVITATION,
        recipient: user.email.clone(),
        subject: format!("Invitation to survey: {}", survey.name),
        body,
        survey_id: Some(survey.id.clone()),
    }
}

pub(crate) fn rater_invitation(
    settings: &Settings,
    survey: &Survey,
    rater_user: &User,
    respondent_name: &str,
    token: &str,
) -> OutgoingEmail {
    let link = settings
        .mail()
        .link(&format!("{}/invitations/{token}", settings.api().api_v1_str));
    let body = format!(
        "Hello, {name}!\n\n\
         You have been asked to give feedback about {respondent} in the survey \"{survey}\".\n\
         Please answer before {end}.\n\n\
         {link}\n",
        name = rater_user.full_name(),
        respondent = respondent_name,
        survey = survey.name,
        end = format_date(survey.end_date),
    );

    OutgoingEmail {
        kind: RATER_INVITATION,
        recipient: rater_user.email.clone(),
        subject: format!("Feedback request: {}", survey.name),
        body,
        survey_id: Some(survey.id.clone()),
    }
}

pub(crate) fn access_request(
    settings: &Settings,
    request: &AccessRequest,
    requester: &User,
    admin: &User,
) -> OutgoingEmail {
    let link = settings
        .mail()
        .link(&format!("{}/access-requests/{}", settings.api().api_v1_str, request.id));
    let comment = if request.comment.trim().is_empty() { "-" } else { request.comment.trim() };
    let body = format!(
        "Hello, {admin}!\n\n\
         {requester} ({username}) asks for extended access.\n\
         Comment: {comment}\n\n\
         Review the request: {link}\n",
        admin = admin.full_name(),
        requester = requester.full_name(),
        username = requester.username,
    );

    OutgoingEmail {
        kind: ACCESS_REQUEST,
        recipient: admin.email.clone(),
        subject: format!("Access request from {}", requester.username),
        body,
        survey_id: None,
    }
}

pub(crate) fn access_decision(request: &AccessRequest, requester: &User) -> OutgoingEmail {
    let outcome = match request.status {
        AccessRequestStatus::Approved => "approved. You now have leader access",
        AccessRequestStatus::Rejected => "rejected",
        AccessRequestStatus::Pending => "still pending",
    };

    OutgoingEmail {
        kind: ACCESS_DECISION,
        recipient: requester.email.clone(),
        subject: "Your access request was reviewed".to_string(),
        body: format!("Hello, {}!\n\nYour access request was {outcome}.\n", requester.full_name()),
        survey_id: None,
    }
}

/// Writes the message to the outbox; delivery happens outside this service.
pub(crate) async fn queue(
    executor: impl sqlx::PgExecutor<'_>,
    settings: &Settings,
    email: &OutgoingEmail,
) -> Result<(), MailError> {
    if email.recipient.trim().is_empty() {
        return Err(MailError::MissingRecipient(email.kind.to_string()));
    }

    crate::repositories::email_outbox::enqueue(
        executor,
        crate::repositories::email_outbox::EnqueueEmail {
            id: &Uuid::new_v4().to_string(),
            kind: email.kind,
            recipient: email.recipient.trim(),
            subject: &email.subject,
            body: &email.body,
            survey_id: email.survey_id.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        kind = email.kind,
        recipient = %email.recipient,
        from = %settings.mail().default_from_email,
        "Email queued"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::SurveyStatus;
    use crate::test_support;
    use time::macros::date;

    fn user(username: &str, email: &str) -> User {
        let now = primitive_now_utc();
        User {
            id: format!("{username}-id"),
            username: username.to_string(),
            email: email.to_string(),
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            position: String::new(),
            department: String::new(),
            hashed_password: String::new(),
            is_superuser: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn survey() -> Survey {
        let now = primitive_now_utc();
        Survey {
            id: "survey-1".to_string(),
            name: "Spring review".to_string(),
            description: String::new(),
            template_id: "template-1".to_string(),
            start_date: date!(2026 - 03 - 01),
            end_date: date!(2026 - 03 - 31),
            status: SurveyStatus::Active,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn survey_invitation_points_to_dashboard() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let email = survey_invitation(&settings, &survey(), &user("anna", "anna@example.com"));

        assert_eq!(email.kind, SURVEY_INVITATION);
        assert_eq!(email.recipient, "anna@example.com");
        assert_eq!(email.survey_id.as_deref(), Some("survey-1"));
        assert!(email.body.contains("Anna Petrova"));
        assert!(email.body.contains("2026-03-01"));
        assert!(email.body.contains("/api/v1/dashboard"));
    }

    #[tokio::test]
    async fn rater_invitation_carries_token_link() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let email = rater_invitation(
            &settings,
            &survey(),
            &user("boris", "boris@example.com"),
            "Anna Petrova",
            "TOKEN123",
        );

        assert!(email.body.contains("/api/v1/invitations/TOKEN123"));
        assert!(email.body.contains("Anna Petrova"));
        assert_eq!(email.kind, RATER_INVITATION);
    }
}
