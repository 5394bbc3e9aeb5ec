use anyhow::{Context, Result};

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Rater, Survey};
use crate::services::{mail, rater_tokens};

/// Queues one invitation per current respondent of `survey`.
pub(crate) async fn dispatch_survey_invitations(state: &AppState, survey: &Survey) -> Result<usize> {
    let respondents = crate::repositories::respondents::list_for_survey(state.db(), &survey.id)
        .await
        .context("Failed to list respondents")?;

    let mut queued = 0usize;
    for respondent in respondents {
        let Some(user) = crate::repositories::users::find_by_id(state.db(), &respondent.user_id)
            .await
            .context("Failed to fetch respondent user")?
        else {
            continue;
        };

        let email = mail::survey_invitation(state.settings(), survey, &user);
        match mail::queue(state.db(), state.settings(), &email).await {
            Ok(()) => queued += 1,
            Err(mail::MailError::MissingRecipient(_)) => {
                tracing::warn!(
                    survey_id = %survey.id,
                    user_id = %user.id,
                    "Respondent has no email address; invitation skipped"
                );
            }
            Err(err) => return Err(err).context("Failed to queue survey invitation"),
        }
    }

    ::metrics::counter!(metrics::INVITATIONS_DISPATCHED).increment(queued as u64);
    tracing::info!(
        action = "survey_invitations_dispatched",
        survey_id = %survey.id,
        queued,
        "Survey invitations queued"
    );
    Ok(queued)
}

/// Runs the dispatch in the background; the caller never waits for it.
pub(crate) fn spawn_survey_invitations(state: AppState, survey: Survey) {
    tokio::spawn(async move {
        if let Err(err) = dispatch_survey_invitations(&state, &survey).await {
            tracing::error!(survey_id = %survey.id, error = ?err, "Survey invitation dispatch failed");
        }
    });
}

/// Issues a fresh personal link for the rater and emails it. Returns the plain token.
pub(crate) async fn invite_rater(
    state: &AppState,
    survey: &Survey,
    rater: &Rater,
    respondent_name: &str,
) -> Result<String> {
    let rater_user = crate::repositories::users::find_by_id(state.db(), &rater.user_id)
        .await
        .context("Failed to fetch rater user")?
        .context("Rater references a missing user")?;

    let token = rater_tokens::generate_rater_token();
    let token_hash = rater_tokens::hash_rater_token(&token);

    let mut tx = state.db().begin().await.context("Failed to start transaction")?;
    crate::repositories::raters::record_invitation(
        &mut *tx,
        &rater.id,
        &token_hash,
        primitive_now_utc(),
    )
    .await
    .context("Failed to store rater invitation")?;

    let email =
        mail::rater_invitation(state.settings(), survey, &rater_user, respondent_name, &token);
    match mail::queue(&mut *tx, state.settings(), &email).await {
        Ok(()) => {}
        Err(mail::MailError::MissingRecipient(_)) => {
            tracing::warn!(rater_id = %rater.id, "Rater has no email address; link issued without email");
        }
        Err(err) => return Err(err).context("Failed to queue rater invitation"),
    }
    tx.commit().await.context("Failed to commit rater invitation")?;

    tracing::info!(action = "rater_invited", rater_id = %rater.id, survey_id = %survey.id, "Rater invited");
    Ok(token)
}
