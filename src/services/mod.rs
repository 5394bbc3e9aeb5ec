use thiserror::Error;

use crate::services::answer_forms::FormErrors;

pub(crate) mod access;
pub(crate) mod access_requests;
pub(crate) mod answer_forms;
pub(crate) mod invitations;
pub(crate) mod mail;
pub(crate) mod rater_tokens;
pub(crate) mod reports;
pub(crate) mod surveys;
pub(crate) mod template_editing;
pub(crate) mod wizard;

#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error("submitted data is invalid")]
    Invalid(FormErrors),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
