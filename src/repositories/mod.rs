pub(crate) mod access_requests;
pub(crate) mod competencies;
pub(crate) mod email_outbox;
pub(crate) mod flash;
pub(crate) mod notifications;
pub(crate) mod questions;
pub(crate) mod raters;
pub(crate) mod reports;
pub(crate) mod respondents;
pub(crate) mod responses;
pub(crate) mod roles;
pub(crate) mod surveys;
pub(crate) mod templates;
pub(crate) mod users;
pub(crate) mod wizard_sessions;
