pub(crate) mod access_requests;
pub(crate) mod auth;
pub(crate) mod dashboard;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod notifications;
pub(crate) mod pagination;
pub(crate) mod reports;
pub(crate) mod respond;
pub(crate) mod router;
pub(crate) mod surveys;
pub(crate) mod templates;
pub(crate) mod users;
