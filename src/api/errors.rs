use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::answer_forms::FormErrors;
use crate::services::ServiceError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ValidationResponse {
    status: u16,
    detail: &'static str,
    #[serde(flatten)]
    errors: FormErrors,
    input: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct RedirectResponse {
    status: u16,
    detail: String,
    location: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    UnprocessableEntity(String),
    /// Form errors plus the submitted input, so the client can redisplay it.
    Validation { errors: FormErrors, input: serde_json::Value },
    SeeOther { location: String, detail: String },
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn see_other(location: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SeeOther { location: location.into(), detail: detail.into() }
    }

    pub(crate) fn invalid(errors: FormErrors, input: impl Serialize) -> Self {
        let input = serde_json::to_value(input).unwrap_or(serde_json::Value::Null);
        Self::Validation { errors, input }
    }

    pub(crate) fn from_validation(errors: validator::ValidationErrors, input: impl Serialize) -> Self {
        Self::invalid(FormErrors::from(errors), input)
    }

    /// Maps constraint violations to 409 with `message`; anything else is internal.
    pub(crate) fn from_write(err: sqlx::Error, message: &str, context: &str) -> Self {
        if crate::db::is_unique_violation(&err) || crate::db::is_foreign_key_violation(&err) {
            Self::Conflict(message.to_string())
        } else {
            Self::internal(err, context)
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Invalid(errors) => {
                Self::Validation { errors, input: serde_json::Value::Null }
            }
            ServiceError::NotFound(message) => Self::NotFound(message.to_string()),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Database(err) => Self::internal(err, "Database error"),
            ServiceError::Other(err) => Self::internal(format!("{err:#}"), "Internal error occurred"),
        }
    }
}

impl ApiError {
    /// Like `From<ServiceError>`, but validation errors echo `input`.
    pub(crate) fn from_service(err: ServiceError, input: impl Serialize) -> Self {
        match err {
            ServiceError::Invalid(errors) => Self::invalid(errors, input),
            other => other.into(),
        }
    }
}

fn plain(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let mut response = plain(StatusCode::UNAUTHORIZED, message.to_string());
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::BadRequest(message) => plain(StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => plain(StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => plain(StatusCode::CONFLICT, message),
            ApiError::TooManyRequests(message) => {
                plain(StatusCode::TOO_MANY_REQUESTS, message.to_string())
            }
            ApiError::UnprocessableEntity(message) => {
                plain(StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            ApiError::Validation { errors, input } => {
                let status = StatusCode::UNPROCESSABLE_ENTITY;
                (
                    status,
                    Json(ValidationResponse {
                        status: status.as_u16(),
                        detail: "Please correct the errors below",
                        errors,
                        input,
                    }),
                )
                    .into_response()
            }
            ApiError::SeeOther { location, detail } => {
                let status = StatusCode::SEE_OTHER;
                let header_value = HeaderValue::from_str(&location)
                    .unwrap_or_else(|_| HeaderValue::from_static("/"));
                let mut response = (
                    status,
                    Json(RedirectResponse { status: status.as_u16(), detail, location }),
                )
                    .into_response();
                response.headers_mut().insert(header::LOCATION, header_value);
                response
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                plain(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}
