use std::collections::HashMap;

use serde::Serialize;
use validator::ValidationError;

pub(crate) mod access;
pub(crate) mod auth;
pub(crate) mod dashboard;
pub(crate) mod report;
pub(crate) mod respond;
pub(crate) mod survey;
pub(crate) mod template;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

/// Rejects values that are empty once surrounding whitespace is dropped.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("This field is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_is_blank() {
        assert!(not_blank("   ").is_err());
        assert!(not_blank("\t\n").is_err());
        assert!(not_blank(" Q3 review ").is_ok());
    }
}
