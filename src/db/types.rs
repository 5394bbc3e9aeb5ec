use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "surveystatus", rename_all = "lowercase")]
pub(crate) enum SurveyStatus {
    Draft,
    Active,
    Completed,
}

impl SurveyStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "respondentstatus", rename_all = "snake_case")]
pub(crate) enum RespondentStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "raterstatus", rename_all = "lowercase")]
pub(crate) enum RaterStatus {
    Pending,
    Started,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "relationshiptype", rename_all = "lowercase")]
pub(crate) enum RelationshipType {
    #[serde(rename = "self")]
    #[sqlx(rename = "self")]
    SelfAssessment,
    Manager,
    Peer,
    Subordinate,
    Other,
}

impl RelationshipType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::SelfAssessment => "self",
            Self::Manager => "manager",
            Self::Peer => "peer",
            Self::Subordinate => "subordinate",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "accessrequeststatus", rename_all = "lowercase")]
pub(crate) enum AccessRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Declared answer type of a question.
///
/// Stored as plain text so rows written by older tooling with an unknown
/// type still load; those dispatch to the scale form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AnswerType {
    Scale,
    Text,
    Multiple,
    List,
}

impl AnswerType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Scale => "scale",
            Self::Text => "text",
            Self::Multiple => "multiple",
            Self::List => "list",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "scale" => Some(Self::Scale),
            "text" => Some(Self::Text),
            "multiple" => Some(Self::Multiple),
            "list" => Some(Self::List),
            _ => None,
        }
    }

    pub(crate) fn from_stored(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::Scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FlashLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl FlashLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}
