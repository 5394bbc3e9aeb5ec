use serde::{Deserialize, Serialize};

use crate::db::types::{RaterStatus, RelationshipType};
use crate::services::answer_forms::{AnswerInput, FormSpec};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WizardQuery {
    #[serde(default)]
    pub(crate) q: Option<String>,
}

impl WizardQuery {
    /// Requested question index. Integers beyond `i64` saturate so the wizard
    /// clamps them; anything non-numeric counts as no request.
    pub(crate) fn position(&self) -> Option<i64> {
        let raw = self.q.as_deref()?.trim();
        if let Ok(value) = raw.parse::<i64>() {
            return Some(value);
        }
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        Some(if negative { i64::MIN } else { i64::MAX })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Direction {
    #[default]
    Next,
    Back,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct WizardSubmit {
    #[serde(default)]
    pub(crate) direction: Direction,
    #[serde(flatten)]
    pub(crate) answer: AnswerInput,
}

#[derive(Debug, Serialize)]
pub(crate) struct WizardQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) answer_type: &'static str,
    pub(crate) is_required: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct WizardStepResponse {
    pub(crate) rater_id: String,
    pub(crate) survey_id: String,
    pub(crate) survey_name: String,
    pub(crate) respondent_name: String,
    pub(crate) relationship_type: RelationshipType,
    pub(crate) index: usize,
    pub(crate) total: usize,
    pub(crate) is_first: bool,
    pub(crate) is_last: bool,
    pub(crate) question: WizardQuestion,
    pub(crate) form: FormSpec,
    pub(crate) initial: AnswerInput,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletionResponse {
    pub(crate) rater_id: String,
    pub(crate) survey_id: String,
    pub(crate) survey_name: String,
    pub(crate) respondent_name: String,
    pub(crate) status: RaterStatus,
    pub(crate) completed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(uri: &str) -> WizardQuery {
        let uri: axum::http::Uri = uri.parse().unwrap();
        axum::extract::Query::<WizardQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn oversized_index_saturates_instead_of_failing() {
        assert_eq!(query("/respond/r?q=99999999999999999999").position(), Some(i64::MAX));
        assert_eq!(query("/respond/r?q=-99999999999999999999").position(), Some(i64::MIN));
        assert_eq!(query("/respond/r?q=2").position(), Some(2));
    }

    #[test]
    fn non_numeric_index_is_ignored() {
        assert_eq!(query("/respond/r?q=abc").position(), None);
        assert_eq!(query("/respond/r?q=").position(), None);
        assert_eq!(query("/respond/r").position(), None);
    }

    #[test]
    fn submit_defaults_to_forward_navigation() {
        let submit: WizardSubmit = serde_json::from_str(r#"{"answer_value":4}"#).unwrap();
        assert_eq!(submit.direction, Direction::Next);
        assert_eq!(submit.answer.answer_value, Some(4.0));

        let back: WizardSubmit = serde_json::from_str(r#"{"direction":"back"}"#).unwrap();
        assert_eq!(back.direction, Direction::Back);
        assert!(back.answer.answer_value.is_none());
    }
}
