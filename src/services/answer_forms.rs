use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::db::models::{Choice, Question, Response};
use crate::db::types::AnswerType;

pub(crate) const DEFAULT_SCALE_MIN: i32 = 1;
pub(crate) const DEFAULT_SCALE_MAX: i32 = 5;
const TEXT_MIN_CHARS: usize = 10;
const LIST_MIN_ITEMS: usize = 2;

const SCALE_LABELS: [(&str, &str); 5] =
    [("1", "Never"), ("2", "Rarely"), ("3", "Sometimes"), ("4", "Often"), ("5", "Always")];

pub(crate) fn default_choices() -> Vec<Choice> {
    SCALE_LABELS
        .iter()
        .map(|(value, label)| Choice { value: value.to_string(), label: label.to_string() })
        .collect()
}

/// Raw answer fields as submitted by the rater.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AnswerInput {
    #[serde(default)]
    pub(crate) answer_value: Option<f64>,
    #[serde(default)]
    pub(crate) answer_text: Option<String>,
    #[serde(default)]
    pub(crate) selected: Vec<String>,
    #[serde(default)]
    pub(crate) items: Vec<String>,
}

/// Values ready to be written to a response row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CleanAnswer {
    pub(crate) answer_value: Option<f64>,
    pub(crate) answer_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct FormErrors {
    pub(crate) field_errors: BTreeMap<String, Vec<String>>,
    pub(crate) non_field_errors: Vec<String>,
}

impl FormErrors {
    pub(crate) fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub(crate) fn non_field(message: impl Into<String>) -> Self {
        Self { non_field_errors: vec![message.into()], ..Self::default() }
    }

    pub(crate) fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors.entry(field.into()).or_default().push(message.into());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }
}

impl From<validator::ValidationErrors> for FormErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut form = Self::default();
        for (field, failures) in errors.field_errors() {
            for failure in failures {
                let message = match &failure.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid ({})", failure.code),
                };
                form.add(field.to_string(), message);
            }
        }
        form
    }
}

/// Widget description sent to the client for the current step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub(crate) enum FormSpec {
    Scale { min: i32, max: i32, labels: Vec<Choice> },
    Text { min_length: usize },
    MultipleChoice { choices: Vec<Choice> },
    List { min_items: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AnswerForm {
    Scale { min: i32, max: i32, required: bool },
    Text { required: bool },
    MultipleChoice { choices: Vec<Choice>, required: bool },
    List,
}

impl AnswerForm {
    pub(crate) fn for_question(question: &Question) -> Self {
        let required = question.is_required;
        match question.kind() {
            AnswerType::Text => Self::Text { required },
            AnswerType::Multiple => {
                let choices = if question.choices.0.is_empty() {
                    default_choices()
                } else {
                    question.choices.0.clone()
                };
                Self::MultipleChoice { choices, required }
            }
            AnswerType::List => Self::List,
            AnswerType::Scale => Self::Scale {
                min: question.scale_min.unwrap_or(DEFAULT_SCALE_MIN),
                max: question.scale_max.unwrap_or(DEFAULT_SCALE_MAX),
                required,
            },
        }
    }

    pub(crate) fn spec(&self) -> FormSpec {
        match self {
            Self::Scale { min, max, .. } => FormSpec::Scale {
                min: *min,
                max: *max,
                labels: scale_labels(*min, *max),
            },
            Self::Text { .. } => FormSpec::Text { min_length: TEXT_MIN_CHARS },
            Self::MultipleChoice { choices, .. } => {
                FormSpec::MultipleChoice { choices: choices.clone() }
            }
            Self::List => FormSpec::List { min_items: LIST_MIN_ITEMS },
        }
    }

    /// Previously saved answer in the shape the form submits it.
    pub(crate) fn initial(&self, existing: Option<&Response>) -> AnswerInput {
        let Some(response) = existing else {
            return AnswerInput::default();
        };

        match self {
            Self::Scale { .. } => AnswerInput {
                answer_value: response.answer_value,
                answer_text: response.answer_text.clone(),
                ..AnswerInput::default()
            },
            Self::Text { .. } => {
                AnswerInput { answer_text: response.answer_text.clone(), ..AnswerInput::default() }
            }
            Self::MultipleChoice { .. } => AnswerInput {
                selected: split_nonempty(response.answer_text.as_deref(), ','),
                ..AnswerInput::default()
            },
            Self::List => AnswerInput {
                items: split_nonempty(response.answer_text.as_deref(), '\n'),
                ..AnswerInput::default()
            },
        }
    }

    pub(crate) fn validate(&self, input: &AnswerInput) -> Result<CleanAnswer, FormErrors> {
        match self {
            Self::Scale { min, max, required } => validate_scale(*min, *max, *required, input),
            Self::Text { required } => validate_text(*required, input),
            Self::MultipleChoice { choices, required } => {
                validate_multiple(choices, *required, input)
            }
            Self::List => validate_list(input),
        }
    }
}

fn validate_scale(
    min: i32,
    max: i32,
    required: bool,
    input: &AnswerInput,
) -> Result<CleanAnswer, FormErrors> {
    let comment = trimmed(input.answer_text.as_deref());

    let Some(value) = input.answer_value else {
        if required {
            return Err(FormErrors::non_field("Select an answer option"));
        }
        return Ok(CleanAnswer { answer_value: None, answer_text: comment });
    };

    if value.fract() != 0.0 {
        return Err(FormErrors::field("answer_value", "Select a whole number"));
    }
    if value < f64::from(min) || value > f64::from(max) {
        return Err(FormErrors::field(
            "answer_value",
            format!("Value must be between {min} and {max}"),
        ));
    }

    Ok(CleanAnswer { answer_value: Some(value), answer_text: comment })
}

fn validate_text(required: bool, input: &AnswerInput) -> Result<CleanAnswer, FormErrors> {
    let Some(text) = trimmed(input.answer_text.as_deref()) else {
        if required {
            return Err(FormErrors::non_field("Text answer required"));
        }
        return Ok(CleanAnswer { answer_value: None, answer_text: None });
    };

    if text.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(FormErrors::field(
            "answer_text",
            "A text answer is required, not just digits",
        ));
    }
    if text.chars().count() < TEXT_MIN_CHARS {
        return Err(FormErrors::field(
            "answer_text",
            format!("Answer must contain at least {TEXT_MIN_CHARS} characters"),
        ));
    }

    Ok(CleanAnswer { answer_value: None, answer_text: Some(text) })
}

fn validate_multiple(
    choices: &[Choice],
    required: bool,
    input: &AnswerInput,
) -> Result<CleanAnswer, FormErrors> {
    let mut selected: Vec<String> = Vec::new();
    for value in input.selected.iter().map(|value| value.trim()).filter(|value| !value.is_empty()) {
        if !choices.iter().any(|choice| choice.value == value) {
            return Err(FormErrors::field(
                "selected",
                format!("Select a valid choice. {value} is not one of the available choices."),
            ));
        }
        if !selected.iter().any(|existing| existing == value) {
            selected.push(value.to_string());
        }
    }

    if selected.is_empty() {
        if required {
            return Err(FormErrors::non_field("Select an answer option"));
        }
        return Ok(CleanAnswer { answer_value: None, answer_text: None });
    }

    Ok(CleanAnswer { answer_value: None, answer_text: Some(selected.join(",")) })
}

fn validate_list(input: &AnswerInput) -> Result<CleanAnswer, FormErrors> {
    let items: Vec<String> = if input.items.is_empty() {
        split_nonempty(input.answer_text.as_deref(), '\n')
    } else {
        input
            .items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    };

    if items.len() < LIST_MIN_ITEMS {
        return Err(FormErrors::field(
            "items",
            format!("Provide at least {LIST_MIN_ITEMS} items"),
        ));
    }
    if items.iter().all(|item| item.chars().all(|ch| ch.is_ascii_digit())) {
        return Err(FormErrors::field("items", "Items cannot consist only of digits"));
    }

    Ok(CleanAnswer { answer_value: None, answer_text: Some(items.join("\n")) })
}

fn scale_labels(min: i32, max: i32) -> Vec<Choice> {
    if min == DEFAULT_SCALE_MIN && max == DEFAULT_SCALE_MAX {
        return default_choices();
    }
    (min..=max)
        .map(|value| Choice { value: value.to_string(), label: value.to_string() })
        .collect()
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

fn split_nonempty(value: Option<&str>, separator: char) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(separator)
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;
    use sqlx::types::Json;

    fn question(answer_type: &str, required: bool) -> Question {
        let scale = answer_type == "scale";
        Question {
            id: "q1".to_string(),
            template_id: Some("t1".to_string()),
            survey_id: None,
            competency_id: None,
            text: "How often does the colleague share context?".to_string(),
            answer_type: answer_type.to_string(),
            scale_min: scale.then_some(1),
            scale_max: scale.then_some(5),
            choices: Json(Vec::new()),
            is_required: required,
            sort_order: 1,
            created_at: primitive_now_utc(),
        }
    }

    fn input_value(value: f64) -> AnswerInput {
        AnswerInput { answer_value: Some(value), ..AnswerInput::default() }
    }

    fn input_text(text: &str) -> AnswerInput {
        AnswerInput { answer_text: Some(text.to_string()), ..AnswerInput::default() }
    }

    #[test]
    fn unknown_type_dispatches_to_scale_form() {
        let mut q = question("rating", true);
        q.scale_min = None;
        q.scale_max = None;
        assert_eq!(
            AnswerForm::for_question(&q),
            AnswerForm::Scale { min: 1, max: 5, required: true }
        );
    }

    #[test]
    fn scale_accepts_value_within_bounds() {
        let form = AnswerForm::for_question(&question("scale", true));
        let clean = form.validate(&input_value(4.0)).expect("valid");
        assert_eq!(clean.answer_value, Some(4.0));
        assert_eq!(clean.answer_text, None);
    }

    #[test]
    fn scale_rejects_out_of_range_and_fractional_values() {
        let form = AnswerForm::for_question(&question("scale", true));
        let errors = form.validate(&input_value(6.0)).unwrap_err();
        assert_eq!(errors.field_errors["answer_value"], vec!["Value must be between 1 and 5"]);
        assert!(form.validate(&input_value(2.5)).is_err());
    }

    #[test]
    fn required_scale_without_value_is_a_form_error() {
        let form = AnswerForm::for_question(&question("scale", true));
        let errors = form.validate(&AnswerInput::default()).unwrap_err();
        assert_eq!(errors.non_field_errors, vec!["Select an answer option"]);
        assert!(errors.field_errors.is_empty());
    }

    #[test]
    fn optional_scale_may_be_left_blank() {
        let form = AnswerForm::for_question(&question("scale", false));
        let clean = form.validate(&AnswerInput::default()).expect("valid");
        assert_eq!(clean, CleanAnswer { answer_value: None, answer_text: None });
    }

    #[test]
    fn text_rules() {
        let form = AnswerForm::for_question(&question("text", true));
        assert_eq!(
            form.validate(&input_text("  ")).unwrap_err().non_field_errors,
            vec!["Text answer required"]
        );
        assert!(form.validate(&input_text("1234567890123")).unwrap_err().field_errors
            .contains_key("answer_text"));
        assert!(form.validate(&input_text("too short")).is_err());

        let clean = form.validate(&input_text("  Explains decisions clearly  ")).expect("valid");
        assert_eq!(clean.answer_text.as_deref(), Some("Explains decisions clearly"));
    }

    #[test]
    fn multiple_choice_joins_selection_and_checks_choices() {
        let form = AnswerForm::for_question(&question("multiple", true));
        let input = AnswerInput {
            selected: vec!["2".to_string(), "4".to_string(), "2".to_string()],
            ..AnswerInput::default()
        };
        let clean = form.validate(&input).expect("valid");
        assert_eq!(clean.answer_text.as_deref(), Some("2,4"));
        assert_eq!(clean.answer_value, None);

        let invalid = AnswerInput { selected: vec!["9".to_string()], ..AnswerInput::default() };
        assert!(form.validate(&invalid).unwrap_err().field_errors.contains_key("selected"));

        let empty = form.validate(&AnswerInput::default()).unwrap_err();
        assert_eq!(empty.non_field_errors, vec!["Select an answer option"]);
    }

    #[test]
    fn list_requires_two_meaningful_items() {
        let form = AnswerForm::for_question(&question("list", false));
        assert!(form.validate(&input_text("only one")).is_err());
        assert!(form.validate(&input_text("12\n34")).is_err());

        let clean = form.validate(&input_text("Mentoring\n\n  Code review \n")).expect("valid");
        assert_eq!(clean.answer_text.as_deref(), Some("Mentoring\nCode review"));

        let from_items = AnswerInput {
            items: vec!["Planning".to_string(), "Delegation".to_string()],
            ..AnswerInput::default()
        };
        assert_eq!(
            form.validate(&from_items).expect("valid").answer_text.as_deref(),
            Some("Planning\nDelegation")
        );
    }

    #[test]
    fn initial_restores_saved_selection() {
        let form = AnswerForm::for_question(&question("multiple", true));
        let now = primitive_now_utc();
        let saved = Response {
            id: "r1".to_string(),
            rater_id: "ra1".to_string(),
            question_id: "q1".to_string(),
            answer_value: None,
            answer_text: Some("1,3".to_string()),
            answered_at: now,
            updated_at: now,
        };
        assert_eq!(form.initial(Some(&saved)).selected, vec!["1", "3"]);
        assert!(form.initial(None).selected.is_empty());
    }

    #[test]
    fn scale_spec_uses_frequency_labels_for_default_bounds() {
        let form = AnswerForm::for_question(&question("scale", true));
        match form.spec() {
            FormSpec::Scale { labels, .. } => {
                assert_eq!(labels.first().map(|c| c.label.as_str()), Some("Never"));
                assert_eq!(labels.last().map(|c| c.label.as_str()), Some("Always"));
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }
}
