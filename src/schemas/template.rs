use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Choice, Competency, Question, SurveyTemplate};

/// One row of the question editor. Rows without `id` are new questions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct QuestionRowInput {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) text: String,
    #[serde(default, alias = "answerType")]
    pub(crate) answer_type: Option<String>,
    #[serde(default, alias = "scaleMin")]
    pub(crate) scale_min: Option<i32>,
    #[serde(default, alias = "scaleMax")]
    pub(crate) scale_max: Option<i32>,
    #[serde(default)]
    pub(crate) choices: Vec<Choice>,
    #[serde(default, alias = "competencyId")]
    pub(crate) competency_id: Option<String>,
    #[serde(default = "default_true", alias = "isRequired")]
    pub(crate) is_required: bool,
    #[serde(default, alias = "sortOrder")]
    pub(crate) sort_order: Option<i32>,
    #[serde(default, alias = "DELETE")]
    pub(crate) delete: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct TemplateCreate {
    #[validate(
        length(min = 1, max = 200, message = "name must not be empty"),
        custom(function = "crate::schemas::not_blank")
    )]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default = "default_true", alias = "isActive")]
    pub(crate) is_active: bool,
    #[serde(default)]
    pub(crate) questions: Vec<QuestionRowInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct TemplateUpdate {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 200, message = "name must not be empty"),
        custom(function = "crate::schemas::not_blank")
    )]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default)]
    pub(crate) questions: Option<Vec<QuestionRowInput>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct CompetencyCreate {
    #[validate(
        length(min = 1, max = 200, message = "name must not be empty"),
        custom(function = "crate::schemas::not_blank")
    )]
    pub(crate) name: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "category is too long"))]
    pub(crate) category: String,
    #[serde(default = "default_weight")]
    #[validate(range(exclusive_min = 0.0, message = "weight must be positive"))]
    pub(crate) weight: f64,
    #[serde(default, alias = "sortOrder")]
    #[validate(range(min = 0, message = "sort_order must be non-negative"))]
    pub(crate) sort_order: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) is_active: bool,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl TemplateResponse {
    pub(crate) fn from_db(template: SurveyTemplate) -> Self {
        Self {
            id: template.id,
            name: template.name,
            description: template.description,
            is_active: template.is_active,
            created_by: template.created_by,
            created_at: format_primitive(template.created_at),
            updated_at: format_primitive(template.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CompetencyResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) weight: f64,
    pub(crate) sort_order: i32,
}

impl CompetencyResponse {
    pub(crate) fn from_db(competency: Competency) -> Self {
        Self {
            id: competency.id,
            name: competency.name,
            category: competency.category,
            weight: competency.weight,
            sort_order: competency.sort_order,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) answer_type: String,
    pub(crate) sort_order: i32,
    pub(crate) scale_min: Option<i32>,
    pub(crate) scale_max: Option<i32>,
    pub(crate) choices: Vec<Choice>,
    pub(crate) competency_id: Option<String>,
    pub(crate) is_required: bool,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            text: question.text,
            answer_type: question.answer_type,
            sort_order: question.sort_order,
            scale_min: question.scale_min,
            scale_max: question.scale_max,
            choices: question.choices.0,
            competency_id: question.competency_id,
            is_required: question.is_required,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateDetailResponse {
    #[serde(flatten)]
    pub(crate) template: TemplateResponse,
    pub(crate) survey_count: i64,
    pub(crate) competencies: Vec<CompetencyResponse>,
    pub(crate) questions: Vec<QuestionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateQuestionsResponse {
    pub(crate) questions: Vec<QuestionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

impl StatusResponse {
    pub(crate) fn ok() -> Self {
        Self { status: "ok", message: None }
    }
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}
