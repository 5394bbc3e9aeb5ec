use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

use crate::core::time::{format_date, format_primitive, iso_date};
use crate::db::models::{Rater, Survey};
use crate::db::types::{RaterStatus, RelationshipType, RespondentStatus, SurveyStatus};
use crate::repositories::raters::RaterRow;
use crate::repositories::respondents::RespondentRow;
use crate::schemas::template::{QuestionResponse, QuestionRowInput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RespondentInput {
    #[serde(alias = "userId")]
    pub(crate) user_id: String,
    #[serde(default, alias = "managerId")]
    pub(crate) manager_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct SurveyCreate {
    #[validate(
        length(min = 1, max = 200, message = "name must not be empty"),
        custom(function = "crate::schemas::not_blank")
    )]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(alias = "templateId")]
    pub(crate) template_id: String,
    #[serde(with = "iso_date", alias = "startDate")]
    pub(crate) start_date: Date,
    #[serde(with = "iso_date", alias = "endDate")]
    pub(crate) end_date: Date,
    #[serde(default)]
    pub(crate) status: Option<SurveyStatus>,
    #[serde(default)]
    pub(crate) respondents: Vec<RespondentInput>,
    #[serde(default)]
    pub(crate) questions: Vec<QuestionRowInput>,
    #[serde(default, alias = "copyTemplateQuestions")]
    pub(crate) copy_template_questions: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct SurveyUpdate {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 200, message = "name must not be empty"),
        custom(function = "crate::schemas::not_blank")
    )]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "templateId")]
    pub(crate) template_id: Option<String>,
    #[serde(default, with = "iso_date::option", alias = "startDate")]
    pub(crate) start_date: Option<Date>,
    #[serde(default, with = "iso_date::option", alias = "endDate")]
    pub(crate) end_date: Option<Date>,
    #[serde(default)]
    pub(crate) status: Option<SurveyStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SurveyQuestionsAdd {
    #[serde(default)]
    pub(crate) questions: Vec<QuestionRowInput>,
    #[serde(default, alias = "copyTemplateQuestions")]
    pub(crate) copy_template_questions: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RaterCreate {
    #[serde(alias = "userId")]
    pub(crate) user_id: String,
    #[serde(alias = "relationshipType")]
    pub(crate) relationship_type: RelationshipType,
    #[serde(default, alias = "sendInvitation")]
    pub(crate) send_invitation: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SurveyResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) template_id: String,
    pub(crate) start_date: String,
    pub(crate) end_date: String,
    pub(crate) status: SurveyStatus,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
}

impl SurveyResponse {
    pub(crate) fn from_db(survey: Survey) -> Self {
        Self {
            id: survey.id,
            name: survey.name,
            description: survey.description,
            template_id: survey.template_id,
            start_date: format_date(survey.start_date),
            end_date: format_date(survey.end_date),
            status: survey.status,
            created_by: survey.created_by,
            created_at: format_primitive(survey.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RaterResponse {
    pub(crate) id: String,
    pub(crate) respondent_id: String,
    pub(crate) user_id: String,
    pub(crate) relationship_type: RelationshipType,
    pub(crate) status: RaterStatus,
    pub(crate) invitation_sent_at: Option<String>,
    pub(crate) completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) username: Option<String>,
}

impl RaterResponse {
    pub(crate) fn from_db(rater: Rater) -> Self {
        Self {
            id: rater.id,
            respondent_id: rater.respondent_id,
            user_id: rater.user_id,
            relationship_type: rater.relationship_type,
            status: rater.status,
            invitation_sent_at: rater.invitation_sent_at.map(format_primitive),
            completed_at: rater.completed_at.map(format_primitive),
            username: None,
        }
    }

    pub(crate) fn from_row(row: RaterRow) -> Self {
        Self {
            id: row.id,
            respondent_id: row.respondent_id,
            user_id: row.user_id,
            relationship_type: row.relationship_type,
            status: row.status,
            invitation_sent_at: row.invitation_sent_at.map(format_primitive),
            completed_at: row.completed_at.map(format_primitive),
            username: Some(row.username),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RespondentResponse {
    pub(crate) id: String,
    pub(crate) survey_id: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) manager_id: Option<String>,
    pub(crate) status: RespondentStatus,
    pub(crate) completed_at: Option<String>,
    pub(crate) raters: Vec<RaterResponse>,
}

impl RespondentResponse {
    pub(crate) fn from_row(row: RespondentRow, raters: Vec<RaterResponse>) -> Self {
        let full_name = format!("{} {}", row.first_name.trim(), row.last_name.trim());
        let full_name = match full_name.trim() {
            "" => row.username.clone(),
            name => name.to_string(),
        };
        Self {
            id: row.id,
            survey_id: row.survey_id,
            user_id: row.user_id,
            username: row.username,
            full_name,
            manager_id: row.manager_id,
            status: row.status,
            completed_at: row.completed_at.map(format_primitive),
            raters,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SurveyDetailResponse {
    #[serde(flatten)]
    pub(crate) survey: SurveyResponse,
    pub(crate) template_name: String,
    pub(crate) questions: Vec<QuestionResponse>,
    pub(crate) respondents: Vec<RespondentResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RaterCreatedResponse {
    pub(crate) rater: RaterResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) invitation_token: Option<String>,
}
