use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{
    AccessRequestStatus, AnswerType, RaterStatus, RelationshipType, RespondentStatus,
    SurveyStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) position: String,
    pub(crate) department: String,
    pub(crate) hashed_password: String,
    pub(crate) is_superuser: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Role {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SurveyTemplate {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) is_active: bool,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Competency {
    pub(crate) id: String,
    pub(crate) template_id: String,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) weight: f64,
    pub(crate) sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Choice {
    pub(crate) value: String,
    pub(crate) label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) template_id: Option<String>,
    pub(crate) survey_id: Option<String>,
    pub(crate) competency_id: Option<String>,
    pub(crate) text: String,
    pub(crate) answer_type: String,
    pub(crate) scale_min: Option<i32>,
    pub(crate) scale_max: Option<i32>,
    pub(crate) choices: Json<Vec<Choice>>,
    pub(crate) is_required: bool,
    pub(crate) sort_order: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

impl Question {
    pub(crate) fn kind(&self) -> AnswerType {
        AnswerType::from_stored(&self.answer_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Survey {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) template_id: String,
    pub(crate) start_date: Date,
    pub(crate) end_date: Date,
    pub(crate) status: SurveyStatus,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Respondent {
    pub(crate) id: String,
    pub(crate) survey_id: String,
    pub(crate) user_id: String,
    pub(crate) manager_id: Option<String>,
    pub(crate) status: RespondentStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Rater {
    pub(crate) id: String,
    pub(crate) respondent_id: String,
    pub(crate) user_id: String,
    pub(crate) relationship_type: RelationshipType,
    pub(crate) status: RaterStatus,
    pub(crate) token_hash: Option<String>,
    pub(crate) invitation_sent_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Response {
    pub(crate) id: String,
    pub(crate) rater_id: String,
    pub(crate) question_id: String,
    pub(crate) answer_value: Option<f64>,
    pub(crate) answer_text: Option<String>,
    pub(crate) answered_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Report {
    pub(crate) id: String,
    pub(crate) respondent_id: String,
    pub(crate) report_data: Json<serde_json::Value>,
    pub(crate) generated_at: PrimitiveDateTime,
    pub(crate) generated_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AccessRequest {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) admin_id: String,
    pub(crate) comment: String,
    pub(crate) status: AccessRequestStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) decided_at: Option<PrimitiveDateTime>,
    pub(crate) decided_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Notification {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) message: String,
    pub(crate) link: Option<String>,
    pub(crate) is_read: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct WizardSession {
    pub(crate) session_id: String,
    pub(crate) survey_id: String,
    pub(crate) question_ids: Json<Vec<String>>,
    /// Last step shown; informational only.
    pub(crate) current_index: i32,
    pub(crate) initialized: bool,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct FlashMessage {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) level: String,
    pub(crate) message: String,
    pub(crate) created_at: PrimitiveDateTime,
}
