use serde::{Deserialize, Serialize};

use crate::core::time::{format_date, format_primitive};
use crate::db::models::{FlashMessage, Survey};
use crate::db::types::{RaterStatus, RelationshipType};
use crate::repositories::raters::RaterAssignment;
use crate::schemas::user::CurrentUserResponse;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DashboardSort {
    #[default]
    Deadline,
    Progress,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DashboardQuery {
    #[serde(default)]
    pub(crate) sort: DashboardSort,
    #[serde(default)]
    pub(crate) category: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardSurvey {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) start_date: String,
    pub(crate) end_date: String,
    pub(crate) total_questions: i64,
    pub(crate) answered: i64,
    pub(crate) progress: u8,
    pub(crate) categories: Vec<String>,
}

impl DashboardSurvey {
    pub(crate) fn new(survey: Survey, total_questions: i64, answered: i64, categories: Vec<String>) -> Self {
        Self {
            id: survey.id,
            name: survey.name,
            start_date: format_date(survey.start_date),
            end_date: format_date(survey.end_date),
            total_questions,
            answered,
            progress: progress_percent(answered, total_questions),
            categories,
        }
    }
}

/// Share of answered questions, rounded and capped at 100; zero when nothing is asked.
pub(crate) fn progress_percent(answered: i64, total: i64) -> u8 {
    if total <= 0 {
        return 0;
    }
    let percent = (answered.max(0) as f64 / total as f64 * 100.0).round();
    percent.min(100.0) as u8
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardAssignment {
    pub(crate) rater_id: String,
    pub(crate) status: RaterStatus,
    pub(crate) relationship_type: RelationshipType,
    pub(crate) respondent_id: String,
    pub(crate) respondent_name: String,
    pub(crate) survey_id: String,
    pub(crate) survey_name: String,
    pub(crate) end_date: String,
}

impl DashboardAssignment {
    pub(crate) fn from_row(row: RaterAssignment) -> Self {
        let name = format!("{} {}", row.respondent_first_name.trim(), row.respondent_last_name.trim());
        let respondent_name = match name.trim() {
            "" => row.respondent_username,
            name => name.to_string(),
        };
        Self {
            rater_id: row.rater_id,
            status: row.status,
            relationship_type: row.relationship_type,
            respondent_id: row.respondent_id,
            respondent_name,
            survey_id: row.survey_id,
            survey_name: row.survey_name,
            end_date: format_date(row.end_date),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FlashResponse {
    pub(crate) level: String,
    pub(crate) message: String,
    pub(crate) created_at: String,
}

impl FlashResponse {
    pub(crate) fn from_db(message: FlashMessage) -> Self {
        Self {
            level: message.level,
            message: message.message,
            created_at: format_primitive(message.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    pub(crate) user: CurrentUserResponse,
    pub(crate) surveys: Vec<DashboardSurvey>,
    pub(crate) assignments: Vec<DashboardAssignment>,
    pub(crate) categories: Vec<String>,
    pub(crate) messages: Vec<FlashResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_rounds_and_caps() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(9, 3), 100);
        assert_eq!(progress_percent(0, 0), 0);
    }

    #[test]
    fn sort_defaults_to_deadline() {
        let query: DashboardQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.sort, DashboardSort::Deadline);
        let query: DashboardQuery = serde_json::from_str(r#"{"sort":"progress"}"#).unwrap();
        assert_eq!(query.sort, DashboardSort::Progress);
    }
}
