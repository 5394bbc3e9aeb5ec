use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::{Report, Respondent};

#[derive(Debug, Serialize)]
pub(crate) struct ReportResponse {
    pub(crate) id: String,
    pub(crate) respondent_id: String,
    pub(crate) survey_id: String,
    pub(crate) generated_at: String,
    pub(crate) generated_by: Option<String>,
    pub(crate) data: serde_json::Value,
}

impl ReportResponse {
    pub(crate) fn from_db(report: Report, respondent: &Respondent) -> Self {
        Self {
            id: report.id,
            respondent_id: report.respondent_id,
            survey_id: respondent.survey_id.clone(),
            generated_at: format_primitive(report.generated_at),
            generated_by: report.generated_by,
            data: report.report_data.0,
        }
    }
}
