use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::Report;
use crate::repositories::responses::ReportResponseRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ReportDetail {
    pub(crate) question_id: String,
    pub(crate) question: String,
    pub(crate) relationship: String,
    pub(crate) answer: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ReportSummary {
    pub(crate) average_score: f64,
    pub(crate) total_questions: i64,
    pub(crate) answered_questions: i64,
    pub(crate) scored_questions: i64,
    pub(crate) total_responses: i64,
    pub(crate) rater_count: i64,
    pub(crate) completed_raters: i64,
    pub(crate) details: Vec<ReportDetail>,
}

/// Aggregates every stored response of one respondent.
///
/// `answered_questions` counts questions with any non-empty answer, numeric
/// or text. `scored_questions` keeps the numeric-only count.
pub(crate) fn summarize(
    rows: &[ReportResponseRow],
    total_questions: i64,
    rater_count: i64,
    completed_raters: i64,
) -> ReportSummary {
    let values: Vec<f64> = rows.iter().filter_map(|row| row.answer_value).collect();
    let average_score = if values.is_empty() {
        0.0
    } else {
        round_one_decimal(values.iter().sum::<f64>() / values.len() as f64)
    };

    let mut answered = HashSet::new();
    let mut scored = HashSet::new();
    let mut details = Vec::with_capacity(rows.len());

    for row in rows {
        let text = row.answer_text.as_deref().map(str::trim).filter(|text| !text.is_empty());
        if row.answer_value.is_some() {
            scored.insert(row.question_id.as_str());
        }
        if row.answer_value.is_some() || text.is_some() {
            answered.insert(row.question_id.as_str());
        }

        let answer = match (row.answer_value, text) {
            (Some(value), _) => serde_json::json!(value),
            (None, Some(text)) => serde_json::json!(text),
            (None, None) => serde_json::Value::Null,
        };
        details.push(ReportDetail {
            question_id: row.question_id.clone(),
            question: row.question_text.clone(),
            relationship: row.relationship_type.as_str().to_string(),
            answer,
        });
    }

    ReportSummary {
        average_score,
        total_questions,
        answered_questions: answered.len() as i64,
        scored_questions: scored.len() as i64,
        total_responses: rows.len() as i64,
        rater_count,
        completed_raters,
        details,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn empty_report_data(total_questions: i64) -> serde_json::Value {
    serde_json::to_value(summarize(&[], total_questions, 0, 0)).unwrap_or_default()
}

/// Recomputes and stores the report; `None` when the respondent no longer exists.
pub(crate) async fn regenerate(
    pool: &PgPool,
    respondent_id: &str,
    generated_by: Option<&str>,
) -> Result<Option<Report>> {
    let Some(respondent) = crate::repositories::respondents::find_by_id(pool, respondent_id)
        .await
        .context("Failed to fetch respondent")?
    else {
        return Ok(None);
    };

    let survey = crate::repositories::surveys::find_by_id(pool, &respondent.survey_id)
        .await
        .context("Failed to fetch survey")?
        .context("Respondent references a missing survey")?;

    let question_ids = crate::repositories::questions::ordered_ids_for_survey(
        pool,
        &survey.id,
        &survey.template_id,
    )
    .await
    .context("Failed to list survey questions")?;

    let rows = crate::repositories::responses::list_for_respondent(pool, respondent_id)
        .await
        .context("Failed to fetch responses")?;

    let (rater_count, completed_raters) =
        crate::repositories::raters::count_by_status(pool, respondent_id)
            .await
            .context("Failed to count raters")?;

    let summary = summarize(&rows, question_ids.len() as i64, rater_count, completed_raters);
    let report_data = serde_json::to_value(&summary).context("Failed to encode report")?;

    let report = crate::repositories::reports::save(
        pool,
        crate::repositories::reports::SaveReport {
            id: &Uuid::new_v4().to_string(),
            respondent_id,
            report_data,
            generated_by,
            generated_at: primitive_now_utc(),
        },
    )
    .await
    .context("Failed to save report")?;

    ::metrics::counter!(metrics::REPORTS_GENERATED).increment(1);
    tracing::info!(
        action = "report_regenerated",
        respondent_id,
        average_score = summary.average_score,
        total_responses = summary.total_responses,
        "Report regenerated"
    );

    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::RelationshipType;

    fn row(question: &str, value: Option<f64>, text: Option<&str>) -> ReportResponseRow {
        ReportResponseRow {
            question_id: question.to_string(),
            question_text: format!("Question {question}"),
            relationship_type: RelationshipType::Peer,
            answer_value: value,
            answer_text: text.map(str::to_string),
        }
    }

    #[test]
    fn averages_numeric_answers_and_lists_every_response() {
        let rows = vec![
            row("q1", Some(3.0), None),
            row("q2", Some(5.0), None),
            row("q3", None, Some("Runs calm and focused meetings")),
        ];

        let summary = summarize(&rows, 3, 2, 1);

        assert_eq!(summary.average_score, 4.0);
        assert_eq!(summary.details.len(), 3);
        assert_eq!(summary.answered_questions, 3);
        assert_eq!(summary.scored_questions, 2);
        assert_eq!(summary.details[2].answer, serde_json::json!("Runs calm and focused meetings"));
        assert_eq!(summary.details[0].answer, serde_json::json!(3.0));
        assert_eq!(summary.details[0].relationship, "peer");
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        let rows = vec![
            row("q1", Some(4.0), None),
            row("q1", Some(4.0), None),
            row("q2", Some(5.0), None),
        ];
        let summary = summarize(&rows, 2, 3, 3);
        assert_eq!(summary.average_score, 4.3);
        assert_eq!(summary.answered_questions, 2);
        assert_eq!(summary.total_responses, 3);
    }

    #[test]
    fn empty_report_has_zero_average() {
        let data = empty_report_data(5);
        assert_eq!(data["average_score"], serde_json::json!(0.0));
        assert_eq!(data["total_questions"], serde_json::json!(5));
        assert_eq!(data["details"], serde_json::json!([]));
    }

    #[test]
    fn blank_text_does_not_count_as_answered() {
        let rows = vec![row("q1", None, Some("   ")), row("q2", None, None)];
        let summary = summarize(&rows, 2, 1, 0);
        assert_eq!(summary.answered_questions, 0);
        assert_eq!(summary.details[0].answer, serde_json::Value::Null);
    }
}
