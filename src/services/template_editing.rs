use std::collections::HashSet;

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::Choice;
use crate::db::types::AnswerType;
use crate::repositories::questions::{self, CreateQuestion, QuestionOwner, UpdateQuestion};
use crate::schemas::template::QuestionRowInput;
use crate::services::answer_forms::{FormErrors, DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN};

const SCALE_FLOOR: i32 = 1;
const SCALE_CEILING: i32 = 10;

/// A validated question definition ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionDraft {
    pub(crate) text: String,
    pub(crate) answer_type: AnswerType,
    pub(crate) scale_min: Option<i32>,
    pub(crate) scale_max: Option<i32>,
    pub(crate) choices: Vec<Choice>,
    pub(crate) competency_id: Option<String>,
    pub(crate) is_required: bool,
    pub(crate) sort_order: i32,
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct EditPlan {
    pub(crate) deletes: Vec<String>,
    pub(crate) updates: Vec<(String, QuestionDraft)>,
    pub(crate) inserts: Vec<QuestionDraft>,
}

enum Target {
    Existing(String),
    New,
}

/// Validates one question row. Errors are recorded under `prefix.<field>`.
pub(crate) fn clean_question(
    prefix: &str,
    row: &QuestionRowInput,
    competency_ids: &[String],
    errors: &mut FormErrors,
) -> Option<QuestionDraft> {
    let before = errors.field_errors.len();

    let text = row.text.trim();
    if text.is_empty() {
        errors.add(format!("{prefix}.text"), "Question text is required");
    }

    let answer_type = match row.answer_type.as_deref().map(str::trim) {
        None | Some("") => Some(AnswerType::Scale),
        Some(value) => {
            let parsed = AnswerType::parse(value);
            if parsed.is_none() {
                errors.add(
                    format!("{prefix}.answer_type"),
                    format!("Select a valid answer type. {value} is not one of the available choices."),
                );
            }
            parsed
        }
    };

    let (scale_min, scale_max) = match answer_type {
        Some(AnswerType::Scale) => {
            let min = row.scale_min.unwrap_or(DEFAULT_SCALE_MIN);
            let max = row.scale_max.unwrap_or(DEFAULT_SCALE_MAX);
            if min >= max {
                errors.add(format!("{prefix}.scale_min"), "scale_min must be less than scale_max");
            } else if min < SCALE_FLOOR || max > SCALE_CEILING {
                errors.add(
                    format!("{prefix}.scale_min"),
                    format!("Scale bounds must lie between {SCALE_FLOOR} and {SCALE_CEILING}"),
                );
            }
            (Some(min), Some(max))
        }
        Some(_) => {
            if row.scale_min.is_some() || row.scale_max.is_some() {
                errors.add(
                    format!("{prefix}.scale_min"),
                    "Scale bounds apply only to scale questions",
                );
            }
            (None, None)
        }
        None => (None, None),
    };

    let choices = if answer_type == Some(AnswerType::Multiple) {
        let mut seen = HashSet::new();
        for choice in &row.choices {
            let value = choice.value.trim();
            if value.is_empty() || choice.label.trim().is_empty() {
                errors.add(format!("{prefix}.choices"), "Each choice needs a value and a label");
                break;
            }
            if !seen.insert(value) {
                errors.add(format!("{prefix}.choices"), format!("Duplicate choice value {value}"));
                break;
            }
        }
        row.choices
            .iter()
            .map(|choice| Choice {
                value: choice.value.trim().to_string(),
                label: choice.label.trim().to_string(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let competency_id =
        row.competency_id.as_deref().map(str::trim).filter(|id| !id.is_empty()).map(str::to_string);
    if let Some(id) = &competency_id {
        if !competency_ids.iter().any(|known| known == id) {
            errors.add(format!("{prefix}.competency_id"), "Competency does not belong to this template");
        }
    }

    if errors.field_errors.len() != before {
        return None;
    }

    Some(QuestionDraft {
        text: text.to_string(),
        answer_type: answer_type.unwrap_or(AnswerType::Scale),
        scale_min,
        scale_max,
        choices,
        competency_id,
        is_required: row.is_required,
        sort_order: row.sort_order.unwrap_or(0),
    })
}

/// Turns a submitted question set into deletes, updates and inserts.
///
/// Kept rows are ordered by their requested sort order (rows without one go
/// last, in submission order) and numbered 1..N.
pub(crate) fn plan(
    existing_ids: &[String],
    competency_ids: &[String],
    rows: &[QuestionRowInput],
) -> Result<EditPlan, FormErrors> {
    let mut errors = FormErrors::default();
    let mut plan = EditPlan::default();
    let mut seen_ids = HashSet::new();
    let mut kept: Vec<(i32, usize, Target, QuestionDraft)> = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let prefix = format!("questions[{index}]");
        let id = row.id.as_deref().map(str::trim).filter(|id| !id.is_empty());

        if let Some(id) = id {
            if !existing_ids.iter().any(|existing| existing == id) {
                errors.add(format!("{prefix}.id"), "Question does not belong to this template");
                continue;
            }
            if !seen_ids.insert(id.to_string()) {
                errors.add(format!("{prefix}.id"), "Question submitted more than once");
                continue;
            }
        }

        if row.delete {
            if let Some(id) = id {
                plan.deletes.push(id.to_string());
            }
            continue;
        }

        let Some(draft) = clean_question(&prefix, row, competency_ids, &mut errors) else {
            continue;
        };
        let target = match id {
            Some(id) => Target::Existing(id.to_string()),
            None => Target::New,
        };
        kept.push((row.sort_order.unwrap_or(i32::MAX), index, target, draft));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    kept.sort_by_key(|(requested, index, _, _)| (*requested, *index));
    for (position, (_, _, target, mut draft)) in kept.into_iter().enumerate() {
        draft.sort_order = position as i32 + 1;
        match target {
            Target::Existing(id) => plan.updates.push((id, draft)),
            Target::New => plan.inserts.push(draft),
        }
    }

    Ok(plan)
}

pub(crate) async fn insert_draft(
    conn: &mut PgConnection,
    owner: QuestionOwner<'_>,
    draft: &QuestionDraft,
    now: time::PrimitiveDateTime,
) -> Result<()> {
    questions::create(
        &mut *conn,
        CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            owner,
            competency_id: draft.competency_id.as_deref(),
            text: &draft.text,
            answer_type: draft.answer_type,
            scale_min: draft.scale_min,
            scale_max: draft.scale_max,
            choices: draft.choices.clone(),
            is_required: draft.is_required,
            sort_order: draft.sort_order,
            created_at: now,
        },
    )
    .await
    .context("Failed to insert question")?;
    Ok(())
}

/// Writes the plan and renumbers the template's questions so no gaps remain.
pub(crate) async fn apply(
    conn: &mut PgConnection,
    template_id: &str,
    plan: &EditPlan,
    now: time::PrimitiveDateTime,
) -> Result<()> {
    for id in &plan.deletes {
        questions::delete_for_template(&mut *conn, template_id, id)
            .await
            .context("Failed to delete question")?;
    }

    for (id, draft) in &plan.updates {
        questions::update_for_template(
            &mut *conn,
            template_id,
            id,
            UpdateQuestion {
                competency_id: draft.competency_id.as_deref(),
                text: &draft.text,
                answer_type: draft.answer_type,
                scale_min: draft.scale_min,
                scale_max: draft.scale_max,
                choices: draft.choices.clone(),
                is_required: draft.is_required,
                sort_order: draft.sort_order,
            },
        )
        .await
        .context("Failed to update question")?;
    }

    for draft in &plan.inserts {
        insert_draft(&mut *conn, QuestionOwner::Template(template_id), draft, now).await?;
    }

    questions::renumber(&mut *conn, QuestionOwner::Template(template_id))
        .await
        .context("Failed to renumber questions")?;

    tracing::info!(
        action = "template_questions_edited",
        template_id,
        deleted = plan.deletes.len(),
        updated = plan.updates.len(),
        inserted = plan.inserts.len(),
        "Template questions saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<&str>, text: &str, sort_order: Option<i32>) -> QuestionRowInput {
        QuestionRowInput {
            id: id.map(str::to_string),
            text: text.to_string(),
            is_required: true,
            sort_order,
            ..QuestionRowInput::default()
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn plan_splits_rows_and_numbers_sequentially() {
        let mut removed = row(Some("q2"), "Removed", Some(2));
        removed.delete = true;
        let rows = vec![
            row(Some("q1"), "Keeps promises", Some(10)),
            removed,
            row(None, "Shares knowledge", Some(5)),
            row(Some("q3"), "Gives feedback", None),
        ];

        let plan = plan(&ids(&["q1", "q2", "q3"]), &[], &rows).expect("valid plan");

        assert_eq!(plan.deletes, vec!["q2".to_string()]);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].text, "Shares knowledge");
        assert_eq!(plan.inserts[0].sort_order, 1);

        let updates: Vec<(&str, i32)> =
            plan.updates.iter().map(|(id, draft)| (id.as_str(), draft.sort_order)).collect();
        assert_eq!(updates, vec![("q1", 2), ("q3", 3)]);
    }

    #[test]
    fn deleted_new_rows_are_dropped() {
        let mut blank = row(None, "", None);
        blank.delete = true;
        let plan = plan(&[], &[], &[blank]).expect("valid plan");
        assert_eq!(plan, EditPlan::default());
    }

    #[test]
    fn foreign_question_ids_are_rejected() {
        let errors = plan(&ids(&["q1"]), &[], &[row(Some("other"), "Text", None)]).unwrap_err();
        assert!(errors.field_errors.contains_key("questions[0].id"));
    }

    #[test]
    fn scale_bounds_follow_answer_type() {
        let mut errors = FormErrors::default();
        let mut text_row = row(None, "Describe strengths", None);
        text_row.answer_type = Some("text".to_string());
        text_row.scale_min = Some(1);
        assert!(clean_question("q", &text_row, &[], &mut errors).is_none());
        assert!(errors.field_errors.contains_key("q.scale_min"));

        let mut errors = FormErrors::default();
        let mut inverted = row(None, "Rate delegation", None);
        inverted.scale_min = Some(5);
        inverted.scale_max = Some(1);
        assert!(clean_question("q", &inverted, &[], &mut errors).is_none());

        let mut errors = FormErrors::default();
        let draft = clean_question("q", &row(None, "Rate delegation", None), &[], &mut errors)
            .expect("defaults apply");
        assert_eq!((draft.scale_min, draft.scale_max), (Some(1), Some(5)));
        assert_eq!(draft.answer_type, AnswerType::Scale);
    }

    #[test]
    fn unknown_answer_type_is_a_row_error_when_editing() {
        let mut errors = FormErrors::default();
        let mut bad = row(None, "Anything", None);
        bad.answer_type = Some("rating".to_string());
        assert!(clean_question("questions[0]", &bad, &[], &mut errors).is_none());
        assert!(errors.field_errors.contains_key("questions[0].answer_type"));
    }

    #[test]
    fn competency_must_belong_to_template() {
        let mut errors = FormErrors::default();
        let mut scoped = row(None, "Leads by example", None);
        scoped.competency_id = Some("c9".to_string());
        assert!(clean_question("q", &scoped, &ids(&["c1"]), &mut errors).is_none());

        let mut errors = FormErrors::default();
        scoped.competency_id = Some("c1".to_string());
        let draft = clean_question("q", &scoped, &ids(&["c1"]), &mut errors).expect("valid");
        assert_eq!(draft.competency_id.as_deref(), Some("c1"));
    }
}
