use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, today_utc};
use crate::core::{bootstrap, security};
use crate::db::models::User;
use crate::db::types::{AnswerType, RelationshipType, SurveyStatus};
use crate::repositories;
use crate::repositories::questions::QuestionOwner;
use crate::schemas::survey::RespondentInput;
use crate::services::access::{ADMIN_ROLE, EMPLOYEE_ROLE, LEADER_ROLE, MANAGER_ROLE};
use crate::services::{answer_forms, reports, surveys};

const DEMO_PASSWORD: &str = "demo-password";
const DEMO_TEMPLATE: &str = "Demo leadership review";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    CheckSurveys,
    FixSortOrders,
    GenerateReports,
    ResetRaters,
    SeedDemo,
}

impl Command {
    pub(crate) const NAMES: [&'static str; 5] =
        ["check-surveys", "fix-sort-orders", "generate-reports", "reset-raters", "seed-demo"];

    pub(crate) fn parse(name: &str) -> Result<Self> {
        Ok(match name.trim() {
            "check-surveys" => Self::CheckSurveys,
            "fix-sort-orders" => Self::FixSortOrders,
            "generate-reports" => Self::GenerateReports,
            "reset-raters" => Self::ResetRaters,
            "seed-demo" => Self::SeedDemo,
            other => bail!("Unknown command '{other}'; expected one of {}", Self::NAMES.join(", ")),
        })
    }
}

pub(crate) async fn execute(state: &AppState, command: Command) -> Result<String> {
    tracing::info!(command = ?command, "Running maintenance command");
    match command {
        Command::CheckSurveys => check_surveys(state).await,
        Command::FixSortOrders => fix_sort_orders(state).await,
        Command::GenerateReports => generate_reports(state).await,
        Command::ResetRaters => reset_raters(state).await,
        Command::SeedDemo => seed_demo(state).await,
    }
}

async fn check_surveys(state: &AppState) -> Result<String> {
    let surveys = repositories::surveys::list_all(state.db()).await.context("Failed to list surveys")?;
    let mut report = String::new();
    let mut empty = 0usize;

    for survey in &surveys {
        let template_name = repositories::templates::find_by_id(state.db(), &survey.template_id)
            .await?
            .map(|template| template.name)
            .unwrap_or_else(|| "<missing template>".to_string());
        let questions = repositories::questions::ordered_ids_for_survey(
            state.db(),
            &survey.id,
            &survey.template_id,
        )
        .await?;

        let marker = if questions.is_empty() {
            empty += 1;
            " [no questions]"
        } else {
            ""
        };
        writeln!(
            report,
            "{} ({}) template={} questions={}{marker}",
            survey.name,
            survey.status.as_str(),
            template_name,
            questions.len()
        )?;
    }

    write!(report, "{} surveys checked, {empty} without questions", surveys.len())?;
    Ok(report)
}

async fn fix_sort_orders(state: &AppState) -> Result<String> {
    let mut tx = state.db().begin().await?;
    let mut changed = 0u64;

    let template_ids = repositories::templates::list_ids(state.db()).await?;
    for id in &template_ids {
        changed += repositories::questions::renumber(&mut *tx, QuestionOwner::Template(id)).await?;
    }
    let surveys = repositories::surveys::list_all(state.db()).await?;
    for survey in &surveys {
        changed += repositories::questions::renumber(&mut *tx, QuestionOwner::Survey(&survey.id))
            .await?;
    }
    tx.commit().await?;

    Ok(format!(
        "Renumbered {changed} questions across {} templates and {} surveys",
        template_ids.len(),
        surveys.len()
    ))
}

async fn regenerate_all(state: &AppState) -> Result<usize> {
    let ids = repositories::respondents::list_ids(state.db()).await?;
    let mut generated = 0usize;
    for id in &ids {
        if reports::regenerate(state.db(), id, None).await?.is_some() {
            generated += 1;
        }
    }
    Ok(generated)
}

async fn generate_reports(state: &AppState) -> Result<String> {
    let generated = regenerate_all(state).await?;
    Ok(format!("Regenerated {generated} reports"))
}

/// Clears every response, then rebuilds reports so none reflect deleted answers.
async fn reset_raters(state: &AppState) -> Result<String> {
    let mut tx = state.db().begin().await?;
    let raters = repositories::raters::reset_started(&mut *tx).await?;
    let responses = repositories::responses::delete_all(&mut *tx).await?;
    let respondents = repositories::respondents::reset_in_progress(&mut *tx).await?;
    tx.commit().await?;

    let reports = regenerate_all(state).await.context("Failed to refresh reports after reset")?;

    tracing::info!(
        action = "raters_reset",
        raters,
        responses,
        respondents,
        reports,
        "Rater progress cleared"
    );
    Ok(format!(
        "Reset {raters} raters and {respondents} respondents, deleted {responses} responses, \
         regenerated {reports} reports"
    ))
}

async fn demo_user(
    state: &AppState,
    username: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> Result<User> {
    if let Some(user) = repositories::users::find_by_username(state.db(), username).await? {
        return Ok(user);
    }

    let now = primitive_now_utc();
    let email = format!("{username}@example.com");
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            email: &email,
            first_name,
            last_name,
            position: "",
            department: "Demo",
            hashed_password: security::hash_password(DEMO_PASSWORD)?,
            is_superuser: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    let role = repositories::roles::ensure(state.db(), role, "").await?;
    repositories::roles::grant(state.db(), &user.id, &role.id).await?;
    Ok(user)
}

async fn seed_demo(state: &AppState) -> Result<String> {
    bootstrap::ensure_roles(state).await?;

    let existing = repositories::templates::list(state.db()).await?;
    if existing.iter().any(|template| template.name == DEMO_TEMPLATE) {
        return Ok("Demo data already present".to_string());
    }

    let admin = demo_user(state, "demo_admin", "Alice", "Admin", ADMIN_ROLE).await?;
    let leader = demo_user(state, "demo_leader", "Leo", "Leader", LEADER_ROLE).await?;
    let manager = demo_user(state, "demo_manager", "Mira", "Manager", MANAGER_ROLE).await?;
    let first = demo_user(state, "demo_employee1", "Egor", "Employee", EMPLOYEE_ROLE).await?;
    let second = demo_user(state, "demo_employee2", "Eva", "Employee", EMPLOYEE_ROLE).await?;

    let now = primitive_now_utc();
    let template = repositories::templates::create(
        state.db(),
        repositories::templates::CreateTemplate {
            id: &Uuid::new_v4().to_string(),
            name: DEMO_TEMPLATE,
            description: "Sample template created by seed-demo",
            is_active: true,
            created_by: Some(admin.id.as_str()),
            created_at: now,
        },
    )
    .await?;

    let competencies = [("Communication", "Soft skills"), ("Delivery", "Execution")];
    let questions = [
        (0, "Shares information openly with the team", AnswerType::Scale),
        (0, "How often does the colleague ask for feedback?", AnswerType::Multiple),
        (1, "Meets agreed deadlines", AnswerType::Scale),
        (1, "What should the colleague keep doing?", AnswerType::Text),
    ];

    let mut competency_ids = Vec::with_capacity(competencies.len());
    for (index, (name, category)) in competencies.iter().enumerate() {
        let competency = repositories::competencies::create(
            state.db(),
            repositories::competencies::CreateCompetency {
                id: &Uuid::new_v4().to_string(),
                template_id: &template.id,
                name,
                category,
                weight: 1.0,
                sort_order: index as i32 + 1,
            },
        )
        .await?;
        competency_ids.push(competency.id);
    }

    for (position, (competency, text, answer_type)) in questions.iter().enumerate() {
        let (scale_min, scale_max) = match answer_type {
            AnswerType::Scale => (Some(1), Some(5)),
            _ => (None, None),
        };
        repositories::questions::create(
            state.db(),
            repositories::questions::CreateQuestion {
                id: &Uuid::new_v4().to_string(),
                owner: QuestionOwner::Template(&template.id),
                competency_id: Some(competency_ids[*competency].as_str()),
                text,
                answer_type: *answer_type,
                scale_min,
                scale_max,
                choices: answer_forms::default_choices(),
                is_required: true,
                sort_order: position as i32 + 1,
                created_at: now,
            },
        )
        .await?;
    }

    let today = today_utc();
    let survey = repositories::surveys::create(
        state.db(),
        repositories::surveys::CreateSurvey {
            id: &Uuid::new_v4().to_string(),
            name: "Demo 360 review",
            description: "Seeded survey",
            template_id: &template.id,
            start_date: today,
            end_date: today + time::Duration::days(14),
            status: SurveyStatus::Active,
            created_by: Some(leader.id.as_str()),
            created_at: now,
        },
    )
    .await?;

    let assignments = [(&first, &second), (&second, &first)];
    for (target, peer) in assignments {
        let respondent = surveys::add_respondent(
            state,
            &survey,
            &RespondentInput { user_id: target.id.clone(), manager_id: Some(manager.id.clone()) },
        )
        .await
        .map_err(|err| anyhow::anyhow!("Failed to add demo respondent: {err}"))?;

        for (user, relationship_type) in [
            (target, RelationshipType::SelfAssessment),
            (peer, RelationshipType::Peer),
            (&manager, RelationshipType::Manager),
        ] {
            repositories::raters::create(
                state.db(),
                repositories::raters::CreateRater {
                    id: &Uuid::new_v4().to_string(),
                    respondent_id: &respondent.id,
                    user_id: &user.id,
                    relationship_type,
                    created_at: now,
                },
            )
            .await?;
        }
    }

    tracing::info!(action = "demo_seeded", survey_id = %survey.id, "Demo data created");
    Ok(format!(
        "Seeded demo survey '{}' with 2 respondents; demo users share the password '{DEMO_PASSWORD}'",
        survey.name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("check-surveys").unwrap(), Command::CheckSurveys);
        assert_eq!(Command::parse(" seed-demo ").unwrap(), Command::SeedDemo);
        for name in Command::NAMES {
            assert!(Command::parse(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn unknown_command_lists_choices() {
        let err = Command::parse("drop-everything").unwrap_err().to_string();
        assert!(err.contains("drop-everything"));
        assert!(err.contains("reset-raters"));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL test database"]
    async fn reset_raters_refreshes_stale_reports() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let employee = test_support::insert_user(db, "worker", "secret-password").await;
        let peer = test_support::insert_user(db, "peer", "secret-password").await;
        let (template, questions) =
            test_support::insert_template(db, "Reset", &[("Q1", AnswerType::Scale)]).await;
        let survey = test_support::insert_survey(db, &template, SurveyStatus::Active, None).await;
        let respondent = test_support::insert_respondent(&ctx.state, &survey, &employee, None).await;
        let rater = test_support::insert_rater(db, &respondent, &peer, RelationshipType::Peer).await;

        sqlx::query(
            "INSERT INTO responses (id, rater_id, question_id, answer_value, answered_at, updated_at)
             VALUES ($1, $2, $3, 4, NOW(), NOW())",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&rater.id)
        .bind(&questions[0].id)
        .execute(db)
        .await
        .unwrap();
        let before = reports::regenerate(db, &respondent.id, None).await.unwrap().unwrap();
        assert_eq!(before.report_data.0["average_score"], 4.0);

        let summary = execute(&ctx.state, Command::ResetRaters).await.unwrap();
        assert!(summary.contains("deleted 1 responses"), "{summary}");
        assert!(summary.contains("regenerated 1 reports"), "{summary}");

        let after = repositories::reports::find_for_respondent(db, &respondent.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.report_data.0["answered_questions"], 0);
        assert_ne!(after.report_data.0["average_score"], 4.0);
    }
}
