use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub(crate) const WIZARD_ANSWERS_SAVED: &str = "wizard_answers_saved_total";
pub(crate) const WIZARD_COMPLETIONS: &str = "wizard_completions_total";
pub(crate) const INVITATIONS_DISPATCHED: &str = "invitations_dispatched_total";
pub(crate) const REPORTS_GENERATED: &str = "reports_generated_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(WIZARD_ANSWERS_SAVED, "Answers persisted through the wizard");
    metrics::describe_counter!(WIZARD_COMPLETIONS, "Raters who finished every question");
    metrics::describe_counter!(INVITATIONS_DISPATCHED, "Survey invitation emails queued");
    metrics::describe_counter!(REPORTS_GENERATED, "Respondent reports recomputed");
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
