//! The `dashmig` command: flag and config-file handling plus the top-level
//! run that wires the pipeline to real HTTP, reporting, and email.

pub mod args;
pub mod file;
pub mod logging;
pub mod settings;

use anyhow::Context;
use dashmig_client::HttpConnector;
use dashmig_core::selection::Selector;
use dashmig_core::summary::RunSummary;
use dashmig_core::types::DashboardRecord;
use dashmig_events::{
    log_summary, render_preview, EmailConfig, EmailDelivery, SummaryEmail, PREVIEW_ROWS,
};
use dashmig_pipeline::id_source::load_id_csv;
use dashmig_pipeline::BatchOrchestrator;
use tokio_util::sync::CancellationToken;

pub use settings::Settings;

/// Run one batch with resolved settings.
///
/// Only configuration and ledger I/O problems are returned as errors;
/// workspace and dashboard failures are recorded in the summary.
pub async fn execute(settings: Settings, cancel: CancellationToken) -> anyhow::Result<RunSummary> {
    let Settings {
        batch,
        mut criteria,
        dashboard_csv,
        email,
        ..
    } = settings;

    if let Some(path) = &dashboard_csv {
        criteria.external_ids = load_id_csv(path)?;
        tracing::info!(
            path = %path.display(),
            ids = criteria.external_ids.len(),
            "Loaded dashboard ids from CSV",
        );
    }
    let selector = Selector::new(&criteria)?;
    if let Some(count) = selector.allowlist_len() {
        tracing::info!(count, "Migrating explicitly listed dashboards only");
    }

    if batch.execution.dry_run {
        tracing::warn!("DRY RUN: no dashboards will be migrated, published, or deleted");
    }

    let connector = HttpConnector::new().context("failed to build HTTP client")?;
    let publish = batch.migration.publish;
    let delete_legacy = batch.migration.delete_legacy;
    let log_file = batch.output_ledger_path().display().to_string();

    let orchestrator = BatchOrchestrator::new(batch, connector);
    let outcome = orchestrator.run(&selector, &cancel).await?;

    let records: Vec<&DashboardRecord> = outcome.ledger.records().collect();
    log_summary(&outcome.summary, &records);
    tracing::info!(path = %log_file, rows = records.len(), "Ledger written");
    println!("{}", render_preview(&records, PREVIEW_ROWS));

    if let Some(config) = email {
        let message = SummaryEmail::render(
            &records,
            publish,
            delete_legacy,
            outcome.summary.dry_run,
            &log_file,
        );
        send_summary(config, &message).await;
    }

    Ok(outcome.summary)
}

/// Email failures are logged and never fail the run.
async fn send_summary(config: EmailConfig, message: &SummaryEmail) {
    if let Err(e) = config.check() {
        tracing::warn!(error = %e, "Email not configured, skipping summary email");
        return;
    }
    if let Err(e) = EmailDelivery::new(config).deliver(message).await {
        tracing::error!(error = %e, "Failed to send summary email");
    }
}
