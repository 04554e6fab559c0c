//! End-of-run reporting: summary log lines and a ledger preview table.

use std::fmt::Write as _;

use dashmig_core::summary::RunSummary;
use dashmig_core::types::DashboardRecord;

/// Rows shown by [`render_preview`] by default.
pub const PREVIEW_ROWS: usize = 10;

const PREVIEW_NAME_WIDTH: usize = 30;

/// Log the overall and per-tenant outcome of a run.
pub fn log_summary(summary: &RunSummary, records: &[&DashboardRecord]) {
    let totals = summary.totals();
    let elapsed_secs = summary
        .finished_at
        .map(|end| (end - summary.started_at).num_milliseconds() as f64 / 1000.0)
        .unwrap_or_default();

    tracing::info!(
        run_id = %summary.run_id,
        tenants = summary.tenants.len(),
        tenant_failures = summary.tenant_failures(),
        records = records.len(),
        migrated = totals.migrated,
        published = totals.published,
        deleted = totals.deleted,
        failed = totals.failed,
        skipped = totals.skipped,
        would_migrate = totals.would_migrate,
        dry_run = summary.dry_run,
        cancelled = summary.cancelled,
        elapsed_secs,
        "Migration run complete",
    );

    for tenant in &summary.tenants {
        match &tenant.failure {
            Some(reason) => tracing::warn!(
                tenant = %tenant.tenant,
                migrated = tenant.counts.migrated,
                reason = %reason,
                "Workspace failed",
            ),
            None => tracing::info!(
                tenant = %tenant.tenant,
                legacy_found = tenant.legacy_found,
                lakeview_found = tenant.lakeview_found,
                selected = tenant.selected,
                migrated = tenant.counts.migrated,
                published = tenant.counts.published,
                deleted = tenant.counts.deleted,
                failed = tenant.counts.failed,
                skipped = tenant.counts.skipped,
                would_migrate = tenant.counts.would_migrate,
                "Workspace summary",
            ),
        }
    }
}

/// Fixed-width table of the first `limit` ledger rows.
pub fn render_preview(records: &[&DashboardRecord], limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<16} {:<name$} {:<16} {:<8} {:<9} {:<7} {:<8} error",
        "workspace",
        "legacy_id",
        "legacy_name",
        "lakeview_id",
        "type",
        "migrated",
        "publish",
        "deleted",
        name = PREVIEW_NAME_WIDTH,
    );
    for record in records.iter().take(limit) {
        let name = if record.legacy_name.is_empty() {
            &record.name
        } else {
            &record.legacy_name
        };
        let _ = writeln!(
            out,
            "{:<12} {:<16} {:<name_width$} {:<16} {:<8} {:<9} {:<7} {:<8} {}",
            record.tenant,
            record.legacy_id,
            clip(name, PREVIEW_NAME_WIDTH),
            record.lakeview_id,
            record.kind.as_str(),
            record.migrated,
            record.published,
            record.deleted_legacy,
            record.error,
            name_width = PREVIEW_NAME_WIDTH,
        );
    }
    if records.len() > limit {
        let _ = writeln!(out, "... {} more rows", records.len() - limit);
    }
    out
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut clipped: String = value.chars().take(width.saturating_sub(3)).collect();
    clipped.push_str("...");
    clipped
}
