//! One tenant: list, select, migrate, then record Lakeview-native dashboards.

use std::collections::HashSet;

use dashmig_client::{Catalog, Transport};
use dashmig_core::config::{ExecutionOptions, MigrationOptions};
use dashmig_core::selection::Selector;
use dashmig_core::summary::TenantSummary;
use tokio_util::sync::CancellationToken;

use crate::ledger::{Ledger, LedgerError};
use crate::steps::StepMachine;

/// Runs the pipeline for a single workspace.
pub struct TenantRunner<'a, T> {
    catalog: Catalog<T>,
    selector: &'a Selector,
    options: &'a MigrationOptions,
    execution: ExecutionOptions,
    cancel: &'a CancellationToken,
}

impl<'a, T: Transport> TenantRunner<'a, T> {
    pub fn new(
        catalog: Catalog<T>,
        selector: &'a Selector,
        options: &'a MigrationOptions,
        execution: ExecutionOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            catalog,
            selector,
            options,
            execution,
            cancel,
        }
    }

    /// Process the tenant.
    ///
    /// Listing failures are reported in the returned summary; only ledger
    /// persistence failures are errors.
    pub async fn run(self, ledger: &mut Ledger) -> Result<TenantSummary, LedgerError> {
        let tenant = self.catalog.tenant().to_string();
        let mut summary = TenantSummary::new(&tenant);

        let legacy = match self.catalog.collect_legacy().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list legacy dashboards");
                summary.failure = Some(e.to_string());
                return Ok(summary);
            }
        };
        summary.legacy_found = legacy.len();

        let selected = self.selector.select(legacy);
        summary.selected = selected.len();
        tracing::info!(
            found = summary.legacy_found,
            selected = summary.selected,
            "Selected legacy dashboards",
        );

        let machine = StepMachine::new(self.catalog.api(), self.options, self.execution);
        for (index, record) in selected.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(processed = index, "Cancelled, stopping before the next dashboard");
                return Ok(summary);
            }
            tracing::info!(
                progress = %format!("{}/{}", index + 1, summary.selected),
                legacy_id = %record.legacy_id,
                name = %record.legacy_name,
                "Processing dashboard",
            );
            machine.drive(ledger, record, &mut summary.counts).await?;
        }

        if self.cancel.is_cancelled() {
            return Ok(summary);
        }

        let lakeview = match self.catalog.collect_lakeview().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list Lakeview dashboards");
                summary.failure = Some(e.to_string());
                return Ok(summary);
            }
        };
        summary.lakeview_found = lakeview.len();

        // Dashboards produced by a recorded migration already have a row.
        let migrated: HashSet<String> = ledger
            .migrated_lakeview_ids(&tenant)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut native = 0usize;
        for record in lakeview {
            if !migrated.contains(&record.lakeview_id) {
                ledger.upsert(record);
                native += 1;
            }
        }
        ledger.checkpoint()?;
        tracing::info!(
            found = summary.lakeview_found,
            native,
            "Recorded Lakeview dashboards",
        );

        Ok(summary)
    }
}
