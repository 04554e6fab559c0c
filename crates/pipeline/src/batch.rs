//! Sequential multi-tenant batch run.

use std::path::PathBuf;

use dashmig_client::{Catalog, Connector, RetryPolicy, WorkspaceApi};
use dashmig_core::config::{normalize_host, ExecutionOptions, MigrationOptions, TenantConfig};
use dashmig_core::error::ConfigError;
use dashmig_core::selection::Selector;
use dashmig_core::summary::{RunSummary, TenantSummary};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::ledger::{Ledger, LedgerError};
use crate::tenant::TenantRunner;

/// Default location of the persisted ledger.
pub const DEFAULT_LEDGER_PATH: &str = "data/dashboard_migration_log.csv";

/// A fatal run error. Tenant and entity failures are never fatal.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Everything a batch run needs, resolved from flags, file, and environment.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub tenants: Vec<TenantConfig>,
    pub migration: MigrationOptions,
    pub execution: ExecutionOptions,
    pub retry: RetryPolicy,
    pub ledger_path: PathBuf,
}

impl BatchConfig {
    /// Reject configurations that must not reach the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenants.is_empty() {
            return Err(ConfigError::NoWorkspaces);
        }
        self.migration.validate()?;
        for tenant in &self.tenants {
            if let Some(options) = &tenant.migration {
                options.validate()?;
            }
        }
        Ok(())
    }

    /// Where this run writes its ledger.
    ///
    /// A dry run writes beside `ledger_path` (`<stem>.dry_run.<ext>`) so the
    /// resume state recorded by earlier real runs is left intact.
    pub fn output_ledger_path(&self) -> PathBuf {
        if !self.execution.dry_run {
            return self.ledger_path.clone();
        }
        let stem = self
            .ledger_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match self.ledger_path.extension() {
            Some(ext) => format!("{stem}.{DRY_RUN_SUFFIX}.{}", ext.to_string_lossy()),
            None => format!("{stem}.{DRY_RUN_SUFFIX}"),
        };
        self.ledger_path.with_file_name(name)
    }
}

const DRY_RUN_SUFFIX: &str = "dry_run";

/// Result of a completed (possibly cancelled) batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub summary: RunSummary,
    pub ledger: Ledger,
}

/// Runs every configured tenant one after another against a shared ledger.
pub struct BatchOrchestrator<C> {
    config: BatchConfig,
    connector: C,
}

impl<C: Connector> BatchOrchestrator<C> {
    pub fn new(config: BatchConfig, connector: C) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn run(
        &self,
        selector: &Selector,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, RunError> {
        self.config.validate()?;

        let execution = self.config.execution;
        let ledger = if execution.resume {
            Ledger::load(&self.config.ledger_path)?
        } else {
            Ledger::new()
        };
        let output = self.config.output_ledger_path();
        let path = output.as_path();
        let mut ledger = ledger.with_checkpoint(path);
        let mut summary = RunSummary::start(execution.dry_run);

        tracing::info!(
            run_id = %summary.run_id,
            tenants = self.config.tenants.len(),
            dry_run = execution.dry_run,
            resume = execution.resume,
            ledger = %path.display(),
            "Starting dashboard migration",
        );

        for tenant in &self.config.tenants {
            if cancel.is_cancelled() {
                tracing::warn!("Cancelled, skipping remaining workspaces");
                break;
            }
            let span = tracing::info_span!("tenant", tenant = %tenant.name);
            let tenant_summary = self
                .run_tenant(tenant, selector, &mut ledger, cancel)
                .instrument(span)
                .await?;
            summary.tenants.push(tenant_summary);
        }

        summary.cancelled = cancel.is_cancelled();
        ledger.persist(path)?;
        summary.finish();
        Ok(BatchOutcome { summary, ledger })
    }

    async fn run_tenant(
        &self,
        tenant: &TenantConfig,
        selector: &Selector,
        ledger: &mut Ledger,
        cancel: &CancellationToken,
    ) -> Result<TenantSummary, LedgerError> {
        let host = match normalize_host(&tenant.host) {
            Ok(host) => host,
            Err(e) => {
                tracing::error!(error = %e, "Skipping workspace");
                return Ok(TenantSummary::failed(&tenant.name, e.to_string()));
            }
        };
        if tenant.credential.trim().is_empty() {
            tracing::error!("Skipping workspace without a token");
            return Ok(TenantSummary::failed(&tenant.name, "missing token"));
        }

        tracing::info!(host = %host, "Processing workspace");
        let transport = self.connector.connect(&tenant.name, &host, &tenant.credential);
        let catalog = Catalog::new(WorkspaceApi::new(transport, self.config.retry), &tenant.name);
        let options = tenant.effective_migration(&self.config.migration);

        let summary = TenantRunner::new(catalog, selector, options, self.config.execution, cancel)
            .run(ledger)
            .await?;

        tracing::info!(
            selected = summary.selected,
            migrated = summary.counts.migrated,
            published = summary.counts.published,
            deleted = summary.counts.deleted,
            failed = summary.counts.failed,
            skipped = summary.counts.skipped,
            "Workspace complete",
        );
        Ok(summary)
    }
}
