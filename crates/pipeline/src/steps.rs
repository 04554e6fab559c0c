//! Per-dashboard migration state machine.
//!
//! ```text
//! PENDING -> MIGRATING -> MIGRATED [-> PUBLISHING -> PUBLISHED] [-> DELETING -> DELETED]
//!                 \______________\_______________\____________________\-> FAILED
//! ```
//!
//! Every state change that touches the remote workspace is written to the
//! [`Ledger`] and checkpointed before the next call is issued.

use chrono::Utc;
use dashmig_client::{Transport, WorkspaceApi};
use dashmig_core::config::{ExecutionOptions, MigrationOptions};
use dashmig_core::summary::{EntityOutcome, StepCounts};
use dashmig_core::types::DashboardRecord;

use crate::ledger::{Ledger, LedgerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Migrating,
    Migrated,
    Publishing,
    Published,
    Deleting,
    Deleted,
    Failed,
}

impl StepState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Migrating => "migrating",
            Self::Migrated => "migrated",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Migrated | Self::Published | Self::Deleted | Self::Failed
        )
    }
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record moving through the state machine.
struct Entity {
    record: DashboardRecord,
    state: StepState,
}

impl Entity {
    fn advance(&mut self, next: StepState) {
        tracing::debug!(
            legacy_id = %self.record.legacy_id,
            from = %self.state,
            to = %next,
            "Step transition",
        );
        self.state = next;
    }

    fn fail(&mut self, message: String) {
        tracing::error!(
            legacy_id = %self.record.legacy_id,
            step = %self.state,
            error = %message,
            "Migration step failed",
        );
        self.record.push_error(&message);
        self.state = StepState::Failed;
    }
}

/// Drives selected legacy dashboards of one tenant through the steps.
pub struct StepMachine<'a, T> {
    api: &'a WorkspaceApi<T>,
    options: &'a MigrationOptions,
    execution: ExecutionOptions,
}

impl<'a, T: Transport> StepMachine<'a, T> {
    pub fn new(
        api: &'a WorkspaceApi<T>,
        options: &'a MigrationOptions,
        execution: ExecutionOptions,
    ) -> Self {
        Self {
            api,
            options,
            execution,
        }
    }

    /// Run one selected legacy dashboard to a terminal state.
    ///
    /// Remote failures end up on the record; only ledger persistence
    /// failures are returned as errors.
    pub async fn drive(
        &self,
        ledger: &mut Ledger,
        selected: DashboardRecord,
        counts: &mut StepCounts,
    ) -> Result<EntityOutcome, LedgerError> {
        let tenant = selected.tenant.clone();
        let legacy_id = selected.legacy_id.clone();

        if self.execution.resume && ledger.is_migrated(&tenant, &legacy_id) {
            let prior = ledger
                .get(&tenant, &selected.key())
                .cloned()
                .unwrap_or(selected);
            return self.resume(ledger, prior, counts).await;
        }

        if self.execution.dry_run {
            tracing::info!(
                legacy_id = %legacy_id,
                name = %selected.legacy_name,
                publish = self.options.publish,
                delete_legacy = self.options.delete_legacy,
                "[DRY RUN] Would migrate dashboard",
            );
            let record = DashboardRecord {
                migrated: false,
                ..selected
            };
            commit(ledger, &record)?;
            counts.would_migrate += 1;
            return Ok(EntityOutcome::WouldMigrate);
        }

        let mut entity = Entity {
            record: selected,
            state: StepState::Pending,
        };
        entity.advance(StepState::Migrating);

        match self
            .api
            .migrate(&entity.record.legacy_id, &entity.record.legacy_name)
            .await
        {
            Ok(lakeview_id) => {
                tracing::info!(
                    legacy_id = %legacy_id,
                    lakeview_id = %lakeview_id,
                    "Migrated dashboard",
                );
                entity.record.lakeview_id = lakeview_id;
                entity.record.migrated = true;
                entity.record.migrated_at = Some(Utc::now());
                entity.advance(StepState::Migrated);
                counts.migrated += 1;
            }
            Err(e) => {
                entity.record.migrated = false;
                entity.fail(format!("migrate_error: {e}"));
                commit(ledger, &entity.record)?;
                counts.failed += 1;
                return Ok(EntityOutcome::Failed);
            }
        }
        commit(ledger, &entity.record)?;

        self.post_migration(ledger, entity, counts, EntityOutcome::Migrated)
            .await
    }

    /// Re-enter a previously migrated record at its first incomplete step.
    ///
    /// Counted as skipped unless a remaining step fails, in which case it is
    /// counted as failed only.
    async fn resume(
        &self,
        ledger: &mut Ledger,
        record: DashboardRecord,
        counts: &mut StepCounts,
    ) -> Result<EntityOutcome, LedgerError> {
        let pending_publish = self.options.publish && !record.published;
        let pending_delete = self.options.delete_legacy && !record.deleted_legacy;

        if !pending_publish && !pending_delete {
            tracing::info!(legacy_id = %record.legacy_id, "Already migrated, nothing left to do");
            counts.skipped += 1;
            return Ok(EntityOutcome::Skipped);
        }
        if self.execution.dry_run {
            tracing::info!(
                legacy_id = %record.legacy_id,
                publish = pending_publish,
                delete_legacy = pending_delete,
                "[DRY RUN] Would resume remaining steps",
            );
            counts.skipped += 1;
            return Ok(EntityOutcome::Skipped);
        }

        tracing::info!(legacy_id = %record.legacy_id, "Already migrated, resuming remaining steps");
        let mut entity = Entity {
            record,
            state: StepState::Migrated,
        };
        // The error column only describes the most recent attempt.
        entity.record.error.clear();
        let outcome = self
            .post_migration(ledger, entity, counts, EntityOutcome::Skipped)
            .await?;
        if outcome != EntityOutcome::Failed {
            counts.skipped += 1;
        }
        Ok(outcome)
    }

    /// Optional publish and delete steps after MIGRATED.
    async fn post_migration(
        &self,
        ledger: &mut Ledger,
        mut entity: Entity,
        counts: &mut StepCounts,
        mut outcome: EntityOutcome,
    ) -> Result<EntityOutcome, LedgerError> {
        if self.options.publish && !entity.record.published {
            entity.advance(StepState::Publishing);
            let result = if entity.record.lakeview_id.is_empty() {
                Err("no Lakeview id recorded".to_string())
            } else {
                self.api
                    .publish(&entity.record.lakeview_id, self.options.warehouse_id.as_deref())
                    .await
                    .map_err(|e| e.to_string())
            };
            match result {
                Ok(()) => {
                    tracing::info!(lakeview_id = %entity.record.lakeview_id, "Published dashboard");
                    entity.record.published = true;
                    entity.record.published_at = Some(Utc::now());
                    entity.advance(StepState::Published);
                    counts.published += 1;
                    outcome = EntityOutcome::Published;
                }
                Err(e) => {
                    entity.fail(format!("publish_error: {e}"));
                    commit(ledger, &entity.record)?;
                    counts.failed += 1;
                    return Ok(EntityOutcome::Failed);
                }
            }
            commit(ledger, &entity.record)?;
        }

        if self.options.delete_legacy && !entity.record.deleted_legacy {
            entity.advance(StepState::Deleting);
            match self.api.delete_legacy(&entity.record.legacy_id).await {
                Ok(()) => {
                    tracing::info!(
                        legacy_id = %entity.record.legacy_id,
                        "Deleted legacy dashboard",
                    );
                    entity.record.deleted_legacy = true;
                    entity.advance(StepState::Deleted);
                    counts.deleted += 1;
                    outcome = EntityOutcome::Deleted;
                }
                Err(e) => {
                    entity.fail(format!("delete_error: {e}"));
                    commit(ledger, &entity.record)?;
                    counts.failed += 1;
                    return Ok(EntityOutcome::Failed);
                }
            }
            commit(ledger, &entity.record)?;
        }

        debug_assert!(entity.state.is_terminal());
        Ok(outcome)
    }
}

/// Upsert and checkpoint.
fn commit(ledger: &mut Ledger, record: &DashboardRecord) -> Result<(), LedgerError> {
    ledger.upsert(record.clone());
    ledger.checkpoint()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
