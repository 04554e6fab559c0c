//! Run summary built by the batch orchestrator and consumed by reporting.

use serde::Serialize;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// EntityOutcome
// ---------------------------------------------------------------------------

/// Terminal result of driving one entity through the step machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityOutcome {
    /// Migrated; no further step requested.
    Migrated,
    /// Migrated and published; delete not requested.
    Published,
    /// Legacy dashboard deleted after migration.
    Deleted,
    /// A step failed; the error is recorded on the entity.
    Failed,
    /// Already migrated in a previous run and nothing left to do.
    Skipped,
    /// Dry run: would have been migrated.
    WouldMigrate,
}

impl EntityOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Migrated => "migrated",
            Self::Published => "published",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::WouldMigrate => "would_migrate",
        }
    }
}

// ---------------------------------------------------------------------------
// StepCounts
// ---------------------------------------------------------------------------

/// Counters of effectful transitions performed during a run.
///
/// `migrated`, `published`, and `deleted` count calls that succeeded in
/// this run, so an entity that was migrated and published counts once in
/// each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepCounts {
    pub migrated: usize,
    pub published: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub would_migrate: usize,
}

impl StepCounts {
    pub fn add(&mut self, other: &StepCounts) {
        self.migrated += other.migrated;
        self.published += other.published;
        self.deleted += other.deleted;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.would_migrate += other.would_migrate;
    }
}

// ---------------------------------------------------------------------------
// TenantSummary
// ---------------------------------------------------------------------------

/// Outcome of one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TenantSummary {
    pub tenant: String,
    pub legacy_found: usize,
    pub lakeview_found: usize,
    pub selected: usize,
    pub counts: StepCounts,
    /// Set when the tenant aborted (listing failure, invalid host, ...).
    pub failure: Option<String>,
}

impl TenantSummary {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            ..Default::default()
        }
    }

    pub fn failed(tenant: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(tenant)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// Whole-batch summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: uuid::Uuid,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    pub dry_run: bool,
    /// True when the run stopped early on cancellation.
    pub cancelled: bool,
    pub tenants: Vec<TenantSummary>,
}

impl RunSummary {
    pub fn start(dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            finished_at: None,
            dry_run,
            cancelled: false,
            tenants: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now());
    }

    /// Counters summed over every tenant.
    pub fn totals(&self) -> StepCounts {
        let mut totals = StepCounts::default();
        for tenant in &self.tenants {
            totals.add(&tenant.counts);
        }
        totals
    }

    pub fn tenant_failures(&self) -> usize {
        self.tenants.iter().filter(|t| t.is_failure()).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_tenants() {
        let mut summary = RunSummary::start(false);
        let mut a = TenantSummary::new("a");
        a.counts.migrated = 2;
        a.counts.failed = 1;
        let mut b = TenantSummary::new("b");
        b.counts.migrated = 3;
        b.counts.skipped = 4;
        summary.tenants = vec![a, b, TenantSummary::failed("c", "listing failed")];

        let totals = summary.totals();
        assert_eq!(totals.migrated, 5);
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.skipped, 4);
        assert_eq!(summary.tenant_failures(), 1);
    }

    #[test]
    fn finish_sets_timestamp() {
        let mut summary = RunSummary::start(true);
        assert!(summary.finished_at.is_none());
        summary.finish();
        assert!(summary.finished_at.is_some());
        assert!(summary.dry_run);
    }

    #[test]
    fn outcome_names() {
        assert_eq!(EntityOutcome::WouldMigrate.as_str(), "would_migrate");
        assert_eq!(EntityOutcome::Deleted.as_str(), "deleted");
    }
}
