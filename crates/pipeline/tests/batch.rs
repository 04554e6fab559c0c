mod common;

use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use common::{read, FakeConnector, FakeWorkspace};
use dashmig_client::RetryPolicy;
use dashmig_core::config::{ExecutionOptions, MigrationOptions, TenantConfig};
use dashmig_core::selection::{SelectionCriteria, Selector};
use dashmig_core::types::{DashboardKind, RecordKey};
use dashmig_pipeline::{BatchConfig, BatchOrchestrator, BatchOutcome, Ledger, RunError};
use tokio_util::sync::CancellationToken;

fn tenant(name: &str) -> TenantConfig {
    TenantConfig::new(name, format!("https://{name}.example.com/"), "token")
}

fn publish_and_delete() -> MigrationOptions {
    MigrationOptions {
        publish: true,
        delete_legacy: true,
        warehouse_id: None,
    }
}

fn sales_workspace() -> FakeWorkspace {
    FakeWorkspace::new()
        .with_legacy("1", "Revenue", "/Users/alice", "alice")
        .with_legacy("2", "Churn", "/Users/bob", "bob")
        .with_legacy("3", "Ops", "/Teams/ops", "carol")
        .with_lakeview("native-1", "Already Lakeview", "/Shared")
}

struct Harness {
    _dir: tempfile::TempDir,
    ledger_path: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("data").join("ledger.csv");
        Self {
            _dir: dir,
            ledger_path,
        }
    }

    fn config(
        &self,
        tenants: Vec<TenantConfig>,
        migration: MigrationOptions,
        execution: ExecutionOptions,
    ) -> BatchConfig {
        BatchConfig {
            tenants,
            migration,
            execution,
            retry: RetryPolicy::immediate(0),
            ledger_path: self.ledger_path.clone(),
        }
    }

    async fn run(
        &self,
        config: BatchConfig,
        connector: FakeConnector,
        selector: &Selector,
    ) -> BatchOutcome {
        BatchOrchestrator::new(config, connector)
            .run(selector, &CancellationToken::new())
            .await
            .unwrap()
    }

    fn path(&self) -> &Path {
        &self.ledger_path
    }
}

const RESUME: ExecutionOptions = ExecutionOptions {
    dry_run: false,
    resume: true,
};

#[tokio::test]
async fn full_run_records_migrated_and_native_dashboards() {
    let harness = Harness::new();
    let workspace = sales_workspace();
    let connector = FakeConnector::default().with("prod", workspace.clone());
    let config = harness.config(
        vec![tenant("prod")],
        publish_and_delete(),
        ExecutionOptions::default(),
    );

    let outcome = harness.run(config, connector, &Selector::all()).await;

    let totals = outcome.summary.totals();
    assert_eq!((totals.migrated, totals.published, totals.deleted), (3, 3, 3));
    assert_eq!(outcome.summary.tenant_failures(), 0);

    let ledger = Ledger::load(harness.path()).unwrap();
    // three legacy-origin rows plus the Lakeview-native one
    assert_eq!(ledger.len(), 4);
    let row = ledger.get("prod", &RecordKey::Legacy("1".into())).unwrap();
    assert_eq!(row.lakeview_id, "lv-1");
    assert!(row.migrated && row.published && row.deleted_legacy);
    let native = ledger
        .get("prod", &RecordKey::Lakeview("native-1".into()))
        .unwrap();
    assert_eq!(native.kind, DashboardKind::Lakeview);
    assert_eq!(native.path, "/Shared");
    assert!(native.legacy_id.is_empty());
    assert!(native.migrated);
}

#[tokio::test]
async fn resumed_run_is_idempotent() {
    let harness = Harness::new();
    let workspace = sales_workspace();
    let connector = FakeConnector::default().with("prod", workspace.clone());

    let first = harness.config(
        vec![tenant("prod")],
        publish_and_delete(),
        ExecutionOptions::default(),
    );
    harness.run(first, connector.clone(), &Selector::all()).await;
    let after_first = read(harness.path());

    let second = harness.config(vec![tenant("prod")], publish_and_delete(), RESUME);
    let outcome = harness.run(second, connector, &Selector::all()).await;
    let after_second = read(harness.path());

    assert_eq!(after_first, after_second);
    assert_eq!(outcome.summary.totals().migrated, 0);
    for id in ["1", "2", "3"] {
        assert_eq!(workspace.calls("migrate", id), 1);
        assert_eq!(workspace.calls("delete", id), 1);
    }
}

#[tokio::test]
async fn failing_tenant_does_not_affect_others() {
    let harness = Harness::new();
    let connector = FakeConnector::default()
        .with("a", FakeWorkspace::new().with_legacy("1", "A", "/Users/a", "a"))
        .with(
            "b",
            FakeWorkspace::new()
                .with_legacy("1", "B", "/Users/b", "b")
                .failing_listing(),
        )
        .with("c", FakeWorkspace::new().with_legacy("1", "C", "/Users/c", "c"));
    let config = harness.config(
        vec![tenant("a"), tenant("b"), tenant("c")],
        MigrationOptions::default(),
        ExecutionOptions::default(),
    );

    let outcome = harness.run(config, connector, &Selector::all()).await;

    assert_eq!(outcome.summary.tenant_failures(), 1);
    assert!(outcome.summary.tenants[1].is_failure());
    let ledger = Ledger::load(harness.path()).unwrap();
    for name in ["a", "c"] {
        assert!(ledger.is_migrated(name, "1"), "tenant {name} not migrated");
    }
    assert_eq!(ledger.tenant_records("b").count(), 0);
}

#[tokio::test]
async fn migrate_is_never_reissued_after_publish_failure() {
    let harness = Harness::new();
    let workspace = FakeWorkspace::new().with_legacy("1", "A", "/Users/a", "a");
    workspace.set_publish_status(Some(500));
    let connector = FakeConnector::default().with("prod", workspace.clone());

    let first = harness.config(
        vec![tenant("prod")],
        publish_and_delete(),
        ExecutionOptions::default(),
    );
    harness.run(first, connector.clone(), &Selector::all()).await;

    let ledger = Ledger::load(harness.path()).unwrap();
    let row = ledger.get("prod", &RecordKey::Legacy("1".into())).unwrap();
    assert!(row.migrated);
    assert!(row.error.starts_with("publish_error: "));
    assert!(!row.deleted_legacy);
    assert_eq!(workspace.calls("delete", "1"), 0);

    workspace.set_publish_status(None);
    for _ in 0..2 {
        let resumed = harness.config(vec![tenant("prod")], publish_and_delete(), RESUME);
        harness.run(resumed, connector.clone(), &Selector::all()).await;
    }

    assert_eq!(workspace.calls("migrate", "1"), 1);
    assert_eq!(workspace.calls("delete", "1"), 1);
    let ledger = Ledger::load(harness.path()).unwrap();
    let row = ledger.get("prod", &RecordKey::Legacy("1".into())).unwrap();
    assert!(row.published && row.deleted_legacy);
    assert!(row.error.is_empty());
}

#[tokio::test]
async fn exhausted_retries_leave_entity_failed() {
    let harness = Harness::new();
    let workspace = FakeWorkspace::new().with_legacy("1", "A", "/Users/a", "a");
    workspace.set_migrate_status(Some(500));
    let connector = FakeConnector::default().with("prod", workspace.clone());
    let mut config = harness.config(
        vec![tenant("prod")],
        MigrationOptions::default(),
        ExecutionOptions::default(),
    );
    config.retry = RetryPolicy::immediate(3);

    let outcome = harness.run(config, connector, &Selector::all()).await;

    assert_eq!(workspace.calls("migrate", "1"), 4);
    assert_eq!(outcome.summary.totals().failed, 1);
    let row = outcome
        .ledger
        .get("prod", &RecordKey::Legacy("1".into()))
        .unwrap();
    assert!(!row.migrated);
    assert!(row.error.starts_with("migrate_error: "));
}

#[tokio::test]
async fn dry_run_changes_nothing_remotely() {
    let harness = Harness::new();
    let workspace = sales_workspace();
    let connector = FakeConnector::default().with("prod", workspace.clone());
    let config = harness.config(
        vec![tenant("prod")],
        publish_and_delete(),
        ExecutionOptions {
            dry_run: true,
            resume: false,
        },
    );

    let dry_run_path = config.output_ledger_path();

    let outcome = harness.run(config, connector, &Selector::all()).await;

    for kind in ["migrate", "publish", "delete"] {
        assert_eq!(workspace.total_calls(kind), 0, "{kind} issued during dry run");
    }
    assert!(outcome.summary.dry_run);
    assert_eq!(outcome.summary.totals().would_migrate, 3);
    let ledger = Ledger::load(&dry_run_path).unwrap();
    let legacy_rows: Vec<_> = ledger
        .records()
        .filter(|r| !r.legacy_id.is_empty())
        .collect();
    assert_eq!(legacy_rows.len(), 3);
    assert!(legacy_rows.iter().all(|r| !r.migrated));
}

#[tokio::test]
async fn path_filter_limits_migration() {
    let harness = Harness::new();
    let workspace = sales_workspace();
    let connector = FakeConnector::default().with("prod", workspace.clone());
    let config = harness.config(
        vec![tenant("prod")],
        MigrationOptions::default(),
        ExecutionOptions::default(),
    );
    let selector = Selector::new(&SelectionCriteria {
        filter_path: Some("/Users/.*".into()),
        ..Default::default()
    })
    .unwrap();

    let outcome = harness.run(config, connector, &selector).await;

    assert_eq!(outcome.summary.tenants[0].selected, 2);
    assert_eq!(workspace.calls("migrate", "3"), 0);
    assert!(outcome.ledger.is_migrated("prod", "1"));
    assert!(outcome.ledger.is_migrated("prod", "2"));
    // unselected legacy dashboards are not recorded
    assert!(outcome
        .ledger
        .get("prod", &RecordKey::Legacy("3".into()))
        .is_none());
}

#[tokio::test]
async fn invalid_host_skips_only_that_tenant() {
    let harness = Harness::new();
    let connector = FakeConnector::default()
        .with("good", FakeWorkspace::new().with_legacy("1", "A", "/Users/a", "a"));
    let bad = TenantConfig::new("bad", "bad.example.com", "token");
    let config = harness.config(
        vec![bad, tenant("good")],
        MigrationOptions::default(),
        ExecutionOptions::default(),
    );

    let outcome = harness.run(config, connector, &Selector::all()).await;

    assert_eq!(outcome.summary.tenant_failures(), 1);
    assert!(outcome.ledger.is_migrated("good", "1"));
}

#[tokio::test]
async fn cancelled_run_processes_no_tenants() {
    let harness = Harness::new();
    let workspace = sales_workspace();
    let connector = FakeConnector::default().with("prod", workspace.clone());
    let config = harness.config(
        vec![tenant("prod")],
        MigrationOptions::default(),
        ExecutionOptions::default(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = BatchOrchestrator::new(config, connector)
        .run(&Selector::all(), &cancel)
        .await
        .unwrap();

    assert!(outcome.summary.cancelled);
    assert!(outcome.summary.tenants.is_empty());
    assert_eq!(workspace.total_calls("migrate"), 0);
    // the ledger is still written, with just its header
    assert_eq!(read(harness.path()).lines().count(), 1);
}

#[tokio::test]
async fn dry_run_keeps_the_resume_ledger() {
    let harness = Harness::new();
    let workspace = sales_workspace();
    let connector = FakeConnector::default().with("prod", workspace.clone());
    let real = harness.config(
        vec![tenant("prod")],
        MigrationOptions::default(),
        ExecutionOptions::default(),
    );
    harness.run(real, connector.clone(), &Selector::all()).await;
    let before = read(harness.path());

    let dry = harness.config(
        vec![tenant("prod")],
        MigrationOptions::default(),
        ExecutionOptions {
            dry_run: true,
            resume: false,
        },
    );
    let dry_run_path = dry.output_ledger_path();
    harness.run(dry, connector, &Selector::all()).await;

    assert_eq!(read(harness.path()), before);
    assert_ne!(dry_run_path, harness.path());
    assert!(dry_run_path.exists());
    let ledger = Ledger::load(harness.path()).unwrap();
    for id in ["1", "2", "3"] {
        assert!(ledger.is_migrated("prod", id));
    }
}

#[tokio::test]
async fn ledger_write_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let workspace = sales_workspace();
    let connector = FakeConnector::default().with("prod", workspace.clone());
    let config = BatchConfig {
        tenants: vec![tenant("prod")],
        migration: MigrationOptions::default(),
        execution: ExecutionOptions::default(),
        retry: RetryPolicy::immediate(0),
        ledger_path: blocker.join("ledger.csv"),
    };

    let result = BatchOrchestrator::new(config, connector)
        .run(&Selector::all(), &CancellationToken::new())
        .await;

    assert_matches!(result, Err(RunError::Ledger(_)));
    // the run stops at the first step it cannot checkpoint
    assert_eq!(workspace.total_calls("migrate"), 1);
}

#[tokio::test]
async fn migration_is_checkpointed_before_publish() {
    let harness = Harness::new();
    let workspace = FakeWorkspace::new().with_legacy("1", "A", "/Users/a", "a");
    workspace.snapshot_ledger_on_publish(harness.path());
    let connector = FakeConnector::default().with("prod", workspace.clone());
    let config = harness.config(
        vec![tenant("prod")],
        MigrationOptions {
            publish: true,
            delete_legacy: false,
            warehouse_id: None,
        },
        ExecutionOptions::default(),
    );

    harness.run(config, connector, &Selector::all()).await;

    let snapshots = workspace.publish_snapshots();
    assert_eq!(snapshots.len(), 1);
    let row = snapshots[0]
        .get("prod", &RecordKey::Legacy("1".into()))
        .unwrap();
    assert!(row.migrated);
    assert_eq!(row.lakeview_id, "lv-1");
    assert!(!row.published);
}
