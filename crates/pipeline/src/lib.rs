//! Migration pipeline: ledger, per-dashboard step machine, tenant runner,
//! and the multi-tenant batch orchestrator.

pub mod batch;
pub mod id_source;
pub mod ledger;
pub mod steps;
pub mod tenant;

pub use batch::{BatchConfig, BatchOrchestrator, BatchOutcome, RunError, DEFAULT_LEDGER_PATH};
pub use ledger::{Ledger, LedgerError};
pub use steps::{StepMachine, StepState};
pub use tenant::TenantRunner;
