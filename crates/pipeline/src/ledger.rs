//! Persistent per-dashboard migration state.
//!
//! The ledger is a CSV table with one row per (tenant, key). It is loaded at
//! start-up for resume, mutated in memory by the step machine, and rewritten
//! in full on every persist. Rewrites go through a temporary file in the
//! destination directory that is renamed into place, so readers only ever see
//! a complete file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use dashmig_core::types::{DashboardRecord, RecordKey, LEDGER_COLUMNS};

/// Ledger persistence failure. Always fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write ledger {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on ledger {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

type LedgerKey = (String, RecordKey);

/// In-memory ledger, ordered by (tenant, key).
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: BTreeMap<LedgerKey, DashboardRecord>,
    checkpoint: Option<PathBuf>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a persisted ledger. A missing file yields an empty ledger.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        if !path.exists() {
            tracing::info!(path = %path.display(), "No existing ledger, starting fresh");
            return Ok(ledger);
        }

        let read_err = |source| LedgerError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(read_err)?;

        for row in reader.deserialize::<DashboardRecord>() {
            let record = row.map_err(read_err)?;
            if record.legacy_id.is_empty() && record.lakeview_id.is_empty() {
                tracing::warn!(tenant = %record.tenant, "Ignoring ledger row without any id");
                continue;
            }
            ledger.upsert(record);
        }

        tracing::info!(path = %path.display(), records = ledger.len(), "Loaded ledger");
        Ok(ledger)
    }

    /// Persist to `path` after every step-machine upsert.
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    pub fn checkpoint_path(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }

    /// Insert or overwrite the row for the record's (tenant, key).
    pub fn upsert(&mut self, record: DashboardRecord) {
        let key = (record.tenant.clone(), record.key());
        self.records.insert(key, record);
    }

    pub fn get(&self, tenant: &str, key: &RecordKey) -> Option<&DashboardRecord> {
        self.records.get(&(tenant.to_string(), key.clone()))
    }

    /// True iff the legacy dashboard has a row with `migrated == true`.
    pub fn is_migrated(&self, tenant: &str, legacy_id: &str) -> bool {
        self.get(tenant, &RecordKey::Legacy(legacy_id.to_string()))
            .is_some_and(|r| r.migrated)
    }

    /// Lakeview ids produced by migrations recorded for `tenant`.
    pub fn migrated_lakeview_ids<'a>(&'a self, tenant: &'a str) -> Vec<&'a str> {
        self.tenant_records(tenant)
            .filter(|r| !r.legacy_id.is_empty() && !r.lakeview_id.is_empty())
            .map(|r| r.lakeview_id.as_str())
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &DashboardRecord> {
        self.records.values()
    }

    pub fn tenant_records<'a>(
        &'a self,
        tenant: &'a str,
    ) -> impl Iterator<Item = &'a DashboardRecord> {
        self.records
            .iter()
            .filter(move |((t, _), _)| t == tenant)
            .map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rewrite the whole ledger at `path` atomically.
    pub fn persist(&self, path: &Path) -> Result<(), LedgerError> {
        let io_err = |source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        };
        let write_err = |source| LedgerError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        // Dropped (and removed) on any early return below.
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file_mut());
            writer.write_record(LEDGER_COLUMNS).map_err(write_err)?;
            for record in self.records.values() {
                writer.serialize(record).map_err(write_err)?;
            }
            writer.flush().map_err(io_err)?;
        }
        tmp.as_file_mut().flush().map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        tracing::debug!(path = %path.display(), records = self.len(), "Persisted ledger");
        Ok(())
    }

    /// Persist to the checkpoint path, if one is configured.
    pub fn checkpoint(&self) -> Result<(), LedgerError> {
        match &self.checkpoint {
            Some(path) => self.persist(path),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
