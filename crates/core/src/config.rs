//! Run options and per-tenant configuration values.
//!
//! Everything here is plain data plus pure validation; loading from files,
//! flags, and the environment happens in the binary crate.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Minimum accepted length of a warehouse id.
pub const MIN_WAREHOUSE_ID_LENGTH: usize = 8;

/// Name used for the tenant built from `--host` / `--token`.
pub const DEFAULT_TENANT_NAME: &str = "default";

// ---------------------------------------------------------------------------
// MigrationOptions
// ---------------------------------------------------------------------------

/// Which optional workflow steps run after a successful migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Publish each migrated dashboard.
    pub publish: bool,
    /// Delete (move to trash) the legacy dashboard after migration.
    pub delete_legacy: bool,
    /// Warehouse to attach when publishing.
    pub warehouse_id: Option<String>,
}

impl MigrationOptions {
    /// Validate the options, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(warehouse_id) = &self.warehouse_id {
            validate_warehouse_id(warehouse_id)?;
        }
        Ok(())
    }
}

/// Execution switches that apply to the whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Issue no effectful calls; report what would happen.
    pub dry_run: bool,
    /// Skip entities the ledger already records as migrated.
    pub resume: bool,
}

// ---------------------------------------------------------------------------
// TenantConfig
// ---------------------------------------------------------------------------

/// One workspace to process.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantConfig {
    pub name: String,
    pub host: String,
    pub credential: String,
    /// Replaces the batch-wide [`MigrationOptions`] for this tenant.
    pub migration: Option<MigrationOptions>,
}

impl std::fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("credential", &"<redacted>")
            .field("migration", &self.migration)
            .finish()
    }
}

impl TenantConfig {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            credential: credential.into(),
            migration: None,
        }
    }

    /// Options in effect for this tenant.
    pub fn effective_migration<'a>(&'a self, batch: &'a MigrationOptions) -> &'a MigrationOptions {
        self.migration.as_ref().unwrap_or(batch)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Strip trailing slashes and require an `http://` or `https://` scheme.
pub fn normalize_host(host: &str) -> Result<String, ConfigError> {
    let trimmed = host.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidHost(host.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Warehouse ids are alphanumeric with optional `-`/`_`, at least
/// [`MIN_WAREHOUSE_ID_LENGTH`] characters long.
pub fn validate_warehouse_id(warehouse_id: &str) -> Result<(), ConfigError> {
    let valid_chars = warehouse_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let has_alnum = warehouse_id.chars().any(|c| c.is_ascii_alphanumeric());
    if !valid_chars || !has_alnum || warehouse_id.len() < MIN_WAREHOUSE_ID_LENGTH {
        return Err(ConfigError::InvalidWarehouseId(warehouse_id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
