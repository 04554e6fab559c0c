//! Selection of legacy dashboards eligible for migration.
//!
//! Explicit ids are an allowlist: when any id is supplied (inline or from an
//! external source) a record is selected iff its legacy id is in the set and
//! the regex filters are not consulted. Without explicit ids every supplied
//! filter must match. Patterns are compiled once, case-insensitively, when
//! the [`Selector`] is built.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;
use crate::types::DashboardRecord;

// ---------------------------------------------------------------------------
// SelectionCriteria
// ---------------------------------------------------------------------------

/// User-supplied selection inputs, before compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Ids given directly (e.g. `--dashboard-ids`).
    pub dashboard_ids: Vec<String>,
    /// Ids loaded from an external source (e.g. `--dashboard-csv`).
    pub external_ids: Vec<String>,
    pub filter_path: Option<String>,
    pub filter_owner: Option<String>,
    pub filter_name: Option<String>,
}

/// Split a comma-separated id list, trimming blanks.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Compiled, immutable selection predicate.
#[derive(Debug, Clone)]
pub struct Selector {
    allowlist: Option<HashSet<String>>,
    path: Option<Regex>,
    owner: Option<Regex>,
    name: Option<Regex>,
}

impl Selector {
    /// Compile the criteria. Fails on the first malformed pattern.
    pub fn new(criteria: &SelectionCriteria) -> Result<Self, ConfigError> {
        let ids: HashSet<String> = criteria
            .dashboard_ids
            .iter()
            .chain(criteria.external_ids.iter())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        let selector = Self {
            allowlist: (!ids.is_empty()).then_some(ids),
            path: compile("filter_path", criteria.filter_path.as_deref())?,
            owner: compile("filter_owner", criteria.filter_owner.as_deref())?,
            name: compile("filter_name", criteria.filter_name.as_deref())?,
        };

        if selector.allowlist.is_some() && selector.has_filters() {
            tracing::warn!(
                "Explicit dashboard ids were supplied; path/owner/name filters are ignored"
            );
        }

        Ok(selector)
    }

    /// A selector that accepts every legacy record.
    pub fn all() -> Self {
        Self {
            allowlist: None,
            path: None,
            owner: None,
            name: None,
        }
    }

    fn has_filters(&self) -> bool {
        self.path.is_some() || self.owner.is_some() || self.name.is_some()
    }

    /// Number of explicit ids, if an allowlist is in effect.
    pub fn allowlist_len(&self) -> Option<usize> {
        self.allowlist.as_ref().map(HashSet::len)
    }

    /// Whether a single record is eligible.
    pub fn matches(&self, record: &DashboardRecord) -> bool {
        if record.legacy_id.is_empty() {
            return false;
        }
        if let Some(ids) = &self.allowlist {
            return ids.contains(&record.legacy_id);
        }
        let hit =
            |re: &Option<Regex>, field: &str| re.as_ref().map_or(true, |re| re.is_match(field));
        hit(&self.path, &record.legacy_path)
            && hit(&self.owner, &record.owner)
            && hit(&self.name, &record.legacy_name)
    }

    /// Filter `records`, preserving their order.
    pub fn select(&self, records: Vec<DashboardRecord>) -> Vec<DashboardRecord> {
        let before = records.len();
        let selected: Vec<_> = records.into_iter().filter(|r| self.matches(r)).collect();
        if self.allowlist.is_some() && selected.is_empty() {
            tracing::warn!("No dashboards found matching the provided ids");
        }
        tracing::debug!(before, after = selected.len(), "Applied dashboard selection");
        selected
    }
}

fn compile(field: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|source| ConfigError::InvalidPattern {
            field,
            pattern: pattern.to_string(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
