//! Ledger record types shared by every crate in the workspace.

use serde::{Deserialize, Deserializer, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// DashboardKind
// ---------------------------------------------------------------------------

/// Origin of a ledger record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardKind {
    /// A legacy SQL dashboard (migration source).
    #[default]
    Legacy,
    /// A Lakeview dashboard with no legacy counterpart.
    Lakeview,
}

impl DashboardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Lakeview => "lakeview",
        }
    }
}

impl std::fmt::Display for DashboardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RecordKey
// ---------------------------------------------------------------------------

/// Identity of a record within one tenant.
///
/// Legacy-origin records are keyed by their legacy id; Lakeview-native
/// records (empty legacy id) by their Lakeview id. The derived ordering puts
/// every legacy key before every Lakeview key, which keeps persisted output
/// stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    Legacy(String),
    Lakeview(String),
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy(id) => write!(f, "legacy:{id}"),
            Self::Lakeview(id) => write!(f, "lakeview:{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DashboardRecord
// ---------------------------------------------------------------------------

/// One row of the migration ledger.
///
/// Field order is the persisted column order; the `serde` names are the CSV
/// header names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardRecord {
    #[serde(rename = "workspace")]
    pub tenant: String,
    pub legacy_id: String,
    pub legacy_name: String,
    pub legacy_path: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub legacy_created_at: Option<Timestamp>,
    pub lakeview_id: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub migrated: bool,
    #[serde(rename = "migration_datetime", deserialize_with = "lenient_timestamp")]
    pub migrated_at: Option<Timestamp>,
    #[serde(deserialize_with = "lenient_bool")]
    pub published: bool,
    #[serde(rename = "publish_datetime", deserialize_with = "lenient_timestamp")]
    pub published_at: Option<Timestamp>,
    #[serde(deserialize_with = "lenient_bool")]
    pub deleted_legacy: bool,
    pub error: String,
    #[serde(rename = "dashboard_type")]
    pub kind: DashboardKind,
    pub name: String,
    pub path: String,
    #[serde(rename = "created_date")]
    pub created_at: String,
    pub updated_at: String,
    pub owner: String,
    pub description: String,
}

impl DashboardRecord {
    /// Ledger key of this record within its tenant.
    pub fn key(&self) -> RecordKey {
        if self.legacy_id.is_empty() {
            RecordKey::Lakeview(self.lakeview_id.clone())
        } else {
            RecordKey::Legacy(self.legacy_id.clone())
        }
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Append an error message, keeping earlier messages of this run.
    pub fn push_error(&mut self, message: &str) {
        if self.error.is_empty() {
            self.error = message.to_string();
        } else {
            self.error = format!("{}; {message}", self.error);
        }
    }
}

/// Column names of the persisted ledger, in order.
pub const LEDGER_COLUMNS: &[&str] = &[
    "workspace",
    "legacy_id",
    "legacy_name",
    "legacy_path",
    "legacy_created_at",
    "lakeview_id",
    "migrated",
    "migration_datetime",
    "published",
    "publish_datetime",
    "deleted_legacy",
    "error",
    "dashboard_type",
    "name",
    "path",
    "created_date",
    "updated_at",
    "owner",
    "description",
];

// ---------------------------------------------------------------------------
// Lenient parsing
// ---------------------------------------------------------------------------

/// Parse a remote or persisted timestamp.
///
/// Accepts RFC 3339 and the space-separated `YYYY-MM-DD HH:MM:SS` form.
/// Returns `None` for empty or unrecognized input.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&chrono::Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a boolean cell. Accepts `true`/`false` in any case, `1`/`0` and
/// `yes`/`no`; anything else (including empty) is `false`.
pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().map(parse_bool).unwrap_or(false))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_prefers_legacy_id() {
        let record = DashboardRecord {
            legacy_id: "42".into(),
            lakeview_id: "lv-1".into(),
            ..Default::default()
        };
        assert_eq!(record.key(), RecordKey::Legacy("42".into()));
    }

    #[test]
    fn key_falls_back_to_lakeview_id() {
        let record = DashboardRecord {
            lakeview_id: "lv-1".into(),
            kind: DashboardKind::Lakeview,
            ..Default::default()
        };
        assert_eq!(record.key(), RecordKey::Lakeview("lv-1".into()));
    }

    #[test]
    fn legacy_keys_sort_before_lakeview_keys() {
        let legacy = RecordKey::Legacy("z".into());
        let lakeview = RecordKey::Lakeview("a".into());
        assert!(legacy < lakeview);
    }

    #[test]
    fn push_error_joins_messages() {
        let mut record = DashboardRecord::default();
        record.push_error("publish_error: boom");
        record.push_error("delete_error: nope");
        assert_eq!(record.error, "publish_error: boom; delete_error: nope");
    }

    #[test]
    fn parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-03-01T10:00:00.123+02:00").is_some());
        assert!(parse_timestamp("2024-03-01 10:00:00").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("true"));
        assert!(parse_bool("True"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("False"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn kind_display() {
        assert_eq!(DashboardKind::Legacy.to_string(), "legacy");
        assert_eq!(DashboardKind::Lakeview.to_string(), "lakeview");
    }
}
