//! Config file model and loading.
//!
//! Keys are accepted in snake_case and kebab-case. Boolean values may be
//! written as booleans, integers, or strings such as `"yes"`.

use std::path::Path;

use dashmig_core::error::ConfigError;
use dashmig_core::types::parse_bool;
use serde::{Deserialize, Deserializer};

/// One entry of the `workspaces` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileWorkspace {
    #[serde(alias = "workspace")]
    pub name: Option<String>,
    pub host: Option<String>,
    pub token: Option<String>,
    #[serde(alias = "delete-legacy", deserialize_with = "flex_bool")]
    pub delete_legacy: Option<bool>,
    #[serde(deserialize_with = "flex_bool")]
    pub publish: Option<bool>,
    #[serde(alias = "warehouse-id")]
    pub warehouse_id: Option<String>,
}

impl FileWorkspace {
    pub fn has_migration_override(&self) -> bool {
        self.delete_legacy.is_some() || self.publish.is_some() || self.warehouse_id.is_some()
    }
}

/// A list given either as one comma-separated string or as a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Self::Many(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Contents of a `--config` file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub host: Option<String>,
    pub token: Option<String>,
    #[serde(alias = "workspace-name", alias = "workspace")]
    pub workspace_name: Option<String>,
    pub workspaces: Vec<FileWorkspace>,

    #[serde(alias = "delete-legacy", deserialize_with = "flex_bool")]
    pub delete_legacy: Option<bool>,
    #[serde(deserialize_with = "flex_bool")]
    pub publish: Option<bool>,
    #[serde(alias = "warehouse-id")]
    pub warehouse_id: Option<String>,

    #[serde(alias = "dry-run", deserialize_with = "flex_bool")]
    pub dry_run: Option<bool>,
    #[serde(deserialize_with = "flex_bool")]
    pub resume: Option<bool>,
    #[serde(alias = "log-file")]
    pub log_file: Option<String>,
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    #[serde(alias = "sleep-between-calls")]
    pub sleep_between_calls: Option<f64>,
    #[serde(alias = "max-retries")]
    pub max_retries: Option<u32>,
    #[serde(alias = "retry-delay")]
    pub retry_delay: Option<f64>,

    #[serde(alias = "dashboard-ids")]
    pub dashboard_ids: Option<StringList>,
    #[serde(alias = "dashboard-csv")]
    pub dashboard_csv: Option<String>,
    #[serde(alias = "filter-path")]
    pub filter_path: Option<String>,
    #[serde(alias = "filter-owner")]
    pub filter_owner: Option<String>,
    #[serde(alias = "filter-name")]
    pub filter_name: Option<String>,

    #[serde(alias = "send-email", deserialize_with = "flex_bool")]
    pub send_email: Option<bool>,
    #[serde(alias = "email-to")]
    pub email_to: Option<StringList>,
    #[serde(alias = "email-from")]
    pub email_from: Option<String>,
    #[serde(alias = "smtp-server")]
    pub smtp_server: Option<String>,
    #[serde(alias = "smtp-port")]
    pub smtp_port: Option<u16>,
    #[serde(alias = "smtp-username")]
    pub smtp_username: Option<String>,
    #[serde(alias = "smtp-password")]
    pub smtp_password: Option<String>,
}

impl FileConfig {
    /// Read and parse `path`.
    ///
    /// `.json` is parsed as JSON, `.yaml`/`.yml` as YAML; anything else is
    /// tried as YAML first, then JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let parsed = match extension.as_deref() {
            Some("json") => Self::from_json(&content),
            Some("yaml" | "yml") => Self::from_yaml(&content),
            _ => Self::from_yaml(&content).or_else(|_| Self::from_json(&content)),
        };
        parsed.map_err(|message| ConfigError::File(format!("{}: {message}", path.display())))
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str::<Option<Self>>(content)
            .map(Option::unwrap_or_default)
            .map_err(|e| e.to_string())
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexBool {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn flex_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<FlexBool> = Option::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        FlexBool::Bool(b) => b,
        FlexBool::Int(n) => n != 0,
        FlexBool::Text(s) => parse_bool(&s),
    }))
}
