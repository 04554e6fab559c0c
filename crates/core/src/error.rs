/// Configuration and selection errors.
///
/// Every variant is fatal: the run aborts before any remote call is issued.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {field} pattern '{pattern}': {source}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Dashboard id source {path}: {message}")]
    IdSource { path: String, message: String },

    #[error("Host must start with http:// or https://: {0}")]
    InvalidHost(String),

    #[error(
        "Invalid warehouse ID format: {0}. Expected alphanumeric string with optional hyphens/underscores."
    )]
    InvalidWarehouseId(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Config file error: {0}")]
    File(String),

    #[error(
        "No workspace configured. Provide --host and --token, set DATABRICKS_HOST / DATABRICKS_TOKEN, or configure workspaces in the config file."
    )]
    NoWorkspaces,
}
