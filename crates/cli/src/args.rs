//! Command-line flags.

use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, Parser, ValueEnum};
use dashmig_client::retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_SLEEP_BETWEEN_CALLS};
use dashmig_events::email::{DEFAULT_SMTP_PORT, DEFAULT_SMTP_SERVER};
use dashmig_pipeline::DEFAULT_LEDGER_PATH;

/// Migrate legacy SQL dashboards to Lakeview across one or more workspaces.
#[derive(Debug, Clone, Parser)]
#[command(name = "dashmig")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// YAML or JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Workspace URL, e.g. https://adb-123.4.azuredatabricks.net.
    #[arg(long, env = "DATABRICKS_HOST")]
    pub host: Option<String>,

    /// Personal access token.
    #[arg(long, env = "DATABRICKS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Name recorded in the ledger for the --host workspace.
    #[arg(long)]
    pub workspace_name: Option<String>,

    /// CSV ledger to write (and read with --resume). Dry runs write
    /// `<stem>.dry_run.csv` beside it instead.
    #[arg(long, default_value = DEFAULT_LEDGER_PATH)]
    pub log_file: PathBuf,

    /// Move legacy dashboards to the trash after migration.
    #[arg(long)]
    pub delete_legacy: bool,

    /// Publish migrated dashboards with embedded credentials.
    #[arg(long)]
    pub publish: bool,

    /// SQL warehouse to attach when publishing.
    #[arg(long)]
    pub warehouse_id: Option<String>,

    /// Report what would happen without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip dashboards the ledger already records as migrated.
    #[arg(long)]
    pub resume: bool,

    /// Regex over the legacy dashboard path.
    #[arg(long)]
    pub filter_path: Option<String>,

    /// Regex over the dashboard owner.
    #[arg(long)]
    pub filter_owner: Option<String>,

    /// Regex over the legacy dashboard name.
    #[arg(long)]
    pub filter_name: Option<String>,

    /// Comma-separated legacy dashboard ids to migrate.
    #[arg(long)]
    pub dashboard_ids: Option<String>,

    /// CSV file with an id column (legacy_id, id, dashboard_id or dashboardId).
    #[arg(long)]
    pub dashboard_csv: Option<PathBuf>,

    /// Seconds to pause after every API call.
    #[arg(long, default_value_t = DEFAULT_SLEEP_BETWEEN_CALLS.as_secs_f64())]
    pub sleep_between_calls: f64,

    /// Retries for failed API calls.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Initial delay between retries in seconds, doubled on every retry.
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs_f64())]
    pub retry_delay: f64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Email a summary after the run.
    #[arg(long)]
    pub send_email: bool,

    /// Comma-separated recipients.
    #[arg(long)]
    pub email_to: Option<String>,

    /// Sender address.
    #[arg(long, env = "EMAIL_FROM")]
    pub email_from: Option<String>,

    #[arg(long, env = "SMTP_SERVER", default_value = DEFAULT_SMTP_SERVER)]
    pub smtp_server: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = DEFAULT_SMTP_PORT)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Which flags were typed on the command line, as opposed to coming from
/// the environment or a default.
#[derive(Debug, Clone)]
pub struct Explicit {
    matches: ArgMatches,
}

impl Explicit {
    pub fn new(matches: ArgMatches) -> Self {
        Self { matches }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.matches.value_source(id) == Some(ValueSource::CommandLine)
    }
}
