//! Resolve flags, config file, environment, and defaults into run settings.
//!
//! Precedence: command line > config file > environment > defaults. Clap
//! already folds the environment and defaults into [`Args`]; a file value
//! replaces them unless the flag was typed on the command line.

use std::path::PathBuf;
use std::time::Duration;

use dashmig_client::RetryPolicy;
use dashmig_core::config::{ExecutionOptions, MigrationOptions, TenantConfig, DEFAULT_TENANT_NAME};
use dashmig_core::error::ConfigError;
use dashmig_core::selection::{parse_id_list, SelectionCriteria};
use dashmig_events::EmailConfig;
use dashmig_pipeline::BatchConfig;

use crate::args::{Args, Explicit, LogFormat};
use crate::file::{FileConfig, FileWorkspace};

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub batch: BatchConfig,
    pub criteria: SelectionCriteria,
    pub dashboard_csv: Option<PathBuf>,
    /// Present when `--send-email` is in effect.
    pub email: Option<EmailConfig>,
    pub log_level: String,
    pub log_format: LogFormat,
}

struct Layers<'a> {
    explicit: &'a Explicit,
}

impl Layers<'_> {
    fn pick<T>(&self, id: &str, cli: T, file: Option<T>) -> T {
        if self.explicit.contains(id) {
            cli
        } else {
            file.unwrap_or(cli)
        }
    }

    fn pick_opt<T>(&self, id: &str, cli: Option<T>, file: Option<T>) -> Option<T> {
        if self.explicit.contains(id) {
            cli
        } else {
            file.or(cli)
        }
    }
}

impl Settings {
    /// Log level alone, needed before the subscriber is installed.
    pub fn log_level(args: &Args, explicit: &Explicit, file: Option<&FileConfig>) -> String {
        let layers = Layers { explicit };
        layers.pick(
            "log_level",
            args.log_level.clone(),
            file.and_then(|f| f.log_level.clone()),
        )
    }

    pub fn resolve(
        args: &Args,
        explicit: &Explicit,
        file: Option<FileConfig>,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();
        let layers = Layers { explicit };

        let migration = MigrationOptions {
            publish: layers.pick("publish", args.publish, file.publish),
            delete_legacy: layers.pick("delete_legacy", args.delete_legacy, file.delete_legacy),
            warehouse_id: layers
                .pick_opt("warehouse_id", args.warehouse_id.clone(), file.warehouse_id.clone())
                .filter(|w| !w.trim().is_empty()),
        };
        migration.validate()?;

        let execution = ExecutionOptions {
            dry_run: layers.pick("dry_run", args.dry_run, file.dry_run),
            resume: layers.pick("resume", args.resume, file.resume),
        };

        let retry = RetryPolicy {
            max_retries: layers.pick("max_retries", args.max_retries, file.max_retries),
            retry_delay: seconds(
                "retry_delay",
                layers.pick("retry_delay", args.retry_delay, file.retry_delay),
            )?,
            sleep_between_calls: seconds(
                "sleep_between_calls",
                layers.pick(
                    "sleep_between_calls",
                    args.sleep_between_calls,
                    file.sleep_between_calls,
                ),
            )?,
        };

        let ledger_path = layers.pick(
            "log_file",
            args.log_file.clone(),
            file.log_file.clone().map(PathBuf::from),
        );

        let tenants = resolve_tenants(args, &layers, &file, &migration)?;

        let criteria = SelectionCriteria {
            dashboard_ids: layers
                .pick_opt(
                    "dashboard_ids",
                    args.dashboard_ids.as_deref().map(parse_id_list),
                    file.dashboard_ids.clone().map(|ids| ids.into_vec()),
                )
                .unwrap_or_default(),
            external_ids: Vec::new(),
            filter_path: layers.pick_opt(
                "filter_path",
                args.filter_path.clone(),
                file.filter_path.clone(),
            ),
            filter_owner: layers.pick_opt(
                "filter_owner",
                args.filter_owner.clone(),
                file.filter_owner.clone(),
            ),
            filter_name: layers.pick_opt(
                "filter_name",
                args.filter_name.clone(),
                file.filter_name.clone(),
            ),
        };
        let dashboard_csv = layers.pick_opt(
            "dashboard_csv",
            args.dashboard_csv.clone(),
            file.dashboard_csv.clone().map(PathBuf::from),
        );

        let send_email = layers.pick("send_email", args.send_email, file.send_email);
        let email = send_email.then(|| EmailConfig {
            smtp_server: layers.pick(
                "smtp_server",
                args.smtp_server.clone(),
                file.smtp_server.clone(),
            ),
            smtp_port: layers.pick("smtp_port", args.smtp_port, file.smtp_port),
            from_address: layers.pick_opt(
                "email_from",
                args.email_from.clone(),
                file.email_from.clone(),
            ),
            recipients: layers
                .pick_opt(
                    "email_to",
                    args.email_to.as_deref().map(EmailConfig::parse_recipients),
                    file.email_to.clone().map(|to| to.into_vec()),
                )
                .unwrap_or_default(),
            smtp_username: layers.pick_opt(
                "smtp_username",
                args.smtp_username.clone(),
                file.smtp_username.clone(),
            ),
            smtp_password: layers.pick_opt(
                "smtp_password",
                args.smtp_password.clone(),
                file.smtp_password.clone(),
            ),
        });

        Ok(Self {
            batch: BatchConfig {
                tenants,
                migration,
                execution,
                retry,
                ledger_path,
            },
            criteria,
            dashboard_csv,
            email,
            log_level: Self::log_level(args, explicit, Some(&file)),
            log_format: args.log_format,
        })
    }
}

fn seconds(key: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// A `--host` typed on the command line selects a single workspace;
/// otherwise the file's `workspaces` list wins over a single host/token.
fn resolve_tenants(
    args: &Args,
    layers: &Layers<'_>,
    file: &FileConfig,
    batch: &MigrationOptions,
) -> Result<Vec<TenantConfig>, ConfigError> {
    if !layers.explicit.contains("host") && !file.workspaces.is_empty() {
        let tenants: Vec<TenantConfig> = file
            .workspaces
            .iter()
            .enumerate()
            .filter_map(|(index, ws)| workspace_tenant(index, ws, batch))
            .collect();
        if tenants.is_empty() {
            return Err(ConfigError::NoWorkspaces);
        }
        for tenant in &tenants {
            if let Some(options) = &tenant.migration {
                options.validate()?;
            }
        }
        return Ok(tenants);
    }

    let host = layers.pick_opt("host", args.host.clone(), file.host.clone());
    let token = layers.pick_opt("token", args.token.clone(), file.token.clone());
    let (Some(host), Some(token)) = (host, token) else {
        return Err(ConfigError::NoWorkspaces);
    };
    let name = layers
        .pick_opt(
            "workspace_name",
            args.workspace_name.clone(),
            file.workspace_name.clone(),
        )
        .unwrap_or_else(|| DEFAULT_TENANT_NAME.to_string());
    Ok(vec![TenantConfig::new(name, host, token)])
}

fn workspace_tenant(
    index: usize,
    ws: &FileWorkspace,
    batch: &MigrationOptions,
) -> Option<TenantConfig> {
    let name = ws
        .name
        .clone()
        .unwrap_or_else(|| format!("workspace_{}", index + 1));
    let (Some(host), Some(token)) = (ws.host.clone(), ws.token.clone()) else {
        tracing::warn!(workspace = %name, "Skipping workspace: missing host or token");
        return None;
    };

    let mut tenant = TenantConfig::new(name, host, token);
    if ws.has_migration_override() {
        tenant.migration = Some(MigrationOptions {
            publish: ws.publish.unwrap_or(batch.publish),
            delete_legacy: ws.delete_legacy.unwrap_or(batch.delete_legacy),
            warehouse_id: ws.warehouse_id.clone().or_else(|| batch.warehouse_id.clone()),
        });
    }
    Some(tenant)
}
