use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches};
use tokio_util::sync::CancellationToken;

use dashmig_cli::args::{Args, Explicit};
use dashmig_cli::file::FileConfig;
use dashmig_cli::{logging, Settings};

/// Exit status after Ctrl-C, matching shell convention for SIGINT.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches)?;
    let explicit = Explicit::new(matches);

    let file = args.config.as_deref().map(FileConfig::load).transpose()?;

    // --- Tracing ---
    let level = Settings::log_level(&args, &explicit, file.as_ref());
    logging::init(&level, args.log_format);

    // --- Configuration ---
    let settings = Settings::resolve(&args, &explicit, file)?;
    tracing::debug!(
        tenants = settings.batch.tenants.len(),
        ledger = %settings.batch.ledger_path.display(),
        "Loaded configuration",
    );

    // --- Cancellation ---
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing current dashboard");
                cancel.cancel();
            }
        }
    });

    let summary = dashmig_cli::execute(settings, cancel).await?;
    if summary.cancelled {
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }
    Ok(ExitCode::SUCCESS)
}
