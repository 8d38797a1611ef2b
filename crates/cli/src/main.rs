mod args;
mod commands;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use models::CancellationToken;
use tracing::{error, info, warn};

use crate::args::{Cli, Command};

const EXIT_FAILURE: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_ctrl_c.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || run(cli, &cancel))
        .await
        .context("worker thread panicked")
        .and_then(|result| result);

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_cancelled(&err) => {
            warn!("operation cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    let settings =
        settings_loader::load_settings_with_fallback(cli.settings_path.as_ref())?.unwrap_or_default();
    let db_path = settings_loader::resolve_database_path(cli.db_path.as_deref(), Some(&settings));

    match cli.command {
        Command::Convert(args) => {
            let output = commands::convert(args, &settings, &db_path, cancel)?;
            info!(output = %output.display(), "done");
            Ok(())
        }
        Command::Payee { action } => commands::payee(action, &db_path),
        Command::Category { action } => commands::category(action, &db_path),
        Command::Synonym(args) => commands::synonym(args, &db_path),
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<models::Error>())
        .any(models::Error::is_cancelled)
}
