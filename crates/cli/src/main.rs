use crate::{
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use engine_config::settings::{Settings, StoreSettings};
use engine_core::{progress::StatusService, state::WatermarkStore};
use engine_runtime::{factory, scheduler::Scheduler};
use model::{classify::ClassificationProfile, core::sensor::SensorKind};
use std::{path::PathBuf, str::FromStr};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "soilwatch",
    version = "0.1.0",
    about = "Incremental soil moisture extraction"
)]
struct Cli {
    #[arg(long, global = true, help = "Env file to load (defaults to ./.env when present)")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(CliError::ShutdownRequested) => ExitCode::ShutdownRequested,
        Err(e @ (CliError::Settings(_) | CliError::Config(_))) => {
            error!("{e}");
            ExitCode::ConfigError
        }
        Err(e) => {
            error!("{e}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let mut env = EnvManager::from_process();
    match &cli.env_file {
        Some(path) => env.load_file(path, true)?,
        None => env.load_file(".env", false)?,
    }
    for (key, value) in env.redacted() {
        debug!("{key}={value}");
    }

    match cli.command {
        Commands::Run { json } => {
            let settings = Settings::from_env(env.all())?;
            let driver = factory::create_driver(&settings).await?;
            let report = driver.run_once().await?;
            output::print_run(&report, json)?;
        }
        Commands::Watch => {
            let settings = Settings::from_env(env.all())?;
            let driver = factory::create_driver(&settings).await?;

            let shutdown = ShutdownCoordinator::new(CancellationToken::new());
            shutdown.register_handlers();

            info!("Watching every {:?}", settings.run_interval);
            let runs = Scheduler::new(settings.run_interval)
                .run_forever(&driver, shutdown.cancel_token())
                .await?;
            info!("Stopped after {runs} run(s)");

            if shutdown.is_shutdown_requested() {
                return Err(CliError::ShutdownRequested);
            }
        }
        Commands::Status { json } => {
            let store = factory::open_store(&StoreSettings::from_env(env.all())?).await?;
            let status = StatusService::new(store).status().await?;
            output::print_status(&status, json)?;
        }
        Commands::History { limit, json } => {
            let store = factory::open_store(&StoreSettings::from_env(env.all())?).await?;
            let records = store.history(limit).await?;
            output::print_history(&records, json)?;
        }
        Commands::Classify { sensor, value } => {
            let sensor =
                SensorKind::from_str(&sensor).map_err(|_| CliError::UnknownSensor(sensor))?;
            let profile = ClassificationProfile::for_sensor(sensor);
            println!("{}", profile.classify(value));
        }
    }

    Ok(ExitCode::Success)
}
