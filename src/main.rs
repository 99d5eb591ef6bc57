//! Kiosk - browser kiosk display orchestrator
//!
//! Main entry point: launches the configured displays, serves the admin API
//! and shuts everything down on SIGINT/SIGTERM.

mod cli;
mod deps;
mod signal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kiosk_admin::{AdminConfig, AdminServer, AdminState};
use kiosk_config::{Config, ConfigLoader, ConfigValidator};
use kiosk_core::{CancellationToken, Kiosk, ReloadingControl};

use crate::cli::{Cli, Commands};
use crate::signal::SignalHandler;

/// Get the kiosk data directory (~/.kiosk).
fn kiosk_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".kiosk"))
        .unwrap_or_else(|| PathBuf::from(".kiosk"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.kiosk/logs/ with daily rotation.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = kiosk_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("kiosk")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keeps the file writer flushing until exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let cli = Cli::parse();
    let config_path = PathBuf::from(ConfigLoader::expand_path(&cli.config.to_string_lossy()));

    let result = match cli.command() {
        Commands::Run => run_kiosk(&cli, &config_path).await,
        Commands::Check => check_config(&config_path),
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

/// Load the configuration and log validation warnings. Errors are fatal.
fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    info!("Loading configuration from {}", path.display());
    let config = ConfigLoader::load(path)?;
    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!("{}: {}", warning.path, warning.message);
    }
    Ok(config)
}

fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config);

    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }

    if !result.is_valid() {
        return Err(format!("{} is invalid", path.display()).into());
    }
    println!(
        "{}: {} displays, {} tabs",
        path.display(),
        config.displays.len(),
        config.displays.iter().map(|d| d.tabs.len()).sum::<usize>()
    );
    Ok(())
}

/// Run the displays in the foreground until a shutdown signal or a fatal
/// launch error.
async fn run_kiosk(cli: &Cli, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting kiosk v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(config_path)?;
    deps::check_dependencies(&config)?;

    let root = CancellationToken::new();
    let kiosk = Arc::new(Kiosk::system(config.clone()));
    let control = ReloadingControl::new(kiosk, config_path, root.clone());

    let signals = SignalHandler::new();
    signals.setup_os_signals()?;
    let signal_task = tokio::spawn(signal::dispatch(
        signals.subscribe(),
        root.clone(),
        Arc::new(control.clone()),
    ));

    let admin_task = if cli.no_admin {
        info!("Admin API disabled");
        None
    } else {
        let state = Arc::new(AdminState::new(
            config,
            config_path,
            Arc::new(control.clone()),
        ));
        let server = AdminServer::new(
            AdminConfig::new(cli.admin_host.clone(), cli.admin_port),
            state,
        );
        let listener = server.bind().await?;
        let shutdown = root.clone();
        Some(tokio::spawn(async move {
            server.serve(listener, shutdown).await
        }))
    };

    control.start().await;
    root.cancelled().await;

    info!("Shutting down");
    control.shutdown().await;

    if let Some(task) = admin_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Admin API error: {}", e),
            Err(e) => warn!("Admin API task failed: {}", e),
        }
    }
    signal_task.abort();

    if let Some(failure) = control.failure() {
        return Err(failure.into());
    }
    info!("Kiosk stopped");
    Ok(())
}
