//! CLI definitions for the kiosk.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kiosk CLI.
#[derive(Debug, Parser)]
#[command(name = "kiosk")]
#[command(about = "Browser kiosk display orchestrator")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE", default_value = "./kiosk.yml", global = true)]
    pub config: PathBuf,

    /// Admin API host
    #[arg(long, default_value = "127.0.0.1", global = true)]
    pub admin_host: String,

    /// Admin API port
    #[arg(long, env = "PORT", default_value_t = 8080, global = true)]
    pub admin_port: u16,

    /// Do not start the admin API
    #[arg(long, global = true)]
    pub no_admin: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub(crate) enum Commands {
    /// Launch the displays and cycle until interrupted (default)
    Run,

    /// Validate the configuration file and print findings
    Check,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}
