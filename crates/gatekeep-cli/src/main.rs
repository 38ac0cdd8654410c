//! Gatekeep CLI
//!
//! Operator tool for a Gatekeep server: queue commands for terminals, read
//! access logs, check device sync and manage occupancy.

use std::io::{self, Write};

use clap::Parser;
use tracing::debug;

use gatekeep_cli::config::CliConfig;
use gatekeep_cli::device_cmd::{self, DeviceAction};
use gatekeep_cli::logs_cmd::{self, LogsAction};
use gatekeep_cli::occupancy_cmd::{self, OccupancyAction};
use gatekeep_cli::queue_cmd::{self, QueueArgs};
use gatekeep_cli::{GateClient, hash_cmd};

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3002";

#[derive(Parser, Debug)]
#[command(name = "gatekeep")]
#[command(version, about = "Gatekeep access-control operator CLI", long_about = None)]
struct Cli {
    /// Server base URL (falls back to the stored config, then localhost)
    #[arg(long, global = true, env = "GATEKEEP_URL")]
    server: Option<String>,

    /// Operator bearer token
    #[arg(long, global = true, env = "GATEKEEP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Admin username for Basic auth
    #[arg(long, global = true, env = "GATEKEEP_USER")]
    user: Option<String>,

    /// Admin password; selects Basic auth
    #[arg(long, global = true, env = "GATEKEEP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Queue commands for a terminal.
    Queue(QueueArgs),
    /// List access logs.
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },
    /// Inspect terminals.
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
    /// Show or adjust a card holder's occupancy.
    Occupancy {
        #[command(subcommand)]
        action: OccupancyAction,
    },
    /// Check that the server is serving.
    Health,
    /// Hash an admin password read from stdin.
    HashPassword,
    /// Show or change stored CLI settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Print the stored settings (token redacted).
    Show,
    /// Store the server URL.
    SetServer { url: String },
    /// Store an operator bearer token.
    SetToken { token: String },
    /// Store the admin username used with --password.
    SetUser { username: String },
    /// Remove all stored settings.
    Clear,
}

fn run_config(action: ConfigAction, config: &mut CliConfig) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        ConfigAction::Show => {
            let path = CliConfig::config_path()
                .map_or_else(|| "unknown".to_string(), |p| p.display().to_string());
            writeln!(out, "Config file: {path}")?;
            writeln!(
                out,
                "Server:      {}",
                config.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
            )?;
            writeln!(
                out,
                "Token:       {}",
                if config.token.is_some() { "set" } else { "not set" }
            )?;
            writeln!(
                out,
                "Username:    {}",
                config.username.as_deref().unwrap_or("admin")
            )?;
            return Ok(());
        }
        ConfigAction::SetServer { url } => config.server_url = Some(url),
        ConfigAction::SetToken { token } => config.token = Some(token),
        ConfigAction::SetUser { username } => config.username = Some(username),
        ConfigAction::Clear => *config = CliConfig::default(),
    }
    config.save()?;
    writeln!(out, "Saved.")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    gatekeep_core::tracing_init::init_cli_tracing("gatekeep=warn,gatekeep_cli=warn");

    let mut config = CliConfig::load();

    let command = match cli.command {
        Command::HashPassword => return hash_cmd::run(),
        Command::Config { action } => return run_config(action, &mut config),
        other => other,
    };

    let server = cli
        .server
        .or_else(|| config.server_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let credentials = config.credentials(cli.token, cli.user, cli.password)?;
    debug!(%server, "Connecting");
    let client = GateClient::new(&server, &credentials)?;

    match command {
        Command::Queue(args) => queue_cmd::run(args, &client).await,
        Command::Logs { action } => logs_cmd::run(action, &client, cli.json).await,
        Command::Device { action } => device_cmd::run(action, &client, cli.json).await,
        Command::Occupancy { action } => occupancy_cmd::run(action, &client, cli.json).await,
        Command::Health => {
            let status = client.health().await?;
            writeln!(io::stdout(), "{server}: {status}")?;
            Ok(())
        }
        Command::HashPassword | Command::Config { .. } => Ok(()),
    }
}
