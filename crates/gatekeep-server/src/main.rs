//! Gatekeep Server
//!
//! HTTP server that registers access-control terminals, hands them queued
//! commands when they poll, and ingests their access logs.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use gatekeep_core::config::load_config;
use gatekeep_core::tracing_init::init_tracing;
use gatekeep_server::auth::Role;
use gatekeep_server::auth::operator::sign_operator_token;
use gatekeep_server::server::{AppState, build_router};
use gatekeep_server::storage::GateDatabase;

#[derive(Parser, Debug)]
#[command(name = "gatekeep-server")]
#[command(
    version,
    about = "Gatekeep server - terminal registration, command dispatch and access logs"
)]
struct Args {
    /// Config file merged over the global one.
    #[arg(long, env = "GATEKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file (overrides config).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "GATEKEEP_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign an operator bearer token with the configured operator secret.
    MintToken {
        /// Subject recorded in the token.
        #[arg(long, default_value = "operator")]
        subject: String,

        #[arg(long, value_enum)]
        role: RoleArg,

        /// Token lifetime in seconds.
        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Boss,
    Clerk,
    Manager,
    Employee,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Boss => Self::Boss,
            RoleArg::Clerk => Self::Clerk,
            RoleArg::Manager => Self::Manager,
            RoleArg::Employee => Self::Employee,
        }
    }
}

#[tokio::main]
#[allow(clippy::print_stdout)]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.listen_addr = addr;
    }
    if let Some(path) = args.db_path {
        config.database_path = Some(path);
    }
    config.validate()?;

    if let Some(Command::MintToken {
        subject,
        role,
        ttl_secs,
    }) = args.command
    {
        let token = sign_operator_token(
            config.auth.operator_token_secret.as_bytes(),
            &subject,
            role.into(),
            ttl_secs,
        )?;
        println!("{token}");
        return Ok(());
    }

    init_tracing("gatekeep_server=info,tower_http=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        "Starting gatekeep-server"
    );

    if config.uses_dev_secrets() {
        warn!(
            "Using built-in development token secrets; set GATEKEEP_DEVICE_TOKEN_SECRET and GATEKEEP_OPERATOR_TOKEN_SECRET"
        );
    }
    if config.auth.admin_password_hash.is_none() {
        info!("No admin password hash configured, Basic auth disabled");
    }

    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening gate database");
    let db = GateDatabase::open(&db_path).await?;

    let app = build_router(AppState::new(db, &config));
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Gatekeep server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("Gatekeep server stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".gatekeep").join("gatekeep.db"))
}
