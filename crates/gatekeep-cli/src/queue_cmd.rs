//! `gatekeep queue`: queue one command, or a batch read from a JSON file.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use gatekeep_core::wire::{QueueCommandsRequest, QueuedCommand};
use gatekeep_core::{CommandName, MacAddress, validate_payload};

use crate::client::GateClient;

#[derive(clap::Args, Debug)]
pub struct QueueArgs {
    /// Target terminal MAC address.
    pub mac: MacAddress,

    /// Command name, e.g. `SET_FAIL_BEEP`. Omit when using --file.
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub command: Option<CommandName>,

    /// JSON payload for the command.
    #[arg(long, requires = "command")]
    pub payload: Option<String>,

    /// JSON file holding an array of `{"name": ..., "payload": ...}` objects.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Turn the arguments into the command batch to submit.
///
/// Payloads are checked locally so typos fail before touching the network;
/// the server validates again on receipt.
pub fn build_batch(args: &QueueArgs) -> anyhow::Result<Vec<QueuedCommand>> {
    let commands = match (&args.file, args.command) {
        (Some(path), _) => read_batch(path)?,
        (None, Some(name)) => {
            let payload = args
                .payload
                .as_deref()
                .map(serde_json::from_str::<Value>)
                .transpose()
                .map_err(|e| anyhow::anyhow!("--payload is not valid JSON: {e}"))?;
            vec![QueuedCommand { name, payload }]
        }
        (None, None) => anyhow::bail!("Either a command name or --file is required"),
    };

    if commands.is_empty() {
        anyhow::bail!("No commands to queue");
    }
    for (index, cmd) in commands.iter().enumerate() {
        validate_payload(cmd.name, cmd.payload.as_ref())
            .map_err(|e| anyhow::anyhow!("command #{index}: {e}"))?;
    }
    Ok(commands)
}

fn read_batch(path: &Path) -> anyhow::Result<Vec<QueuedCommand>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid command file {}: {e}", path.display()))
}

pub async fn run(args: QueueArgs, client: &GateClient) -> anyhow::Result<()> {
    let commands = build_batch(&args)?;
    let request = QueueCommandsRequest {
        mac_address: args.mac.to_string(),
        commands,
    };
    let resp = client.queue_commands(&request).await?;

    let mut out = io::stdout();
    writeln!(out, "Queued {} command(s) for {}", resp.queued, args.mac)?;
    for id in resp.command_ids {
        writeln!(out, "  #{id}")?;
    }
    Ok(())
}
