//! Device subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use gatekeep_core::MacAddress;
use gatekeep_core::wire::DeviceView;

use crate::client::GateClient;

/// Device subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum DeviceAction {
    /// Show registration and command sync state for a terminal.
    Status {
        /// Terminal MAC address.
        mac: MacAddress,
    },
}

/// Execute a device subcommand.
pub async fn run(action: DeviceAction, client: &GateClient, json: bool) -> anyhow::Result<()> {
    match action {
        DeviceAction::Status { mac } => {
            let view = client.device_status(&mac).await?;
            let mut out = io::stdout();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
            } else {
                write_status(&mut out, &view)?;
            }
            Ok(())
        }
    }
}

fn or_none(id: Option<i64>) -> String {
    id.map_or_else(|| "none".to_string(), |v| format!("#{v}"))
}

pub fn write_status(out: &mut impl Write, view: &DeviceView) -> io::Result<()> {
    writeln!(out, "Device:        {}", view.mac_address)?;
    writeln!(out, "Registered at: {}", view.registered_at)?;
    writeln!(out, "Last seen:     {}", view.last_seen)?;
    writeln!(out, "Last sent:     {}", or_none(view.sync.last_sent_command_id))?;
    writeln!(
        out,
        "Last acked:    {}",
        or_none(view.sync.last_acknowledged_command_id)
    )?;
    writeln!(out, "Pending:       {}", view.sync.pending)
}
