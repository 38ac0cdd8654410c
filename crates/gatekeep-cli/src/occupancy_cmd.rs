//! Occupancy subcommands: show, exit, reset.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use gatekeep_core::CredentialId;
use gatekeep_core::wire::OccupancyView;

use crate::client::GateClient;

/// Occupancy subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum OccupancyAction {
    /// Show whether a card holder is inside and their accumulated time.
    Show { card_id: CredentialId },
    /// Record an exit now, adding the visit to the accumulated time.
    Exit { card_id: CredentialId },
    /// Mark the card holder outside without counting the current visit.
    Reset { card_id: CredentialId },
}

/// Execute an occupancy subcommand.
pub async fn run(action: OccupancyAction, client: &GateClient, json: bool) -> anyhow::Result<()> {
    let view = match action {
        OccupancyAction::Show { card_id } => client.occupancy(card_id).await?,
        OccupancyAction::Exit { card_id } => client.exit_occupancy(card_id).await?,
        OccupancyAction::Reset { card_id } => client.reset_occupancy(card_id).await?,
    };
    let mut out = io::stdout();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
    } else {
        write_view(&mut out, &view)?;
    }
    Ok(())
}

/// Render seconds as `1h 02m 03s`.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn write_view(out: &mut impl Write, view: &OccupancyView) -> io::Result<()> {
    let state = if view.is_inside_workplace {
        "inside"
    } else {
        "outside"
    };
    writeln!(out, "Card {} (user {}): {state}", view.card_id, view.user_id)?;
    if let Some(start) = view.start_time {
        writeln!(out, "  entered at {start}")?;
    }
    if let Some(end) = view.end_time {
        writeln!(out, "  left at    {end}")?;
    }
    writeln!(
        out,
        "  total time {}",
        format_duration(view.cumulative_time_in_office)
    )
}
