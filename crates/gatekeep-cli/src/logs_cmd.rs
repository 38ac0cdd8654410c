//! Log subcommands: all, by-user, by-card.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use gatekeep_core::CredentialId;
use gatekeep_core::wire::{LogRecord, Page};

use crate::client::{GateClient, LogQuery};

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Page number, starting at 1.
    #[arg(long)]
    pub page: Option<u32>,
    /// Records per page (server maximum is 10).
    #[arg(long)]
    pub limit: Option<u32>,
}

/// Log subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum LogsAction {
    /// Every access attempt, newest first.
    All {
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Attempts by one user.
    ByUser {
        user_id: CredentialId,
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Attempts with one card.
    ByCard {
        card_id: CredentialId,
        #[command(flatten)]
        paging: PageArgs,
    },
}

impl LogsAction {
    const fn query(&self) -> (LogQuery, PageArgs) {
        match *self {
            Self::All { paging } => (LogQuery::All, paging),
            Self::ByUser { user_id, paging } => (LogQuery::User(user_id), paging),
            Self::ByCard { card_id, paging } => (LogQuery::Card(card_id), paging),
        }
    }
}

/// Execute a log subcommand.
pub async fn run(action: LogsAction, client: &GateClient, json: bool) -> anyhow::Result<()> {
    let (query, paging) = action.query();
    let page = client.list_logs(query, paging.page, paging.limit).await?;

    let mut out = io::stdout();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&page)?)?;
    } else {
        write_page(&mut out, &page)?;
    }
    Ok(())
}

pub fn write_page(out: &mut impl Write, page: &Page<LogRecord>) -> io::Result<()> {
    if page.data.is_empty() {
        writeln!(out, "No access logs.")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<8} {:<12} {:<12} {:<12} {:<20} DEVICE",
        "ID", "TIMESTAMP", "CARD", "USER", "ENTRY"
    )?;
    for r in &page.data {
        writeln!(
            out,
            "{:<8} {:<12} {:<12} {:<12} {:<20} {}",
            r.id,
            r.timestamp,
            r.card_id,
            r.user_id,
            r.entry_type.as_str(),
            r.device_id
        )?;
    }
    let pages = if page.limit == 0 {
        1
    } else {
        (page.total + i64::from(page.limit) - 1) / i64::from(page.limit)
    };
    writeln!(
        out,
        "Page {} of {} ({} total)",
        page.page,
        pages.max(1),
        page.total
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gatekeep_core::{EntryType, MacAddress};

    use super::*;

    fn record(id: i64) -> LogRecord {
        LogRecord {
            id,
            card_id: CredentialId(7),
            user_id: CredentialId(3),
            entry_type: EntryType::AntiPassback,
            timestamp: 1_700_000_000 + id,
            device_id: MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap(),
        }
    }

    #[test]
    fn page_footer_counts_pages() {
        let page = Page {
            data: vec![record(2), record(1)],
            total: 25,
            page: 3,
            limit: 10,
        };
        let mut buf = Vec::new();
        write_page(&mut buf, &page).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("ANTI_PASSBACK"));
        assert!(text.contains("AA:BB:CC:DD:EE:FF"));
        assert!(text.ends_with("Page 3 of 3 (25 total)\n"));
    }

    #[test]
    fn empty_page_says_so() {
        let page = Page {
            data: Vec::new(),
            total: 0,
            page: 1,
            limit: 10,
        };
        let mut buf = Vec::new();
        write_page(&mut buf, &page).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "No access logs.\n");
    }
}
