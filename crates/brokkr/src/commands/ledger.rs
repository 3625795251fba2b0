//! Ledger management commands

use anyhow::{Context, Result};
use brokkr_runtimes::{FileLedger, LedgerRecord};
use dialoguer::Confirm;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::{LedgerCommands, LedgerListArgs, LedgerPruneArgs};
use crate::output;

/// Handle ledger subcommands
pub async fn handle_ledger_command(command: LedgerCommands) -> Result<()> {
    match command {
        LedgerCommands::List(args) => list(args).await,
        LedgerCommands::Prune(args) => prune(args).await,
    }
}

#[derive(Tabled)]
struct LedgerRow {
    runtime: String,
    version: String,
    platform: String,
    size: String,
    downloaded: String,
    status: String,
}

impl LedgerRow {
    fn from_record(record: &LedgerRecord) -> Self {
        Self {
            runtime: record.runtime.clone(),
            version: record.version.clone(),
            platform: format!("{}-{}", record.os, record.arch),
            size: format_bytes(record.size_bytes),
            downloaded: record.timestamp.format("%Y-%m-%d %H:%M UTC").to_string(),
            status: record.verification_status.clone(),
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

async fn list(args: LedgerListArgs) -> Result<()> {
    let ledger = FileLedger::load_default().context("Failed to open download ledger")?;
    let mut records = ledger.records().context("Failed to read download ledger")?;

    if let Some(runtime) = &args.runtime {
        records.retain(|r| &r.runtime == runtime);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        match &args.runtime {
            Some(runtime) => output::info(&format!("No ledger records for {}", runtime)),
            None => output::info("Ledger is empty"),
        }
        return Ok(());
    }

    let rows: Vec<LedgerRow> = records.iter().map(LedgerRow::from_record).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    Ok(())
}

async fn prune(args: LedgerPruneArgs) -> Result<()> {
    let ledger = FileLedger::load_default().context("Failed to open download ledger")?;
    let count = ledger
        .records()
        .context("Failed to read download ledger")?
        .len();

    if count == 0 {
        output::info("Ledger is already empty");
        return Ok(());
    }

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove all {} ledger records? Future downloads will re-fetch everything",
                count
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Prune cancelled");
            return Ok(());
        }
    }

    let removed = ledger.prune().context("Failed to prune download ledger")?;
    output::success(&format!("Removed {} ledger records", removed));
    Ok(())
}
