//! Policy inspection commands

use anyhow::{Context, Result};
use brokkr_core::types::PolicyVersion;
use brokkr_runtimes::check_download_allowed;
use camino::Utf8Path;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::{PolicyCheckArgs, PolicyCommands, PolicyShowArgs};
use crate::output;

/// Handle policy subcommands
pub async fn handle_policy_command(
    command: PolicyCommands,
    config_path: Option<&Utf8Path>,
) -> Result<()> {
    match command {
        PolicyCommands::Show(args) => show(args, config_path).await,
        PolicyCommands::Check(args) => check(args, config_path).await,
    }
}

#[derive(Tabled)]
struct PolicyRow {
    version: String,
    supported: &'static str,
    recommended: &'static str,
    lts: &'static str,
    #[tabled(rename = "under review")]
    under_review: &'static str,
    #[tabled(rename = "pinned eol")]
    pinned_eol: String,
}

impl PolicyRow {
    fn from_entry(entry: &PolicyVersion) -> Self {
        Self {
            version: entry.version.clone(),
            supported: mark(entry.supported),
            recommended: mark(entry.recommended),
            lts: mark(entry.lts),
            under_review: mark(entry.under_review),
            pinned_eol: entry
                .eol_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn mark(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "-"
    }
}

async fn show(args: PolicyShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let policy = super::load_policy(&config)?;

    let Some(entries) = policy.entries_for(&args.runtime) else {
        output::warning(&format!(
            "Policy file has no entries for runtime {}",
            args.runtime
        ));
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    output::header(&format!("Policy entries for {}", args.runtime));
    let rows: Vec<PolicyRow> = entries.iter().map(PolicyRow::from_entry).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    Ok(())
}

async fn check(args: PolicyCheckArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let policy = super::load_policy(&config)?;
    let pattern = config.runtime_options(&args.runtime).pattern;

    let entries = policy.entries_for(&args.runtime).with_context(|| {
        format!("Policy file has no entries for runtime {}", args.runtime)
    })?;

    let version = args.version.trim_start_matches(['v', 'V']);
    match check_download_allowed(entries, &args.runtime, version, pattern) {
        Ok(()) => {
            output::success(&format!(
                "{} {} is cleared for download",
                args.runtime, version
            ));
            Ok(())
        }
        Err(err) => {
            output::error(&err.to_string());
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_marks_set_flags_only() {
        let mut entry = PolicyVersion::new("20");
        entry.supported = true;
        entry.lts = true;

        let row = PolicyRow::from_entry(&entry);
        assert_eq!(row.supported, "yes");
        assert_eq!(row.lts, "yes");
        assert_eq!(row.recommended, "-");
        assert_eq!(row.under_review, "-");
        assert_eq!(row.pinned_eol, "-");
    }

    #[test]
    fn test_row_formats_pinned_eol_date() {
        let mut entry = PolicyVersion::new("18");
        entry.eol_date = chrono::NaiveDate::from_ymd_opt(2025, 4, 30);

        let row = PolicyRow::from_entry(&entry);
        assert_eq!(row.pinned_eol, "2025-04-30");
    }
}
