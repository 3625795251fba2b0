//! List command

use anyhow::{Context, Result};
use brokkr_core::types::VersionInfo;
use camino::Utf8Path;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::ListArgs;
use crate::output;

#[derive(Tabled)]
struct VersionRow {
    version: String,
    latest: String,
    flags: String,
    #[tabled(rename = "eol date")]
    eol_date: String,
}

impl VersionRow {
    fn from_info(info: &VersionInfo) -> Self {
        Self {
            version: info.version.clone(),
            latest: info.latest.clone().unwrap_or_else(|| "-".to_string()),
            flags: flags_for(info),
            eol_date: info
                .eol_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Compact status column: policy designations first, lifecycle state after
fn flags_for(info: &VersionInfo) -> String {
    let mut flags = Vec::new();
    if info.recommended {
        flags.push("recommended");
    }
    if info.lts {
        flags.push("lts");
    }
    if info.is_security_only() {
        flags.push("security-only");
    }
    if info.eol {
        flags.push("eol");
    }

    if flags.is_empty() {
        "-".to_string()
    } else {
        flags.join(", ")
    }
}

pub async fn run(args: ListArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let policy = super::load_policy(&config)?;
    let registry = super::build_registry(&config, policy)?;
    let provider = registry.get(&args.runtime)?;

    let spinner = output::spinner(&format!("Resolving sanctioned {} versions", args.runtime));
    let versions = provider.supported_versions().await;
    spinner.finish_and_clear();
    let versions = versions.context("Failed to resolve sanctioned versions")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    if versions.is_empty() {
        output::warning(&format!(
            "No sanctioned {} versions; the policy file and upstream lifecycle data do not intersect",
            args.runtime
        ));
        return Ok(());
    }

    let rows: Vec<VersionRow> = versions.iter().map(VersionRow::from_info).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    Ok(())
}
