//! CLI argument parsing with clap

use brokkr_core::types::Platform;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Brokkr - Policy-gated downloads of managed runtime distributions
#[derive(Parser, Debug)]
#[command(name = "brokkr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to brokkr.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List policy-sanctioned versions
    List(ListArgs),

    /// Download and verify runtime artifacts
    Download(DownloadArgs),

    /// Re-run verification against a downloaded artifact
    Verify(VerifyArgs),

    /// Policy inspection
    #[command(subcommand)]
    Policy(PolicyCommands),

    /// Download ledger management
    #[command(subcommand)]
    Ledger(LedgerCommands),
}

// List command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Runtime to list versions for
    #[arg(short, long, default_value = "nodejs")]
    pub runtime: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Download command
#[derive(Args, Debug)]
#[command(disable_version_flag = true)]
pub struct DownloadArgs {
    /// Runtime to download
    #[arg(short, long, default_value = "nodejs")]
    pub runtime: String,

    /// Version to download (a sanctioned line like `20`, or an exact `20.11.1`)
    #[arg(long)]
    pub version: String,

    /// Platform to download for (repeatable; defaults to the current platform)
    #[arg(short, long = "platform", value_name = "OS-ARCH")]
    pub platforms: Vec<Platform>,

    /// Download for every platform configured for the runtime
    #[arg(long, conflicts_with = "platforms")]
    pub all_platforms: bool,

    /// Destination directory (default: download_dir from brokkr.yaml)
    #[arg(short, long)]
    pub dest: Option<Utf8PathBuf>,

    /// Re-download even when the ledger already has a verified entry
    #[arg(short, long)]
    pub force: bool,
}

// Verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Artifact to verify (checksum manifest and signature must sit beside it)
    pub artifact: Utf8PathBuf,

    /// Runtime the artifact belongs to
    #[arg(short, long, default_value = "nodejs")]
    pub runtime: String,

    /// Output the audit record as JSON
    #[arg(long)]
    pub json: bool,
}

// Policy commands
#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Show policy entries for a runtime
    Show(PolicyShowArgs),

    /// Evaluate the download gate for a version
    Check(PolicyCheckArgs),
}

#[derive(Args, Debug)]
pub struct PolicyShowArgs {
    /// Runtime to show entries for
    #[arg(short, long, default_value = "nodejs")]
    pub runtime: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
#[command(disable_version_flag = true)]
pub struct PolicyCheckArgs {
    /// Runtime the version belongs to
    #[arg(short, long, default_value = "nodejs")]
    pub runtime: String,

    /// Version to evaluate
    #[arg(long)]
    pub version: String,
}

// Ledger commands
#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// List recorded downloads
    List(LedgerListArgs),

    /// Remove every ledger record
    Prune(LedgerPruneArgs),
}

#[derive(Args, Debug)]
pub struct LedgerListArgs {
    /// Show records for one runtime only
    #[arg(short, long)]
    pub runtime: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LedgerPruneArgs {
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_download_args_parse() {
        let cli = Cli::parse_from([
            "brokkr",
            "download",
            "--runtime",
            "nodejs",
            "--version",
            "20",
            "--platform",
            "linux-x64",
            "--platform",
            "darwin-arm64",
            "--force",
        ]);
        let Commands::Download(args) = cli.command else {
            panic!("expected download command");
        };
        assert_eq!(args.runtime, "nodejs");
        assert_eq!(args.version, "20");
        assert_eq!(
            args.platforms,
            vec![Platform::new("linux", "x64"), Platform::new("darwin", "arm64")]
        );
        assert!(args.force);
        assert!(args.dest.is_none());
    }

    #[test]
    fn test_platform_aliases_normalized_at_parse_time() {
        let cli = Cli::parse_from([
            "brokkr",
            "download",
            "--version",
            "20",
            "--platform",
            "macos-aarch64",
        ]);
        let Commands::Download(args) = cli.command else {
            panic!("expected download command");
        };
        assert_eq!(args.platforms, vec![Platform::new("darwin", "arm64")]);
    }

    #[test]
    fn test_malformed_platform_rejected() {
        let result = Cli::try_parse_from([
            "brokkr",
            "download",
            "--version",
            "20",
            "--platform",
            "linux",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_all_platforms_conflicts_with_platform() {
        let result = Cli::try_parse_from([
            "brokkr",
            "download",
            "--version",
            "20",
            "--platform",
            "linux-x64",
            "--all-platforms",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag_reaches_subcommands() {
        let cli = Cli::parse_from([
            "brokkr",
            "list",
            "--config",
            "/etc/brokkr/brokkr.yaml",
            "--json",
        ]);
        assert_eq!(
            cli.config,
            Some(Utf8PathBuf::from("/etc/brokkr/brokkr.yaml"))
        );
        let Commands::List(args) = cli.command else {
            panic!("expected list command");
        };
        assert!(args.json);
    }

    #[test]
    fn test_ledger_prune_defaults_to_interactive() {
        let cli = Cli::parse_from(["brokkr", "ledger", "prune"]);
        let Commands::Ledger(LedgerCommands::Prune(args)) = cli.command else {
            panic!("expected ledger prune command");
        };
        assert!(!args.yes);
    }
}
