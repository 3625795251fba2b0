//! Download command

use anyhow::{Context, Result};
use brokkr_core::types::{DownloadResult, Platform};
use brokkr_fetch::DownloadExecutor;
use brokkr_runtimes::{DownloadOptions, FileLedger, RuntimeManager};
use camino::Utf8Path;
use std::sync::Arc;
use tracing::debug;

use crate::cli::DownloadArgs;
use crate::output;

pub async fn run(args: DownloadArgs, config_path: Option<&Utf8Path>, quiet: bool) -> Result<()> {
    let config = super::load_config(config_path)?;
    let policy = super::load_policy(&config)?;
    let registry = super::build_registry(&config, policy)?;
    let scanner = super::build_scanner(&config)?;

    let platforms = resolve_platforms(&args, &config)?;
    let platform_list = platforms
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let dest = args.dest.clone().unwrap_or_else(|| config.download_dir());
    debug!(platforms = %platform_list, dest = %dest, "download session parameters");

    output::header(&format!("Downloading {} {}", args.runtime, args.version));
    output::kv("Platforms", &platform_list);
    output::kv("Destination", dest.as_str());
    if scanner.is_some() {
        output::kv("Malware scan", "enabled");
    }
    println!();

    let executor = DownloadExecutor::new(&config.inner().network, config.inner().concurrency)
        .context("Failed to build download executor")?
        .with_progress(!quiet);
    let ledger = Arc::new(FileLedger::load_default().context("Failed to open download ledger")?);

    let mut manager = RuntimeManager::new(registry, executor, ledger);
    if let Some(scanner) = scanner {
        manager = manager.with_scanner(scanner);
    }

    let options = DownloadOptions {
        runtime: args.runtime.clone(),
        version: args.version.clone(),
        platforms,
        dest,
        force: args.force,
    };
    let results = manager.download(&options).await?;

    if results.is_empty() {
        output::success("Nothing to do; the ledger already covers every requested platform");
        return Ok(());
    }

    let mut failed = 0usize;
    for result in &results {
        report_result(result, &mut failed);
    }

    println!();
    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, results.len());
    }
    output::success(&format!(
        "Downloaded and verified {} files into {}",
        results.len(),
        options.dest
    ));
    Ok(())
}

/// Explicit platforms win; --all-platforms takes the configured set;
/// otherwise the artifact targets the machine brokkr runs on.
fn resolve_platforms(
    args: &DownloadArgs,
    config: &brokkr_core::BrokkrConfig,
) -> Result<Vec<Platform>> {
    if !args.platforms.is_empty() {
        return Ok(args.platforms.clone());
    }
    if args.all_platforms {
        return config
            .runtime_options(&args.runtime)
            .platforms
            .iter()
            .map(|p| p.parse())
            .collect::<std::result::Result<Vec<Platform>, _>>()
            .with_context(|| format!("Invalid platform in configuration for {}", args.runtime));
    }
    Ok(vec![Platform::current()])
}

/// One outcome line per file, matching the order tasks were planned in
fn report_result(result: &DownloadResult, failed: &mut usize) {
    let name = result.task.file_name();
    if result.success {
        if result.size_bytes == 0 && result.task.optional {
            output::info(&format!("{} not published upstream (optional)", name));
        } else {
            output::success(&format!("{} ({})", name, format_bytes(result.size_bytes)));
        }
    } else {
        *failed += 1;
        output::error(&format!(
            "{}: {}",
            name,
            result.error.as_deref().unwrap_or("unknown error")
        ));
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokkr_core::types::{DownloadTask, FileKind};
    use std::time::Duration;

    fn result(optional: bool, success: bool, size: u64) -> DownloadResult {
        let mut task = DownloadTask::new(
            "https://nodejs.org/dist/v20.11.1/node-v20.11.1-linux-x64.tar.gz",
            "/tmp/node-v20.11.1-linux-x64.tar.gz",
            Platform::new("linux", "x64"),
            "nodejs",
            "20.11.1",
            FileKind::Main,
        );
        if optional {
            task = task.optional();
        }
        if success {
            DownloadResult::succeeded(task, size, Duration::from_secs(1))
        } else {
            DownloadResult::failed(task, "connection reset")
        }
    }

    #[test]
    fn test_failure_counted() {
        let mut failed = 0;
        report_result(&result(false, false, 0), &mut failed);
        assert_eq!(failed, 1);
    }

    #[test]
    fn test_success_and_optional_miss_not_counted() {
        let mut failed = 0;
        report_result(&result(false, true, 1024), &mut failed);
        report_result(&result(true, true, 0), &mut failed);
        assert_eq!(failed, 0);
    }

    #[test]
    fn test_format_bytes_tiers() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(26_214_400), "25.0 MB");
        assert_eq!(format_bytes(2_147_483_648), "2.00 GB");
    }
}
