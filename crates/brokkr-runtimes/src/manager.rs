//! Download session orchestration
//!
//! [`RuntimeManager`] ties the pieces together: provider lookup, version
//! resolution, ledger-based idempotence, bounded-concurrency fetching,
//! verification, and ledger recording. The policy gate sits inside the
//! provider's task planning, so a sanction violation aborts the session
//! before any network traffic.

use crate::ledger::{DownloadLedger, LedgerRecord};
use crate::provider::RuntimeProvider;
use crate::registry::ProviderRegistry;
use brokkr_core::error::{Error, Result};
use brokkr_core::types::{DownloadResult, FileKind, Platform};
use brokkr_core::version::extract_pattern;
use brokkr_fetch::DownloadExecutor;
use brokkr_verify::MalwareScanner;
use camino::Utf8PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What one download session should produce
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub runtime: String,
    /// Requested version, resolved against the sanctioned set (`20`, `20.11.1`)
    pub version: String,
    pub platforms: Vec<Platform>,
    pub dest: Utf8PathBuf,
    /// Download even when the ledger already has a verified entry
    pub force: bool,
}

/// Orchestrates resolve, fetch, verify, and record for one runtime
pub struct RuntimeManager {
    registry: Arc<ProviderRegistry>,
    executor: DownloadExecutor,
    ledger: Arc<dyn DownloadLedger>,
    scanner: Option<Arc<dyn MalwareScanner>>,
}

impl RuntimeManager {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        executor: DownloadExecutor,
        ledger: Arc<dyn DownloadLedger>,
    ) -> Self {
        Self {
            registry,
            executor,
            ledger,
            scanner: None,
        }
    }

    /// Attach a malware scanner as the final verification stage
    pub fn with_scanner(mut self, scanner: Arc<dyn MalwareScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Run one download session.
    ///
    /// Resolves the requested version through the provider, drops platforms
    /// the ledger already covers (unless forced), fetches the remaining
    /// artifacts together with their verification files, verifies every
    /// fetched artifact, and records verified downloads in the ledger.
    /// Results keep task order; a verification failure retracts the
    /// download success in place rather than removing the entry.
    pub async fn download(&self, options: &DownloadOptions) -> Result<Vec<DownloadResult>> {
        let provider = self.registry.get(&options.runtime)?;

        let requested = options.version.trim_start_matches(['v', 'V']);
        let artifact_version = self.resolve_artifact_version(&*provider, requested, options).await?;
        info!(
            runtime = %options.runtime,
            requested = %options.version,
            resolved = %artifact_version,
            "resolved version"
        );

        let platforms = self.remaining_platforms(options, &artifact_version);
        if platforms.is_empty() {
            info!(
                runtime = %options.runtime,
                version = %artifact_version,
                "every platform already downloaded and verified"
            );
            return Ok(Vec::new());
        }

        let tasks = provider
            .create_download_tasks(&artifact_version, &platforms, &options.dest)
            .await?;
        let mut results = self.executor.process(tasks).await;

        let pipeline = provider.verification_pipeline(self.scanner.clone());
        for result in &mut results {
            if !result.success || result.task.kind != FileKind::Main {
                continue;
            }
            match pipeline
                .verify(&result.task.output_path, &result.task.url, result.size_bytes)
                .await
            {
                Ok(_) => self.record(options, &artifact_version, result),
                Err(err) => result.mark_failed(err.to_string()),
            }
        }

        Ok(results)
    }

    /// Version the artifacts will actually carry.
    ///
    /// A request at line granularity (`20` under a major pattern) means
    /// "the newest sanctioned patch"; anything more precise is honored
    /// verbatim. A version absent from the sanctioned listing also passes
    /// through verbatim so the policy gate inside task planning decides;
    /// under-review versions are downloadable only by exact version.
    async fn resolve_artifact_version(
        &self,
        provider: &dyn RuntimeProvider,
        requested: &str,
        options: &DownloadOptions,
    ) -> Result<String> {
        match provider.resolve_version(requested).await {
            Ok(info) => {
                let line_request = extract_pattern(requested, info.pattern)
                    .map(|line| line == requested)
                    .unwrap_or(false);
                if !line_request {
                    return Ok(requested.to_string());
                }
                info.latest.ok_or_else(|| {
                    Error::invalid_response(format!(
                        "no latest patch known for {} {}",
                        options.runtime, info.version
                    ))
                })
            }
            Err(Error::NotFound { .. }) => Ok(requested.to_string()),
            Err(err) => Err(err),
        }
    }

    /// Platforms still needing a download. A ledger read failure keeps the
    /// platform in the set so a corrupt ledger cannot block downloads.
    fn remaining_platforms(&self, options: &DownloadOptions, version: &str) -> Vec<Platform> {
        if options.force {
            return options.platforms.clone();
        }
        options
            .platforms
            .iter()
            .filter(|platform| {
                match self.ledger.is_already_downloaded(
                    &options.runtime,
                    version,
                    &platform.os,
                    &platform.arch,
                ) {
                    Ok(true) => {
                        info!(
                            runtime = %options.runtime,
                            version = version,
                            platform = %platform,
                            "already downloaded and verified, skipping"
                        );
                        false
                    }
                    Ok(false) => true,
                    Err(err) => {
                        warn!("ledger check failed for {}: {}", platform, err);
                        true
                    }
                }
            })
            .cloned()
            .collect()
    }

    /// Ledger write failures are logged, not fatal; the artifact on disk
    /// is already verified at this point.
    fn record(&self, options: &DownloadOptions, version: &str, result: &DownloadResult) {
        let outcome = LedgerRecord::new(
            &options.runtime,
            version,
            &result.task.platform,
            result.task.file_name(),
            result.size_bytes,
            &result.task.url,
            "sha256",
            "verified",
        )
        .and_then(|record| self.ledger.record_download(&record));
        if let Err(err) = outcome {
            warn!(
                "failed to record {} in ledger: {}",
                result.task.file_name(),
                err
            );
        }
    }
}
