//! Malware scanning stage
//!
//! The pipeline depends only on the narrow [`MalwareScanner`] contract;
//! the shipped implementation shells out to ClamAV's `clamscan`, either
//! on the host or inside a container. A scan error fails the artifact.
//! A positive detection fails the artifact, records the threat names in
//! the audit record, and deletes the artifact from disk (quarantine);
//! the audit record survives.

use crate::audit::{AuditRecord, ScanReport};
use crate::pipeline::{StageOutcome, VerificationStage};
use async_trait::async_trait;
use brokkr_core::error::{Error, Result};
use brokkr_core::types::ScannerConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{info, warn};

/// Result of scanning one file
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Whether the engine found the file clean
    pub clean: bool,

    /// Detected threat names (empty when clean)
    pub threats: Vec<String>,

    /// Engine version string, "unknown" when it cannot be determined
    pub engine_version: String,

    /// Wall-clock scan duration
    pub duration: Duration,
}

/// Contract between the pipeline and a scan engine
#[async_trait]
pub trait MalwareScanner: Send + Sync {
    /// Engine tag used in logs and failure messages
    fn name(&self) -> &'static str;

    /// Scan a single file
    async fn scan(&self, path: &Path) -> Result<ScanOutcome>;
}

/// Extract threat names from `clamscan` output.
///
/// Detections are reported one per line as `<path>: <threat> FOUND`.
fn parse_threats(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let stripped = line.strip_suffix(" FOUND")?;
            let (_, threat) = stripped.rsplit_once(": ")?;
            Some(threat.to_string())
        })
        .collect()
}

/// Extract the engine version from the `clamscan` scan summary block
fn parse_engine_version(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        line.strip_prefix("Engine version: ")
            .map(|v| v.trim().to_string())
    })
}

/// ClamAV-backed scanner.
///
/// Exit status semantics follow `clamscan(1)`: 0 means clean, 1 means a
/// virus was found, anything else is an engine error.
pub struct ClamScanner {
    config: ScannerConfig,
}

impl ClamScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Whether the configured engine can run at all (binary on PATH, or
    /// docker present in container mode)
    pub fn is_available(&self) -> bool {
        if self.config.use_container {
            which::which("docker").is_ok()
        } else {
            which::which(&self.config.command).is_ok()
        }
    }

    async fn run_engine(&self, path: &Path) -> Result<std::process::Output> {
        let mut command = if self.config.use_container {
            let file_name = path
                .file_name()
                .ok_or_else(|| Error::verification("artifact has no file name"))?
                .to_string_lossy()
                .into_owned();
            let mounted = path.canonicalize().map_err(|e| {
                Error::verification(format!("cannot resolve {}: {}", path.display(), e))
            })?;
            let target = format!("/scan/{}", file_name);

            let mut c = Command::new("docker");
            c.arg("run")
                .arg("--rm")
                .arg("-v")
                .arg(format!("{}:{}:ro", mounted.display(), target))
                .arg(&self.config.image)
                .arg(&self.config.command);
            c.args(&self.config.args);
            c.arg(&target);
            c
        } else {
            let mut c = Command::new(&self.config.command);
            c.args(&self.config.args);
            c.arg(path);
            c
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(Error::verification(format!(
                "failed to launch {}: {}",
                self.config.command, e
            ))),
            Err(_) => Err(Error::verification(format!(
                "scan of {} timed out after {}s",
                path.display(),
                self.config.timeout_secs
            ))),
        }
    }

    /// Engine version when the scan summary did not include one
    async fn query_version(&self) -> String {
        if self.config.use_container {
            return self.config.image.clone();
        }

        match Command::new(&self.config.command)
            .arg("--version")
            .output()
            .await
        {
            Ok(out) if out.status.success() => {
                String::from_utf8_lossy(&out.stdout).trim().to_string()
            }
            _ => "unknown".to_string(),
        }
    }
}

#[async_trait]
impl MalwareScanner for ClamScanner {
    fn name(&self) -> &'static str {
        "clamav"
    }

    async fn scan(&self, path: &Path) -> Result<ScanOutcome> {
        let started = Instant::now();
        let output = self.run_engine(path).await?;
        let duration = started.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let threats = parse_threats(&stdout);
        let engine_version = match parse_engine_version(&stdout) {
            Some(version) => version,
            None => self.query_version().await,
        };

        match output.status.code() {
            Some(0) => Ok(ScanOutcome {
                clean: true,
                threats: Vec::new(),
                engine_version,
                duration,
            }),
            Some(1) => {
                // Detection lines can be missing when custom args alter
                // the output format; the verdict still stands.
                let threats = if threats.is_empty() {
                    vec!["unnamed threat".to_string()]
                } else {
                    threats
                };
                Ok(ScanOutcome {
                    clean: false,
                    threats,
                    engine_version,
                    duration,
                })
            }
            Some(code) => Err(Error::verification(format!(
                "{} exited with status {}: {}",
                self.config.command,
                code,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            None => Err(Error::verification(format!(
                "{} terminated by signal",
                self.config.command
            ))),
        }
    }
}

/// Pipeline stage wrapping a [`MalwareScanner`]
pub struct MalwareScanStage {
    scanner: Arc<dyn MalwareScanner>,
}

impl MalwareScanStage {
    pub fn new(scanner: Arc<dyn MalwareScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl VerificationStage for MalwareScanStage {
    fn method(&self) -> &'static str {
        self.scanner.name()
    }

    async fn run(&self, artifact: &Path, audit: &mut AuditRecord) -> StageOutcome {
        let outcome = match self.scanner.scan(artifact).await {
            Ok(outcome) => outcome,
            Err(e) => return StageOutcome::Failed(format!("scan error: {}", e)),
        };

        audit.scan = Some(ScanReport {
            engine_version: outcome.engine_version.clone(),
            duration_ms: outcome.duration.as_millis() as u64,
            clean: outcome.clean,
            threats: outcome.threats.clone(),
        });

        if outcome.clean {
            return StageOutcome::Passed;
        }

        info!(
            "quarantining {}: {}",
            artifact.display(),
            outcome.threats.join(", ")
        );
        if let Err(e) = std::fs::remove_file(artifact) {
            warn!(
                "failed to remove infected artifact {}: {}",
                artifact.display(),
                e
            );
        }

        StageOutcome::Failed(format!("threats detected: {}", outcome.threats.join(", ")))
    }
}
