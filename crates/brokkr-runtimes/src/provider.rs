//! The runtime provider capability

use async_trait::async_trait;
use brokkr_core::error::Result;
use brokkr_core::types::{DownloadTask, Platform, VersionInfo};
use brokkr_verify::{MalwareScanner, VerificationPipeline};
use camino::Utf8Path;
use std::sync::Arc;

/// One managed runtime (Node.js, Python, ...) behind a uniform capability.
///
/// Implementations own their upstream layout: distribution URLs, artifact
/// naming, sibling files, and the verification stages that apply. The
/// manager only ever speaks this interface.
#[async_trait]
pub trait RuntimeProvider: Send + Sync {
    /// Registry name of the runtime
    fn name(&self) -> &str;

    /// Policy-sanctioned versions, newest line first
    async fn supported_versions(&self) -> Result<Vec<VersionInfo>>;

    /// Match a requested version (`20`, `20.11`, `20.11.1`) against the
    /// supported set under the configured pattern
    async fn resolve_version(&self, requested: &str) -> Result<VersionInfo>;

    /// Download tasks for one artifact version across `platforms`. The
    /// policy gate runs here; an empty platform list yields no tasks.
    async fn create_download_tasks(
        &self,
        version: &str,
        platforms: &[Platform],
        dest: &Utf8Path,
    ) -> Result<Vec<DownloadTask>>;

    /// Verification stages for this runtime's artifacts; the malware stage
    /// joins the chain when a scanner is supplied
    fn verification_pipeline(
        &self,
        scanner: Option<Arc<dyn MalwareScanner>>,
    ) -> VerificationPipeline;
}
