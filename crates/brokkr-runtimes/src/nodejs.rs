//! Node.js runtime adapter
//!
//! Resolves sanctioned Node.js versions by merging the organization policy
//! with the endoflife.date lifecycle feed, and lays out download tasks
//! against the nodejs.org distribution tree. Every release directory under
//! `https://nodejs.org/dist/v{version}/` carries one `SHASUMS256.txt`
//! manifest covering all platform artifacts plus a detached signature over
//! that manifest, which is what the verification pipeline consumes.

use crate::lifecycle::LifecycleSource;
use crate::policy::{apply_policy, check_download_allowed, PolicyStore};
use crate::provider::RuntimeProvider;
use async_trait::async_trait;
use brokkr_core::error::{Error, Result};
use brokkr_core::types::{DownloadTask, FileKind, Platform, PolicyVersion, RuntimeOptions, VersionInfo};
use brokkr_core::version::{compare_versions, is_supported};
use brokkr_verify::{ChecksumStage, MalwareScanStage, MalwareScanner, SignatureStage, VerificationPipeline};
use camino::Utf8Path;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "nodejs";
const DEFAULT_DIST_BASE: &str = "https://nodejs.org/dist";
const CHECKSUM_MANIFEST: &str = "SHASUMS256.txt";
const SIGNATURE_FILE: &str = "SHASUMS256.txt.sig";

/// Node.js adapter over the generic provider contract
pub struct NodeJsProvider {
    lifecycle: Arc<dyn LifecycleSource>,
    policy: Arc<PolicyStore>,
    options: RuntimeOptions,
}

impl NodeJsProvider {
    pub fn new(
        lifecycle: Arc<dyn LifecycleSource>,
        policy: Arc<PolicyStore>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            lifecycle,
            policy,
            options,
        }
    }

    fn dist_base(&self) -> &str {
        self.options
            .dist_base_url
            .as_deref()
            .map(|base| base.trim_end_matches('/'))
            .unwrap_or(DEFAULT_DIST_BASE)
    }

    fn entries(&self) -> Result<&[PolicyVersion]> {
        self.policy.entries_for(NAME).ok_or_else(|| {
            Error::policy(format!("policy file has no entries for runtime {NAME}"))
        })
    }

    /// Artifact file name as published on nodejs.org, e.g.
    /// `node-v20.11.1-linux-x64.tar.gz` or `node-v20.11.1-win-x64.zip`.
    fn artifact_name(version: &str, platform: &Platform) -> String {
        let ext = if platform.os == "win" { "zip" } else { "tar.gz" };
        format!("node-v{}-{}-{}.{}", version, platform.os, platform.arch, ext)
    }
}

#[async_trait]
impl RuntimeProvider for NodeJsProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn supported_versions(&self) -> Result<Vec<VersionInfo>> {
        let releases = self.lifecycle.product_info(NAME).await?;
        let mut versions = apply_policy(&releases, self.entries()?, NAME, self.options.pattern);
        versions.sort_by(|a, b| {
            compare_versions(&b.version, &a.version).unwrap_or(Ordering::Equal)
        });
        debug!(
            runtime = NAME,
            count = versions.len(),
            "resolved sanctioned versions"
        );
        Ok(versions)
    }

    async fn resolve_version(&self, requested: &str) -> Result<VersionInfo> {
        let versions = self.supported_versions().await?;
        versions
            .into_iter()
            .find(|info| is_supported(&info.version, self.options.pattern, requested).unwrap_or(false))
            .ok_or_else(|| Error::not_found(format!("{NAME} version {requested} in the supported set")))
    }

    async fn create_download_tasks(
        &self,
        version: &str,
        platforms: &[Platform],
        dest: &Utf8Path,
    ) -> Result<Vec<DownloadTask>> {
        check_download_allowed(self.entries()?, NAME, version, self.options.pattern)?;

        let Some(first_platform) = platforms.first() else {
            return Ok(Vec::new());
        };

        let dir = dest.join(NAME).join(format!("v{version}"));
        let base = format!("{}/v{}", self.dist_base(), version);
        let mut tasks = Vec::with_capacity(platforms.len() + 2);

        for platform in platforms {
            let name = Self::artifact_name(version, platform);
            tasks.push(DownloadTask::new(
                format!("{base}/{name}"),
                dir.join(&name),
                platform.clone(),
                NAME,
                version,
                FileKind::Main,
            ));
        }

        // One manifest per version, shared by every platform artifact
        tasks.push(DownloadTask::new(
            format!("{base}/{CHECKSUM_MANIFEST}"),
            dir.join(CHECKSUM_MANIFEST),
            first_platform.clone(),
            NAME,
            version,
            FileKind::Checksum,
        ));
        tasks.push(
            DownloadTask::new(
                format!("{base}/{SIGNATURE_FILE}"),
                dir.join(SIGNATURE_FILE),
                first_platform.clone(),
                NAME,
                version,
                FileKind::Signature,
            )
            .optional(),
        );

        Ok(tasks)
    }

    fn verification_pipeline(&self, scanner: Option<Arc<dyn MalwareScanner>>) -> VerificationPipeline {
        let mut pipeline = VerificationPipeline::new()
            .with_stage(Box::new(ChecksumStage::new(CHECKSUM_MANIFEST)))
            .with_stage(Box::new(SignatureStage::for_runtime(
                NAME,
                CHECKSUM_MANIFEST,
                SIGNATURE_FILE,
            )));
        if let Some(scanner) = scanner {
            pipeline = pipeline.with_stage(Box::new(MalwareScanStage::new(scanner)));
        }
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleRelease;
    use brokkr_core::types::PolicyDocument;
    use brokkr_core::version::VersionPattern;
    use brokkr_verify::ScanOutcome;
    use chrono::NaiveDate;
    use std::path::Path;

    struct StaticLifecycle {
        releases: Vec<LifecycleRelease>,
    }

    #[async_trait]
    impl LifecycleSource for StaticLifecycle {
        async fn product_info(&self, _product: &str) -> Result<Vec<LifecycleRelease>> {
            Ok(self.releases.clone())
        }
    }

    struct NoopScanner;

    #[async_trait]
    impl MalwareScanner for NoopScanner {
        fn name(&self) -> &'static str {
            "noop"
        }

        async fn scan(&self, _path: &Path) -> Result<ScanOutcome> {
            Ok(ScanOutcome {
                clean: true,
                threats: Vec::new(),
                engine_version: "test".to_string(),
                duration: std::time::Duration::ZERO,
            })
        }
    }

    fn release(name: &str, latest: &str, lts: bool) -> LifecycleRelease {
        LifecycleRelease {
            name: name.to_string(),
            latest: Some(latest.to_string()),
            eol: false,
            eoas: false,
            maintained: true,
            lts,
            eol_date: NaiveDate::from_ymd_opt(2026, 4, 30),
            release_date: NaiveDate::from_ymd_opt(2023, 4, 18),
            latest_release_date: NaiveDate::from_ymd_opt(2024, 2, 14),
        }
    }

    fn policy_entry(version: &str, supported: bool) -> PolicyVersion {
        PolicyVersion {
            supported,
            ..PolicyVersion::new(version)
        }
    }

    fn store(entries: Vec<PolicyVersion>) -> Arc<PolicyStore> {
        let mut runtimes = std::collections::HashMap::new();
        runtimes.insert(NAME.to_string(), entries);
        Arc::new(PolicyStore::from_document(PolicyDocument::Runtimes(runtimes)))
    }

    fn provider(releases: Vec<LifecycleRelease>, entries: Vec<PolicyVersion>) -> NodeJsProvider {
        NodeJsProvider::new(
            Arc::new(StaticLifecycle { releases }),
            store(entries),
            RuntimeOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_supported_versions_sorted_descending() {
        let provider = provider(
            vec![
                release("18", "18.19.1", true),
                release("20", "20.11.1", true),
                release("21", "21.6.2", false),
            ],
            vec![
                policy_entry("18", true),
                policy_entry("20", true),
                policy_entry("21", true),
            ],
        );

        let versions = provider.supported_versions().await.unwrap();
        let names: Vec<&str> = versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(names, vec!["21", "20", "18"]);
    }

    #[tokio::test]
    async fn test_supported_versions_drops_unsanctioned() {
        let provider = provider(
            vec![release("16", "16.20.2", true), release("20", "20.11.1", true)],
            vec![policy_entry("20", true)],
        );

        let versions = provider.supported_versions().await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, "20");
        assert_eq!(versions[0].latest.as_deref(), Some("20.11.1"));
    }

    #[tokio::test]
    async fn test_supported_versions_without_policy_entries() {
        let provider = NodeJsProvider::new(
            Arc::new(StaticLifecycle {
                releases: vec![release("20", "20.11.1", true)],
            }),
            Arc::new(PolicyStore::from_document(PolicyDocument::Runtimes(
                std::collections::HashMap::new(),
            ))),
            RuntimeOptions::default(),
        );

        let err = provider.supported_versions().await.unwrap_err();
        assert!(matches!(err, Error::Policy { .. }));
        assert!(err.to_string().contains("no entries for runtime nodejs"));
    }

    #[tokio::test]
    async fn test_resolve_version_by_major() {
        let provider = provider(
            vec![release("18", "18.19.1", true), release("20", "20.11.1", true)],
            vec![policy_entry("18", true), policy_entry("20", true)],
        );

        let info = provider.resolve_version("20").await.unwrap();
        assert_eq!(info.version, "20");
        assert_eq!(info.latest.as_deref(), Some("20.11.1"));
    }

    #[tokio::test]
    async fn test_resolve_version_full_triple() {
        let provider = provider(
            vec![release("20", "20.11.1", true)],
            vec![policy_entry("20", true)],
        );

        // Major pattern matches any 20.x.y request against the 20 line
        let info = provider.resolve_version("20.11.1").await.unwrap();
        assert_eq!(info.version, "20");
    }

    #[tokio::test]
    async fn test_resolve_version_unknown() {
        let provider = provider(
            vec![release("20", "20.11.1", true)],
            vec![policy_entry("20", true)],
        );

        let err = provider.resolve_version("99").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_download_tasks_layout() {
        let provider = provider(
            vec![release("20", "20.11.1", true)],
            vec![policy_entry("20", true)],
        );
        let platforms = vec![Platform::new("linux", "x64"), Platform::new("win", "x64")];

        let tasks = provider
            .create_download_tasks("20.11.1", &platforms, Utf8Path::new("/downloads"))
            .await
            .unwrap();

        assert_eq!(tasks.len(), 4);
        assert_eq!(
            tasks[0].url,
            "https://nodejs.org/dist/v20.11.1/node-v20.11.1-linux-x64.tar.gz"
        );
        assert_eq!(
            tasks[1].url,
            "https://nodejs.org/dist/v20.11.1/node-v20.11.1-win-x64.zip"
        );
        assert_eq!(
            tasks[0].output_path,
            Path::new("/downloads/nodejs/v20.11.1/node-v20.11.1-linux-x64.tar.gz")
        );

        let checksum = &tasks[2];
        assert_eq!(checksum.kind, FileKind::Checksum);
        assert_eq!(checksum.url, "https://nodejs.org/dist/v20.11.1/SHASUMS256.txt");
        assert!(!checksum.optional);

        let signature = &tasks[3];
        assert_eq!(signature.kind, FileKind::Signature);
        assert_eq!(
            signature.url,
            "https://nodejs.org/dist/v20.11.1/SHASUMS256.txt.sig"
        );
        assert!(signature.optional);
    }

    #[tokio::test]
    async fn test_create_download_tasks_refuses_unsanctioned_version() {
        let provider = provider(
            vec![release("20", "20.11.1", true)],
            vec![policy_entry("20", true)],
        );
        let platforms = vec![Platform::new("linux", "x64")];

        let err = provider
            .create_download_tasks("16.20.2", &platforms, Utf8Path::new("/downloads"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Policy { .. }));
    }

    #[tokio::test]
    async fn test_create_download_tasks_without_platforms() {
        let provider = provider(
            vec![release("20", "20.11.1", true)],
            vec![policy_entry("20", true)],
        );

        let tasks = provider
            .create_download_tasks("20.11.1", &[], Utf8Path::new("/downloads"))
            .await
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_dist_base_override_trims_trailing_slash() {
        let options = RuntimeOptions {
            dist_base_url: Some("https://mirror.internal/node/".to_string()),
            ..RuntimeOptions::default()
        };
        let provider = NodeJsProvider::new(
            Arc::new(StaticLifecycle {
                releases: vec![release("20", "20.11.1", true)],
            }),
            store(vec![policy_entry("20", true)]),
            options,
        );
        let platforms = vec![Platform::new("linux", "x64")];

        let tasks = provider
            .create_download_tasks("20.11.1", &platforms, Utf8Path::new("/downloads"))
            .await
            .unwrap();
        assert_eq!(
            tasks[0].url,
            "https://mirror.internal/node/v20.11.1/node-v20.11.1-linux-x64.tar.gz"
        );
    }

    #[tokio::test]
    async fn test_major_minor_pattern_resolution() {
        let options = RuntimeOptions {
            pattern: VersionPattern::MajorMinor,
            ..RuntimeOptions::default()
        };
        let provider = NodeJsProvider::new(
            Arc::new(StaticLifecycle {
                releases: vec![release("20.11", "20.11.1", true)],
            }),
            store(vec![policy_entry("20.11", true)]),
            options,
        );

        let info = provider.resolve_version("20.11").await.unwrap();
        assert_eq!(info.version, "20.11");
        assert!(provider.resolve_version("20.12").await.is_err());
    }

    #[test]
    fn test_verification_pipeline_stage_count() {
        let provider = provider(vec![], vec![]);

        assert_eq!(provider.verification_pipeline(None).len(), 2);
        assert_eq!(
            provider
                .verification_pipeline(Some(Arc::new(NoopScanner)))
                .len(),
            3
        );
    }

    #[test]
    fn test_artifact_name_per_platform() {
        assert_eq!(
            NodeJsProvider::artifact_name("20.11.1", &Platform::new("linux", "arm64")),
            "node-v20.11.1-linux-arm64.tar.gz"
        );
        assert_eq!(
            NodeJsProvider::artifact_name("20.11.1", &Platform::new("darwin", "x64")),
            "node-v20.11.1-darwin-x64.tar.gz"
        );
        assert_eq!(
            NodeJsProvider::artifact_name("20.11.1", &Platform::new("win", "x64")),
            "node-v20.11.1-win-x64.zip"
        );
    }
}
