//! Stage chaining for artifact verification
//!
//! A pipeline runs its stages in order against one artifact. Severity is
//! fixed per stage kind: a `Failed` outcome stops the chain and fails the
//! artifact, a `Warned` outcome is logged and recorded but does not fail
//! it. The audit record is written exactly once per `verify` call, after
//! the chain finishes, whatever the outcome.

use crate::audit::AuditRecord;
use async_trait::async_trait;
use brokkr_core::error::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of a single verification stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Stage ran and the artifact passed
    Passed,

    /// Stage found a problem worth recording that does not fail the artifact
    Warned(String),

    /// Stage found a problem that fails the artifact and stops the chain
    Failed(String),
}

/// One verification step run against a downloaded artifact
#[async_trait]
pub trait VerificationStage: Send + Sync {
    /// Method tag used in logs and failure messages
    fn method(&self) -> &'static str;

    /// Run the stage, recording findings on the audit record
    async fn run(&self, artifact: &Path, audit: &mut AuditRecord) -> StageOutcome;
}

/// Ordered chain of verification stages for one runtime's artifacts
pub struct VerificationPipeline {
    stages: Vec<Box<dyn VerificationStage>>,
}

impl VerificationPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the chain
    pub fn with_stage(mut self, stage: Box<dyn VerificationStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Number of stages in the chain
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage against the artifact and write its audit record.
    ///
    /// Returns the record on success. On the first `Failed` outcome the
    /// remaining stages are skipped, the record is written with `error`
    /// populated, and a verification error is returned.
    pub async fn verify(
        &self,
        artifact: &Path,
        source_url: &str,
        size_bytes: u64,
    ) -> Result<AuditRecord> {
        let mut audit = AuditRecord::new(artifact, source_url, size_bytes);
        let mut failure: Option<String> = None;

        for stage in &self.stages {
            debug!(
                "running {} verification for {}",
                stage.method(),
                artifact.display()
            );

            match stage.run(artifact, &mut audit).await {
                StageOutcome::Passed => {}
                StageOutcome::Warned(msg) => {
                    warn!(
                        "{} verification warning for {}: {}",
                        stage.method(),
                        artifact.display(),
                        msg
                    );
                }
                StageOutcome::Failed(msg) => {
                    failure = Some(format!("{} verification failed: {}", stage.method(), msg));
                    break;
                }
            }
        }

        audit.error = failure.clone();
        let audit_path = audit.write(artifact)?;
        debug!("audit record written to {}", audit_path.display());

        match failure {
            Some(msg) => Err(Error::verification(msg)),
            None => Ok(audit),
        }
    }
}

impl Default for VerificationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Stage that returns a canned outcome and counts invocations
    struct ScriptedStage {
        method: &'static str,
        outcome: StageOutcome,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedStage {
        fn new(method: &'static str, outcome: StageOutcome) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    method,
                    outcome,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl VerificationStage for ScriptedStage {
        fn method(&self) -> &'static str {
            self.method
        }

        async fn run(&self, _artifact: &Path, _audit: &mut AuditRecord) -> StageOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn temp_artifact(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("artifact.tar.gz");
        fs::write(&path, b"payload").unwrap();
        path
    }

    #[tokio::test]
    async fn test_all_stages_pass() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = temp_artifact(&dir);

        let (first, first_calls) = ScriptedStage::new("sha256", StageOutcome::Passed);
        let (second, second_calls) = ScriptedStage::new("ecdsa-p256", StageOutcome::Passed);
        let pipeline = VerificationPipeline::new()
            .with_stage(Box::new(first))
            .with_stage(Box::new(second));

        let audit = pipeline
            .verify(&artifact, "https://example.com/a.tar.gz", 7)
            .await
            .unwrap();

        assert!(audit.error.is_none());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert!(AuditRecord::path_for(&artifact).exists());
    }

    #[tokio::test]
    async fn test_failure_stops_chain() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = temp_artifact(&dir);

        let (first, _) = ScriptedStage::new(
            "sha256",
            StageOutcome::Failed("checksum mismatch".to_string()),
        );
        let (second, second_calls) = ScriptedStage::new("clamav", StageOutcome::Passed);
        let pipeline = VerificationPipeline::new()
            .with_stage(Box::new(first))
            .with_stage(Box::new(second));

        let err = pipeline
            .verify(&artifact, "https://example.com/a.tar.gz", 7)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("sha256 verification failed"));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_warning_does_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = temp_artifact(&dir);

        let (first, _) = ScriptedStage::new(
            "ecdsa-p256",
            StageOutcome::Warned("signature did not verify".to_string()),
        );
        let (second, second_calls) = ScriptedStage::new("clamav", StageOutcome::Passed);
        let pipeline = VerificationPipeline::new()
            .with_stage(Box::new(first))
            .with_stage(Box::new(second));

        let audit = pipeline
            .verify(&artifact, "https://example.com/a.tar.gz", 7)
            .await
            .unwrap();

        assert!(audit.error.is_none());
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_audit_written_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = temp_artifact(&dir);

        let (stage, _) = ScriptedStage::new("sha256", StageOutcome::Failed("bad".to_string()));
        let pipeline = VerificationPipeline::new().with_stage(Box::new(stage));

        let result = pipeline
            .verify(&artifact, "https://example.com/a.tar.gz", 7)
            .await;
        assert!(result.is_err());

        let body = fs::read_to_string(AuditRecord::path_for(&artifact)).unwrap();
        let record: AuditRecord = serde_json::from_str(&body).unwrap();
        assert_eq!(
            record.error.as_deref(),
            Some("sha256 verification failed: bad")
        );
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = temp_artifact(&dir);

        let pipeline = VerificationPipeline::new();
        assert!(pipeline.is_empty());

        let audit = pipeline
            .verify(&artifact, "https://example.com/a.tar.gz", 7)
            .await
            .unwrap();
        assert!(audit.error.is_none());
    }
}
