//! SHA-256 checksum verification against vendor manifests
//!
//! The checksum stage is the hard gate of the pipeline: a missing
//! manifest, a missing entry, or a digest mismatch fails the artifact
//! and stops the remaining stages.

use crate::audit::AuditRecord;
use crate::pipeline::{StageOutcome, VerificationStage};
use async_trait::async_trait;
use brokkr_core::error::Result;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read buffer for streaming digests (1MB)
const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Compute the SHA-256 digest of a file, lowercase hex-encoded
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Find the digest recorded for `file_name` in a `<hex> <name>` manifest.
///
/// Handles the `sha256sum` binary-mode marker (`*` before the name).
fn find_manifest_entry(manifest: &str, file_name: &str) -> Option<String> {
    for line in manifest.lines() {
        let mut parts = line.split_whitespace();
        let (Some(digest), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        let name = name.strip_prefix('*').unwrap_or(name);
        if name == file_name {
            return Some(digest.to_string());
        }
    }
    None
}

/// Verifies an artifact's SHA-256 digest against its sibling manifest
/// (`SHASUMS256.txt` for Node.js distributions).
pub struct ChecksumStage {
    manifest_name: String,
}

impl ChecksumStage {
    /// Create a stage looking for the given manifest file name next to
    /// the artifact
    pub fn new(manifest_name: impl Into<String>) -> Self {
        Self {
            manifest_name: manifest_name.into(),
        }
    }
}

#[async_trait]
impl VerificationStage for ChecksumStage {
    fn method(&self) -> &'static str {
        "sha256"
    }

    async fn run(&self, artifact: &Path, audit: &mut AuditRecord) -> StageOutcome {
        let manifest_path = match artifact.parent() {
            Some(parent) => parent.join(&self.manifest_name),
            None => return StageOutcome::Failed("artifact has no parent directory".to_string()),
        };

        if !manifest_path.exists() {
            return StageOutcome::Failed(format!(
                "checksum manifest {} not found",
                manifest_path.display()
            ));
        }

        let manifest = match std::fs::read_to_string(&manifest_path) {
            Ok(text) => text,
            Err(e) => {
                return StageOutcome::Failed(format!(
                    "failed to read checksum manifest {}: {}",
                    manifest_path.display(),
                    e
                ))
            }
        };

        let file_name = match artifact.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return StageOutcome::Failed("artifact has no file name".to_string()),
        };

        let expected = match find_manifest_entry(&manifest, &file_name) {
            Some(digest) => digest,
            None => {
                return StageOutcome::Failed(format!(
                    "no entry for {} in {}",
                    file_name, self.manifest_name
                ))
            }
        };

        let actual = match sha256_file(artifact) {
            Ok(digest) => digest,
            Err(e) => return StageOutcome::Failed(format!("failed to hash artifact: {}", e)),
        };

        audit.checksum = Some(actual.clone());

        // Hex digests compare case-sensitively.
        if actual == expected {
            audit.checksum_verified = true;
            StageOutcome::Passed
        } else {
            StageOutcome::Failed(format!(
                "checksum mismatch for {}: manifest has {}, computed {}",
                file_name, expected, actual
            ))
        }
    }
}
