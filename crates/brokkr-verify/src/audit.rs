//! Audit record emission
//!
//! Every verification attempt produces one JSON document next to the
//! artifact (`<name>.audit.json`), overwriting any prior record for that
//! path. The record is written on failure too, with `error` populated.
//! Field names are a stable on-disk format consumed by downstream audit
//! tooling.

use brokkr_core::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Outcome of a malware scan, embedded in the audit record when scanning ran.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanReport {
    /// Version string reported by the scan engine
    pub engine_version: String,

    /// Wall-clock scan duration in milliseconds
    pub duration_ms: u64,

    /// Whether the scan found the artifact clean
    pub clean: bool,

    /// Names of detected threats (empty when clean)
    pub threats: Vec<String>,
}

/// Per-artifact verification record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// Artifact file name (not the full path)
    pub artifact: String,

    /// URL the artifact was fetched from
    pub source_url: String,

    /// Artifact size in bytes
    pub size_bytes: u64,

    /// Computed digest of the artifact, hex-encoded
    pub checksum: Option<String>,

    /// Digest algorithm tag
    pub checksum_method: String,

    /// Whether the computed digest matched the vendor manifest
    pub checksum_verified: bool,

    /// Signature algorithm tag
    pub signature_method: String,

    /// Whether the manifest signature verified against the embedded keyring
    pub signature_verified: bool,

    /// Malware scan outcome, present only when scanning ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanReport>,

    /// Failure description when verification did not succeed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When this record was produced
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Create a fresh record for an artifact before any stage has run
    pub fn new(artifact: &Path, source_url: &str, size_bytes: u64) -> Self {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| artifact.display().to_string());

        Self {
            id: Uuid::new_v4(),
            artifact: name,
            source_url: source_url.to_string(),
            size_bytes,
            checksum: None,
            checksum_method: "sha256".to_string(),
            checksum_verified: false,
            signature_method: "ecdsa-p256".to_string(),
            signature_verified: false,
            scan: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Sibling path the record is written to: `<artifact>.audit.json`
    pub fn path_for(artifact: &Path) -> PathBuf {
        let mut name = artifact.as_os_str().to_os_string();
        name.push(".audit.json");
        PathBuf::from(name)
    }

    /// Write the record next to the artifact, replacing any prior record
    pub fn write(&self, artifact: &Path) -> Result<PathBuf> {
        let path = Self::path_for(artifact);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}
