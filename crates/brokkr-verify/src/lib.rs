//! Artifact verification for Brokkr
//!
//! This crate handles:
//! - SHA-256 checksum verification against vendor manifests
//! - Detached ECDSA P-256 signature verification of those manifests
//! - Malware scanning via an external engine (ClamAV by default)
//! - Audit record emission, one JSON document per verified artifact
//!
//! Stages are chained by [`VerificationPipeline`]: verification stops at
//! the first hard failure, and the audit record is written regardless of
//! the outcome.

pub mod audit;
pub mod checksum;
pub mod pipeline;
pub mod scanner;
pub mod signature;

pub use audit::{AuditRecord, ScanReport};
pub use checksum::ChecksumStage;
pub use pipeline::{StageOutcome, VerificationPipeline, VerificationStage};
pub use scanner::{ClamScanner, MalwareScanStage, MalwareScanner, ScanOutcome};
pub use signature::SignatureStage;
