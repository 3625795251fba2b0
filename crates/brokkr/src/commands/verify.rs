//! Verify command

use anyhow::{Context, Result};
use brokkr_verify::AuditRecord;
use camino::Utf8Path;

use crate::cli::VerifyArgs;
use crate::output;

/// Re-run the runtime's verification pipeline against an artifact on disk.
///
/// The checksum manifest (and signature, if published) must sit in the
/// same directory as the artifact, which is where a download session
/// leaves them. A fresh audit record replaces the existing one.
pub async fn run(args: VerifyArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let policy = super::load_policy(&config)?;
    let registry = super::build_registry(&config, policy)?;
    let provider = registry.get(&args.runtime)?;
    let pipeline = provider.verification_pipeline(super::build_scanner(&config)?);

    let artifact = args.artifact.as_std_path();
    let size_bytes = std::fs::metadata(artifact)
        .with_context(|| format!("Cannot read {}", args.artifact))?
        .len();

    let spinner = output::spinner(&format!("Verifying {}", args.artifact));
    let verified = pipeline
        .verify(artifact, args.artifact.as_str(), size_bytes)
        .await;
    spinner.finish_and_clear();

    let audit_path = AuditRecord::path_for(artifact).display().to_string();
    match verified {
        Ok(record) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&record)?);
                return Ok(());
            }
            output::success(&format!("{} passed verification", record.artifact));
            output::kv(
                "Checksum",
                if record.checksum_verified {
                    "verified"
                } else {
                    "not checked"
                },
            );
            output::kv(
                "Signature",
                if record.signature_verified {
                    "verified"
                } else {
                    "unverified (advisory)"
                },
            );
            if let Some(scan) = &record.scan {
                output::kv(
                    "Malware scan",
                    &format!("clean ({}, {} ms)", scan.engine_version, scan.duration_ms),
                );
            }
            output::kv("Audit record", &audit_path);
            Ok(())
        }
        Err(err) => {
            output::error(&err.to_string());
            output::kv("Audit record", &audit_path);
            Err(err.into())
        }
    }
}
