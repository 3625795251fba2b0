//! Detached signature verification over checksum manifests
//!
//! Verifies an ECDSA P-256 signature over the checksum manifest using a
//! per-runtime keyring embedded at build time (`keys/<runtime>.pem`).
//! Signature files are accepted as raw DER or base64-encoded DER.
//!
//! This stage is advisory: it runs only when both the manifest and its
//! detached signature are present, and a verification failure is logged
//! and recorded but never fails the artifact. Checksum integrity is the
//! hard gate; the signature is defense-in-depth.

use crate::audit::AuditRecord;
use crate::pipeline::{StageOutcome, VerificationStage};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use rust_embed::RustEmbed;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Public keys compiled into the binary, one PEM keyring per runtime.
/// Keys are never fetched over the network at run time.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/keys/"]
#[prefix = ""]
struct EmbeddedKeys;

/// Parse every `PUBLIC KEY` PEM block in a keyring file.
///
/// Unparseable blocks are skipped with a warning so one bad key cannot
/// disable the rest of the ring.
fn parse_keyring(pem: &str) -> Vec<VerifyingKey> {
    let mut keys = Vec::new();
    let mut block = String::new();
    let mut in_block = false;

    for line in pem.lines() {
        if line.starts_with("-----BEGIN PUBLIC KEY-----") {
            in_block = true;
            block.clear();
        }
        if in_block {
            block.push_str(line);
            block.push('\n');
        }
        if line.starts_with("-----END PUBLIC KEY-----") {
            in_block = false;
            match VerifyingKey::from_public_key_pem(&block) {
                Ok(key) => keys.push(key),
                Err(e) => warn!("skipping unparseable public key in keyring: {}", e),
            }
        }
    }

    keys
}

/// Parse a detached signature file as raw DER, falling back to
/// base64-encoded DER.
fn parse_signature(bytes: &[u8]) -> Option<Signature> {
    if let Ok(sig) = Signature::from_der(bytes) {
        return Some(sig);
    }

    let text = std::str::from_utf8(bytes).ok()?;
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let der = BASE64.decode(compact).ok()?;
    Signature::from_der(&der).ok()
}

/// Verifies the detached signature over the checksum manifest
pub struct SignatureStage {
    manifest_name: String,
    signature_name: String,
    keys: Vec<VerifyingKey>,
}

impl SignatureStage {
    /// Create a stage using the keyring embedded for `runtime`.
    ///
    /// A runtime without an embedded keyring gets an empty ring; the
    /// stage then skips verification rather than failing downloads.
    pub fn for_runtime(
        runtime: &str,
        manifest_name: impl Into<String>,
        signature_name: impl Into<String>,
    ) -> Self {
        let file = format!("{}.pem", runtime);
        let keys = match EmbeddedKeys::get(&file) {
            Some(embedded) => {
                let pem = String::from_utf8_lossy(&embedded.data);
                parse_keyring(&pem)
            }
            None => {
                debug!("no embedded keyring for runtime {}", runtime);
                Vec::new()
            }
        };

        Self::with_keys(manifest_name, signature_name, keys)
    }

    /// Create a stage with an explicit set of verifying keys
    pub fn with_keys(
        manifest_name: impl Into<String>,
        signature_name: impl Into<String>,
        keys: Vec<VerifyingKey>,
    ) -> Self {
        Self {
            manifest_name: manifest_name.into(),
            signature_name: signature_name.into(),
            keys,
        }
    }
}

#[async_trait]
impl VerificationStage for SignatureStage {
    fn method(&self) -> &'static str {
        "ecdsa-p256"
    }

    async fn run(&self, artifact: &Path, audit: &mut AuditRecord) -> StageOutcome {
        let Some(parent) = artifact.parent() else {
            return StageOutcome::Warned("artifact has no parent directory".to_string());
        };
        let manifest_path = parent.join(&self.manifest_name);
        let signature_path = parent.join(&self.signature_name);

        // Upstream does not publish signatures for every release line.
        if !manifest_path.exists() || !signature_path.exists() {
            debug!(
                "skipping signature verification for {}: manifest or signature absent",
                artifact.display()
            );
            return StageOutcome::Passed;
        }

        if self.keys.is_empty() {
            debug!(
                "skipping signature verification for {}: no keys in ring",
                artifact.display()
            );
            return StageOutcome::Passed;
        }

        let manifest = match fs::read(&manifest_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return StageOutcome::Warned(format!(
                    "failed to read checksum manifest {}: {}",
                    manifest_path.display(),
                    e
                ))
            }
        };

        let signature_bytes = match fs::read(&signature_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return StageOutcome::Warned(format!(
                    "failed to read signature {}: {}",
                    signature_path.display(),
                    e
                ))
            }
        };

        let Some(signature) = parse_signature(&signature_bytes) else {
            return StageOutcome::Warned(format!(
                "signature {} is neither DER nor base64 DER",
                signature_path.display()
            ));
        };

        let verified = self
            .keys
            .iter()
            .any(|key| key.verify(&manifest, &signature).is_ok());

        if verified {
            audit.signature_verified = true;
            StageOutcome::Passed
        } else {
            StageOutcome::Warned(format!(
                "signature over {} did not verify against any of {} embedded keys",
                self.manifest_name,
                self.keys.len()
            ))
        }
    }
}
