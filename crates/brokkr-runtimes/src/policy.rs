//! Policy loading and application
//!
//! The policy file is the organization's allow-list of runtime versions.
//! Versions absent from it are never offered and never downloadable; there
//! is no implicit allow-all when the file is missing.

use brokkr_core::error::{Error, Result};
use brokkr_core::schema::SchemaValidator;
use brokkr_core::types::{PolicyDocument, PolicyVersion, VersionInfo};
use brokkr_core::version::{is_supported, VersionPattern};
use camino::Utf8Path;
use std::collections::HashMap;
use tracing::debug;

use crate::lifecycle::LifecycleRelease;

/// File-reading capability the policy loader takes by injection
pub trait FileReader: Send + Sync {
    fn read_to_string(&self, path: &Utf8Path) -> Result<String>;
}

/// Reads policy files from the real filesystem
pub struct FsReader;

impl FileReader for FsReader {
    fn read_to_string(&self, path: &Utf8Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::policy(format!("policy file {} does not exist", path))
            } else {
                Error::Io(e)
            }
        })
    }
}

/// Loaded, schema-validated policy document
pub struct PolicyStore {
    document: PolicyDocument,
}

impl PolicyStore {
    /// Load a policy file (YAML or JSON) and validate it against the policy
    /// schema before parsing.
    pub fn load(
        path: &Utf8Path,
        reader: &dyn FileReader,
        validator: &SchemaValidator,
    ) -> Result<Self> {
        let content = reader.read_to_string(path)?;
        validator.validate_yaml(&content, "policy")?;

        let document: PolicyDocument = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::policy(format!("cannot parse policy file {}: {}", path, e)))?;

        Ok(Self { document })
    }

    /// Wrap an already-parsed document
    pub fn from_document(document: PolicyDocument) -> Self {
        Self { document }
    }

    /// Entries applying to `runtime`, if the document has any
    pub fn entries_for(&self, runtime: &str) -> Option<&[PolicyVersion]> {
        self.document.entries_for(runtime)
    }
}

/// Merge upstream lifecycle releases with the policy entries for `runtime`.
///
/// Lookup is by exact version string. Releases without an entry, or whose
/// entry is not `supported`, are dropped. Policy flags (recommended, lts,
/// pinned EOL date) merge with lifecycle facts; the latest patch only ever
/// comes from lifecycle data so a stale pin cannot masquerade as current.
pub fn apply_policy(
    upstream: &[LifecycleRelease],
    entries: &[PolicyVersion],
    runtime: &str,
    pattern: VersionPattern,
) -> Vec<VersionInfo> {
    let by_version: HashMap<&str, &PolicyVersion> =
        entries.iter().map(|e| (e.version.as_str(), e)).collect();

    upstream
        .iter()
        .filter_map(|release| {
            let entry = match by_version.get(release.name.as_str()) {
                Some(entry) => *entry,
                None => {
                    debug!("{} {} has no policy entry, dropping", runtime, release.name);
                    return None;
                }
            };
            if !entry.supported {
                debug!("{} {} is not policy-supported, dropping", runtime, release.name);
                return None;
            }

            Some(VersionInfo {
                version: release.name.clone(),
                latest: release.latest.clone(),
                supported: true,
                recommended: entry.recommended,
                lts: entry.lts || release.lts,
                eol: release.eol,
                eoas: release.eoas,
                maintained: release.maintained,
                eol_date: entry.eol_date.or(release.eol_date),
                release_date: release.release_date,
                runtime: runtime.to_string(),
                pattern,
            })
        })
        .collect()
}

/// Download gate: a version may only be fetched when a policy entry covering
/// it under `pattern` says `supported` or `under_review`. The two refusal
/// modes name the entry so operators can tell a missing entry from an
/// insufficient one.
pub fn check_download_allowed(
    entries: &[PolicyVersion],
    runtime: &str,
    version: &str,
    pattern: VersionPattern,
) -> Result<()> {
    let entry = entries
        .iter()
        .find(|e| is_supported(&e.version, pattern, version).unwrap_or(false));

    match entry {
        Some(entry) if entry.supported || entry.under_review => Ok(()),
        Some(entry) => Err(Error::policy(format!(
            "{} {} matches policy entry {} but it is neither supported nor under review",
            runtime, version, entry.version
        ))),
        None => Err(Error::policy(format!(
            "no policy entry covers {} {}; downloads are denied by default",
            runtime, version
        ))),
    }
}
