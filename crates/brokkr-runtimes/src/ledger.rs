//! Download ledger: the idempotence record for verified artifacts
//!
//! The ledger only answers "is re-fetching necessary"; it is never consulted
//! for policy decisions.

use brokkr_core::error::{Error, Result};
use brokkr_core::types::Platform;
use brokkr_core::version::parse_version;
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One verified download, as persisted in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub runtime: String,
    pub version: String,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub os: String,
    pub arch: String,
    pub filename: String,
    pub size_bytes: u64,
    pub source_url: String,
    pub timestamp: DateTime<Utc>,
    pub verification_type: String,
    pub verification_status: String,
}

impl LedgerRecord {
    /// Build a record for a verified artifact; fails when `version` does not
    /// parse as semver.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runtime: impl Into<String>,
        version: &str,
        platform: &Platform,
        filename: impl Into<String>,
        size_bytes: u64,
        source_url: impl Into<String>,
        verification_type: impl Into<String>,
        verification_status: impl Into<String>,
    ) -> Result<Self> {
        let parsed = parse_version(version)?;
        Ok(Self {
            runtime: runtime.into(),
            version: version.to_string(),
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            os: platform.os.clone(),
            arch: platform.arch.clone(),
            filename: filename.into(),
            size_bytes,
            source_url: source_url.into(),
            timestamp: Utc::now(),
            verification_type: verification_type.into(),
            verification_status: verification_status.into(),
        })
    }

    fn key(&self) -> String {
        ledger_key(&self.runtime, &self.version, &self.os, &self.arch)
    }
}

fn ledger_key(runtime: &str, version: &str, os: &str, arch: &str) -> String {
    format!("{}/{}/{}-{}", runtime, version, os, arch)
}

/// Idempotence contract the manager consults around a download session
pub trait DownloadLedger: Send + Sync {
    /// Whether a verified download already exists for this exact key
    fn is_already_downloaded(
        &self,
        runtime: &str,
        version: &str,
        os: &str,
        arch: &str,
    ) -> Result<bool>;

    /// Persist one verified download
    fn record_download(&self, record: &LedgerRecord) -> Result<()>;
}

/// Append-only JSONL ledger guarded by advisory file locks
pub struct FileLedger {
    ledger_path: PathBuf,
}

impl FileLedger {
    /// Ledger at the default location (~/.brokkr/ledger.jsonl)
    pub fn load_default() -> Result<Self> {
        let home = brokkr_core::get_home_dir().map_err(|e| Error::ledger(e.to_string()))?;
        let brokkr_dir = home.join(".brokkr");
        fs::create_dir_all(&brokkr_dir)
            .map_err(|e| Error::ledger(format!("cannot create .brokkr directory: {}", e)))?;

        Ok(Self {
            ledger_path: brokkr_dir.join("ledger.jsonl"),
        })
    }

    /// Ledger at a custom path
    pub fn new(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.ledger_path
    }

    /// All records, folded to the newest entry per (runtime, version, os,
    /// arch) key, in timestamp order. Unreadable lines are skipped so one
    /// corrupt write cannot poison the whole ledger.
    pub fn records(&self) -> Result<Vec<LedgerRecord>> {
        if !self.ledger_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.ledger_path).map_err(|e| {
            Error::ledger(format!("cannot open {}: {}", self.ledger_path.display(), e))
        })?;
        let reader = BufReader::new(file);

        let mut newest: HashMap<String, LedgerRecord> = HashMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                Error::ledger(format!("cannot read {}: {}", self.ledger_path.display(), e))
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let record: LedgerRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable ledger line {}: {}", line_no + 1, e);
                    continue;
                }
            };

            match newest.entry(record.key()) {
                Entry::Occupied(mut slot) => {
                    if record.timestamp > slot.get().timestamp {
                        slot.insert(record);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }

        let mut records: Vec<LedgerRecord> = newest.into_values().collect();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(records)
    }

    /// Drop every record by removing the ledger file. Returns how many
    /// folded records were removed.
    pub fn prune(&self) -> Result<usize> {
        let count = self.records()?.len();
        if self.ledger_path.exists() {
            fs::remove_file(&self.ledger_path).map_err(|e| {
                Error::ledger(format!(
                    "cannot remove {}: {}",
                    self.ledger_path.display(),
                    e
                ))
            })?;
        }
        Ok(count)
    }
}

impl DownloadLedger for FileLedger {
    fn is_already_downloaded(
        &self,
        runtime: &str,
        version: &str,
        os: &str,
        arch: &str,
    ) -> Result<bool> {
        let key = ledger_key(runtime, version, os, arch);
        Ok(self.records()?.iter().any(|r| r.key() == key))
    }

    fn record_download(&self, record: &LedgerRecord) -> Result<()> {
        if let Some(parent) = self.ledger_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::ledger(format!("cannot create ledger directory: {}", e)))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .map_err(|e| {
                Error::ledger(format!("cannot open {}: {}", self.ledger_path.display(), e))
            })?;

        // Exclusive advisory lock, released when the handle drops
        file.lock_exclusive()
            .map_err(|e| Error::ledger(format!("cannot lock ledger: {}", e)))?;

        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)
            .map_err(|e| Error::ledger(format!("cannot append to ledger: {}", e)))?;
        file.sync_all()
            .map_err(|e| Error::ledger(format!("cannot sync ledger: {}", e)))?;

        Ok(())
    }
}
