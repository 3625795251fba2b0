//! Locally authored version policy documents
//!
//! The policy file is the organization's allow-list of runtime versions,
//! independent of upstream lifecycle data. It is read once per invocation
//! and never mutated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One version entry from the policy file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVersion {
    /// Exact upstream version string this entry governs
    pub version: String,

    #[serde(default)]
    pub supported: bool,

    #[serde(default)]
    pub recommended: bool,

    #[serde(default)]
    pub lts: bool,

    /// Under evaluation: downloads are permitted, sanctioning is pending
    #[serde(default)]
    pub under_review: bool,

    /// Organization-pinned end-of-life date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eol_date: Option<NaiveDate>,

    /// Informational pin only. Latest-patch resolution always comes from
    /// live lifecycle data so a stale pin can never masquerade as current.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_patch: Option<String>,
}

impl PolicyVersion {
    /// Minimal entry with every flag off
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            supported: false,
            recommended: false,
            lts: false,
            under_review: false,
            eol_date: None,
            latest_patch: None,
        }
    }
}

/// Parsed policy file: either a bare entry list or a per-runtime map
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyDocument {
    Entries(Vec<PolicyVersion>),
    Runtimes(HashMap<String, Vec<PolicyVersion>>),
}

impl PolicyDocument {
    /// Entries applying to `runtime`, if the document has any.
    ///
    /// A bare entry list applies to whichever runtime is being resolved; a
    /// per-runtime map applies only to its named runtimes.
    pub fn entries_for(&self, runtime: &str) -> Option<&[PolicyVersion]> {
        match self {
            PolicyDocument::Entries(list) => Some(list.as_slice()),
            PolicyDocument::Runtimes(map) => map.get(runtime).map(|v| v.as_slice()),
        }
    }
}
