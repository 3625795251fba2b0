//! Enriched, runtime-facing version representation

use crate::version::VersionPattern;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A policy entry merged with upstream lifecycle facts.
///
/// One instance flows through the pipeline per selected version. Policy
/// flags come from the local policy file; lifecycle flags and the latest
/// patch come from upstream, never the other way around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version line as upstream names it (`20`, `20.11`)
    pub version: String,

    /// Latest patch release known upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,

    pub supported: bool,
    pub recommended: bool,
    pub lts: bool,

    /// End-of-life milestone reached
    pub eol: bool,

    /// End-of-active-support milestone reached
    pub eoas: bool,

    /// Line still receives fixes upstream
    pub maintained: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub eol_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,

    /// Runtime this version belongs to
    pub runtime: String,

    /// Pattern the version line was derived under
    pub pattern: VersionPattern,
}

impl VersionInfo {
    /// Security-fixes-only window: active support has ended, end of life has
    /// not been reached, and upstream still maintains the line. Production
    /// installers should skip these even though fixes still land.
    pub fn is_security_only(&self) -> bool {
        self.eoas && !self.eol && self.maintained
    }
}
