//! Semantic-version pattern matching
//!
//! Upstream version feeds are not curated: entries like `20` or `v20.11`
//! appear next to full semver strings, and occasionally next to garbage.
//! Everything here is built on a lenient normalizer plus a tolerant-filtering
//! policy: batch operations drop entries that do not parse instead of failing
//! the whole batch. Callers that need hard failure use the strict variants.

use crate::error::{Error, Result};
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Granularity at which two version strings are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPattern {
    /// Compare the major component only
    #[default]
    Major,
    /// Compare major and minor components
    MajorMinor,
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPattern::Major => write!(f, "major"),
            VersionPattern::MajorMinor => write!(f, "major_minor"),
        }
    }
}

impl FromStr for VersionPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "major" => Ok(VersionPattern::Major),
            "major_minor" | "major.minor" => Ok(VersionPattern::MajorMinor),
            other => Err(Error::pattern(other)),
        }
    }
}

/// Accepts `20`, `20.11`, `20.11.1`, an optional leading `v`, and a trailing
/// pre-release/build suffix.
fn lenient_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[vV]?(\d+)(?:\.(\d+))?(?:\.(\d+))?([-+][0-9A-Za-z.+-]*)?$")
            .expect("lenient version regex is valid")
    })
}

/// Parse a version string, tolerating the abbreviated forms upstream feeds
/// use. Missing minor/patch components are padded with zeros.
pub fn parse_version(version: &str) -> Result<Version> {
    let captures = lenient_pattern()
        .captures(version.trim())
        .ok_or_else(|| Error::parse(version))?;

    let major = &captures[1];
    let minor = captures.get(2).map_or("0", |m| m.as_str());
    let patch = captures.get(3).map_or("0", |m| m.as_str());
    let suffix = captures.get(4).map_or("", |m| m.as_str());

    Version::parse(&format!("{}.{}.{}{}", major, minor, patch, suffix))
        .map_err(|_| Error::parse(version))
}

/// Reduce a version to the component(s) named by `pattern`
pub fn extract_pattern(version: &str, pattern: VersionPattern) -> Result<String> {
    let parsed = parse_version(version)?;
    Ok(match pattern {
        VersionPattern::Major => parsed.major.to_string(),
        VersionPattern::MajorMinor => format!("{}.{}", parsed.major, parsed.minor),
    })
}

/// True when `check` falls inside `supported`'s line under `pattern`
pub fn is_supported(supported: &str, pattern: VersionPattern, check: &str) -> Result<bool> {
    Ok(extract_pattern(supported, pattern)? == extract_pattern(check, pattern)?)
}

/// Full semver ordering. Pre-release versions sort before their release;
/// build metadata carries no precedence.
pub fn compare_versions(v1: &str, v2: &str) -> Result<Ordering> {
    let a = parse_version(v1)?;
    let b = parse_version(v2)?;
    Ok(a.cmp_precedence(&b))
}

/// Keep the entries of `versions` that belong to `supported`'s line.
///
/// Tolerant filtering: entries that do not parse are dropped, and an
/// unparseable `supported` reference yields an empty result rather than an
/// error.
pub fn filter_versions_by_pattern(
    versions: &[String],
    supported: &str,
    pattern: VersionPattern,
) -> Vec<String> {
    let Ok(reference) = extract_pattern(supported, pattern) else {
        return Vec::new();
    };

    versions
        .iter()
        .filter(|v| extract_pattern(v, pattern).is_ok_and(|p| p == reference))
        .cloned()
        .collect()
}

/// Sort ascending by semver precedence, dropping entries that do not parse
pub fn sort_versions(versions: &[String]) -> Vec<String> {
    let mut parsed: Vec<(Version, &String)> = versions
        .iter()
        .filter_map(|v| parse_version(v).ok().map(|p| (p, v)))
        .collect();
    parsed.sort_by(|(a, _), (b, _)| a.cmp_precedence(b));
    parsed.into_iter().map(|(_, v)| v.clone()).collect()
}

/// Greatest entry by semver precedence, or `None` when nothing parses
pub fn latest_version(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|v| parse_version(v).ok().map(|p| (p, v)))
        .max_by(|(a, _), (b, _)| a.cmp_precedence(b))
        .map(|(_, v)| v.clone())
}

/// Strict variant of [`latest_version`]: any unparseable entry is an error,
/// as is an empty input
pub fn latest_version_strict(versions: &[String]) -> Result<String> {
    let mut best: Option<(Version, &String)> = None;
    for candidate in versions {
        let parsed = parse_version(candidate)?;
        let replace = match &best {
            Some((current, _)) => parsed.cmp_precedence(current) == Ordering::Greater,
            None => true,
        };
        if replace {
            best = Some((parsed, candidate));
        }
    }
    best.map(|(_, v)| v.clone())
        .ok_or_else(|| Error::parse("<empty version list>"))
}
