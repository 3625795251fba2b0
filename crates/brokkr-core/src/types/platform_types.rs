//! Target platform identification

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One os/arch pair a distribution artifact targets.
///
/// Aliases are normalized on construction so `macos-aarch64`,
/// `darwin-arm64`, and `Darwin-ARM64` all name the same platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl AsRef<str>, arch: impl AsRef<str>) -> Self {
        Self {
            os: normalize_os(os.as_ref()),
            arch: normalize_arch(arch.as_ref()),
        }
    }

    /// Platform of the running process
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }
}

fn normalize_os(os: &str) -> String {
    match os.trim().to_ascii_lowercase().as_str() {
        "macos" | "osx" => "darwin".to_string(),
        "windows" => "win".to_string(),
        other => other.to_string(),
    }
}

fn normalize_arch(arch: &str) -> String {
    match arch.trim().to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" => "x64".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (os, arch) = s
            .split_once('-')
            .ok_or_else(|| Error::invalid_config(format!("Invalid platform: {} (expected os-arch)", s)))?;
        if os.is_empty() || arch.is_empty() {
            return Err(Error::invalid_config(format!(
                "Invalid platform: {} (expected os-arch)",
                s
            )));
        }
        Ok(Self::new(os, arch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_normalizes_aliases() {
        assert_eq!(Platform::new("macos", "aarch64"), Platform::new("darwin", "arm64"));
        assert_eq!(Platform::new("windows", "x86_64"), Platform::new("win", "x64"));
        assert_eq!(Platform::new("Linux", "AMD64").to_string(), "linux-x64");
    }

    #[test]
    fn test_platform_parse_round_trip() {
        let platform: Platform = "darwin-arm64".parse().unwrap();
        assert_eq!(platform.os, "darwin");
        assert_eq!(platform.arch, "arm64");
        assert_eq!(platform.to_string(), "darwin-arm64");
    }

    #[test]
    fn test_platform_parse_rejects_malformed() {
        assert!("linux".parse::<Platform>().is_err());
        assert!("-x64".parse::<Platform>().is_err());
        assert!("linux-".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_current_is_normalized() {
        let current = Platform::current();
        assert!(!current.os.is_empty());
        assert_ne!(current.arch, "x86_64", "arch aliases should be normalized");
        assert_ne!(current.os, "macos", "os aliases should be normalized");
    }
}
