//! Shared utility functions for brokkr crates

use anyhow::anyhow;
use std::path::PathBuf;

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() because:
/// - In containers with volume mounts, HOME may be overridden
/// - dirs::home_dir() reads from /etc/passwd which doesn't respect env overrides
pub fn get_home_dir() -> anyhow::Result<PathBuf> {
    // First check HOME environment variable
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }

    // Fallback to dirs::home_dir() for non-container environments
    dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))
}
