//! Configuration types for brokkr.yaml

use crate::version::VersionPattern;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root brokkr.yaml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Directory downloaded artifacts land in
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// Maximum concurrent downloads per batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Path to the local version policy file
    #[serde(default)]
    pub policy_file: Option<String>,

    /// Network behaviour
    #[serde(default)]
    pub network: NetworkConfig,

    /// Upstream lifecycle data source
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Malware scanner configuration
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Per-runtime overrides keyed by runtime name
    #[serde(default)]
    pub runtimes: HashMap<String, RuntimeOptions>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            concurrency: default_concurrency(),
            policy_file: None,
            network: NetworkConfig::default(),
            lifecycle: LifecycleConfig::default(),
            scanner: ScannerConfig::default(),
            runtimes: HashMap::new(),
        }
    }
}

fn default_download_dir() -> String {
    "~/.brokkr/downloads".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Timeout for metadata requests in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Timeout for artifact downloads in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// User-Agent header sent on every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            user_agent: default_user_agent(),
            retry: RetryPolicy::default(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!(
        "brokkr/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Retry policy for network operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay strategy between attempts
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Base delay before the first retry
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Ceiling applied to any computed delay
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Growth factor for exponential backoff
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: RetryStrategy::default(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            strategy: RetryStrategy::None,
            ..Self::default()
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Delay strategies between retry attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Retry immediately
    None,
    /// Same delay every attempt
    FixedDelay,
    /// Delay grows by the backoff multiplier each attempt
    #[default]
    ExponentialBackoff,
}

/// Upstream lifecycle data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Base URL of the lifecycle API
    #[serde(default = "default_lifecycle_url")]
    pub base_url: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            base_url: default_lifecycle_url(),
        }
    }
}

fn default_lifecycle_url() -> String {
    "https://endoflife.date".to_string()
}

/// Malware scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Enable the malware scan stage
    #[serde(default)]
    pub enabled: bool,

    /// Scanner binary
    #[serde(default = "default_scanner_command")]
    pub command: String,

    /// Extra arguments passed before the target path
    #[serde(default)]
    pub args: Vec<String>,

    /// Run the scanner inside a container instead of on the host
    #[serde(default)]
    pub use_container: bool,

    /// Container image when use_container is set
    #[serde(default = "default_scanner_image")]
    pub image: String,

    /// Scan timeout in seconds
    #[serde(default = "default_scanner_timeout")]
    pub timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_scanner_command(),
            args: Vec::new(),
            use_container: false,
            image: default_scanner_image(),
            timeout_secs: default_scanner_timeout(),
        }
    }
}

fn default_scanner_command() -> String {
    "clamscan".to_string()
}

fn default_scanner_image() -> String {
    "clamav/clamav:stable".to_string()
}

fn default_scanner_timeout() -> u64 {
    600
}

/// Per-runtime configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Override the provider's distribution base URL
    #[serde(default)]
    pub dist_base_url: Option<String>,

    /// Version comparison granularity
    #[serde(default)]
    pub pattern: VersionPattern,

    /// Platforms to download artifacts for
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            dist_base_url: None,
            pattern: VersionPattern::default(),
            platforms: default_platforms(),
        }
    }
}

fn default_platforms() -> Vec<String> {
    vec![
        "linux-x64".to_string(),
        "linux-arm64".to_string(),
        "darwin-x64".to_string(),
        "darwin-arm64".to_string(),
        "win-x64".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config: ConfigFile = serde_yaml_ng::from_str("{}").unwrap();
        assert_eq!(config.download_dir, "~/.brokkr/downloads");
        assert_eq!(config.concurrency, 4);
        assert!(config.policy_file.is_none());
        assert_eq!(config.network.http_timeout_secs, 30);
        assert_eq!(config.network.retry.max_attempts, 3);
        assert_eq!(
            config.network.retry.strategy,
            RetryStrategy::ExponentialBackoff
        );
        assert_eq!(config.lifecycle.base_url, "https://endoflife.date");
        assert!(!config.scanner.enabled);
        assert_eq!(config.scanner.command, "clamscan");
        assert!(config.runtimes.is_empty());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let yaml = r#"
concurrency: 8
network:
  retry:
    strategy: fixed_delay
    initial_delay_ms: 100
"#;
        let config: ConfigFile = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.network.retry.strategy, RetryStrategy::FixedDelay);
        assert_eq!(config.network.retry.initial_delay_ms, 100);
        // Untouched neighbours keep defaults
        assert_eq!(config.network.retry.max_attempts, 3);
        assert_eq!(config.network.http_timeout_secs, 30);
    }

    #[test]
    fn test_runtime_options_defaults() {
        let yaml = r#"
runtimes:
  nodejs:
    pattern: major_minor
"#;
        let config: ConfigFile = serde_yaml_ng::from_str(yaml).unwrap();
        let nodejs = &config.runtimes["nodejs"];
        assert_eq!(nodejs.pattern, VersionPattern::MajorMinor);
        assert_eq!(nodejs.platforms.len(), 5);
        assert!(nodejs.dist_base_url.is_none());
    }

    #[test]
    fn test_default_matches_empty_yaml() {
        let from_yaml: ConfigFile = serde_yaml_ng::from_str("{}").unwrap();
        let from_default = ConfigFile::default();
        assert_eq!(from_default.download_dir, from_yaml.download_dir);
        assert_eq!(from_default.concurrency, from_yaml.concurrency);
        assert_eq!(
            from_default.network.user_agent,
            from_yaml.network.user_agent
        );
    }

    #[test]
    fn test_user_agent_names_the_tool() {
        let agent = default_user_agent();
        assert!(agent.starts_with("brokkr/"));
    }

    #[test]
    fn test_retry_policy_none() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.strategy, RetryStrategy::None);
    }
}
