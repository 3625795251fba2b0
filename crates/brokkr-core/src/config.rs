//! Configuration file loading and discovery

use crate::error::{Error, Result};
use crate::schema::SchemaValidator;
use crate::types::{ConfigFile, RuntimeOptions};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::debug;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["brokkr.yaml", "brokkr.yml"];

/// Loaded and validated brokkr configuration
#[derive(Debug, Clone)]
pub struct BrokkrConfig {
    /// The parsed configuration
    pub config: ConfigFile,

    /// Path to the configuration file, if one was found
    pub config_path: Option<Utf8PathBuf>,

    /// Directory relative paths in the config resolve against
    pub working_dir: Utf8PathBuf,
}

impl BrokkrConfig {
    /// Load configuration from the specified path or search for it.
    ///
    /// An explicit path must exist. Without one the search walks parent
    /// directories and falls back to built-in defaults when nothing is found.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        Self::load_inner(path, None)
    }

    /// Load configuration, validating against the brokkr schema first
    pub fn load_and_validate(path: Option<&Utf8Path>, validator: &SchemaValidator) -> Result<Self> {
        Self::load_inner(path, Some(validator))
    }

    fn load_inner(path: Option<&Utf8Path>, validator: Option<&SchemaValidator>) -> Result<Self> {
        let located = if let Some(p) = path {
            let content = fs::read_to_string(p).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::config_not_found(p.as_str())
                } else {
                    Error::Io(e)
                }
            })?;
            Some((p.to_owned(), content))
        } else {
            Self::find_config()?
        };

        let Some((config_path, content)) = located else {
            debug!("No brokkr.yaml found, using defaults");
            return Ok(Self {
                config: ConfigFile::default(),
                config_path: None,
                working_dir: Self::current_dir()?,
            });
        };

        // Validate against schema before deserializing
        if let Some(validator) = validator {
            validator.validate_yaml(&content, "brokkr")?;
        }

        let working_dir = config_path
            .parent()
            .map(|p| p.to_owned())
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        // Parse YAML
        let config: ConfigFile = serde_yaml_ng::from_str(&content)?;

        Ok(Self {
            config,
            config_path: Some(config_path),
            working_dir,
        })
    }

    /// Find configuration file in current directory or parent directories
    fn find_config() -> Result<Option<(Utf8PathBuf, String)>> {
        let cwd = Self::current_dir()?;
        let mut current = cwd.as_path();

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let content = fs::read_to_string(&path)?;
                    return Ok(Some((path, content)));
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(None)
    }

    fn current_dir() -> Result<Utf8PathBuf> {
        let cwd = std::env::current_dir().map_err(Error::Io)?;
        Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))
    }

    /// Get the inner configuration file
    pub fn inner(&self) -> &ConfigFile {
        &self.config
    }

    /// Download directory with tilde expansion applied
    pub fn download_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(shellexpand::tilde(&self.config.download_dir).into_owned())
    }

    /// Policy file path, tilde-expanded and resolved against the config
    /// file's directory when relative. None when no policy file is configured.
    pub fn policy_file(&self) -> Option<Utf8PathBuf> {
        self.config.policy_file.as_deref().map(|p| {
            let expanded = Utf8PathBuf::from(shellexpand::tilde(p).into_owned());
            if expanded.is_absolute() {
                expanded
            } else {
                self.working_dir.join(expanded)
            }
        })
    }

    /// Options for a runtime, falling back to defaults when unconfigured
    pub fn runtime_options(&self, runtime: &str) -> RuntimeOptions {
        self.config
            .runtimes
            .get(runtime)
            .cloned()
            .unwrap_or_default()
    }
}
