//! Error types for brokkr-core

use thiserror::Error;

/// Result type alias using brokkr-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Brokkr
#[derive(Error, Debug)]
pub enum Error {
    /// Version string did not parse as semver
    #[error("Unable to parse version: {version}")]
    Parse { version: String },

    /// Unrecognized version pattern
    #[error("Unknown version pattern: {pattern}. Valid patterns: major, major_minor")]
    Pattern { pattern: String },

    /// Policy file missing, or an entry absent/insufficient for a request
    #[error("Policy violation: {message}")]
    Policy { message: String },

    /// Runtime, provider, or resource not found
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Transport failure or 5xx response
    #[error("Network error: {message}")]
    Network { message: String },

    /// Upstream returned an unusable 4xx response
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Non-2xx status on a fetch
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Artifact failed verification
    #[error("Verification failed: {message}")]
    Verification { message: String },

    /// Ledger read or write failure
    #[error("Ledger error: {message}")]
    Ledger { message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Schema validation error
    #[error("Schema validation failed:\n{errors}")]
    SchemaValidation { errors: String },

    /// Schema not found
    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a version parse error
    pub fn parse(version: impl Into<String>) -> Self {
        Self::Parse {
            version: version.into(),
        }
    }

    /// Create an unknown-pattern error
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
        }
    }

    /// Create a policy error
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an invalid-response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Create a verification error
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }

    /// Create a ledger error
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a schema validation error from a list of errors
    pub fn schema_validation(errors: Vec<String>) -> Self {
        Self::SchemaValidation {
            errors: errors.join("\n"),
        }
    }

    /// Create a schema not found error
    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Self::SchemaNotFound { name: name.into() }
    }
}
