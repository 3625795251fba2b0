//! # brokkr-core
//!
//! Core library for the Brokkr CLI providing:
//! - Semantic-version pattern matching with tolerant filtering
//! - Policy, lifecycle, and download type definitions
//! - Configuration file parsing (brokkr.yaml)
//! - JSON Schema validation
//! - Retry execution with policy-based configuration

pub mod config;
pub mod error;
pub mod retry;
pub mod schema;
pub mod types;
pub mod utils;
pub mod version;

pub use config::BrokkrConfig;
pub use error::{Error, Result};
pub use schema::SchemaValidator;
pub use utils::get_home_dir;
pub use version::VersionPattern;
