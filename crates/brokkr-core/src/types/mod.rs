//! Type definitions for Brokkr policies, versions, platforms, and downloads

mod config_types;
mod download_types;
mod platform_types;
mod policy_types;
mod version_types;

pub use config_types::*;
pub use download_types::*;
pub use platform_types::*;
pub use policy_types::*;
pub use version_types::*;
