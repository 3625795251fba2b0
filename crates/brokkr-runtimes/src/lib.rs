//! Runtime providers for Brokkr
//!
//! This crate handles:
//! - Fetching upstream lifecycle data (endoflife.date API shape)
//! - Loading and applying the local version policy
//! - Per-runtime providers behind the [`RuntimeProvider`] trait
//! - The download ledger used to skip already-verified artifacts
//! - The [`RuntimeManager`] orchestrating a full download session
//!
//! Providers are registered in a [`ProviderRegistry`] and looked up by
//! name; Node.js ships as the first adapter.

pub mod ledger;
pub mod lifecycle;
pub mod manager;
pub mod nodejs;
pub mod policy;
pub mod provider;
pub mod registry;

pub use ledger::{DownloadLedger, FileLedger, LedgerRecord};
pub use lifecycle::{LifecycleClient, LifecycleRelease, LifecycleSource};
pub use manager::{DownloadOptions, RuntimeManager};
pub use nodejs::NodeJsProvider;
pub use policy::{apply_policy, check_download_allowed, FileReader, FsReader, PolicyStore};
pub use provider::RuntimeProvider;
pub use registry::ProviderRegistry;
