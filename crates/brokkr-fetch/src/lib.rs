//! Bounded-concurrency artifact downloads for Brokkr
//!
//! This crate handles:
//! - Executing a batch of download tasks under a concurrency ceiling
//! - Streaming response bodies to disk with byte accounting
//! - Optional-file semantics for checksums and signatures upstream
//!   does not always publish
//! - Order-preserving result collection for positional task/result zips

pub mod executor;

pub use executor::DownloadExecutor;
