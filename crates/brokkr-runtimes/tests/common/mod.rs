//! Common test infrastructure for brokkr-runtimes tests
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

// Allow unused code in test infrastructure - helpers are shared across test files
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_server;

pub use mock_server::*;
