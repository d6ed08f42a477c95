//! # Store Harness Core
//!
//! Filesystem-agnostic logic for Store Harness: data models, the error
//! taxonomy, the remote-store and config-storage ports with in-memory
//! implementations, the config merge policy, and the keyword-window
//! retrieval algorithm.
//!
//! This crate contains no HTTP client, CLI or config-file parsing. The
//! `store-harness` crate supplies those and drives everything here.

pub mod error;
pub mod models;
pub mod search;
pub mod state;
pub mod store;

pub use error::{HarnessError, Result};
