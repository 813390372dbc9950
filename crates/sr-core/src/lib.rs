//! sr-core: shared error type and configuration.
//!
//! This crate is the foundational dependency for the other sr-* crates,
//! providing the unified render [`Error`] and the JSON-backed application
//! [`config::Config`].

pub mod config;
pub mod error;

// Re-export the most commonly used items at the crate root.
pub use config::Config;
pub use error::{Error, Result};
