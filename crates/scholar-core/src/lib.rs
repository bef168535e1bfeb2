//! Shared building blocks for the Scholar conversational core.
//!
//! Holds the conversation data model, the error taxonomy every other crate
//! reports through, TOML configuration, and logging initialization.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::ScholarConfig;
pub use error::{Result, ScholarError};
pub use types::*;
