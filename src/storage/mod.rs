//! Storage Layer
//!
//! The translator keeps no database; its only persistent state is the JSON
//! configuration file.

pub mod config;

pub use config::{ConfigService, DEFAULT_CONFIG_FILE};
