//! Configuration

pub mod config;

pub use config::{ConfigurationManager, LocatorConfig, ConfigError};
