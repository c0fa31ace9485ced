//! Error types

pub mod error;

pub use error::CalibrationError;
