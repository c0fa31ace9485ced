//! Core types, constants and bearing geometry for the stronghold locator

pub mod types;
pub mod constants;
pub mod geometry;

pub use types::*;
pub use constants::*;
pub use geometry::{normalize_angle, bearing_degrees, bearing_gradient};
