//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants, rounding helpers and run telemetry shared across the crate.

pub mod constants;
pub mod math;
pub mod telemetry;

pub use constants::*;
pub use math::*;
pub use telemetry::*;
