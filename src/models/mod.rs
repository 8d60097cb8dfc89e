//! Models Module - Data Structures & Configuration
//!
//! Input records, derived report records, errors and configuration.

pub mod config;
pub mod errors;
pub mod report;
pub mod types;

pub use config::*;
pub use errors::*;
pub use report::*;
pub use types::*;
