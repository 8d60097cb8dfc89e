//! Providers Module - Input Sources
//!
//! Data-source seam, raw row decoding, and the file and HTTP adapters.

pub mod file;
pub mod http;
pub mod rows;
pub mod source;

pub use file::*;
pub use http::*;
pub use rows::*;
pub use source::*;

use std::sync::Arc;
use std::time::Duration;

use crate::models::{AppResult, SourceConfig};

/// Open the configured data source
pub fn connect(config: &SourceConfig, timeout: Duration) -> AppResult<Arc<dyn DataSource>> {
    Ok(match config {
        SourceConfig::Directory(dir) => Arc::new(JsonFileSource::new(dir.clone())),
        SourceConfig::Http(url) => Arc::new(HttpSource::new(url.clone(), timeout)?),
    })
}
