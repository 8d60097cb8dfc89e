//! NetRisk Library
//!
//! Network risk scoring and behavioral pattern engine. From a snapshot of
//! entities, relationships, cases and districts it produces:
//! - Behavioral pattern classification and a 0-100 risk score per entity
//! - District risk profiles with trends
//! - Hotspot ranking with alert tiers
//! - Temporal, vulnerability and communication summaries

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::analyzer::{compute_bundle, NetworkAnalyzer};
pub use crate::core::export::{export, ExportFormat};
pub use models::{
    AnalysisBundle, AppError, AppResult, BehavioralPattern, EngineConfig, ErrorCode,
    ServerConfig, Snapshot, SourceConfig,
};
pub use providers::{AuthoritativeEngine, DataSource, HttpSource, JsonFileSource, StaticSource};
pub use utils::telemetry::{AnalysisTelemetry, TelemetryStats};
