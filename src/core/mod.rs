//! Core Module - Analysis Engine
//!
//! Graph indexing, pattern classification, risk scoring, district
//! aggregation, hotspots, temporal trends, and export.

pub mod analyzer;
pub mod districts;
pub mod export;
pub mod graph;
pub mod hotspots;
pub mod patterns;
pub mod risk_score;
pub mod temporal;
pub mod vulnerability;

pub use analyzer::{compute_bundle, FetchedSnapshot, NetworkAnalyzer};
pub use districts::{DistrictScope, DistrictTable, EntityPlacement};
pub use export::{entities_to_csv, export, ExportFormat, CSV_HEADERS};
pub use graph::{GraphIndex, NodeMetrics};
pub use hotspots::detect_hotspots;
pub use patterns::{pattern_insights, Classification, PatternClassifier, PatternInputs};
pub use risk_score::{score_district, score_entity, EntityRiskScore, EntityScoreBuilder, ScoreInputs};
pub use temporal::{temporal_patterns, WindowCounts};
pub use vulnerability::{communication_patterns, network_vulnerabilities};
