//! Run Telemetry
//!
//! Counters over analysis runs: which path produced the bundle, how often the
//! authoritative engine fell back, and how much input was degraded or skipped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{AnalysisBundle, AnalysisSource, BehavioralPattern};

/// Outcome of a single run, as recorded by the analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub source: AnalysisSource,
    pub latency_ms: u64,
    pub fell_back: bool,
    pub degraded_collections: u64,
    /// Collections in which rows were skipped
    pub malformed_collections: u64,
    pub entities_scored: u64,
    pub critical_entities: u64,
}

impl RunRecord {
    pub fn from_bundle(bundle: &AnalysisBundle, latency_ms: u64, critical_min_score: u32) -> Self {
        let degraded = bundle
            .warnings
            .iter()
            .filter(|w| w.code == "INPUT_UNAVAILABLE")
            .count() as u64;
        let malformed = bundle
            .warnings
            .iter()
            .filter(|w| w.code == "INPUT_MALFORMED")
            .count() as u64;
        let fell_back = bundle
            .warnings
            .iter()
            .any(|w| w.code == "COMPUTATION_TIMEOUT" || w.code == "AUTHORITATIVE_FAILED");

        Self {
            source: bundle.source,
            latency_ms,
            fell_back,
            degraded_collections: degraded,
            malformed_collections: malformed,
            entities_scored: bundle.detailed_entities.len() as u64,
            critical_entities: bundle.critical_entities(critical_min_score).len() as u64,
        }
    }
}

/// Aggregated statistics for reporting
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelemetryStats {
    pub total_runs: u64,
    pub local_runs: u64,
    pub authoritative_runs: u64,
    pub fallbacks: u64,
    pub failed_runs: u64,
    /// Collections that had to be substituted with an empty set
    pub degraded_collections: u64,
    /// Collections in which rows were skipped
    pub malformed_collections: u64,
    pub entities_scored: u64,
    pub critical_entities: u64,
    /// Flagged entities per pattern, from the latest run
    pub last_run_patterns: HashMap<String, u64>,
    pub avg_latency_ms: f64,
    pub period_start: u64,
    pub period_end: u64,
}

impl TelemetryStats {
    /// Export as JSON for API
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Export as CSV row
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{:.2}\n",
            self.period_start,
            self.period_end,
            self.total_runs,
            self.local_runs,
            self.authoritative_runs,
            self.fallbacks,
            self.failed_runs,
            self.degraded_collections,
            self.avg_latency_ms,
        )
    }
}

/// Main telemetry collector
pub struct AnalysisTelemetry {
    total_runs: AtomicU64,
    local_runs: AtomicU64,
    authoritative_runs: AtomicU64,
    fallbacks: AtomicU64,
    failed_runs: AtomicU64,
    degraded_collections: AtomicU64,
    malformed_collections: AtomicU64,
    entities_scored: AtomicU64,
    critical_entities: AtomicU64,
    total_latency_ms: AtomicU64,
    last_run_patterns: RwLock<HashMap<String, u64>>,
    /// Session start time
    session_start: u64,
    /// Export directory
    export_dir: PathBuf,
}

impl AnalysisTelemetry {
    /// Create new collector with default settings
    pub fn new() -> Self {
        Self::with_export_dir(PathBuf::from("./telemetry"))
    }

    pub fn with_export_dir(export_dir: PathBuf) -> Self {
        Self {
            total_runs: AtomicU64::new(0),
            local_runs: AtomicU64::new(0),
            authoritative_runs: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            failed_runs: AtomicU64::new(0),
            degraded_collections: AtomicU64::new(0),
            malformed_collections: AtomicU64::new(0),
            entities_scored: AtomicU64::new(0),
            critical_entities: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            last_run_patterns: RwLock::new(HashMap::new()),
            session_start: current_timestamp(),
            export_dir,
        }
    }

    /// Record a completed run
    pub fn record_run(&self, record: &RunRecord) {
        self.total_runs.fetch_add(1, Ordering::Relaxed);
        match record.source {
            AnalysisSource::Local => self.local_runs.fetch_add(1, Ordering::Relaxed),
            AnalysisSource::Authoritative => self.authoritative_runs.fetch_add(1, Ordering::Relaxed),
        };
        if record.fell_back {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        self.degraded_collections
            .fetch_add(record.degraded_collections, Ordering::Relaxed);
        self.malformed_collections
            .fetch_add(record.malformed_collections, Ordering::Relaxed);
        self.entities_scored
            .fetch_add(record.entities_scored, Ordering::Relaxed);
        self.critical_entities
            .fetch_add(record.critical_entities, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(record.latency_ms, Ordering::Relaxed);
    }

    /// Remember the pattern mix of the latest bundle
    pub fn record_patterns(&self, bundle: &AnalysisBundle) {
        let counts: HashMap<String, u64> = BehavioralPattern::FLAGGED
            .iter()
            .map(|p| {
                let n = bundle
                    .detailed_entities
                    .iter()
                    .filter(|e| e.pattern == *p)
                    .count() as u64;
                (p.as_str().to_string(), n)
            })
            .collect();
        if let Ok(mut last) = self.last_run_patterns.write() {
            *last = counts;
        }
    }

    /// Record a run that produced no bundle
    pub fn record_failure(&self, latency_ms: u64) {
        self.total_runs.fetch_add(1, Ordering::Relaxed);
        self.failed_runs.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        let total_runs = self.total_runs.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency = if total_runs > 0 {
            total_latency as f64 / total_runs as f64
        } else {
            0.0
        };

        TelemetryStats {
            total_runs,
            local_runs: self.local_runs.load(Ordering::Relaxed),
            authoritative_runs: self.authoritative_runs.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
            degraded_collections: self.degraded_collections.load(Ordering::Relaxed),
            malformed_collections: self.malformed_collections.load(Ordering::Relaxed),
            entities_scored: self.entities_scored.load(Ordering::Relaxed),
            critical_entities: self.critical_entities.load(Ordering::Relaxed),
            last_run_patterns: self
                .last_run_patterns
                .read()
                .map(|p| p.clone())
                .unwrap_or_default(),
            avg_latency_ms: avg_latency,
            period_start: self.session_start,
            period_end: current_timestamp(),
        }
    }

    /// Export current stats to JSON file
    pub fn export_stats_json(&self) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.export_dir)?;
        let stats = self.get_stats();
        let filename = format!("stats_{}.json", current_timestamp());
        let path = self.export_dir.join(filename);

        fs::write(&path, stats.to_json())?;

        Ok(path)
    }

    /// Export stats to CSV (append mode)
    pub fn export_stats_csv(&self) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.export_dir)?;
        let stats = self.get_stats();
        let path = self.export_dir.join("telemetry_history.csv");

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        // Write header if new file
        if file.metadata()?.len() == 0 {
            writeln!(file, "period_start,period_end,total_runs,local_runs,authoritative_runs,fallbacks,failed_runs,degraded_collections,avg_latency_ms")?;
        }

        write!(file, "{}", stats.to_csv_row())?;

        Ok(path)
    }
}

impl Default for AnalysisTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetailedEntity, SourceWarning};

    fn bundle() -> AnalysisBundle {
        AnalysisBundle {
            detailed_entities: vec![
                DetailedEntity {
                    calculated_risk_score: 97,
                    pattern: BehavioralPattern::HighInfluenceHub,
                    ..Default::default()
                },
                DetailedEntity {
                    calculated_risk_score: 35,
                    ..Default::default()
                },
            ],
            warnings: vec![
                SourceWarning {
                    collection: None,
                    code: "COMPUTATION_TIMEOUT".to_string(),
                    message: "authoritative engine timed out".to_string(),
                },
                SourceWarning {
                    collection: None,
                    code: "INPUT_UNAVAILABLE".to_string(),
                    message: "relationships: down".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_run_record_from_bundle() {
        let record = RunRecord::from_bundle(&bundle(), 12, 85);
        assert!(record.fell_back);
        assert_eq!(record.degraded_collections, 1);
        assert_eq!(record.entities_scored, 2);
        assert_eq!(record.critical_entities, 1);
    }

    #[test]
    fn test_collector_basic() {
        let telemetry = AnalysisTelemetry::new();
        telemetry.record_run(&RunRecord::from_bundle(&bundle(), 10, 85));
        telemetry.record_failure(20);
        telemetry.record_patterns(&bundle());

        let stats = telemetry.get_stats();
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.local_runs, 1);
        assert_eq!(stats.failed_runs, 1);
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.avg_latency_ms, 15.0);
        assert_eq!(stats.last_run_patterns.get("HIGH_INFLUENCE_HUB"), Some(&1));
    }

    #[test]
    fn test_malformed_counts_collections() {
        let mut bundle = bundle();
        bundle.warnings.push(SourceWarning {
            collection: None,
            code: "INPUT_MALFORMED".to_string(),
            message: "entities: skipped 7 malformed rows".to_string(),
        });
        let record = RunRecord::from_bundle(&bundle, 1, 85);
        assert_eq!(record.malformed_collections, 1);
    }

    #[test]
    fn test_history_csv_export() {
        let dir = std::env::temp_dir().join(format!("netrisk_telemetry_{}", std::process::id()));
        let telemetry = AnalysisTelemetry::with_export_dir(dir.clone());
        telemetry.record_run(&RunRecord::from_bundle(&bundle(), 10, 85));

        let path = telemetry.export_stats_csv().unwrap();
        telemetry.export_stats_csv().unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("period_start,"));

        let json_path = telemetry.export_stats_json().unwrap();
        let stats: TelemetryStats =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(stats.total_runs, 1);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_stats_json_export() {
        let stats = TelemetryStats {
            total_runs: 1000,
            fallbacks: 3,
            ..Default::default()
        };
        let json = stats.to_json();
        assert!(json.contains("1000"));
        assert!(json.contains("fallbacks"));
        assert_eq!(stats.to_csv_row().split(',').count(), 9);
    }
}
