//! Network analyzer
//! Orchestrates the whole run: fetch, graph index, classification and
//! scoring, district aggregation, hotspots.
//!
//! Every product in the bundle is always present. Missing collections
//! degrade to empty sets with a warning; only a run where every collection
//! failed is an error.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::districts::{aggregate_districts, DistrictScope, DistrictTable, EntityPlacement};
use crate::core::graph::{scope_relationships, GraphIndex};
use crate::core::hotspots::detect_hotspots;
use crate::core::patterns::{pattern_insights, PatternClassifier, PatternInputs};
use crate::core::risk_score::{methodology, score_entity, ScoreInputs};
use crate::core::temporal::{entity_activity, temporal_patterns};
use crate::core::vulnerability::{communication_patterns, network_vulnerabilities};
use crate::models::{
    AnalysisBundle, AnalysisSource, AppError, AppResult, Collection, DetailedEntity, EngineConfig,
    Entity, ErrorCode, Snapshot, SourceConfig, SourceWarning,
};
use crate::providers::connect;
use crate::providers::http::HttpAuthoritative;
use crate::providers::rows::{
    parse_cases, parse_districts, parse_entities, parse_relationships, Parsed,
};
use crate::providers::source::{AuthoritativeEngine, DataSource};
use crate::utils::math::round2;
use crate::utils::telemetry::{AnalysisTelemetry, RunRecord};

const UNKNOWN_DISTRICT: &str = "Unknown";

/// Parsed snapshot plus the warnings collected while fetching it
#[derive(Debug, Clone, Default)]
pub struct FetchedSnapshot {
    pub snapshot: Snapshot,
    pub warnings: Vec<SourceWarning>,
}

/// Main analyzer: the one entry point every consumer goes through
pub struct NetworkAnalyzer {
    source: Arc<dyn DataSource>,
    authoritative: Option<Arc<dyn AuthoritativeEngine>>,
    config: EngineConfig,
    districts: DistrictTable,
    telemetry: Arc<AnalysisTelemetry>,
}

impl NetworkAnalyzer {
    /// Create an analyzer over a data source; validates the district table
    pub fn new(source: Arc<dyn DataSource>, config: EngineConfig) -> AppResult<Self> {
        Ok(Self {
            source,
            authoritative: None,
            config,
            districts: DistrictTable::builtin()?,
            telemetry: Arc::new(AnalysisTelemetry::new()),
        })
    }

    /// Source, thresholds and optional remote engine from `NETRISK_*` variables
    pub fn from_env() -> AppResult<Self> {
        let config = EngineConfig::from_env();
        let source = connect(&SourceConfig::from_env(), config.fetch_timeout)?;
        let authoritative = match &config.authoritative_url {
            Some(url) => Some(HttpAuthoritative::new(url.clone(), config.authoritative_timeout)?),
            None => None,
        };

        let analyzer = Self::new(source, config)?;
        Ok(match authoritative {
            Some(engine) => analyzer.with_authoritative(Arc::new(engine)),
            None => analyzer,
        })
    }

    pub fn with_authoritative(mut self, engine: Arc<dyn AuthoritativeEngine>) -> Self {
        self.authoritative = Some(engine);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<AnalysisTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Same settings over a different source, local path only
    pub fn with_source(&self, source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            authoritative: None,
            config: self.config.clone(),
            districts: self.districts.clone(),
            telemetry: self.telemetry.clone(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<AnalysisTelemetry> {
        &self.telemetry
    }

    pub fn district_table(&self) -> &DistrictTable {
        &self.districts
    }

    /// Run one analysis. `requested` restricts the district product to the
    /// named districts (zero-filled when absent from the data).
    pub async fn analyze(
        &self,
        now: DateTime<Utc>,
        requested: Option<&[String]>,
    ) -> AppResult<AnalysisBundle> {
        let start = Instant::now();
        let result = self.run(now, requested).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(bundle) => {
                self.telemetry.record_run(&RunRecord::from_bundle(
                    bundle,
                    latency_ms,
                    self.config.critical_min_score,
                ));
                self.telemetry.record_patterns(bundle);
                info!(
                    run_id = %bundle.run_id,
                    source = ?bundle.source,
                    entities = bundle.detailed_entities.len(),
                    districts = bundle.district_risk.districts.len(),
                    hotspots = bundle.hotspots.hotspots.len(),
                    warnings = bundle.warnings.len(),
                    "✅ Analysis completed in {}ms",
                    latency_ms
                );
            }
            Err(e) => {
                self.telemetry.record_failure(latency_ms);
                error!("❌ Analysis failed after {}ms: {}", latency_ms, e);
            }
        }

        result
    }

    async fn run(
        &self,
        now: DateTime<Utc>,
        requested: Option<&[String]>,
    ) -> AppResult<AnalysisBundle> {
        let mut fallback = None;

        // The remote contract has no district filter, so filtered runs stay local
        if let (Some(engine), None) = (&self.authoritative, requested) {
            match tokio::time::timeout(self.config.authoritative_timeout, engine.analyze(now)).await
            {
                Ok(Ok(mut bundle)) => {
                    bundle.source = AnalysisSource::Authoritative;
                    if bundle.run_id.is_nil() {
                        bundle.run_id = Uuid::new_v4();
                    }
                    return Ok(bundle);
                }
                Ok(Err(e)) => {
                    let e = if e.code == ErrorCode::ComputationTimeout {
                        e
                    } else {
                        AppError::authoritative_failed(e.to_string())
                    };
                    warn!("⚠️ Authoritative engine {} failed, using local path: {}", engine.describe(), e);
                    fallback = Some(SourceWarning::from_error(&e));
                }
                Err(_) => {
                    let e = AppError::timeout(format!(
                        "authoritative engine exceeded {}ms",
                        self.config.authoritative_timeout.as_millis()
                    ));
                    warn!("⏱️ {}, using local path", e);
                    fallback = Some(SourceWarning::from_error(&e));
                }
            }
        }

        let fetched = self.fetch_snapshot().await?;
        let mut bundle = self.compute_off_runtime(fetched.snapshot, now, requested).await?;

        let mut warnings = Vec::new();
        warnings.extend(fallback);
        warnings.extend(fetched.warnings);
        warnings.append(&mut bundle.warnings);
        bundle.warnings = warnings;

        Ok(bundle)
    }

    async fn bounded(
        &self,
        collection: Collection,
        fetch: impl Future<Output = AppResult<Vec<Value>>>,
    ) -> AppResult<Vec<Value>> {
        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(Ok(rows)) => Ok(rows),
            // Anything the run cannot degrade around is reported as a missing collection
            Ok(Err(e)) if !e.code.is_degradable() => {
                Err(AppError::input_unavailable(collection, e.to_string()))
            }
            Ok(Err(e)) if e.collection.is_none() => Err(e.for_collection(collection)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AppError::input_unavailable(
                collection,
                format!("timed out after {}ms", self.config.fetch_timeout.as_millis()),
            )),
        }
    }

    /// Fetch all four collections concurrently and decode them
    pub async fn fetch_snapshot(&self) -> AppResult<FetchedSnapshot> {
        debug!("📥 Fetching collections from {}", self.source.describe());

        let (entities, relationships, cases, districts) = tokio::join!(
            self.bounded(Collection::Entities, self.source.fetch_entities()),
            self.bounded(Collection::Relationships, self.source.fetch_relationships()),
            self.bounded(Collection::Cases, self.source.fetch_cases()),
            self.bounded(Collection::Districts, self.source.fetch_districts()),
        );

        let mut warnings = Vec::new();
        let mut failures = Vec::new();

        let snapshot = Snapshot {
            entities: decode(Collection::Entities, entities, parse_entities, &mut warnings, &mut failures),
            relationships: decode(
                Collection::Relationships,
                relationships,
                parse_relationships,
                &mut warnings,
                &mut failures,
            ),
            cases: decode(Collection::Cases, cases, parse_cases, &mut warnings, &mut failures),
            districts: decode(Collection::Districts, districts, parse_districts, &mut warnings, &mut failures),
        };

        if failures.len() == Collection::ALL.len() {
            return Err(AppError::unrecoverable(&failures));
        }

        Ok(FetchedSnapshot { snapshot, warnings })
    }

    /// Local computation on the blocking pool; rayon keeps the async workers free
    async fn compute_off_runtime(
        &self,
        snapshot: Snapshot,
        now: DateTime<Utc>,
        requested: Option<&[String]>,
    ) -> AppResult<AnalysisBundle> {
        let config = self.config.clone();
        let table = self.districts.clone();
        let requested = requested.map(<[String]>::to_vec);

        tokio::task::spawn_blocking(move || {
            compute_bundle(&snapshot, now, &config, &table, requested.as_deref())
        })
        .await
        .map_err(|e| AppError::internal(format!("analysis task failed: {}", e)))
    }
}

fn decode<T>(
    collection: Collection,
    fetched: AppResult<Vec<Value>>,
    parse: fn(&[Value]) -> Parsed<T>,
    warnings: &mut Vec<SourceWarning>,
    failures: &mut Vec<AppError>,
) -> Vec<T> {
    match fetched {
        Ok(rows) => {
            let parsed = parse(&rows);
            if parsed.malformed > 0 {
                warn!("⚠️ Skipped {} malformed {} rows", parsed.malformed, collection);
                warnings.push(SourceWarning::from_error(&AppError::input_malformed(
                    collection,
                    format!("skipped {} malformed rows", parsed.malformed),
                )));
            }
            parsed.records
        }
        Err(e) => {
            warn!("⚠️ {} unavailable, continuing with empty set: {}", collection, e);
            warnings.push(SourceWarning::from_error(&e));
            failures.push(e);
            Vec::new()
        }
    }
}

/// Every derived product for one snapshot and one "now"
pub fn compute_bundle(
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    config: &EngineConfig,
    table: &DistrictTable,
    requested: Option<&[String]>,
) -> AnalysisBundle {
    let (scope, unrecognized) = DistrictScope::build(table, &snapshot.districts, requested);

    let placed: Vec<(&Entity, Option<usize>)> = snapshot
        .entities
        .iter()
        .filter_map(|e| match scope.place(table, e) {
            EntityPlacement::District(idx) => Some((e, Some(idx))),
            EntityPlacement::Unassigned => Some((e, None)),
            EntityPlacement::OutOfScope => None,
        })
        .collect();

    let dropped = snapshot.entities.len() - placed.len();
    if dropped > 0 {
        debug!("Dropped {} entities outside recognized districts", dropped);
    }

    // Degrees must be complete before any entity is classified
    let in_scope: HashSet<&str> = placed.iter().map(|(e, _)| e.id.as_str()).collect();
    let edges = scope_relationships(&in_scope, &snapshot.relationships);
    let graph = GraphIndex::build(&edges, now);
    let activity = entity_activity(&snapshot.cases, now);
    let classifier = PatternClassifier::new(config.rapid_expansion_threshold);

    let mut detailed_entities: Vec<DetailedEntity> = placed
        .par_iter()
        .map(|(entity, district)| {
            let node = graph.metrics(&entity.id);
            let counts = activity.get(&entity.id).copied().unwrap_or_default();
            let avg_strength = node.avg_strength();

            let classification = classifier.classify(&PatternInputs {
                degree: node.degree,
                avg_strength,
                new_relationships_90d: node.new_relationships_90d,
            });
            let score = score_entity(
                &ScoreInputs {
                    pattern: classification.pattern,
                    degree: node.degree,
                    recent_activities: counts.last_30,
                    new_relationships_90d: node.new_relationships_90d,
                },
                config.activity_threshold,
            );
            let district = district.and_then(|idx| scope.get(idx));

            DetailedEntity {
                entity_id: entity.id.clone(),
                name: entity.name.clone(),
                entity_type: entity.entity_type.as_str().to_string(),
                district: district
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| UNKNOWN_DISTRICT.to_string()),
                district_id: district.map(|d| d.id.clone()),
                pattern: classification.pattern,
                total_activities: counts.total,
                recent_activities: counts.last_30,
                total_relationships: node.degree,
                new_relationships_90_days: node.new_relationships_90d,
                avg_connection_strength: round2(avg_strength),
                calculated_risk_score: score.total,
                risk_level: score.level,
                risk_factors: score.factors,
                why_flagged: classification.why_flagged,
            }
        })
        .collect();

    detailed_entities.sort_by(|a, b| {
        b.calculated_risk_score
            .cmp(&a.calculated_risk_score)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    let district_risk = aggregate_districts(&scope, &placed, &snapshot.cases, now);
    let hotspots = detect_hotspots(&district_risk.districts, config.hotspot_limit);

    let warnings = unrecognized
        .iter()
        .map(|name| SourceWarning {
            collection: Some(Collection::Districts),
            code: ErrorCode::ConfigInvalidValue.as_str().to_string(),
            message: format!("unrecognized district requested: {}", name),
        })
        .collect();

    AnalysisBundle {
        run_id: Uuid::new_v4(),
        generated_at: now,
        source: AnalysisSource::Local,
        pattern_insights: pattern_insights(&detailed_entities, config.rapid_expansion_threshold),
        network_vulnerabilities: network_vulnerabilities(&detailed_entities),
        communication_patterns: communication_patterns(&edges, now),
        temporal_patterns: temporal_patterns(&snapshot.cases, now),
        methodology: methodology(config.activity_threshold, config.rapid_expansion_threshold),
        detailed_entities,
        district_risk,
        hotspots,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BehavioralPattern, CaseRecord, District, EntityType, Relationship};
    use crate::providers::source::StaticSource;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
    }

    fn snapshot() -> Snapshot {
        let entity = |id: &str, kind: EntityType, district: Option<&str>| Entity {
            id: id.to_string(),
            name: id.to_uppercase(),
            entity_type: kind,
            district_id: district.map(String::from),
            district_name: None,
            created_at: None,
            updated_at: None,
        };
        let edge = |s: &str, t: &str, strength: u8| Relationship {
            id: None,
            source_entity_id: s.to_string(),
            target_entity_id: t.to_string(),
            relationship_type: "supply".to_string(),
            connection_strength: strength,
            date_established: Some(now() - Duration::days(200)),
            last_activity: None,
        };

        Snapshot {
            entities: vec![
                entity("hub", EntityType::Supplier, Some("1")),
                entity("a", EntityType::Person, Some("1")),
                entity("b", EntityType::Transporter, Some("1")),
                entity("lonely", EntityType::Person, None),
                entity("foreign", EntityType::Person, Some("99")),
            ],
            relationships: vec![
                edge("hub", "a", 5),
                edge("hub", "a", 4),
                edge("hub", "b", 4),
                edge("hub", "foreign", 1),
            ],
            cases: vec![CaseRecord {
                id: "c1".to_string(),
                district_id: Some("1".to_string()),
                entity_id: Some("hub".to_string()),
                created_at: Some(now() - Duration::days(3)),
            }],
            districts: vec![District {
                id: "1".to_string(),
                name: "Mysuru".to_string(),
                state: None,
                latitude: None,
                longitude: None,
            }],
        }
    }

    #[test]
    fn test_compute_bundle_scopes_and_scores() {
        let table = DistrictTable::builtin().unwrap();
        let bundle = compute_bundle(&snapshot(), now(), &EngineConfig::default(), &table, None);

        // "foreign" references an unknown district and is dropped with its edge
        assert_eq!(bundle.detailed_entities.len(), 4);
        let hub = bundle
            .detailed_entities
            .iter()
            .find(|e| e.entity_id == "hub")
            .unwrap();
        assert_eq!(hub.total_relationships, 3);
        assert_eq!(hub.pattern, BehavioralPattern::NocturnalPattern);
        assert_eq!(hub.total_activities, 1);
        assert_eq!(hub.district, "Mysuru");

        let lonely = bundle
            .detailed_entities
            .iter()
            .find(|e| e.entity_id == "lonely")
            .unwrap();
        assert_eq!(lonely.calculated_risk_score, 35);
        assert_eq!(lonely.pattern, BehavioralPattern::None);
        assert_eq!(lonely.district, "Unknown");

        assert_eq!(bundle.district_risk.districts.len(), 1);
        assert_eq!(bundle.district_risk.districts[0].metrics.total_entities, 3);
        assert_eq!(bundle.hotspots.hotspots.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_collection_degrades() {
        let source = StaticSource::from_snapshot(&snapshot())
            .unwrap()
            .without(Collection::Relationships);
        let analyzer = NetworkAnalyzer::new(Arc::new(source), EngineConfig::default()).unwrap();

        let bundle = analyzer.analyze(now(), None).await.unwrap();
        assert!(bundle
            .detailed_entities
            .iter()
            .all(|e| e.total_relationships == 0 && e.calculated_risk_score == 35));
        assert_eq!(bundle.warnings.len(), 1);
        assert_eq!(bundle.warnings[0].code, "INPUT_UNAVAILABLE");
        assert_eq!(bundle.warnings[0].collection, Some(Collection::Relationships));
    }

    #[tokio::test]
    async fn test_all_sources_failed_is_unrecoverable() {
        let analyzer =
            NetworkAnalyzer::new(Arc::new(StaticSource::unavailable()), EngineConfig::default())
                .unwrap();
        let err = analyzer.analyze(now(), None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unrecoverable);
        assert_eq!(analyzer.telemetry().get_stats().failed_runs, 1);
    }

    #[tokio::test]
    async fn test_malformed_rows_are_reported() {
        let source = StaticSource::new().with_rows(
            Collection::Entities,
            vec![json!({"id": 1, "name": "A", "entity_type": "person"}), json!({"id": 2})],
        );
        let analyzer = NetworkAnalyzer::new(Arc::new(source), EngineConfig::default()).unwrap();
        let bundle = analyzer.analyze(now(), None).await.unwrap();
        assert_eq!(bundle.detailed_entities.len(), 1);
        assert!(bundle.warnings.iter().any(|w| w.code == "INPUT_MALFORMED"));
    }

    /// Source whose entities call fails with a non-input error
    struct BrokenEntities(StaticSource);

    #[async_trait]
    impl DataSource for BrokenEntities {
        async fn fetch(&self, collection: Collection) -> AppResult<Vec<Value>> {
            match collection {
                Collection::Entities => Err(AppError::new(ErrorCode::Unknown, "driver panic")),
                other => self.0.fetch(other).await,
            }
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[tokio::test]
    async fn test_non_input_fetch_error_degrades_as_unavailable() {
        let source = BrokenEntities(StaticSource::from_snapshot(&snapshot()).unwrap());
        let analyzer = NetworkAnalyzer::new(Arc::new(source), EngineConfig::default()).unwrap();

        let bundle = analyzer.analyze(now(), None).await.unwrap();
        assert!(bundle.detailed_entities.is_empty());
        assert_eq!(bundle.warnings.len(), 1);
        assert_eq!(bundle.warnings[0].code, "INPUT_UNAVAILABLE");
        assert_eq!(bundle.warnings[0].collection, Some(Collection::Entities));
        assert_eq!(analyzer.telemetry().get_stats().degraded_collections, 1);
    }

    #[tokio::test]
    async fn test_missing_districts_keep_entities() {
        let source = StaticSource::from_snapshot(&snapshot())
            .unwrap()
            .without(Collection::Districts);
        let analyzer = NetworkAnalyzer::new(Arc::new(source), EngineConfig::default()).unwrap();

        let bundle = analyzer.analyze(now(), None).await.unwrap();
        // nothing to resolve against, so "foreign" stays in too
        assert_eq!(bundle.detailed_entities.len(), 5);
        assert!(bundle.detailed_entities.iter().all(|e| e.district == "Unknown"));
        let hub = bundle
            .detailed_entities
            .iter()
            .find(|e| e.entity_id == "hub")
            .unwrap();
        assert_eq!(hub.total_relationships, 4);
        assert!(bundle.district_risk.districts.is_empty());
        assert_eq!(bundle.warnings.len(), 1);
        assert_eq!(bundle.warnings[0].collection, Some(Collection::Districts));
    }

    struct SlowEngine;

    #[async_trait]
    impl AuthoritativeEngine for SlowEngine {
        async fn analyze(&self, _now: DateTime<Utc>) -> AppResult<AnalysisBundle> {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            Ok(AnalysisBundle::default())
        }

        fn describe(&self) -> String {
            "slow".to_string()
        }
    }

    struct FixedEngine;

    #[async_trait]
    impl AuthoritativeEngine for FixedEngine {
        async fn analyze(&self, now: DateTime<Utc>) -> AppResult<AnalysisBundle> {
            Ok(AnalysisBundle {
                generated_at: now,
                ..Default::default()
            })
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    #[tokio::test]
    async fn test_authoritative_timeout_falls_back() {
        let config = EngineConfig {
            authoritative_timeout: std::time::Duration::from_millis(20),
            ..Default::default()
        };
        let source = StaticSource::from_snapshot(&snapshot()).unwrap();
        let analyzer = NetworkAnalyzer::new(Arc::new(source), config)
            .unwrap()
            .with_authoritative(Arc::new(SlowEngine));

        let bundle = analyzer.analyze(now(), None).await.unwrap();
        assert_eq!(bundle.source, AnalysisSource::Local);
        assert_eq!(bundle.warnings[0].code, "COMPUTATION_TIMEOUT");
        assert_eq!(bundle.detailed_entities.len(), 4);
        assert_eq!(analyzer.telemetry().get_stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_authoritative_bundle_is_used() {
        let source = StaticSource::from_snapshot(&snapshot()).unwrap();
        let analyzer = NetworkAnalyzer::new(Arc::new(source), EngineConfig::default())
            .unwrap()
            .with_authoritative(Arc::new(FixedEngine));

        let bundle = analyzer.analyze(now(), None).await.unwrap();
        assert_eq!(bundle.source, AnalysisSource::Authoritative);
        assert!(!bundle.run_id.is_nil());
    }
}
