//! Integration tests for the NetRisk analysis engine

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use netrisk::models::{
    AnalysisBundle, AnalysisSource, AppError, AppResult, BehavioralPattern, Collection,
    DistrictRiskLevel, RiskLevel,
};
use netrisk::{
    export, AuthoritativeEngine, EngineConfig, ErrorCode, ExportFormat, JsonFileSource,
    NetworkAnalyzer, StaticSource,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
}

fn days_ago(days: i64) -> String {
    (now() - Duration::days(days)).to_rfc3339()
}

fn entities() -> Vec<Value> {
    let mut rows = vec![
        json!({"id": "h", "name": "Hub \"Big\" Trader", "entity_type": "supplier", "district_id": "d1"}),
        json!({"id": "r", "name": "Runner", "entity_type": "person", "district_id": "d1"}),
        json!({"id": "iso", "name": "Isolated", "entity_type": "person", "district_id": "d2"}),
        json!({"id": "ghost", "name": "Ghost", "entity_type": "person", "district_id": "d3"}),
    ];
    for i in 1..=9 {
        rows.push(json!({
            "id": format!("n{}", i),
            "name": format!("Node {}", i),
            "entity_type": if i == 1 { "transporter" } else { "person" },
            "district_id": "d1"
        }));
    }
    rows
}

fn relationships() -> Vec<Value> {
    let strengths = [5, 5, 4, 4, 4, 4, 4, 4, 5];
    let mut rows: Vec<Value> = strengths
        .iter()
        .enumerate()
        .map(|(i, s)| {
            json!({
                "source_entity_id": "h",
                "target_entity_id": format!("n{}", i + 1),
                "relationship_type": "supply",
                "connection_strength": s,
                "date_established": days_ago(200),
                "last_activity": days_ago(5)
            })
        })
        .collect();
    for i in 1..=5 {
        rows.push(json!({
            "source_entity_id": "r",
            "target_entity_id": format!("n{}", i),
            "relationship_type": "courier",
            "connection_strength": 2,
            "date_established": days_ago(200),
            "last_activity": days_ago(120)
        }));
    }
    // Endpoint outside any recognized district
    rows.push(json!({
        "source_entity_id": "h",
        "target_entity_id": "ghost",
        "connection_strength": 5,
        "date_established": days_ago(10)
    }));
    rows
}

fn cases() -> Vec<Value> {
    vec![
        json!({"id": "c1", "district_id": "d1", "entity_id": "h", "created_at": days_ago(1)}),
        json!({"id": "c2", "district_id": "d1", "entity_id": "h", "created_at": days_ago(2)}),
        json!({"id": "c3", "entity_id": "h", "created_at": days_ago(3)}),
        json!({"id": "c4", "district_id": "d2", "created_at": days_ago(45)}),
    ]
}

fn districts() -> Vec<Value> {
    vec![
        json!({"id": "d1", "name": "Mysuru", "state": "Karnataka"}),
        json!({"id": "d2", "name": "Udupi"}),
        json!({"id": "d3", "name": "Atlantis"}),
    ]
}

fn full_source() -> StaticSource {
    StaticSource::new()
        .with_rows(Collection::Entities, entities())
        .with_rows(Collection::Relationships, relationships())
        .with_rows(Collection::Cases, cases())
        .with_rows(Collection::Districts, districts())
}

fn analyzer(source: StaticSource) -> NetworkAnalyzer {
    NetworkAnalyzer::new(Arc::new(source), EngineConfig::default()).unwrap()
}

#[tokio::test]
async fn test_full_run_classifies_and_scores() {
    let bundle = analyzer(full_source()).analyze(now(), None).await.unwrap();

    assert_eq!(bundle.source, AnalysisSource::Local);
    assert!(bundle.warnings.is_empty(), "{:?}", bundle.warnings);

    // "ghost" sits in an unrecognized district and is dropped
    assert_eq!(bundle.detailed_entities.len(), 12);
    assert!(bundle.detailed_entities.iter().all(|e| e.entity_id != "ghost"));

    let hub = &bundle.detailed_entities[0];
    assert_eq!(hub.entity_id, "h");
    assert_eq!(hub.pattern, BehavioralPattern::HighInfluenceHub);
    assert_eq!(hub.total_relationships, 9);
    assert_eq!(hub.recent_activities, 3);
    assert_eq!(hub.avg_connection_strength, 4.33);
    assert_eq!(hub.calculated_risk_score, 97);
    assert_eq!(hub.risk_level, Some(RiskLevel::Critical));

    let rapid = &bundle.detailed_entities[1];
    assert_eq!(rapid.entity_id, "r");
    assert_eq!(rapid.pattern, BehavioralPattern::RapidNetworkExpansion);
    assert_eq!(rapid.calculated_risk_score, 65);

    let iso = bundle
        .detailed_entities
        .iter()
        .find(|e| e.entity_id == "iso")
        .unwrap();
    assert_eq!(iso.pattern, BehavioralPattern::None);
    assert_eq!(iso.calculated_risk_score, 35);
    assert_eq!(iso.district, "Udupi");

    for entity in &bundle.detailed_entities {
        assert!(entity.calculated_risk_score <= 100);
    }

    // Remaining entities tie at 35 and are ordered by id
    let tail: Vec<&str> = bundle.detailed_entities[2..]
        .iter()
        .map(|e| e.entity_id.as_str())
        .collect();
    let mut sorted = tail.clone();
    sorted.sort();
    assert_eq!(tail, sorted);
}

#[tokio::test]
async fn test_pattern_insights_and_distribution() {
    let bundle = analyzer(full_source()).analyze(now(), None).await.unwrap();

    let labels: Vec<BehavioralPattern> = bundle
        .pattern_insights
        .iter()
        .map(|p| p.behavioral_pattern)
        .collect();
    assert_eq!(
        labels,
        vec![
            BehavioralPattern::HighInfluenceHub,
            BehavioralPattern::RapidNetworkExpansion,
            BehavioralPattern::NocturnalPattern,
        ]
    );
    assert_eq!(bundle.pattern_insights[0].entity_count, 1);
    assert_eq!(bundle.pattern_insights[0].ai_risk_score, 97);
    // n1..n9 all have degree 1-3
    assert_eq!(bundle.pattern_insights[2].entity_count, 9);

    let distribution = bundle.risk_distribution();
    assert_eq!(distribution.total, 12);
    assert_eq!(distribution.distribution.critical, 1);
    assert_eq!(distribution.distribution.medium, 1);
    assert_eq!(distribution.distribution.low, 10);
}

#[tokio::test]
async fn test_district_risk_and_hotspots() {
    let bundle = analyzer(full_source()).analyze(now(), None).await.unwrap();

    let report = &bundle.district_risk;
    assert_eq!(report.summary.total_districts, 2);
    let names: Vec<&str> = report.districts.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Mysuru", "Udupi"]);

    let mysuru = &report.districts[0];
    assert_eq!(mysuru.metrics.total_entities, 11);
    assert_eq!(mysuru.metrics.suppliers, 1);
    assert_eq!(mysuru.metrics.transporters, 1);
    // c3 has no district and lands via its entity
    assert_eq!(mysuru.metrics.total_cases, 3);
    assert_eq!(mysuru.metrics.recent_cases, 3);
    assert_eq!(mysuru.activity_change_percent, 100);

    let udupi = &report.districts[1];
    assert_eq!(udupi.metrics.previous_cases, 1);
    assert_eq!(udupi.activity_change_percent, -100);
    assert_eq!(udupi.risk_level, DistrictRiskLevel::Low);

    assert_eq!(bundle.hotspots.hotspots[0].district_name, "Mysuru");
    assert_eq!(bundle.hotspots.summary.total_hotspots, 2);
}

#[tokio::test]
async fn test_requested_districts_are_zero_filled() {
    let requested = vec![
        "udupi".to_string(),
        "Coorg".to_string(),
        "Narnia".to_string(),
    ];
    let bundle = analyzer(full_source())
        .analyze(now(), Some(requested.as_slice()))
        .await
        .unwrap();

    let names: Vec<&str> = bundle
        .district_risk
        .districts
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["Udupi", "Kodagu"]);
    let kodagu = &bundle.district_risk.districts[1];
    assert_eq!(kodagu.risk_scores.overall, 0);
    assert_eq!(kodagu.metrics.total_entities, 0);

    assert_eq!(bundle.warnings.len(), 1);
    assert!(bundle.warnings[0].message.contains("Narnia"));

    // Entity scoring is unaffected by the district filter
    assert_eq!(bundle.detailed_entities.len(), 12);
}

#[tokio::test]
async fn test_vulnerability_and_communication() {
    let bundle = analyzer(full_source()).analyze(now(), None).await.unwrap();

    let top = &bundle.network_vulnerabilities.critical_nodes[0];
    assert_eq!(top.id, "h");
    assert_eq!(top.criticality_score, 90);

    let summary = &bundle.communication_patterns.pattern_summary;
    // 14 in-scope edges, the 5 courier edges are dormant
    assert_eq!(summary.dormant_relationships, 5);
    assert_eq!(summary.total_active_relationships, 9);
}

#[tokio::test]
async fn test_degraded_relationships_zero_degrees() {
    let bundle = analyzer(full_source().without(Collection::Relationships))
        .analyze(now(), None)
        .await
        .unwrap();

    assert_eq!(bundle.warnings.len(), 1);
    assert_eq!(bundle.warnings[0].code, "INPUT_UNAVAILABLE");
    assert_eq!(bundle.warnings[0].collection, Some(Collection::Relationships));
    assert!(bundle
        .detailed_entities
        .iter()
        .all(|e| e.total_relationships == 0 && e.pattern == BehavioralPattern::None));
    // Activity points still apply to the hub
    assert_eq!(bundle.detailed_entities[0].calculated_risk_score, 52);
    assert!(bundle.pattern_insights.is_empty());
}

#[tokio::test]
async fn test_degraded_districts_keep_entities() {
    let bundle = analyzer(full_source().without(Collection::Districts))
        .analyze(now(), None)
        .await
        .unwrap();

    assert_eq!(bundle.warnings.len(), 1);
    assert_eq!(bundle.warnings[0].code, "INPUT_UNAVAILABLE");
    assert_eq!(bundle.warnings[0].collection, Some(Collection::Districts));

    // No district records to scope against: every entity is kept as Unknown
    assert_eq!(bundle.detailed_entities.len(), 13);
    assert!(bundle.detailed_entities.iter().all(|e| e.district == "Unknown"));
    let hub = &bundle.detailed_entities[0];
    assert_eq!(hub.entity_id, "h");
    assert_eq!(hub.total_relationships, 10);
    assert_eq!(hub.pattern, BehavioralPattern::HighInfluenceHub);

    assert!(bundle.district_risk.districts.is_empty());
    assert!(bundle.hotspots.hotspots.is_empty());
}

#[tokio::test]
async fn test_empty_snapshot_yields_empty_products() {
    let bundle = analyzer(StaticSource::new()).analyze(now(), None).await.unwrap();

    assert!(bundle.detailed_entities.is_empty());
    assert!(bundle.pattern_insights.is_empty());
    assert_eq!(bundle.district_risk.summary.total_districts, 0);
    assert_eq!(bundle.district_risk.summary.average_risk_score, 0);
    assert_eq!(bundle.hotspots.summary.total_hotspots, 0);
    assert_eq!(bundle.temporal_patterns.activity_change_percent, 0);

    let csv = export(&bundle, ExportFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[tokio::test]
async fn test_all_collections_failed() {
    let err = analyzer(StaticSource::unavailable())
        .analyze(now(), None)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Unrecoverable);
    for collection in Collection::ALL {
        assert!(err.message.contains(collection.as_str()), "{}", err.message);
    }
}

#[tokio::test]
async fn test_csv_export_matches_entities() {
    let bundle = analyzer(full_source()).analyze(now(), None).await.unwrap();

    let csv = export(&bundle, ExportFormat::Csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), bundle.detailed_entities.len() + 1);
    assert!(lines[1].starts_with("h,\"Hub \"\"Big\"\" Trader\",supplier,Mysuru,"));

    let json = export(&bundle, ExportFormat::Json).unwrap();
    let decoded: AnalysisBundle = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.run_id, bundle.run_id);
    assert_eq!(decoded.district_risk, bundle.district_risk);
    assert_eq!(decoded.detailed_entities.len(), bundle.detailed_entities.len());

    assert_eq!(
        "xml".parse::<ExportFormat>().unwrap_err().code,
        ErrorCode::ExportUnsupportedFormat
    );
}

struct FailingEngine;

#[async_trait]
impl AuthoritativeEngine for FailingEngine {
    async fn analyze(&self, _now: DateTime<Utc>) -> AppResult<AnalysisBundle> {
        Err(AppError::authoritative_failed("HTTP 503"))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

#[tokio::test]
async fn test_authoritative_failure_falls_back() {
    let analyzer = analyzer(full_source()).with_authoritative(Arc::new(FailingEngine));
    let bundle = analyzer.analyze(now(), None).await.unwrap();

    assert_eq!(bundle.source, AnalysisSource::Local);
    assert_eq!(bundle.warnings[0].code, "AUTHORITATIVE_FAILED");
    assert_eq!(bundle.detailed_entities[0].calculated_risk_score, 97);

    let stats = analyzer.telemetry().get_stats();
    assert_eq!(stats.total_runs, 1);
    assert_eq!(stats.fallbacks, 1);
    assert_eq!(stats.local_runs, 1);
}

#[tokio::test]
async fn test_file_source_with_missing_collection() {
    let dir = std::env::temp_dir().join(format!("netrisk_it_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("entities.json"),
        serde_json::to_string(&entities()).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.join("relationships.json"),
        serde_json::to_string(&json!({ "rows": relationships() })).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.join("districts.json"),
        serde_json::to_string(&districts()).unwrap(),
    )
    .unwrap();

    let analyzer =
        NetworkAnalyzer::new(Arc::new(JsonFileSource::new(&dir)), EngineConfig::default())
            .unwrap();
    let bundle = analyzer.analyze(now(), None).await.unwrap();

    assert_eq!(bundle.warnings.len(), 1);
    assert_eq!(bundle.warnings[0].collection, Some(Collection::Cases));
    // Without cases the hub loses its activity points
    assert_eq!(bundle.detailed_entities[0].calculated_risk_score, 80);

    let _ = std::fs::remove_dir_all(&dir);
}
