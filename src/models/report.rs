//! Derived output records
//!
//! Everything here is recomputed on every run. Each product has a `Default`
//! that is the correctly shaped empty value, so a bundle never carries a
//! missing product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::errors::AppError;
use super::types::{
    AlertLevel, AnalysisSource, BehavioralPattern, Collection, DistrictRiskLevel, RiskLevel, Trend,
};

// ============================================
// Entities & patterns
// ============================================

/// Additive points behind one entity score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub base_score: u32,
    pub rapid_expansion_points: u32,
    pub high_influence_points: u32,
    pub network_size_points: u32,
    pub activity_points: u32,
    pub coordination_bonus: u32,
}

impl RiskFactors {
    /// Unclamped sum of all factors
    pub fn raw_total(&self) -> u32 {
        self.base_score
            + self.rapid_expansion_points
            + self.high_influence_points
            + self.network_size_points
            + self.activity_points
            + self.coordination_bonus
    }
}

/// Per-entity analysis row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedEntity {
    pub entity_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub district: String,
    #[serde(default)]
    pub district_id: Option<String>,
    pub pattern: BehavioralPattern,
    pub total_activities: usize,
    pub recent_activities: usize,
    pub total_relationships: usize,
    pub new_relationships_90_days: usize,
    pub avg_connection_strength: f64,
    pub calculated_risk_score: u32,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub risk_factors: RiskFactors,
    pub why_flagged: String,
}

/// Mean points per factor across a pattern's members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_score: u32,
    pub rapid_expansion_bonus: u32,
    pub influence_bonus: u32,
    pub network_size_bonus: u32,
    pub activity_bonus: u32,
    pub coordination_bonus: u32,
}

/// Aggregate view of one behavioral pattern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternInsight {
    pub behavioral_pattern: BehavioralPattern,
    pub entity_count: usize,
    pub avg_activities: f64,
    pub avg_connections: f64,
    pub avg_new_relationships: f64,
    pub avg_connection_strength: f64,
    pub ai_risk_score: u32,
    pub score_breakdown: ScoreBreakdown,
    pub pattern_definition: String,
    pub risk_explanation: String,
    pub criteria_thresholds: BTreeMap<String, String>,
    pub criteria_explanation: String,
}

// ============================================
// Districts
// ============================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictSubScores {
    pub overall: u32,
    pub case_activity: u32,
    pub recent_activity: u32,
    pub supplier_presence: u32,
    pub transport_network: u32,
    pub network_density: u32,
}

/// Raw counts a district score is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictMetrics {
    pub total_cases: usize,
    pub recent_cases: usize,
    pub previous_cases: usize,
    pub total_entities: usize,
    pub suppliers: usize,
    pub transporters: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictRisk {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub risk_level: DistrictRiskLevel,
    pub risk_scores: DistrictSubScores,
    pub metrics: DistrictMetrics,
    pub trend: Trend,
    pub activity_change_percent: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictRiskSummary {
    pub total_districts: usize,
    pub high_risk_districts: usize,
    pub medium_risk_districts: usize,
    pub low_risk_districts: usize,
    pub average_risk_score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictRiskReport {
    pub summary: DistrictRiskSummary,
    pub districts: Vec<DistrictRisk>,
}

// ============================================
// Hotspots
// ============================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub recent_cases: usize,
    pub total_entities: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityComparison {
    pub previous_cases: usize,
    pub activity_increase_percent: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub district_id: String,
    pub district_name: String,
    pub alert_level: AlertLevel,
    pub hotspot_score: u32,
    pub activity_metrics: ActivityMetrics,
    pub comparison: ActivityComparison,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotspotSummary {
    pub total_hotspots: usize,
    pub critical_alerts: usize,
    pub high_alerts: usize,
    pub medium_alerts: usize,
    pub low_alerts: usize,
    pub districts_with_increased_activity: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotspotReport {
    pub summary: HotspotSummary,
    pub hotspots: Vec<Hotspot>,
}

// ============================================
// Temporal
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// `YYYY-MM`
    pub month: String,
    pub cases: usize,
    pub moving_average: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalPattern {
    pub season: String,
    pub average_cases: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalPatterns {
    pub monthly_trends: Vec<MonthlyPoint>,
    pub seasonal_patterns: Vec<SeasonalPattern>,
    pub last_30_days: usize,
    pub previous_30_days: usize,
    pub activity_change_percent: i64,
    pub trend: Trend,
}

// ============================================
// Network structure
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub district: String,
    pub total_connections: usize,
    pub criticality_score: u32,
    pub disruption_impact: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeAssessment {
    pub entity_type: String,
    pub node_count: usize,
    pub high_criticality_nodes: usize,
    pub avg_criticality: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkVulnerabilities {
    pub critical_nodes: Vec<CriticalNode>,
    pub vulnerability_assessment: Vec<TypeAssessment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyBucket {
    pub communication_frequency: String,
    pub relationship_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationSummary {
    pub total_active_relationships: usize,
    pub high_frequency_communications: usize,
    pub dormant_relationships: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationPatterns {
    pub communication_patterns: Vec<FrequencyBucket>,
    pub pattern_summary: CommunicationSummary,
}

// ============================================
// Methodology & bundle
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringFactor {
    pub factor: String,
    pub weight: u32,
    pub criteria: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Methodology {
    pub algorithm_name: String,
    pub version: String,
    pub base_score: u32,
    pub max_score: u32,
    pub scoring_factors: Vec<ScoringFactor>,
    pub risk_classifications: BTreeMap<String, String>,
}

/// Non-fatal problem met while assembling the snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWarning {
    #[serde(default)]
    pub collection: Option<Collection>,
    pub code: String,
    pub message: String,
}

impl SourceWarning {
    pub fn from_error(err: &AppError) -> Self {
        Self {
            collection: err.collection,
            code: err.code_str().to_string(),
            message: err.message.clone(),
        }
    }
}

/// Everything one run produces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisBundle {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub source: AnalysisSource,
    pub pattern_insights: Vec<PatternInsight>,
    pub detailed_entities: Vec<DetailedEntity>,
    pub district_risk: DistrictRiskReport,
    pub hotspots: HotspotReport,
    pub temporal_patterns: TemporalPatterns,
    pub network_vulnerabilities: NetworkVulnerabilities,
    pub communication_patterns: CommunicationPatterns,
    pub methodology: Methodology,
    pub warnings: Vec<SourceWarning>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    #[serde(rename = "CRITICAL")]
    pub critical: usize,
    #[serde(rename = "HIGH")]
    pub high: usize,
    #[serde(rename = "MEDIUM")]
    pub medium: usize,
    #[serde(rename = "LOW")]
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub distribution: TierCounts,
    pub total: usize,
    pub methodology: Methodology,
}

impl AnalysisBundle {
    /// Entities at or above `min_score`
    pub fn critical_entities(&self, min_score: u32) -> Vec<&DetailedEntity> {
        self.detailed_entities
            .iter()
            .filter(|e| e.calculated_risk_score >= min_score)
            .collect()
    }

    pub fn entities_by_pattern(&self, pattern: BehavioralPattern) -> Vec<&DetailedEntity> {
        self.detailed_entities
            .iter()
            .filter(|e| e.pattern == pattern)
            .collect()
    }

    /// Tier tallies; unclassified scores (<35) count toward `total` only
    pub fn risk_distribution(&self) -> RiskDistribution {
        let mut distribution = TierCounts::default();
        for entity in &self.detailed_entities {
            match RiskLevel::from_score(entity.calculated_risk_score) {
                Some(RiskLevel::Critical) => distribution.critical += 1,
                Some(RiskLevel::High) => distribution.high += 1,
                Some(RiskLevel::Medium) => distribution.medium += 1,
                Some(RiskLevel::Low) => distribution.low += 1,
                None => {}
            }
        }

        RiskDistribution {
            distribution,
            total: self.detailed_entities.len(),
            methodology: self.methodology.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, score: u32, pattern: BehavioralPattern) -> DetailedEntity {
        DetailedEntity {
            entity_id: id.to_string(),
            calculated_risk_score: score,
            pattern,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_bundle_is_shaped() {
        let json = serde_json::to_value(AnalysisBundle::default()).unwrap();
        assert!(json["pattern_insights"].is_array());
        assert!(json["detailed_entities"].is_array());
        assert!(json["district_risk"]["districts"].is_array());
        assert_eq!(json["district_risk"]["summary"]["average_risk_score"], 0);
        assert!(json["hotspots"]["hotspots"].is_array());
        assert_eq!(json["hotspots"]["summary"]["critical_alerts"], 0);
    }

    #[test]
    fn test_risk_distribution_skips_unclassified() {
        let bundle = AnalysisBundle {
            detailed_entities: vec![
                entity("a", 97, BehavioralPattern::HighInfluenceHub),
                entity("b", 65, BehavioralPattern::RapidNetworkExpansion),
                entity("c", 35, BehavioralPattern::None),
                entity("d", 20, BehavioralPattern::None),
            ],
            ..Default::default()
        };

        let dist = bundle.risk_distribution();
        assert_eq!(dist.distribution.critical, 1);
        assert_eq!(dist.distribution.high, 0);
        assert_eq!(dist.distribution.medium, 1);
        assert_eq!(dist.distribution.low, 1);
        assert_eq!(dist.total, 4);
    }

    #[test]
    fn test_bundle_queries() {
        let bundle = AnalysisBundle {
            detailed_entities: vec![
                entity("a", 97, BehavioralPattern::HighInfluenceHub),
                entity("b", 65, BehavioralPattern::RapidNetworkExpansion),
            ],
            ..Default::default()
        };
        assert_eq!(bundle.critical_entities(85).len(), 1);
        assert_eq!(
            bundle
                .entities_by_pattern(BehavioralPattern::RapidNetworkExpansion)
                .len(),
            1
        );
    }
}
