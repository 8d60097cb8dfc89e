//! Risk Scoring Module
//! Additive, explainable 0-100 scores for entities and districts
//!
//! Entity scores start from a base and add fixed points per factor, so every
//! score can be traced back to the factors that produced it.

use std::collections::BTreeMap;

use crate::models::{
    BehavioralPattern, DistrictMetrics, DistrictSubScores, Methodology, RiskFactors, RiskLevel,
    ScoringFactor,
};
use crate::utils::constants::{
    ACTIVITY_POINTS, ALGORITHM_NAME, ALGORITHM_VERSION, BASE_SCORE, COORDINATION_BONUS,
    HIGH_INFLUENCE_POINTS, HUB_MIN_DEGREE, MAX_SCORE, NETWORK_SIZE_POINTS, RAPID_EXPANSION_POINTS,
    WEIGHT_CASE_ACTIVITY, WEIGHT_NETWORK_DENSITY, WEIGHT_RECENT_ACTIVITY,
    WEIGHT_SUPPLIER_PRESENCE, WEIGHT_TRANSPORT_NETWORK,
};
use crate::utils::math::{clamped_round, mean, round_half_up};

/// Final entity score with its breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRiskScore {
    /// Clamped total (0-100)
    pub total: u32,
    pub factors: RiskFactors,
    /// None below the LOW floor
    pub level: Option<RiskLevel>,
}

impl EntityRiskScore {
    fn from_factors(factors: RiskFactors) -> Self {
        let total = factors.raw_total().min(MAX_SCORE);
        Self {
            total,
            factors,
            level: RiskLevel::from_score(total),
        }
    }
}

/// Builder for entity scores
pub struct EntityScoreBuilder {
    factors: RiskFactors,
}

impl EntityScoreBuilder {
    pub fn new() -> Self {
        Self {
            factors: RiskFactors {
                base_score: BASE_SCORE,
                ..Default::default()
            },
        }
    }

    /// Pattern bonus: rapid expansion or hub influence
    pub fn with_pattern(mut self, pattern: BehavioralPattern) -> Self {
        match pattern {
            BehavioralPattern::RapidNetworkExpansion => {
                self.factors.rapid_expansion_points = RAPID_EXPANSION_POINTS;
            }
            BehavioralPattern::HighInfluenceHub => {
                self.factors.high_influence_points = HIGH_INFLUENCE_POINTS;
            }
            _ => {}
        }
        self
    }

    /// Large networks score regardless of pattern (stacks with influence)
    pub fn with_network_size(mut self, degree: usize) -> Self {
        if degree >= HUB_MIN_DEGREE {
            self.factors.network_size_points = NETWORK_SIZE_POINTS;
        }
        self
    }

    pub fn with_recent_activity(mut self, recent_activities: usize, threshold: usize) -> Self {
        if recent_activities >= threshold {
            self.factors.activity_points = ACTIVITY_POINTS;
        }
        self
    }

    /// Hubs still forming new ties get the coordination bonus
    pub fn with_coordination(mut self, pattern: BehavioralPattern, new_relationships: usize) -> Self {
        if pattern == BehavioralPattern::HighInfluenceHub && new_relationships >= 1 {
            self.factors.coordination_bonus = COORDINATION_BONUS;
        }
        self
    }

    pub fn build(self) -> EntityRiskScore {
        EntityRiskScore::from_factors(self.factors)
    }
}

impl Default for EntityScoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Inputs the entity scorer reads
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub pattern: BehavioralPattern,
    pub degree: usize,
    pub recent_activities: usize,
    pub new_relationships_90d: usize,
}

pub fn score_entity(inputs: &ScoreInputs, activity_threshold: usize) -> EntityRiskScore {
    EntityScoreBuilder::new()
        .with_pattern(inputs.pattern)
        .with_network_size(inputs.degree)
        .with_recent_activity(inputs.recent_activities, activity_threshold)
        .with_coordination(inputs.pattern, inputs.new_relationships_90d)
        .build()
}

// ============================================
// District scoring
// ============================================

/// Five sub-scores, each clamped to [0,100] before the overall mean
pub fn score_district(metrics: &DistrictMetrics) -> DistrictSubScores {
    let sub = |count: usize, weight: f64| clamped_round(count as f64 * weight, MAX_SCORE);

    let case_activity = sub(metrics.total_cases, WEIGHT_CASE_ACTIVITY);
    let recent_activity = sub(metrics.recent_cases, WEIGHT_RECENT_ACTIVITY);
    let supplier_presence = sub(metrics.suppliers, WEIGHT_SUPPLIER_PRESENCE);
    let transport_network = sub(metrics.transporters, WEIGHT_TRANSPORT_NETWORK);
    let network_density = sub(metrics.total_entities, WEIGHT_NETWORK_DENSITY);

    let overall = mean(&[
        case_activity as f64,
        recent_activity as f64,
        supplier_presence as f64,
        transport_network as f64,
        network_density as f64,
    ]);

    DistrictSubScores {
        overall: round_half_up(overall).clamp(0, MAX_SCORE as i64) as u32,
        case_activity,
        recent_activity,
        supplier_presence,
        transport_network,
        network_density,
    }
}

// ============================================
// Methodology descriptor
// ============================================

pub fn methodology(activity_threshold: usize, rapid_expansion_threshold: usize) -> Methodology {
    let factor = |factor: &str, weight: u32, criteria: String, rationale: &str| ScoringFactor {
        factor: factor.to_string(),
        weight,
        criteria,
        rationale: rationale.to_string(),
    };

    let scoring_factors = vec![
        factor(
            "Rapid Network Expansion",
            RAPID_EXPANSION_POINTS,
            format!(
                "Degree between 4 and 7, or at least {} new relationships in 90 days",
                rapid_expansion_threshold
            ),
            "Fast-growing networks indicate expanding operations",
        ),
        factor(
            "High Influence Hub",
            HIGH_INFLUENCE_POINTS,
            "Degree of 8 or more with average connection strength of 4.0 or more".to_string(),
            "Central, strongly tied entities coordinate network activity",
        ),
        factor(
            "Network Size",
            NETWORK_SIZE_POINTS,
            "Degree of 8 or more".to_string(),
            "Large networks extend operational reach",
        ),
        factor(
            "Recent Activity",
            ACTIVITY_POINTS,
            format!("At least {} linked cases in the last 30 days", activity_threshold),
            "Current activity signals ongoing involvement",
        ),
        factor(
            "Coordination Bonus",
            COORDINATION_BONUS,
            "High influence hub that formed a new relationship in 90 days".to_string(),
            "Hubs still recruiting are actively coordinating",
        ),
    ];

    let risk_classifications = BTreeMap::from([
        ("CRITICAL".to_string(), "85-100".to_string()),
        ("HIGH".to_string(), "70-84".to_string()),
        ("MEDIUM".to_string(), "50-69".to_string()),
        ("LOW".to_string(), "35-49".to_string()),
    ]);

    Methodology {
        algorithm_name: ALGORITHM_NAME.to_string(),
        version: ALGORITHM_VERSION.to_string(),
        base_score: BASE_SCORE,
        max_score: MAX_SCORE,
        scoring_factors,
        risk_classifications,
    }
}
