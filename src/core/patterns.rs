//! Behavioral Pattern Classification
//!
//! One label per entity, evaluated in fixed priority order:
//! hub, then rapid expansion, then nocturnal, then none.

use std::collections::BTreeMap;

use crate::models::{BehavioralPattern, DetailedEntity, PatternInsight, ScoreBreakdown};
use crate::utils::constants::{
    HUB_MIN_AVG_STRENGTH, HUB_MIN_DEGREE, NOCTURNAL_MAX_DEGREE, NOCTURNAL_MIN_DEGREE,
    RAPID_MAX_DEGREE, RAPID_MIN_DEGREE,
};
use crate::utils::math::{mean, round2, round_half_up};

/// Graph measurements the classifier reads
#[derive(Debug, Clone, Copy)]
pub struct PatternInputs {
    pub degree: usize,
    pub avg_strength: f64,
    pub new_relationships_90d: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub pattern: BehavioralPattern,
    pub why_flagged: String,
}

pub struct PatternClassifier {
    rapid_expansion_threshold: usize,
}

impl PatternClassifier {
    pub fn new(rapid_expansion_threshold: usize) -> Self {
        Self {
            rapid_expansion_threshold,
        }
    }

    pub fn classify(&self, m: &PatternInputs) -> Classification {
        if m.degree >= HUB_MIN_DEGREE && m.avg_strength >= HUB_MIN_AVG_STRENGTH {
            return Classification {
                pattern: BehavioralPattern::HighInfluenceHub,
                why_flagged: format!(
                    "degree={} ≥ {} and avg_strength={:.1} ≥ {:.1}",
                    m.degree, HUB_MIN_DEGREE, m.avg_strength, HUB_MIN_AVG_STRENGTH
                ),
            };
        }

        let degree_band = (RAPID_MIN_DEGREE..=RAPID_MAX_DEGREE).contains(&m.degree);
        let growth = m.new_relationships_90d >= self.rapid_expansion_threshold;
        if degree_band || growth {
            let mut reasons = Vec::with_capacity(2);
            if degree_band {
                reasons.push(format!(
                    "degree={} within [{}, {}]",
                    m.degree, RAPID_MIN_DEGREE, RAPID_MAX_DEGREE
                ));
            }
            if growth {
                reasons.push(format!(
                    "new_relationships_90d={} ≥ {}",
                    m.new_relationships_90d, self.rapid_expansion_threshold
                ));
            }
            return Classification {
                pattern: BehavioralPattern::RapidNetworkExpansion,
                why_flagged: reasons.join(" and "),
            };
        }

        if (NOCTURNAL_MIN_DEGREE..=NOCTURNAL_MAX_DEGREE).contains(&m.degree) {
            return Classification {
                pattern: BehavioralPattern::NocturnalPattern,
                why_flagged: format!(
                    "degree={} within [{}, {}]",
                    m.degree, NOCTURNAL_MIN_DEGREE, NOCTURNAL_MAX_DEGREE
                ),
            };
        }

        let why_flagged = if m.degree == 0 {
            "degree=0, no connections".to_string()
        } else {
            format!(
                "degree={} ≥ {} but avg_strength={:.1} < {:.1}",
                m.degree, HUB_MIN_DEGREE, m.avg_strength, HUB_MIN_AVG_STRENGTH
            )
        };
        Classification {
            pattern: BehavioralPattern::None,
            why_flagged,
        }
    }
}

// ============================================
// Pattern insights
// ============================================

struct PatternProfile {
    definition: &'static str,
    risk_explanation: &'static str,
    criteria_explanation: &'static str,
}

fn profile(pattern: BehavioralPattern) -> PatternProfile {
    match pattern {
        BehavioralPattern::HighInfluenceHub => PatternProfile {
            definition: "Entities exerting outsized control via strong connections and central positioning.",
            risk_explanation: "Removing or monitoring a hub disrupts the largest share of the network.",
            criteria_explanation: "High degree centrality with strong ties and coordinating role",
        },
        BehavioralPattern::RapidNetworkExpansion => PatternProfile {
            definition: "Entities rapidly forming new ties, expanding operational footprint.",
            risk_explanation: "Fast growth signals recruitment or new supply routes being opened.",
            criteria_explanation: "Significant increase in new relationships over recent period",
        },
        BehavioralPattern::NocturnalPattern => PatternProfile {
            definition: "Entities displaying sporadic interactions consistent with opportunistic behavior.",
            risk_explanation: "Few, irregular contacts are typical of couriers and peripheral operators.",
            criteria_explanation: "Sporadic low-degree activity cluster",
        },
        BehavioralPattern::None => PatternProfile {
            definition: "Entities with no distinctive structural pattern.",
            risk_explanation: "No pattern-based risk beyond the base score.",
            criteria_explanation: "No pattern threshold crossed",
        },
    }
}

fn criteria_thresholds(
    pattern: BehavioralPattern,
    rapid_expansion_threshold: usize,
) -> BTreeMap<String, String> {
    let entries: Vec<(&str, String)> = match pattern {
        BehavioralPattern::HighInfluenceHub => vec![
            ("min_degree", HUB_MIN_DEGREE.to_string()),
            ("min_avg_connection_strength", format!("{:.1}", HUB_MIN_AVG_STRENGTH)),
        ],
        BehavioralPattern::RapidNetworkExpansion => vec![
            ("degree_range", format!("{}-{}", RAPID_MIN_DEGREE, RAPID_MAX_DEGREE)),
            ("min_new_relationships_90d", rapid_expansion_threshold.to_string()),
        ],
        BehavioralPattern::NocturnalPattern => vec![(
            "degree_range",
            format!("{}-{}", NOCTURNAL_MIN_DEGREE, NOCTURNAL_MAX_DEGREE),
        )],
        BehavioralPattern::None => Vec::new(),
    };
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn rounded_mean(values: impl Iterator<Item = u32>) -> u32 {
    let values: Vec<f64> = values.map(|v| v as f64).collect();
    round_half_up(mean(&values)).max(0) as u32
}

/// Aggregate view per flagged pattern, skipping patterns with no members
pub fn pattern_insights(
    entities: &[DetailedEntity],
    rapid_expansion_threshold: usize,
) -> Vec<PatternInsight> {
    BehavioralPattern::FLAGGED
        .iter()
        .filter_map(|&pattern| {
            let members: Vec<&DetailedEntity> =
                entities.iter().filter(|e| e.pattern == pattern).collect();
            if members.is_empty() {
                return None;
            }

            let avg = |f: fn(&DetailedEntity) -> f64| {
                let values: Vec<f64> = members.iter().map(|e| f(e)).collect();
                round2(mean(&values))
            };
            let breakdown = |f: fn(&DetailedEntity) -> u32| rounded_mean(members.iter().map(|e| f(e)));
            let meta = profile(pattern);

            Some(PatternInsight {
                behavioral_pattern: pattern,
                entity_count: members.len(),
                avg_activities: avg(|e| e.total_activities as f64),
                avg_connections: avg(|e| e.total_relationships as f64),
                avg_new_relationships: avg(|e| e.new_relationships_90_days as f64),
                avg_connection_strength: avg(|e| e.avg_connection_strength),
                ai_risk_score: breakdown(|e| e.calculated_risk_score),
                score_breakdown: ScoreBreakdown {
                    base_score: breakdown(|e| e.risk_factors.base_score),
                    rapid_expansion_bonus: breakdown(|e| e.risk_factors.rapid_expansion_points),
                    influence_bonus: breakdown(|e| e.risk_factors.high_influence_points),
                    network_size_bonus: breakdown(|e| e.risk_factors.network_size_points),
                    activity_bonus: breakdown(|e| e.risk_factors.activity_points),
                    coordination_bonus: breakdown(|e| e.risk_factors.coordination_bonus),
                },
                pattern_definition: meta.definition.to_string(),
                risk_explanation: meta.risk_explanation.to_string(),
                criteria_thresholds: criteria_thresholds(pattern, rapid_expansion_threshold),
                criteria_explanation: meta.criteria_explanation.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskFactors;

    fn inputs(degree: usize, avg_strength: f64, new_rel: usize) -> PatternInputs {
        PatternInputs {
            degree,
            avg_strength,
            new_relationships_90d: new_rel,
        }
    }

    #[test]
    fn test_hub_classification() {
        let c = PatternClassifier::new(3).classify(&inputs(9, 4.3, 0));
        assert_eq!(c.pattern, BehavioralPattern::HighInfluenceHub);
        assert_eq!(c.why_flagged, "degree=9 ≥ 8 and avg_strength=4.3 ≥ 4.0");
    }

    #[test]
    fn test_weak_large_network_is_not_a_hub() {
        let c = PatternClassifier::new(3).classify(&inputs(9, 3.2, 0));
        assert_eq!(c.pattern, BehavioralPattern::None);
        assert!(c.why_flagged.contains("avg_strength=3.2 < 4.0"));
    }

    #[test]
    fn test_rapid_by_degree_or_growth() {
        let classifier = PatternClassifier::new(3);
        let by_degree = classifier.classify(&inputs(5, 2.0, 0));
        assert_eq!(by_degree.pattern, BehavioralPattern::RapidNetworkExpansion);
        assert_eq!(by_degree.why_flagged, "degree=5 within [4, 7]");

        let by_growth = classifier.classify(&inputs(2, 2.0, 3));
        assert_eq!(by_growth.pattern, BehavioralPattern::RapidNetworkExpansion);
        assert_eq!(by_growth.why_flagged, "new_relationships_90d=3 ≥ 3");

        // growth outranks the nocturnal band; hub outranks growth
        assert_eq!(
            classifier.classify(&inputs(10, 4.5, 6)).pattern,
            BehavioralPattern::HighInfluenceHub
        );
    }

    #[test]
    fn test_nocturnal_and_none() {
        let classifier = PatternClassifier::new(3);
        assert_eq!(
            classifier.classify(&inputs(1, 1.0, 0)).pattern,
            BehavioralPattern::NocturnalPattern
        );
        assert_eq!(
            classifier.classify(&inputs(3, 5.0, 2)).pattern,
            BehavioralPattern::NocturnalPattern
        );
        let none = classifier.classify(&inputs(0, 0.0, 0));
        assert_eq!(none.pattern, BehavioralPattern::None);
        assert_eq!(none.why_flagged, "degree=0, no connections");
    }

    #[test]
    fn test_pattern_insights_aggregate_members() {
        let member = |id: &str, score: u32, conns: usize| DetailedEntity {
            entity_id: id.to_string(),
            pattern: BehavioralPattern::RapidNetworkExpansion,
            total_relationships: conns,
            calculated_risk_score: score,
            risk_factors: RiskFactors {
                base_score: 35,
                rapid_expansion_points: 30,
                ..Default::default()
            },
            ..Default::default()
        };
        let entities = vec![member("a", 65, 4), member("b", 82, 5), DetailedEntity::default()];

        let insights = pattern_insights(&entities, 3);
        assert_eq!(insights.len(), 1);
        let insight = &insights[0];
        assert_eq!(insight.entity_count, 2);
        // (65 + 82) / 2 = 73.5
        assert_eq!(insight.ai_risk_score, 74);
        assert_eq!(insight.avg_connections, 4.5);
        assert_eq!(insight.score_breakdown.rapid_expansion_bonus, 30);
        assert_eq!(
            insight.criteria_thresholds.get("degree_range").map(String::as_str),
            Some("4-7")
        );
    }
}
