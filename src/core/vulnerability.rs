//! Network Vulnerability Analysis
//!
//! Ranks the most connected nodes as disruption targets and buckets
//! relationships by communication intensity.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::core::temporal::days_between;
use crate::models::{
    CommunicationPatterns, CommunicationSummary, CriticalNode, DetailedEntity, FrequencyBucket,
    NetworkVulnerabilities, Relationship, TypeAssessment,
};
use crate::utils::constants::{
    CRITICALITY_PER_EDGE, CRITICAL_NODE_LIMIT, HIGH_CRITICALITY, HUB_MIN_DEGREE, MAX_SCORE,
    MEDIUM_TIE, NEW_RELATIONSHIP_WINDOW_DAYS, RAPID_MIN_DEGREE, STRONG_TIE,
};
use crate::utils::math::{mean, round2};

fn disruption_impact(degree: usize) -> &'static str {
    if degree >= HUB_MIN_DEGREE {
        "Severe"
    } else if degree >= RAPID_MIN_DEGREE {
        "Moderate"
    } else {
        "Low"
    }
}

fn criticality(degree: usize) -> u32 {
    (degree as u32).saturating_mul(CRITICALITY_PER_EDGE).min(MAX_SCORE)
}

/// Connected entities ranked by degree (ties by id), with a per-type summary
pub fn network_vulnerabilities(entities: &[DetailedEntity]) -> NetworkVulnerabilities {
    let mut ranked: Vec<&DetailedEntity> = entities
        .iter()
        .filter(|e| e.total_relationships > 0)
        .collect();
    ranked.sort_by(|a, b| {
        b.total_relationships
            .cmp(&a.total_relationships)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    ranked.truncate(CRITICAL_NODE_LIMIT);

    let critical_nodes: Vec<CriticalNode> = ranked
        .iter()
        .map(|e| CriticalNode {
            id: e.entity_id.clone(),
            name: e.name.clone(),
            entity_type: e.entity_type.clone(),
            district: e.district.clone(),
            total_connections: e.total_relationships,
            criticality_score: criticality(e.total_relationships),
            disruption_impact: disruption_impact(e.total_relationships).to_string(),
        })
        .collect();

    let mut by_type: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for node in &critical_nodes {
        by_type
            .entry(node.entity_type.as_str())
            .or_default()
            .push(node.criticality_score);
    }

    let vulnerability_assessment = by_type
        .into_iter()
        .map(|(entity_type, scores)| {
            let values: Vec<f64> = scores.iter().map(|&s| s as f64).collect();
            TypeAssessment {
                entity_type: entity_type.to_string(),
                node_count: scores.len(),
                high_criticality_nodes: scores.iter().filter(|&&s| s >= HIGH_CRITICALITY).count(),
                avg_criticality: round2(mean(&values)),
            }
        })
        .collect();

    NetworkVulnerabilities {
        critical_nodes,
        vulnerability_assessment,
    }
}

/// Strength buckets over scoped relationships. A relationship is dormant when
/// its last activity is older than 90 days.
pub fn communication_patterns(edges: &[&Relationship], now: DateTime<Utc>) -> CommunicationPatterns {
    let mut high = 0;
    let mut medium = 0;
    let mut low = 0;
    let mut dormant = 0;

    for edge in edges {
        match edge.connection_strength {
            s if s >= STRONG_TIE => high += 1,
            s if s >= MEDIUM_TIE => medium += 1,
            _ => low += 1,
        }
        let is_dormant = edge
            .last_activity
            .map(|t| days_between(now, t) > NEW_RELATIONSHIP_WINDOW_DAYS)
            .unwrap_or(false);
        if is_dormant {
            dormant += 1;
        }
    }

    let bucket = |label: &str, count: usize| FrequencyBucket {
        communication_frequency: label.to_string(),
        relationship_count: count,
    };

    CommunicationPatterns {
        communication_patterns: vec![bucket("High", high), bucket("Medium", medium), bucket("Low", low)],
        pattern_summary: CommunicationSummary {
            total_active_relationships: edges.len() - dormant,
            high_frequency_communications: high,
            dormant_relationships: dormant,
        },
    }
}
