//! Graph Index Module
//!
//! Degree, incident connection strengths and 90-day relationship growth per
//! entity, built in one pass over the scoped edge list.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::core::temporal::within_days;
use crate::models::Relationship;
use crate::utils::constants::NEW_RELATIONSHIP_WINDOW_DAYS;
use crate::utils::math::mean;

/// Edges whose endpoints are both in scope
pub fn scope_relationships<'a>(
    in_scope: &HashSet<&str>,
    relationships: &'a [Relationship],
) -> Vec<&'a Relationship> {
    relationships
        .iter()
        .filter(|r| {
            in_scope.contains(r.source_entity_id.as_str())
                && in_scope.contains(r.target_entity_id.as_str())
        })
        .collect()
}

/// Graph metrics for one entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMetrics {
    /// Incident edge count; multi-edges each count
    pub degree: usize,
    /// Incident connection_strength values
    pub strengths: Vec<u8>,
    /// Incident edges established within the last 90 days
    pub new_relationships_90d: usize,
}

impl NodeMetrics {
    pub fn avg_strength(&self) -> f64 {
        let values: Vec<f64> = self.strengths.iter().map(|&s| s as f64).collect();
        mean(&values)
    }
}

/// Per-entity graph metrics over the scoped multigraph
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    nodes: HashMap<String, NodeMetrics>,
    edge_count: usize,
}

impl GraphIndex {
    pub fn build(edges: &[&Relationship], now: DateTime<Utc>) -> Self {
        let mut nodes: HashMap<String, NodeMetrics> = HashMap::new();

        for edge in edges {
            let is_new = within_days(now, edge.date_established, NEW_RELATIONSHIP_WINDOW_DAYS);
            for endpoint in [&edge.source_entity_id, &edge.target_entity_id] {
                let node = nodes.entry(endpoint.clone()).or_default();
                node.degree += 1;
                node.strengths.push(edge.connection_strength);
                if is_new {
                    node.new_relationships_90d += 1;
                }
            }
        }

        Self {
            nodes,
            edge_count: edges.len(),
        }
    }

    /// Metrics for an entity; isolated entities get zeroes
    pub fn metrics(&self, entity_id: &str) -> NodeMetrics {
        self.nodes.get(entity_id).cloned().unwrap_or_default()
    }

    pub fn degree(&self, entity_id: &str) -> usize {
        self.nodes.get(entity_id).map(|n| n.degree).unwrap_or(0)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
