//! Type definitions for the network risk engine
//! Input records (entities, relationships, cases, districts) and the
//! classification enums shared by every scorer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::constants::{
    ALERT_CRITICAL, ALERT_HIGH, ALERT_MEDIUM, DISTRICT_HIGH, DISTRICT_MEDIUM, RECOMMEND_CRITICAL,
    RECOMMEND_HIGH, RECOMMEND_LOW, RECOMMEND_MEDIUM, TIER_CRITICAL, TIER_HIGH, TIER_LOW,
    TIER_MEDIUM,
};

// ============================================
// Input collections
// ============================================

/// The four source collections a run is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Entities,
    Relationships,
    Cases,
    Districts,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Entities,
        Collection::Relationships,
        Collection::Cases,
        Collection::Districts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Entities => "entities",
            Collection::Relationships => "relationships",
            Collection::Cases => "cases",
            Collection::Districts => "districts",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of tracked network node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Person,
    Supplier,
    Transporter,
    StorageLocation,
    Vehicle,
    /// Unrecognized label, kept verbatim (lowercased)
    Other(String),
}

impl EntityType {
    pub fn parse(raw: &str) -> Self {
        let label = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match label.as_str() {
            "person" => Self::Person,
            "supplier" => Self::Supplier,
            "transporter" => Self::Transporter,
            "storage_location" => Self::StorageLocation,
            "vehicle" => Self::Vehicle,
            _ => Self::Other(label),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "person",
            Self::Supplier => "supplier",
            Self::Transporter => "transporter",
            Self::StorageLocation => "storage_location",
            Self::Vehicle => "vehicle",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for EntityType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<EntityType> for String {
    fn from(kind: EntityType) -> Self {
        kind.as_str().to_string()
    }
}

/// A tracked node in the network graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    #[serde(default)]
    pub district_id: Option<String>,
    #[serde(default)]
    pub district_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity {
    pub fn has_district_reference(&self) -> bool {
        self.district_id.is_some() || self.district_name.is_some()
    }
}

/// Multigraph edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: Option<String>,
    pub source_entity_id: String,
    pub target_entity_id: String,
    #[serde(default)]
    pub relationship_type: String,
    /// Intensity rating, always within 1..=5
    pub connection_strength: u8,
    #[serde(default)]
    pub date_established: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

/// Case / activity record linked to a district, an entity, or both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    #[serde(default)]
    pub district_id: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// District as delivered by the districts collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// One fetched, parsed snapshot of all source collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub cases: Vec<CaseRecord>,
    #[serde(default)]
    pub districts: Vec<District>,
}

// ============================================
// Classifications
// ============================================

/// Behavioral pattern label, one per entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehavioralPattern {
    HighInfluenceHub,
    RapidNetworkExpansion,
    NocturnalPattern,
    #[default]
    None,
}

impl BehavioralPattern {
    /// Patterns reported in pattern insights (NONE is never an insight)
    pub const FLAGGED: [BehavioralPattern; 3] = [
        BehavioralPattern::HighInfluenceHub,
        BehavioralPattern::RapidNetworkExpansion,
        BehavioralPattern::NocturnalPattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighInfluenceHub => "HIGH_INFLUENCE_HUB",
            Self::RapidNetworkExpansion => "RAPID_NETWORK_EXPANSION",
            Self::NocturnalPattern => "NOCTURNAL_PATTERN",
            Self::None => "NONE",
        }
    }

    /// Parse a pattern tag; accepts any case and spaces for underscores
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "HIGH_INFLUENCE_HUB" => Some(Self::HighInfluenceHub),
            "RAPID_NETWORK_EXPANSION" => Some(Self::RapidNetworkExpansion),
            "NOCTURNAL_PATTERN" => Some(Self::NocturnalPattern),
            "NONE" => Some(Self::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for BehavioralPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity risk tier; scores below the LOW floor carry no tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Option<Self> {
        match score {
            s if s >= TIER_CRITICAL => Some(Self::Critical),
            s if s >= TIER_HIGH => Some(Self::High),
            s if s >= TIER_MEDIUM => Some(Self::Medium),
            s if s >= TIER_LOW => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// District risk level derived from the overall district score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistrictRiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl DistrictRiskLevel {
    pub fn from_overall(overall: u32) -> Self {
        if overall >= DISTRICT_HIGH {
            Self::High
        } else if overall >= DISTRICT_MEDIUM {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Hotspot alert tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= ALERT_CRITICAL => Self::Critical,
            s if s >= ALERT_HIGH => Self::High,
            s if s >= ALERT_MEDIUM => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Critical => RECOMMEND_CRITICAL,
            Self::High => RECOMMEND_HIGH,
            Self::Medium => RECOMMEND_MEDIUM,
            Self::Low => RECOMMEND_LOW,
        }
    }
}

/// Direction of recent activity against the prior window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

/// Which path produced a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    #[default]
    Local,
    Authoritative,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_parse() {
        assert_eq!(EntityType::parse("Supplier"), EntityType::Supplier);
        assert_eq!(EntityType::parse("storage location"), EntityType::StorageLocation);
        assert_eq!(EntityType::parse("Storage-Location"), EntityType::StorageLocation);
        assert_eq!(EntityType::parse("Courier"), EntityType::Other("courier".into()));
    }

    #[test]
    fn test_risk_tiers() {
        assert_eq!(RiskLevel::from_score(97), Some(RiskLevel::Critical));
        assert_eq!(RiskLevel::from_score(85), Some(RiskLevel::Critical));
        assert_eq!(RiskLevel::from_score(84), Some(RiskLevel::High));
        assert_eq!(RiskLevel::from_score(65), Some(RiskLevel::Medium));
        assert_eq!(RiskLevel::from_score(35), Some(RiskLevel::Low));
        assert_eq!(RiskLevel::from_score(34), None);
    }

    #[test]
    fn test_alert_tiers() {
        assert_eq!(AlertLevel::from_score(85), AlertLevel::Critical);
        assert_eq!(AlertLevel::from_score(66), AlertLevel::High);
        assert_eq!(AlertLevel::from_score(65), AlertLevel::Medium);
        assert_eq!(AlertLevel::from_score(33), AlertLevel::Medium);
        assert_eq!(AlertLevel::from_score(32), AlertLevel::Low);
    }

    #[test]
    fn test_district_levels() {
        assert_eq!(DistrictRiskLevel::from_overall(22), DistrictRiskLevel::Low);
        assert_eq!(DistrictRiskLevel::from_overall(40), DistrictRiskLevel::Medium);
        assert_eq!(DistrictRiskLevel::from_overall(70), DistrictRiskLevel::High);
    }

    #[test]
    fn test_pattern_serializes_as_tag() {
        let json = serde_json::to_string(&BehavioralPattern::HighInfluenceHub).unwrap();
        assert_eq!(json, "\"HIGH_INFLUENCE_HUB\"");
        assert_eq!(
            BehavioralPattern::parse("rapid network expansion"),
            Some(BehavioralPattern::RapidNetworkExpansion)
        );
    }
}
