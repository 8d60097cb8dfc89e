//! District Aggregation Module
//!
//! Canonical district table with alias normalization, district scoping and
//! the per-district risk aggregation.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::core::risk_score::score_district;
use crate::core::temporal::WindowCounts;
use crate::models::{
    AppError, AppResult, CaseRecord, District, DistrictMetrics, DistrictRisk, DistrictRiskLevel,
    DistrictRiskReport, DistrictRiskSummary, Entity, EntityType,
};
use crate::utils::constants::{
    CanonicalDistrict, ACCEPTED_STATE, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, KARNATAKA_DISTRICTS,
};
use crate::utils::math::{mean, round_half_up};

/// Id namespace for requested districts that have no source record
const ZERO_FILLED_ID_PREFIX: &str = "requested:";

/// Lowercase, trim, hyphen/underscore to space, collapse whitespace
pub fn normalize_name(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================
// Canonical table
// ============================================

/// Alias lookup over the canonical district list
#[derive(Debug, Clone)]
pub struct DistrictTable {
    entries: &'static [CanonicalDistrict],
    lookup: HashMap<String, usize>,
}

impl DistrictTable {
    /// Built-in Karnataka table
    pub fn builtin() -> AppResult<Self> {
        Self::from_entries(KARNATAKA_DISTRICTS)
    }

    /// Build a table, rejecting any spelling that maps to two districts
    pub fn from_entries(entries: &'static [CanonicalDistrict]) -> AppResult<Self> {
        let mut lookup = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            let spellings = std::iter::once(entry.name).chain(entry.aliases.iter().copied());
            for spelling in spellings {
                let key = normalize_name(spelling);
                match lookup.insert(key.clone(), idx) {
                    Some(existing) if existing != idx => {
                        return Err(AppError::duplicate_alias(&key));
                    }
                    _ => {}
                }
            }
        }
        Ok(Self { entries, lookup })
    }

    /// Canonical entry for any accepted spelling
    pub fn canonical(&self, name: &str) -> Option<&'static CanonicalDistrict> {
        let entries = self.entries;
        self.lookup.get(&normalize_name(name)).map(|&idx| &entries[idx])
    }

    /// Dedup key: the canonical name when known, else the normalized name
    pub fn key_for(&self, name: &str) -> String {
        self.canonical(name)
            .map(|c| normalize_name(c.name))
            .unwrap_or_else(|| normalize_name(name))
    }

    /// A district record is accepted by name or by an explicit state
    pub fn accepts(&self, district: &District) -> bool {
        self.canonical(&district.name).is_some()
            || district
                .state
                .as_deref()
                .map(|s| normalize_name(s) == ACCEPTED_STATE)
                .unwrap_or(false)
    }
}

/// Accepted districts, de-duplicated by canonical key (first occurrence wins)
pub fn filter_districts(table: &DistrictTable, districts: &[District]) -> Vec<District> {
    let mut seen = std::collections::HashSet::new();
    districts
        .iter()
        .filter(|d| table.accepts(d))
        .filter(|d| seen.insert(table.key_for(&d.name)))
        .cloned()
        .collect()
}

// ============================================
// Scope
// ============================================

/// A district that survived filtering and de-duplication
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedDistrict {
    pub id: String,
    pub name: String,
    pub key: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Where an entity lands after district resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityPlacement {
    /// Index into the scope's district list
    District(usize),
    /// No district reference at all
    Unassigned,
    /// References a district outside the scope
    OutOfScope,
}

/// Accepted districts plus id/name lookups, including aliased duplicate ids
#[derive(Debug, Clone, Default)]
pub struct DistrictScope {
    districts: Vec<ScopedDistrict>,
    by_id: HashMap<String, usize>,
    by_key: HashMap<String, usize>,
    /// Districts reported in the district product, in request order
    reported: Vec<usize>,
    /// Whether any district records were supplied to resolve against
    resolvable: bool,
}

impl DistrictScope {
    /// Scope the districts collection. `requested` limits (and zero-fills)
    /// the reported districts; returns names that could not be recognized.
    pub fn build(
        table: &DistrictTable,
        districts: &[District],
        requested: Option<&[String]>,
    ) -> (Self, Vec<String>) {
        let mut scope = Self {
            resolvable: !districts.is_empty(),
            ..Self::default()
        };

        for district in districts.iter().filter(|d| table.accepts(d)) {
            let key = table.key_for(&district.name);
            if let Some(&existing) = scope.by_key.get(&key) {
                debug!(
                    "District {} ({}) aliased to {}",
                    district.name, district.id, scope.districts[existing].name
                );
                scope.by_id.entry(district.id.clone()).or_insert(existing);
                continue;
            }

            let canonical = table.canonical(&district.name);
            let idx = scope.push(ScopedDistrict {
                id: district.id.clone(),
                name: district.name.trim().to_string(),
                key,
                latitude: district
                    .latitude
                    .or(canonical.map(|c| c.latitude))
                    .unwrap_or(DEFAULT_LATITUDE),
                longitude: district
                    .longitude
                    .or(canonical.map(|c| c.longitude))
                    .unwrap_or(DEFAULT_LONGITUDE),
            });
            scope.by_id.insert(district.id.clone(), idx);
        }

        let mut unrecognized = Vec::new();
        match requested {
            None => scope.reported = (0..scope.districts.len()).collect(),
            Some(names) => {
                for name in names {
                    let key = table.key_for(name);
                    let idx = match scope.by_key.get(&key) {
                        Some(&idx) => idx,
                        None => match table.canonical(name) {
                            Some(canonical) => {
                                // zero-filled: requested but absent from the data.
                                // Not registered in by_id so it never shadows a source id.
                                scope.push(ScopedDistrict {
                                    id: format!("{}{}", ZERO_FILLED_ID_PREFIX, key),
                                    name: canonical.name.to_string(),
                                    key,
                                    latitude: canonical.latitude,
                                    longitude: canonical.longitude,
                                })
                            }
                            None => {
                                unrecognized.push(name.clone());
                                continue;
                            }
                        },
                    };
                    if !scope.reported.contains(&idx) {
                        scope.reported.push(idx);
                    }
                }
            }
        }

        (scope, unrecognized)
    }

    fn push(&mut self, district: ScopedDistrict) -> usize {
        let idx = self.districts.len();
        self.by_key.insert(district.key.clone(), idx);
        self.districts.push(district);
        idx
    }

    pub fn districts(&self) -> &[ScopedDistrict] {
        &self.districts
    }

    pub fn get(&self, idx: usize) -> Option<&ScopedDistrict> {
        self.districts.get(idx)
    }

    pub fn by_id(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn by_name(&self, table: &DistrictTable, name: &str) -> Option<usize> {
        self.by_key.get(&table.key_for(name)).copied()
    }

    pub fn reported(&self) -> &[usize] {
        &self.reported
    }

    /// Resolve an entity's district reference; the id wins over the name.
    /// Without any district records nothing can be resolved, so references
    /// are treated as unassigned rather than out of scope.
    pub fn place(&self, table: &DistrictTable, entity: &Entity) -> EntityPlacement {
        if !entity.has_district_reference() || !self.resolvable {
            return EntityPlacement::Unassigned;
        }
        entity
            .district_id
            .as_deref()
            .and_then(|id| self.by_id(id))
            .or_else(|| {
                entity
                    .district_name
                    .as_deref()
                    .and_then(|name| self.by_name(table, name))
            })
            .map(EntityPlacement::District)
            .unwrap_or(EntityPlacement::OutOfScope)
    }
}

// ============================================
// Aggregation
// ============================================

#[derive(Debug, Clone, Copy, Default)]
struct DistrictTally {
    cases: WindowCounts,
    entities: usize,
    suppliers: usize,
    transporters: usize,
}

/// Per-district risk for every reported district.
/// `placed` holds in-scope entities with their resolved district index.
pub fn aggregate_districts(
    scope: &DistrictScope,
    placed: &[(&Entity, Option<usize>)],
    cases: &[CaseRecord],
    now: DateTime<Utc>,
) -> DistrictRiskReport {
    let mut tallies = vec![DistrictTally::default(); scope.districts().len()];
    let mut entity_district: HashMap<&str, usize> = HashMap::new();

    for (entity, district) in placed {
        if let Some(idx) = *district {
            entity_district.insert(entity.id.as_str(), idx);
            let tally = &mut tallies[idx];
            tally.entities += 1;
            match entity.entity_type {
                EntityType::Supplier => tally.suppliers += 1,
                EntityType::Transporter => tally.transporters += 1,
                _ => {}
            }
        }
    }

    for case in cases {
        // A case with its own district is counted there or not at all
        let idx = match case.district_id.as_deref() {
            Some(id) => scope.by_id(id),
            None => case
                .entity_id
                .as_deref()
                .and_then(|id| entity_district.get(id).copied()),
        };
        if let Some(idx) = idx {
            tallies[idx].cases.record(now, case.created_at);
        }
    }

    let mut districts: Vec<DistrictRisk> = scope
        .reported()
        .iter()
        .filter_map(|&idx| {
            let district = scope.get(idx)?;
            let tally = tallies[idx];
            let metrics = DistrictMetrics {
                total_cases: tally.cases.total,
                recent_cases: tally.cases.last_30,
                previous_cases: tally.cases.previous_30,
                total_entities: tally.entities,
                suppliers: tally.suppliers,
                transporters: tally.transporters,
            };
            let risk_scores = score_district(&metrics);
            Some(DistrictRisk {
                id: district.id.clone(),
                name: district.name.clone(),
                latitude: district.latitude,
                longitude: district.longitude,
                risk_level: DistrictRiskLevel::from_overall(risk_scores.overall),
                risk_scores,
                metrics,
                trend: tally.cases.trend(),
                activity_change_percent: tally.cases.percent_change(),
            })
        })
        .collect();

    districts.sort_by(|a, b| {
        b.risk_scores
            .overall
            .cmp(&a.risk_scores.overall)
            .then_with(|| a.name.cmp(&b.name))
    });

    DistrictRiskReport {
        summary: summarize(&districts),
        districts,
    }
}

fn summarize(districts: &[DistrictRisk]) -> DistrictRiskSummary {
    let count = |level: DistrictRiskLevel| districts.iter().filter(|d| d.risk_level == level).count();
    let overall: Vec<f64> = districts
        .iter()
        .map(|d| d.risk_scores.overall as f64)
        .collect();

    DistrictRiskSummary {
        total_districts: districts.len(),
        high_risk_districts: count(DistrictRiskLevel::High),
        medium_risk_districts: count(DistrictRiskLevel::Medium),
        low_risk_districts: count(DistrictRiskLevel::Low),
        average_risk_score: round_half_up(mean(&overall)).max(0) as u32,
    }
}
