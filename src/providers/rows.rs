//! Raw row decoding
//!
//! Sources deliver loosely typed JSON: ids may be numbers or strings and
//! timestamps come in several shapes. Rows missing required fields are
//! skipped and counted rather than failing the run.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::{CaseRecord, District, Entity, EntityType, Relationship};

/// Decoded records plus the number of rows that were skipped
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub malformed: usize,
}

fn parse_rows<T>(rows: &[Value], parse: fn(&Value) -> Option<T>) -> Parsed<T> {
    let mut records = Vec::with_capacity(rows.len());
    let mut malformed = 0;
    for row in rows {
        match parse(row) {
            Some(record) => records.push(record),
            None => malformed += 1,
        }
    }
    Parsed { records, malformed }
}

// ============================================
// Field helpers
// ============================================

/// First present key as a non-empty string; numbers are stringified
fn id_field(row: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn text_field(row: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn number_field(row: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// RFC 3339, naive date-time (taken as UTC), or a bare `YYYY-MM-DD`
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

fn timestamp_field(row: &Value, key: &str) -> Option<DateTime<Utc>> {
    row.get(key).and_then(Value::as_str).and_then(parse_timestamp)
}

// ============================================
// Per-collection decoders
// ============================================

fn entity(row: &Value) -> Option<Entity> {
    Some(Entity {
        id: id_field(row, &["id", "entity_id"])?,
        name: text_field(row, &["name"])?,
        entity_type: EntityType::parse(&text_field(row, &["entity_type", "type"])?),
        district_id: id_field(row, &["district_id"]),
        district_name: text_field(row, &["district_name", "district"]),
        created_at: timestamp_field(row, "created_at"),
        updated_at: timestamp_field(row, "updated_at"),
    })
}

fn relationship(row: &Value) -> Option<Relationship> {
    let strength = number_field(row, &["connection_strength", "strength"])?;
    if strength.fract() != 0.0 || !(1.0..=5.0).contains(&strength) {
        return None;
    }
    Some(Relationship {
        id: id_field(row, &["id"]),
        source_entity_id: id_field(row, &["source_entity_id"])?,
        target_entity_id: id_field(row, &["target_entity_id"])?,
        relationship_type: text_field(row, &["relationship_type"]).unwrap_or_default(),
        connection_strength: strength as u8,
        date_established: timestamp_field(row, "date_established"),
        last_activity: timestamp_field(row, "last_activity"),
    })
}

fn case(row: &Value) -> Option<CaseRecord> {
    let district_id = id_field(row, &["district_id"]);
    let entity_id = id_field(row, &["entity_id"]);
    if district_id.is_none() && entity_id.is_none() {
        return None;
    }
    Some(CaseRecord {
        id: id_field(row, &["id"])?,
        district_id,
        entity_id,
        created_at: timestamp_field(row, "created_at"),
    })
}

fn district(row: &Value) -> Option<District> {
    Some(District {
        id: id_field(row, &["id"])?,
        name: text_field(row, &["name"])?,
        state: text_field(row, &["state"]),
        latitude: number_field(row, &["latitude", "lat"]),
        longitude: number_field(row, &["longitude", "lon", "lng"]),
    })
}

pub fn parse_entities(rows: &[Value]) -> Parsed<Entity> {
    parse_rows(rows, entity)
}

pub fn parse_relationships(rows: &[Value]) -> Parsed<Relationship> {
    parse_rows(rows, relationship)
}

pub fn parse_cases(rows: &[Value]) -> Parsed<CaseRecord> {
    parse_rows(rows, case)
}

pub fn parse_districts(rows: &[Value]) -> Parsed<District> {
    parse_rows(rows, district)
}
