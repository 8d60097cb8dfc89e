//! Export Module
//!
//! Full bundle as pretty JSON, or the entity table as CSV.

use std::str::FromStr;

use crate::models::{AnalysisBundle, AppError, AppResult, DetailedEntity};

/// Fixed CSV column order
pub const CSV_HEADERS: [&str; 12] = [
    "Entity ID",
    "Name",
    "Type",
    "District",
    "Pattern",
    "Risk Score",
    "Total Activities",
    "Recent Activities",
    "Total Relationships",
    "New Relationships (90d)",
    "Avg Connection Strength",
    "Why Flagged",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(AppError::unsupported_format(other)),
        }
    }
}

/// Wrap in quotes, doubling embedded quotes
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_row(entity: &DetailedEntity) -> String {
    [
        entity.entity_id.clone(),
        quoted(&entity.name),
        entity.entity_type.clone(),
        entity.district.clone(),
        entity.pattern.as_str().to_string(),
        entity.calculated_risk_score.to_string(),
        entity.total_activities.to_string(),
        entity.recent_activities.to_string(),
        entity.total_relationships.to_string(),
        entity.new_relationships_90_days.to_string(),
        entity.avg_connection_strength.to_string(),
        quoted(&entity.why_flagged),
    ]
    .join(",")
}

/// Header plus one line per entity; an empty list yields the header only
pub fn entities_to_csv(entities: &[DetailedEntity]) -> String {
    std::iter::once(CSV_HEADERS.join(","))
        .chain(entities.iter().map(csv_row))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn export(bundle: &AnalysisBundle, format: ExportFormat) -> AppResult<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(bundle)?),
        ExportFormat::Csv => Ok(entities_to_csv(&bundle.detailed_entities)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BehavioralPattern;

    fn entity() -> DetailedEntity {
        DetailedEntity {
            entity_id: "42".to_string(),
            name: "Ravi \"The Driver\" K".to_string(),
            entity_type: "transporter".to_string(),
            district: "Mysore".to_string(),
            pattern: BehavioralPattern::RapidNetworkExpansion,
            total_relationships: 5,
            avg_connection_strength: 2.0,
            calculated_risk_score: 65,
            why_flagged: "degree=5 within [4, 7]".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_csv_header_only_when_empty() {
        let csv = entities_to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
        assert_eq!(csv.split(',').count(), 12);
    }

    #[test]
    fn test_csv_row_quoting() {
        let csv = entities_to_csv(&[entity()]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "42,\"Ravi \"\"The Driver\"\" K\",transporter,Mysore,RAPID_NETWORK_EXPANSION,65,0,0,5,0,2,\"degree=5 within [4, 7]\""
        );
    }

    #[test]
    fn test_unsupported_format() {
        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.code_str(), "EXPORT_UNSUPPORTED_FORMAT");
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    }

    #[test]
    fn test_json_export_round_trips() {
        let bundle = AnalysisBundle {
            detailed_entities: vec![entity()],
            ..Default::default()
        };
        let json = export(&bundle, ExportFormat::Json).unwrap();
        let parsed: AnalysisBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, bundle);
    }
}
