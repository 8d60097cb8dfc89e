//! API Request/Response Types

use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{AppError, Collection, DetailedEntity, ErrorCode};
use crate::utils::telemetry::TelemetryStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Error half of every handler result
pub type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<Collection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: ErrorCode::ApiRateLimited.as_str().to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            collection: None,
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }

    /// Pair the error with the status its code maps to
    pub fn into_failure(err: &AppError, latency_ms: f64) -> ApiFailure {
        let status = StatusCode::from_u16(err.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ApiResponse::error(Self::from(err), latency_ms)))
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            collection: err.collection,
            details: None,
        }
    }
}

// ============================================
// Queries
// ============================================

#[derive(Debug, Default, Deserialize)]
pub struct EntityQuery {
    /// One of the behavioral pattern labels, e.g. HIGH_INFLUENCE_HUB
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub min_score: Option<u32>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DistrictQuery {
    /// Comma-separated district names
    #[serde(default)]
    pub districts: Option<String>,
}

impl DistrictQuery {
    pub fn requested(&self) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .districts
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

// ============================================
// Ad-hoc Analysis
// ============================================

/// Raw collections for a one-off run; an omitted collection counts as
/// unavailable
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub entities: Option<Vec<Value>>,
    #[serde(default)]
    pub relationships: Option<Vec<Value>>,
    #[serde(default)]
    pub cases: Option<Vec<Value>>,
    #[serde(default)]
    pub districts: Option<Vec<Value>>,
    /// Reference time; defaults to the server clock
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    #[serde(default)]
    pub district_filter: Option<Vec<String>>,
}

// ============================================
// Responses
// ============================================

#[derive(Debug, Serialize)]
pub struct EntitiesData {
    pub total: usize,
    pub entities: Vec<DetailedEntity>,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub telemetry: TelemetryStats,
    pub uptime_seconds: u64,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub service: String,
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
