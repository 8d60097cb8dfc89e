//! API Request Handlers

use axum::{
    extract::{Json, Query, State},
    http::{header, Uri},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::types::*;
use crate::core::analyzer::NetworkAnalyzer;
use crate::core::export::{export, ExportFormat};
use crate::models::{
    AnalysisBundle, AppError, BehavioralPattern, Collection, DistrictRiskReport, HotspotReport,
    PatternInsight, RiskDistribution, TemporalPatterns,
};
use crate::providers::source::StaticSource;
use crate::utils::constants::{APP_NAME, APP_VERSION};

/// Shared application state
pub struct AppState {
    pub analyzer: Arc<NetworkAnalyzer>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(analyzer: Arc<NetworkAnalyzer>) -> Self {
        Self {
            analyzer,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

async fn run_analysis(
    state: &AppState,
    requested: Option<&[String]>,
    start: Instant,
) -> Result<AnalysisBundle, ApiFailure> {
    state
        .analyzer
        .analyze(Utc::now(), requested)
        .await
        .map_err(|e| ApiError::into_failure(&e, elapsed_ms(start)))
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        service: APP_NAME.to_string(),
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Full Analysis
// ============================================

pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<AnalysisBundle>>, ApiFailure> {
    let start = Instant::now();
    let bundle = run_analysis(&state, None, start).await?;
    Ok(Json(ApiResponse::success(bundle, elapsed_ms(start))))
}

/// One-off run over collections supplied in the request body
pub async fn analyze_snapshot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<AnalysisBundle>>, ApiFailure> {
    let start = Instant::now();

    let mut source = StaticSource::unavailable();
    for (collection, rows) in [
        (Collection::Entities, req.entities),
        (Collection::Relationships, req.relationships),
        (Collection::Cases, req.cases),
        (Collection::Districts, req.districts),
    ] {
        if let Some(rows) = rows {
            source = source.with_rows(collection, rows);
        }
    }

    let analyzer = state.analyzer.with_source(Arc::new(source));
    let now = req.now.unwrap_or_else(Utc::now);
    let bundle = analyzer
        .analyze(now, req.district_filter.as_deref())
        .await
        .map_err(|e| ApiError::into_failure(&e, elapsed_ms(start)))?;

    info!(
        run_id = %bundle.run_id,
        entities = bundle.detailed_entities.len(),
        "📦 Ad-hoc snapshot analyzed"
    );

    Ok(Json(ApiResponse::success(bundle, elapsed_ms(start))))
}

// ============================================
// Products
// ============================================

pub async fn get_patterns(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PatternInsight>>>, ApiFailure> {
    let start = Instant::now();
    let bundle = run_analysis(&state, None, start).await?;
    Ok(Json(ApiResponse::success(bundle.pattern_insights, elapsed_ms(start))))
}

pub async fn get_entities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EntityQuery>,
) -> Result<Json<ApiResponse<EntitiesData>>, ApiFailure> {
    let start = Instant::now();

    let pattern = match query.pattern.as_deref() {
        Some(raw) => Some(BehavioralPattern::parse(raw).ok_or_else(|| {
            let err = AppError::bad_request(format!("Unknown pattern: {}", raw));
            ApiError::into_failure(&err, elapsed_ms(start))
        })?),
        None => None,
    };

    let bundle = run_analysis(&state, None, start).await?;
    let min_score = query.min_score.unwrap_or(0);
    let candidates = match pattern {
        Some(p) => bundle.entities_by_pattern(p),
        None => bundle.detailed_entities.iter().collect(),
    };
    let mut entities: Vec<_> = candidates
        .into_iter()
        .filter(|e| e.calculated_risk_score >= min_score)
        .cloned()
        .collect();
    let total = entities.len();
    if let Some(limit) = query.limit {
        entities.truncate(limit);
    }

    Ok(Json(ApiResponse::success(
        EntitiesData { total, entities },
        elapsed_ms(start),
    )))
}

pub async fn get_district_risk(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DistrictQuery>,
) -> Result<Json<ApiResponse<DistrictRiskReport>>, ApiFailure> {
    let start = Instant::now();
    let requested = query.requested();
    let bundle = run_analysis(&state, requested.as_deref(), start).await?;

    for warning in bundle
        .warnings
        .iter()
        .filter(|w| w.collection == Some(Collection::Districts))
    {
        warn!("⚠️ {}", warning.message);
    }

    Ok(Json(ApiResponse::success(bundle.district_risk, elapsed_ms(start))))
}

pub async fn get_hotspots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HotspotReport>>, ApiFailure> {
    let start = Instant::now();
    let bundle = run_analysis(&state, None, start).await?;
    Ok(Json(ApiResponse::success(bundle.hotspots, elapsed_ms(start))))
}

pub async fn get_temporal(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<TemporalPatterns>>, ApiFailure> {
    let start = Instant::now();
    let bundle = run_analysis(&state, None, start).await?;
    Ok(Json(ApiResponse::success(bundle.temporal_patterns, elapsed_ms(start))))
}

pub async fn get_risk_distribution(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<RiskDistribution>>, ApiFailure> {
    let start = Instant::now();
    let bundle = run_analysis(&state, None, start).await?;
    Ok(Json(ApiResponse::success(
        bundle.risk_distribution(),
        elapsed_ms(start),
    )))
}

// ============================================
// Export
// ============================================

/// Raw export body; errors still use the JSON envelope
pub async fn export_bundle(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiFailure> {
    let start = Instant::now();

    let format: ExportFormat = query
        .format
        .as_deref()
        .unwrap_or("json")
        .parse()
        .map_err(|e| ApiError::into_failure(&e, elapsed_ms(start)))?;

    let bundle = run_analysis(&state, None, start).await?;
    let body = export(&bundle, format).map_err(|e| ApiError::into_failure(&e, elapsed_ms(start)))?;
    let disposition = format!(
        "attachment; filename=\"netrisk_{}.{}\"",
        bundle.generated_at.format("%Y%m%d_%H%M%S"),
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

// ============================================
// Stats / Telemetry
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        telemetry: state.analyzer.telemetry().get_stats(),
        uptime_seconds: state.uptime_seconds(),
        api_version: "v1".to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Fallback
// ============================================

/// Unknown routes get the JSON envelope instead of an empty 404
pub async fn not_found(uri: Uri) -> ApiFailure {
    let err = AppError::not_found(format!("No route for {}", uri.path()));
    ApiError::into_failure(&err, 0.0)
}
