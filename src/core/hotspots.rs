//! Hotspot Detection Module
//!
//! Ranks districts by recent case pressure and entity presence, assigns alert
//! tiers and canned recommendations.

use crate::models::{
    ActivityComparison, ActivityMetrics, AlertLevel, DistrictRisk, Hotspot, HotspotReport,
    HotspotSummary,
};
use crate::utils::constants::{HOTSPOT_ENTITY_WEIGHT, HOTSPOT_RECENT_CASE_WEIGHT, MAX_SCORE};
use crate::utils::math::clamped_round;

pub fn hotspot_score(recent_cases: usize, total_entities: usize) -> u32 {
    clamped_round(
        recent_cases as f64 * HOTSPOT_RECENT_CASE_WEIGHT
            + total_entities as f64 * HOTSPOT_ENTITY_WEIGHT,
        MAX_SCORE,
    )
}

/// Top `limit` districts by hotspot score (ties by name), with tallies over
/// the listed hotspots
pub fn detect_hotspots(districts: &[DistrictRisk], limit: usize) -> HotspotReport {
    let mut hotspots: Vec<Hotspot> = districts
        .iter()
        .map(|d| {
            let score = hotspot_score(d.metrics.recent_cases, d.metrics.total_entities);
            let alert_level = AlertLevel::from_score(score);
            Hotspot {
                district_id: d.id.clone(),
                district_name: d.name.clone(),
                alert_level,
                hotspot_score: score,
                activity_metrics: ActivityMetrics {
                    recent_cases: d.metrics.recent_cases,
                    total_entities: d.metrics.total_entities,
                },
                comparison: ActivityComparison {
                    previous_cases: d.metrics.previous_cases,
                    activity_increase_percent: d.activity_change_percent,
                },
                recommendation: alert_level.recommendation().to_string(),
            }
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.hotspot_score
            .cmp(&a.hotspot_score)
            .then_with(|| a.district_name.cmp(&b.district_name))
    });
    hotspots.truncate(limit);

    let count = |level: AlertLevel| hotspots.iter().filter(|h| h.alert_level == level).count();
    let summary = HotspotSummary {
        total_hotspots: hotspots.len(),
        critical_alerts: count(AlertLevel::Critical),
        high_alerts: count(AlertLevel::High),
        medium_alerts: count(AlertLevel::Medium),
        low_alerts: count(AlertLevel::Low),
        districts_with_increased_activity: hotspots
            .iter()
            .filter(|h| h.comparison.activity_increase_percent > 0)
            .count(),
    };

    HotspotReport { summary, hotspots }
}
