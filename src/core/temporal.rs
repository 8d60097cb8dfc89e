//! Temporal Windowing Module
//!
//! Buckets timestamped activity into the rolling 30-day window and the prior
//! 30-day window (days 31-60 before now), derives trend and percent change,
//! and builds the 12-month case series with seasonal averages.

use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;

use crate::models::{CaseRecord, MonthlyPoint, SeasonalPattern, TemporalPatterns, Trend};
use crate::utils::constants::{
    MONTHLY_SERIES_MONTHS, MOVING_AVERAGE_MONTHS, PRIOR_WINDOW_END_DAYS, RECENT_WINDOW_DAYS,
};
use crate::utils::math::{mean, round_half_up};

const MS_PER_DAY: i64 = 86_400_000;

/// Whole days from `t` to `now`, floored (negative for future timestamps)
pub fn days_between(now: DateTime<Utc>, t: DateTime<Utc>) -> i64 {
    (now - t).num_milliseconds().div_euclid(MS_PER_DAY)
}

/// True when `t` falls within the last `days` days (inclusive)
pub fn within_days(now: DateTime<Utc>, t: Option<DateTime<Utc>>, days: i64) -> bool {
    t.map(|t| days_between(now, t) <= days).unwrap_or(false)
}

/// Window a timestamp falls into relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Last30,
    Previous30,
    Older,
}

impl Window {
    pub fn of(now: DateTime<Utc>, t: DateTime<Utc>) -> Self {
        let delta = days_between(now, t);
        if delta <= RECENT_WINDOW_DAYS {
            Self::Last30
        } else if delta <= PRIOR_WINDOW_END_DAYS {
            Self::Previous30
        } else {
            Self::Older
        }
    }
}

/// Percent change of the recent window against the prior one.
/// A zero prior window yields 100 when there is any recent activity, else 0.
pub fn percent_change(last_30: usize, previous_30: usize) -> i64 {
    if previous_30 == 0 {
        return if last_30 > 0 { 100 } else { 0 };
    }
    let change = (last_30 as f64 - previous_30 as f64) / previous_30 as f64 * 100.0;
    round_half_up(change)
}

pub fn trend(last_30: usize, previous_30: usize) -> Trend {
    match last_30.cmp(&previous_30) {
        std::cmp::Ordering::Greater => Trend::Increasing,
        std::cmp::Ordering::Less => Trend::Decreasing,
        std::cmp::Ordering::Equal => Trend::Stable,
    }
}

/// Running totals for one subject (entity, district, or the whole snapshot)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub total: usize,
    pub last_30: usize,
    pub previous_30: usize,
}

impl WindowCounts {
    /// Count one record; undated records only count toward the total
    pub fn record(&mut self, now: DateTime<Utc>, at: Option<DateTime<Utc>>) {
        self.total += 1;
        match at.map(|t| Window::of(now, t)) {
            Some(Window::Last30) => self.last_30 += 1,
            Some(Window::Previous30) => self.previous_30 += 1,
            _ => {}
        }
    }

    pub fn percent_change(&self) -> i64 {
        percent_change(self.last_30, self.previous_30)
    }

    pub fn trend(&self) -> Trend {
        trend(self.last_30, self.previous_30)
    }
}

/// Per-entity case counts keyed by entity id
pub fn entity_activity(cases: &[CaseRecord], now: DateTime<Utc>) -> HashMap<String, WindowCounts> {
    let mut activity: HashMap<String, WindowCounts> = HashMap::new();
    for case in cases {
        if let Some(entity_id) = &case.entity_id {
            activity
                .entry(entity_id.clone())
                .or_default()
                .record(now, case.created_at);
        }
    }
    activity
}

// ============================================
// Monthly series
// ============================================

/// Month index counted from year 0, so consecutive months differ by one
fn month_index(year: i32, month0: u32) -> i64 {
    year as i64 * 12 + month0 as i64
}

fn season_of(month0: u32) -> usize {
    match month0 {
        11 | 0 | 1 => 0,
        2..=4 => 1,
        5..=8 => 2,
        _ => 3,
    }
}

const SEASONS: [&str; 4] = ["Winter", "Summer", "Monsoon", "Post-monsoon"];

/// Case counts for the last 12 calendar months, oldest first, ending in the
/// month of `now`, with a trailing 3-month moving average
pub fn monthly_series(cases: &[CaseRecord], now: DateTime<Utc>) -> Vec<MonthlyPoint> {
    let months = MONTHLY_SERIES_MONTHS as i64;
    let last = month_index(now.year(), now.month0());
    let first = last - months + 1;

    let mut counts = vec![0usize; months as usize];
    for at in cases.iter().filter_map(|c| c.created_at) {
        let idx = month_index(at.year(), at.month0());
        if (first..=last).contains(&idx) {
            counts[(idx - first) as usize] += 1;
        }
    }

    counts
        .iter()
        .enumerate()
        .map(|(i, &cases)| {
            let idx = first + i as i64;
            let year = idx.div_euclid(12);
            let month = idx.rem_euclid(12) + 1;
            let window_start = i.saturating_sub(MOVING_AVERAGE_MONTHS - 1);
            let window: Vec<f64> = counts[window_start..=i].iter().map(|&c| c as f64).collect();
            MonthlyPoint {
                month: format!("{:04}-{:02}", year, month),
                cases,
                moving_average: round_half_up(mean(&window)),
            }
        })
        .collect()
}

/// Average monthly cases per season over the series
pub fn seasonal_patterns(series: &[MonthlyPoint]) -> Vec<SeasonalPattern> {
    let mut buckets: [Vec<f64>; 4] = Default::default();
    for point in series {
        let month0 = point
            .month
            .get(5..7)
            .and_then(|m| m.parse::<u32>().ok())
            .map(|m| m.saturating_sub(1));
        if let Some(month0) = month0 {
            buckets[season_of(month0)].push(point.cases as f64);
        }
    }

    SEASONS
        .iter()
        .zip(buckets.iter())
        .map(|(season, values)| SeasonalPattern {
            season: season.to_string(),
            average_cases: round_half_up(mean(values)),
        })
        .collect()
}

/// Whole-snapshot temporal view
pub fn temporal_patterns(cases: &[CaseRecord], now: DateTime<Utc>) -> TemporalPatterns {
    let mut counts = WindowCounts::default();
    for case in cases {
        counts.record(now, case.created_at);
    }

    let monthly_trends = monthly_series(cases, now);
    let seasonal_patterns = seasonal_patterns(&monthly_trends);

    TemporalPatterns {
        monthly_trends,
        seasonal_patterns,
        last_30_days: counts.last_30,
        previous_30_days: counts.previous_30,
        activity_change_percent: counts.percent_change(),
        trend: counts.trend(),
    }
}
