//! Dashboard-level derived values: headline metrics, recovery status and
//! benchmark trendlines.

use chrono::{Datelike, NaiveDate};
use perf_core::models::{GpsSessionRecord, PhysicalCapabilityRecord, RecoveryCategory, RecoveryRecord};
use perf_core::stats::{histogram, linear_fit, mean, mean_present, HistogramBin, LinearFit};
use serde::Serialize;

/// Session distance objective in metres.
pub const DISTANCE_TARGET_M: f64 = 8_000.0;
/// Reference peak speed in km/h.
pub const PEAK_SPEED_REFERENCE_KMH: f64 = 30.0;
/// Benchmark objective drawn on the movement comparison.
pub const BENCHMARK_OBJECTIVE: f64 = 0.65;
/// Number of trailing recovery rows averaged for the headline score.
pub const RECENT_RECOVERY_DAYS: usize = 7;
/// Bins used for the session distance histogram.
pub const DISTANCE_HISTOGRAM_BINS: usize = 20;

// ── Recovery status ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Excellent,
    Good,
    Attention,
}

impl RecoveryStatus {
    /// Classify a baseline-relative recovery score.
    pub fn classify(score: f64) -> Self {
        if score > 0.1 {
            RecoveryStatus::Excellent
        } else if score > -0.1 {
            RecoveryStatus::Good
        } else {
            RecoveryStatus::Attention
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecoveryStatus::Excellent => "Excellent",
            RecoveryStatus::Good => "Good",
            RecoveryStatus::Attention => "Attention",
        }
    }
}

/// Per-category scores of one recovery day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySnapshot {
    pub category: RecoveryCategory,
    pub label: &'static str,
    pub composite: Option<f64>,
    pub completeness: Option<f64>,
}

/// The most recent recovery day with its status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestRecovery {
    pub date: NaiveDate,
    pub score: Option<f64>,
    pub status: Option<RecoveryStatus>,
    pub categories: Vec<CategorySnapshot>,
}

/// Snapshot of the latest dated row, `None` for an empty table.
pub fn latest_recovery(rows: &[RecoveryRecord]) -> Option<LatestRecovery> {
    // max_by_key keeps the last of equal dates.
    let latest = rows.iter().max_by_key(|r| r.date)?;
    let score = latest.emboss_baseline_score;

    Some(LatestRecovery {
        date: latest.date,
        score,
        status: score.map(RecoveryStatus::classify),
        categories: RecoveryCategory::ALL
            .iter()
            .map(|&category| {
                let s = latest.score(category);
                CategorySnapshot {
                    category,
                    label: category.label(),
                    composite: s.composite,
                    completeness: s.completeness,
                }
            })
            .collect(),
    })
}

/// Mean baseline score over the last `days` rows in date order.
pub fn recent_recovery_mean(rows: &[RecoveryRecord], days: usize) -> Option<f64> {
    let mut ordered: Vec<&RecoveryRecord> = rows.iter().collect();
    ordered.sort_by_key(|r| r.date);
    let skip = ordered.len().saturating_sub(days);
    mean_present(ordered[skip..].iter().map(|r| r.emboss_baseline_score))
}

/// Baseline score of the last `days` rows, for the overview line chart.
pub fn recent_recovery_series(rows: &[RecoveryRecord], days: usize) -> Vec<(NaiveDate, f64)> {
    let mut points: Vec<(NaiveDate, f64)> = rows
        .iter()
        .filter_map(|r| Some((r.date, r.emboss_baseline_score?)))
        .collect();
    points.sort_by_key(|(d, _)| *d);
    let skip = points.len().saturating_sub(days);
    points.split_off(skip)
}

// ── Trendline ─────────────────────────────────────────────────────────────────

/// Straight-line trend between the first and last observed date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trendline {
    pub fit: LinearFit,
    pub start: (NaiveDate, f64),
    pub end: (NaiveDate, f64),
}

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

/// Least-squares trend over dated values. Needs more than two points.
pub fn linear_trend(points: &[(NaiveDate, f64)]) -> Option<Trendline> {
    if points.len() <= 2 {
        return None;
    }
    let xy: Vec<(f64, f64)> = points.iter().map(|(d, v)| (day_number(*d), *v)).collect();
    let fit = linear_fit(&xy)?;

    let first = points.iter().map(|(d, _)| *d).min()?;
    let last = points.iter().map(|(d, _)| *d).max()?;
    Some(Trendline {
        fit,
        start: (first, fit.predict(day_number(first))),
        end: (last, fit.predict(day_number(last))),
    })
}

/// `(test_date, benchmark_pct)` for every test with a benchmark value.
pub fn benchmark_points(rows: &[PhysicalCapabilityRecord]) -> Vec<(NaiveDate, f64)> {
    rows.iter()
        .filter_map(|r| Some((r.test_date, r.benchmark_pct?)))
        .collect()
}

// ── Headline metrics ──────────────────────────────────────────────────────────

/// Values shown in the overview metric cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineMetrics {
    pub avg_distance: Option<f64>,
    /// `avg_distance - DISTANCE_TARGET_M`.
    pub distance_vs_target: Option<f64>,
    pub avg_peak_speed: Option<f64>,
    /// `avg_peak_speed - PEAK_SPEED_REFERENCE_KMH`.
    pub peak_speed_vs_reference: Option<f64>,
    pub recent_recovery: Option<f64>,
    pub recovery_status: Option<RecoveryStatus>,
    /// Tests carrying a benchmark value.
    pub physical_tests: usize,
}

pub fn headline_metrics(
    gps: &[GpsSessionRecord],
    physical: &[PhysicalCapabilityRecord],
    recovery: &[RecoveryRecord],
) -> HeadlineMetrics {
    let distances: Vec<f64> = gps.iter().map(|r| r.distance).collect();
    let speeds: Vec<f64> = gps.iter().map(|r| r.peak_speed).collect();
    let avg_distance = mean(&distances);
    let avg_peak_speed = mean(&speeds);
    let recent_recovery = recent_recovery_mean(recovery, RECENT_RECOVERY_DAYS);

    HeadlineMetrics {
        avg_distance,
        distance_vs_target: avg_distance.map(|d| d - DISTANCE_TARGET_M),
        avg_peak_speed,
        peak_speed_vs_reference: avg_peak_speed.map(|s| s - PEAK_SPEED_REFERENCE_KMH),
        recent_recovery,
        recovery_status: recent_recovery.map(RecoveryStatus::classify),
        physical_tests: physical.iter().filter(|r| r.benchmark_pct.is_some()).count(),
    }
}

/// Distribution of session distances.
pub fn distance_histogram(rows: &[GpsSessionRecord]) -> Vec<HistogramBin> {
    let distances: Vec<f64> = rows.iter().map(|r| r.distance).collect();
    histogram(&distances, DISTANCE_HISTOGRAM_BINS)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
