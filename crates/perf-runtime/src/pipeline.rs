//! Pure render pass: dashboard selections in, chart-ready outputs out.
//!
//! [`render`] is re-run top to bottom for every state change. Only loader
//! errors propagate; empty selections and sparse data surface as empty
//! vectors and `None` values in [`DashboardOutputs`].

use std::collections::BTreeSet;

use chrono::NaiveDate;
use perf_core::error::Result;
use perf_core::models::{
    CategoryField, GpsSessionRecord, PhysicalCapabilityRecord, RecoveryCategory,
};
use perf_core::settings::Settings;
use perf_core::stats::HistogramBin;
use perf_data::aggregator::{
    accel_decel_series, correlation_matrix, detect_peaks_and_drops, group_mean_count,
    hr_zone_series, pivot_mean, recovery_category_series, CorrelationMatrix, GroupStat,
    PeakDropReport, SeriesPoint, DEFAULT_DROP_PERCENTILE, DEFAULT_PEAK_PERCENTILE,
};
use perf_data::analysis::{
    benchmark_points, distance_histogram, headline_metrics, latest_recovery, linear_trend,
    recent_recovery_series, HeadlineMetrics, LatestRecovery, Trendline, BENCHMARK_OBJECTIVE,
};
use perf_data::filter::{date_bounds, distinct_values, DateRange, FilterSet};
use serde::{Deserialize, Serialize};

use crate::data_manager::DataContext;

/// Minimum tests per movement in the comparison chart.
pub const DEFAULT_MIN_GROUP_COUNT: usize = 3;

/// Trailing days shown in the overview recovery chart.
const OVERVIEW_RECOVERY_DAYS: usize = 30;

/// Categories preselected in the recovery evolution chart.
pub const DEFAULT_RECOVERY_CATEGORIES: [RecoveryCategory; 3] = [
    RecoveryCategory::Sleep,
    RecoveryCategory::Subjective,
    RecoveryCategory::Soreness,
];

// ── DashboardState ────────────────────────────────────────────────────────────

/// User selections driving one render pass.
///
/// For the multi-select fields `None` means "no predicate" while an empty set
/// selects nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    /// Falls back to the GPS table bounds when `None`.
    pub date_range: Option<DateRange>,
    pub seasons: Option<BTreeSet<String>>,
    pub movements: Option<BTreeSet<String>>,
    pub qualities: Option<BTreeSet<String>>,
    pub expressions: Option<BTreeSet<String>>,
    /// Quality plotted in the trend chart; the first available when `None`.
    pub focus_quality: Option<String>,
    pub recovery_categories: Vec<RecoveryCategory>,
    pub min_group_count: usize,
    pub peak_percentile: f64,
    pub drop_percentile: f64,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            date_range: None,
            seasons: None,
            movements: None,
            qualities: None,
            expressions: None,
            focus_quality: None,
            recovery_categories: DEFAULT_RECOVERY_CATEGORIES.to_vec(),
            min_group_count: DEFAULT_MIN_GROUP_COUNT,
            peak_percentile: DEFAULT_PEAK_PERCENTILE,
            drop_percentile: DEFAULT_DROP_PERCENTILE,
        }
    }
}

impl DashboardState {
    /// Initial selections: the full GPS date span, every season and the
    /// first available quality.
    pub fn defaults_for(context: &DataContext) -> Result<Self> {
        let gps = context.gps()?;
        let physical = context.physical()?;
        Ok(Self {
            date_range: date_bounds(&gps),
            seasons: Some(distinct_values(&gps, CategoryField::Season).into_iter().collect()),
            focus_quality: distinct_values(&physical, CategoryField::Quality)
                .into_iter()
                .next(),
            ..Self::default()
        })
    }

    /// Defaults overridden by whatever the command line selected.
    pub fn from_settings(settings: &Settings, context: &DataContext) -> Result<Self> {
        let mut state = Self::defaults_for(context)?;

        match (settings.from, settings.to, state.date_range) {
            (Some(a), Some(b), _) => state.date_range = Some(DateRange::new(a, b)),
            (Some(a), None, bounds) => {
                state.date_range = Some(DateRange::new(a, bounds.map_or(a, |r| r.end())))
            }
            (None, Some(b), bounds) => {
                state.date_range = Some(DateRange::new(bounds.map_or(b, |r| r.start()), b))
            }
            (None, None, _) => {}
        }

        let selection = |values: &[String]| {
            (!values.is_empty()).then(|| values.iter().cloned().collect::<BTreeSet<_>>())
        };
        if let Some(seasons) = selection(&settings.seasons) {
            state.seasons = Some(seasons);
        }
        state.movements = selection(&settings.movements);
        state.qualities = selection(&settings.qualities);
        state.expressions = selection(&settings.expressions);

        if settings.focus_quality.is_some() {
            state.focus_quality = settings.focus_quality.clone();
        }
        if !settings.categories.is_empty() {
            state.recovery_categories = settings.categories.clone();
        }
        state.min_group_count = settings.min_group_count;
        state.peak_percentile = settings.peak_percentile;
        state.drop_percentile = settings.drop_percentile;
        Ok(state)
    }

    fn filter_with(&self, fields: &[(CategoryField, &Option<BTreeSet<String>>)]) -> FilterSet {
        let mut filter = FilterSet::new();
        if let Some(range) = self.date_range {
            filter = filter.with_date_range(range);
        }
        for (field, selected) in fields {
            if let Some(values) = selected {
                filter = filter.with_selection(*field, values.iter().cloned());
            }
        }
        filter
    }

    fn gps_filter(&self) -> FilterSet {
        self.filter_with(&[(CategoryField::Season, &self.seasons)])
    }

    fn physical_filter(&self) -> FilterSet {
        self.filter_with(&[
            (CategoryField::Movement, &self.movements),
            (CategoryField::Quality, &self.qualities),
            (CategoryField::Expression, &self.expressions),
        ])
    }

    fn recovery_filter(&self) -> FilterSet {
        self.filter_with(&[])
    }
}

// ── Outputs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOutputs {
    /// Effective analysis window, `None` when no table has any row.
    pub date_range: Option<DateRange>,
    pub overview: OverviewSection,
    pub gps: GpsSection,
    pub physical: PhysicalSection,
    pub recovery: RecoverySection,
}

/// Headline cards and trend lines over the complete tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewSection {
    pub metrics: HeadlineMetrics,
    pub distance_series: Vec<(NaiveDate, f64)>,
    pub recovery_series: Vec<(NaiveDate, f64)>,
}

/// Peak speed of one session, sized by its high-speed distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedPoint {
    pub date: NaiveDate,
    pub peak_speed: f64,
    pub distance_over_27: f64,
    pub opposition_code: String,
}

impl From<&GpsSessionRecord> for SpeedPoint {
    fn from(r: &GpsSessionRecord) -> Self {
        Self {
            date: r.date,
            peak_speed: r.peak_speed,
            distance_over_27: r.distance_bands[2],
            opposition_code: r.opposition_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsSection {
    pub sessions: usize,
    pub distance_histogram: Vec<HistogramBin>,
    pub speed_points: Vec<SpeedPoint>,
    pub accel_decel: Vec<SeriesPoint>,
    pub hr_zones: Vec<SeriesPoint>,
}

/// Tests of the focus quality with their trendline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityTrend {
    pub quality: Option<String>,
    pub tests: Vec<PhysicalCapabilityRecord>,
    pub trendline: Option<Trendline>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalSection {
    pub tests: usize,
    pub movement_performance: Vec<GroupStat>,
    pub benchmark_objective: f64,
    pub expression_share: Vec<GroupStat>,
    pub quality_trend: QualityTrend,
    pub peaks_and_drops: PeakDropReport,
    pub correlation: CorrelationMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoverySection {
    pub baseline_series: Vec<(NaiveDate, f64)>,
    pub latest: Option<LatestRecovery>,
    pub category_evolution: Vec<SeriesPoint>,
}

// ── render ────────────────────────────────────────────────────────────────────

/// Load (through the cache), filter and aggregate every dashboard section.
pub fn render(context: &DataContext, state: &DashboardState) -> Result<DashboardOutputs> {
    let gps_all = context.gps()?;
    let physical_all = context.physical()?;
    let recovery_all = context.recovery()?;

    let state = DashboardState {
        date_range: state.date_range.or_else(|| date_bounds(&gps_all)),
        ..state.clone()
    };

    let gps = state.gps_filter().apply(&gps_all);
    let physical = state.physical_filter().apply(&physical_all);
    let recovery = state.recovery_filter().apply(&recovery_all);

    tracing::debug!(
        gps = gps.len(),
        physical = physical.len(),
        recovery = recovery.len(),
        "filtered tables"
    );

    let outputs = DashboardOutputs {
        date_range: state.date_range,
        overview: OverviewSection {
            metrics: headline_metrics(&gps_all, &physical_all, &recovery_all),
            distance_series: gps_all.iter().map(|r| (r.date, r.distance)).collect(),
            recovery_series: recent_recovery_series(&recovery_all, OVERVIEW_RECOVERY_DAYS),
        },
        gps: gps_section(&gps),
        physical: physical_section(&physical, &state),
        recovery: RecoverySection {
            baseline_series: recent_recovery_series(&recovery, usize::MAX),
            latest: latest_recovery(&recovery),
            category_evolution: recovery_category_series(&recovery, &state.recovery_categories),
        },
    };

    if outputs.gps.sessions == 0 && !gps_all.is_empty() {
        tracing::warn!("current selection leaves no GPS sessions");
    }
    Ok(outputs)
}

fn gps_section(gps: &[GpsSessionRecord]) -> GpsSection {
    GpsSection {
        sessions: gps.len(),
        distance_histogram: distance_histogram(gps),
        speed_points: gps.iter().map(SpeedPoint::from).collect(),
        accel_decel: accel_decel_series(gps),
        hr_zones: hr_zone_series(gps),
    }
}

fn physical_section(physical: &[PhysicalCapabilityRecord], state: &DashboardState) -> PhysicalSection {
    let benchmark = |r: &PhysicalCapabilityRecord| r.benchmark_pct;

    // The focus must be one of the qualities left after filtering.
    let available = distinct_values(physical, CategoryField::Quality);
    let focus = state
        .focus_quality
        .clone()
        .filter(|q| available.contains(q))
        .or_else(|| available.into_iter().next());
    let focus_tests = match &focus {
        Some(q) => FilterSet::new()
            .with_selection(CategoryField::Quality, [q.as_str()])
            .apply(physical),
        None => Vec::new(),
    };
    let trendline = linear_trend(&benchmark_points(&focus_tests));

    PhysicalSection {
        tests: physical.len(),
        movement_performance: group_mean_count(
            physical,
            CategoryField::Movement,
            benchmark,
            state.min_group_count,
        ),
        benchmark_objective: BENCHMARK_OBJECTIVE,
        expression_share: group_mean_count(physical, CategoryField::Expression, benchmark, 0),
        quality_trend: QualityTrend {
            quality: focus,
            tests: focus_tests,
            trendline,
        },
        peaks_and_drops: detect_peaks_and_drops(
            &benchmark_points(physical),
            state.peak_percentile,
            state.drop_percentile,
        ),
        correlation: correlation_matrix(&pivot_mean(physical, CategoryField::Quality, benchmark)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
