//! Stateless aggregations over filtered tables.
//!
//! Every function accepts an empty slice and returns an empty or neutral
//! result. Values that cannot be computed from the available points are
//! reported as `None` ("insufficient data"), never as `NaN` or an error.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use perf_core::models::{
    Categorized, CategoryField, Dated, GpsSessionRecord, RecoveryCategory, RecoveryRecord,
};
use perf_core::schema::gps::ACCEL_DECEL;
use perf_core::stats::{mean, pearson, percentile, sorted};
use serde::Serialize;

// ── Group mean / count ────────────────────────────────────────────────────────

/// Mean and count of a numeric column within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub key: String,
    /// Mean of the present values, `None` when the group has none.
    pub mean: Option<f64>,
    /// Number of present values (missing values are not counted).
    pub count: usize,
}

/// Group `rows` by `field`, averaging `value` over present values.
///
/// Groups whose count is below `min_count` are dropped. Rows that do not
/// carry `field` are ignored. Groups are returned sorted by key.
pub fn group_mean_count<R, V>(
    rows: &[R],
    field: CategoryField,
    value: V,
    min_count: usize,
) -> Vec<GroupStat>
where
    R: Categorized,
    V: Fn(&R) -> Option<f64>,
{
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let Some(key) = row.category(field) else {
            continue;
        };
        let values = groups.entry(key).or_default();
        if let Some(v) = value(row) {
            values.push(v);
        }
    }

    groups
        .into_iter()
        .filter(|(_, values)| values.len() >= min_count)
        .map(|(key, values)| GroupStat {
            key: key.to_string(),
            mean: mean(&values),
            count: values.len(),
        })
        .collect()
}

// ── Pivot ─────────────────────────────────────────────────────────────────────

/// Date × category matrix of mean values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotTable {
    /// Row labels, ascending.
    pub index: Vec<NaiveDate>,
    /// Column labels, ascending.
    pub columns: Vec<String>,
    /// `values[row][column]`, `None` where the pair was never observed.
    pub values: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Cell for `(date, column)`.
    pub fn get(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let r = self.index.binary_search(&date).ok()?;
        let c = self.columns.iter().position(|col| col == column)?;
        self.values[r][c]
    }

    fn column_values(&self, c: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values.iter().map(move |row| row[c])
    }
}

/// Reshape `rows` into a date × `field` matrix, averaging duplicate pairs.
///
/// Missing values are ignored, so dates and categories that only carry
/// missing values do not appear.
pub fn pivot_mean<R, V>(rows: &[R], field: CategoryField, value: V) -> PivotTable
where
    R: Dated + Categorized,
    V: Fn(&R) -> Option<f64>,
{
    let mut cells: BTreeMap<(NaiveDate, &str), (f64, usize)> = BTreeMap::new();
    for row in rows {
        let (Some(key), Some(v)) = (row.category(field), value(row)) else {
            continue;
        };
        let cell = cells.entry((row.date(), key)).or_insert((0.0, 0));
        cell.0 += v;
        cell.1 += 1;
    }

    let mut index: Vec<NaiveDate> = cells.keys().map(|(d, _)| *d).collect();
    index.dedup();
    let mut columns: Vec<String> = cells.keys().map(|(_, k)| k.to_string()).collect();
    columns.sort();
    columns.dedup();

    let mut values = vec![vec![None; columns.len()]; index.len()];
    for ((date, key), (sum, n)) in cells {
        // Both searches succeed: index and columns were built from these keys.
        if let (Ok(r), Ok(c)) = (
            index.binary_search(&date),
            columns.binary_search_by(|col| col.as_str().cmp(key)),
        ) {
            values[r][c] = Some(sum / n as f64);
        }
    }

    PivotTable {
        index,
        columns,
        values,
    }
}

// ── Correlation ───────────────────────────────────────────────────────────────

/// Square matrix of pairwise Pearson coefficients between pivot columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// `values[i][j]`, `None` where the pair has insufficient data.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.values[i][j]
    }
}

/// Pairwise Pearson correlation over pairwise-complete observations.
///
/// The diagonal is 1.0 for every column. Off-diagonal cells with fewer than
/// two overlapping dates, or with zero variance on either side, are `None`.
pub fn correlation_matrix(pivot: &PivotTable) -> CorrelationMatrix {
    let n = pivot.columns.len();
    let mut values = vec![vec![None; n]; n];

    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let pairs: Vec<(f64, f64)> = pivot
                .column_values(i)
                .zip(pivot.column_values(j))
                .filter_map(|(a, b)| Some((a?, b?)))
                .collect();
            let r = pearson(&pairs);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        labels: pivot.columns.clone(),
        values,
    }
}

// ── Peak / drop detection ─────────────────────────────────────────────────────

/// Percentiles used by [`detect_peaks_and_drops`] in the dashboard.
pub const DEFAULT_PEAK_PERCENTILE: f64 = 95.0;
pub const DEFAULT_DROP_PERCENTILE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Peak,
    Drop,
}

/// One point of a score series with its change from the previous point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreChange {
    pub date: NaiveDate,
    pub value: f64,
    /// Difference to the previous point; `None` for the first point.
    pub diff: Option<f64>,
    pub kind: Option<ChangeKind>,
}

/// Thresholds derived from the diff distribution of the current series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeThresholds {
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeakDropReport {
    /// `None` when the series has fewer than two points.
    pub thresholds: Option<ChangeThresholds>,
    pub points: Vec<ScoreChange>,
}

impl PeakDropReport {
    pub fn peaks(&self) -> impl Iterator<Item = &ScoreChange> {
        self.of_kind(ChangeKind::Peak)
    }

    pub fn drops(&self) -> impl Iterator<Item = &ScoreChange> {
        self.of_kind(ChangeKind::Drop)
    }

    fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &ScoreChange> {
        self.points.iter().filter(move |p| p.kind == Some(kind))
    }
}

/// Flag day-to-day changes in a score series.
///
/// Points are ordered by date and differenced; a diff strictly above the
/// `upper_pct` percentile of all diffs is a peak, one strictly below the
/// `lower_pct` percentile is a drop. Thresholds are computed from `points`
/// on every call.
pub fn detect_peaks_and_drops(
    points: &[(NaiveDate, f64)],
    upper_pct: f64,
    lower_pct: f64,
) -> PeakDropReport {
    let mut series: Vec<(NaiveDate, f64)> = points
        .iter()
        .copied()
        .filter(|(_, v)| v.is_finite())
        .collect();
    series.sort_by_key(|(d, _)| *d);

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1].1 - w[0].1).collect();
    let ordered = sorted(&diffs);
    let thresholds = match (
        percentile(&ordered, upper_pct),
        percentile(&ordered, lower_pct),
    ) {
        (Some(upper), Some(lower)) => Some(ChangeThresholds { upper, lower }),
        _ => None,
    };

    let points = series
        .iter()
        .enumerate()
        .map(|(i, &(date, value))| {
            let diff = i.checked_sub(1).map(|prev| diffs[prev]);
            let kind = match (diff, thresholds) {
                (Some(d), Some(t)) if d > t.upper => Some(ChangeKind::Peak),
                (Some(d), Some(t)) if d < t.lower => Some(ChangeKind::Drop),
                _ => None,
            };
            ScoreChange {
                date,
                value,
                diff,
                kind,
            }
        })
        .collect();

    PeakDropReport { thresholds, points }
}

// ── Long series ───────────────────────────────────────────────────────────────

/// One value of a named series on one date (long / "melted" layout).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub series: String,
    pub value: f64,
}

/// Acceleration/deceleration counts by threshold, one series per bucket.
pub fn accel_decel_series(rows: &[GpsSessionRecord]) -> Vec<SeriesPoint> {
    ACCEL_DECEL
        .iter()
        .enumerate()
        .flat_map(|(i, name)| {
            rows.iter().map(move |r| SeriesPoint {
                date: r.date,
                series: name.to_string(),
                value: r.accel_decel[i],
            })
        })
        .collect()
}

/// Minutes spent in each heart-rate zone, series named `"Zone 1"`..`"Zone 5"`.
pub fn hr_zone_series(rows: &[GpsSessionRecord]) -> Vec<SeriesPoint> {
    let minutes: Vec<_> = rows.iter().map(|r| (r.date, r.hr_zone_minutes())).collect();
    let zones = minutes.first().map(|(_, m)| m.len()).unwrap_or(0);

    (0..zones)
        .flat_map(|z| {
            minutes.iter().map(move |(date, m)| SeriesPoint {
                date: *date,
                series: format!("Zone {}", z + 1),
                value: m[z],
            })
        })
        .collect()
}

/// Composite score evolution for the selected categories. Missing values are
/// left out of the series.
pub fn recovery_category_series(
    rows: &[RecoveryRecord],
    categories: &[RecoveryCategory],
) -> Vec<SeriesPoint> {
    categories
        .iter()
        .flat_map(|category| {
            rows.iter().filter_map(move |r| {
                Some(SeriesPoint {
                    date: r.date,
                    series: category.label().to_string(),
                    value: r.score(*category).composite?,
                })
            })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use perf_core::models::{CategoryScore, PhysicalCapabilityRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test(d: NaiveDate, movement: &str, quality: &str, pct: Option<f64>) -> PhysicalCapabilityRecord {
        PhysicalCapabilityRecord {
            test_date: d,
            movement: movement.to_string(),
            quality: quality.to_string(),
            expression: "dynamic".to_string(),
            benchmark_pct: pct,
        }
    }

    fn benchmark(r: &PhysicalCapabilityRecord) -> Option<f64> {
        r.benchmark_pct
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ── group_mean_count ──────────────────────────────────────────────────────

    #[test]
    fn test_group_below_threshold_excluded() {
        let rows = vec![
            test(date(2024, 1, 1), "jump", "take off", Some(0.4)),
            test(date(2024, 1, 2), "jump", "take off", Some(0.6)),
            test(date(2024, 1, 3), "sprint", "acceleration", Some(0.5)),
            test(date(2024, 1, 4), "sprint", "acceleration", Some(0.7)),
            test(date(2024, 1, 5), "sprint", "max velocity", Some(0.9)),
        ];
        let groups = group_mean_count(&rows, CategoryField::Movement, benchmark, 3);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "sprint");
        assert_eq!(groups[0].count, 3);
        assert!(approx(groups[0].mean.unwrap(), 0.7));
        assert!(groups.iter().all(|g| g.key != "jump"));
    }

    #[test]
    fn test_group_missing_values_not_counted() {
        let rows = vec![
            test(date(2024, 1, 1), "jump", "take off", Some(0.4)),
            test(date(2024, 1, 2), "jump", "take off", None),
            test(date(2024, 1, 3), "agility", "rotate", None),
        ];
        let groups = group_mean_count(&rows, CategoryField::Movement, benchmark, 0);
        assert_eq!(
            groups,
            vec![
                GroupStat {
                    key: "agility".to_string(),
                    mean: None,
                    count: 0
                },
                GroupStat {
                    key: "jump".to_string(),
                    mean: Some(0.4),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_group_empty_input() {
        let rows: Vec<PhysicalCapabilityRecord> = Vec::new();
        assert!(group_mean_count(&rows, CategoryField::Movement, benchmark, 3).is_empty());
    }

    // ── pivot_mean ────────────────────────────────────────────────────────────

    #[test]
    fn test_pivot_averages_duplicates() {
        let d = date(2024, 1, 1);
        let rows = vec![
            test(d, "jump", "take off", Some(0.4)),
            test(d, "jump", "take off", Some(0.6)),
            test(d, "sprint", "acceleration", Some(0.9)),
        ];
        let pivot = pivot_mean(&rows, CategoryField::Quality, benchmark);
        assert_eq!(pivot.index, vec![d]);
        assert_eq!(pivot.columns, vec!["acceleration", "take off"]);
        assert!(approx(pivot.get(d, "take off").unwrap(), 0.5));
        assert_eq!(pivot.get(d, "acceleration"), Some(0.9));
    }

    #[test]
    fn test_pivot_drops_all_missing_rows_and_columns() {
        let rows = vec![
            test(date(2024, 1, 1), "jump", "take off", Some(0.4)),
            test(date(2024, 1, 2), "agility", "rotate", None),
        ];
        let pivot = pivot_mean(&rows, CategoryField::Quality, benchmark);
        assert_eq!(pivot.index, vec![date(2024, 1, 1)]);
        assert_eq!(pivot.columns, vec!["take off"]);
    }

    #[test]
    fn test_pivot_sparse_cells_are_none() {
        let rows = vec![
            test(date(2024, 1, 1), "jump", "take off", Some(0.4)),
            test(date(2024, 1, 2), "agility", "rotate", Some(0.3)),
        ];
        let pivot = pivot_mean(&rows, CategoryField::Quality, benchmark);
        assert_eq!(pivot.get(date(2024, 1, 1), "rotate"), None);
        assert_eq!(pivot.values, vec![vec![None, Some(0.4)], vec![Some(0.3), None]]);
    }

    #[test]
    fn test_pivot_empty_input() {
        let rows: Vec<PhysicalCapabilityRecord> = Vec::new();
        let pivot = pivot_mean(&rows, CategoryField::Quality, benchmark);
        assert!(pivot.is_empty());
        assert!(pivot.index.is_empty());
        assert!(correlation_matrix(&pivot).is_empty());
    }

    // ── correlation_matrix ────────────────────────────────────────────────────

    #[test]
    fn test_correlation_single_column_is_one() {
        let rows = vec![test(date(2024, 1, 1), "jump", "take off", Some(0.4))];
        let corr = correlation_matrix(&pivot_mean(&rows, CategoryField::Quality, benchmark));
        assert_eq!(corr.labels, vec!["take off"]);
        assert_eq!(corr.values, vec![vec![Some(1.0)]]);
    }

    #[test]
    fn test_correlation_pairwise_complete() {
        let mut rows = Vec::new();
        for (day, a, b) in [(1, 0.1, 0.2), (2, 0.2, 0.4), (3, 0.3, 0.6)] {
            rows.push(test(date(2024, 1, day), "jump", "take off", Some(a)));
            rows.push(test(date(2024, 1, day), "sprint", "acceleration", Some(b)));
        }
        // Extra observation with no partner must not disturb the pair.
        rows.push(test(date(2024, 1, 9), "jump", "take off", Some(0.9)));

        let corr = correlation_matrix(&pivot_mean(&rows, CategoryField::Quality, benchmark));
        assert!(approx(corr.get("take off", "acceleration").unwrap(), 1.0));
        assert_eq!(corr.get("take off", "acceleration"), corr.get("acceleration", "take off"));
    }

    #[test]
    fn test_correlation_insufficient_overlap_is_none() {
        let rows = vec![
            test(date(2024, 1, 1), "jump", "take off", Some(0.4)),
            test(date(2024, 1, 1), "sprint", "acceleration", Some(0.5)),
            test(date(2024, 1, 2), "jump", "take off", Some(0.6)),
            test(date(2024, 1, 3), "sprint", "acceleration", Some(0.7)),
        ];
        let corr = correlation_matrix(&pivot_mean(&rows, CategoryField::Quality, benchmark));
        assert_eq!(corr.get("take off", "acceleration"), None);
        assert_eq!(corr.get("take off", "take off"), Some(1.0));
    }

    // ── detect_peaks_and_drops ────────────────────────────────────────────────

    fn series(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (date(2024, 1, 1 + i as u32), *v))
            .collect()
    }

    #[test]
    fn test_peak_and_drop_isolated() {
        let points = series(&[10.0, 12.0, 50.0, 11.0, -40.0, 13.0]);
        let report = detect_peaks_and_drops(
            &points,
            DEFAULT_PEAK_PERCENTILE,
            DEFAULT_DROP_PERCENTILE,
        );

        let peaks: Vec<_> = report.peaks().collect();
        let drops: Vec<_> = report.drops().collect();
        assert_eq!(peaks.len(), 1);
        assert_eq!(drops.len(), 1);
        assert_eq!(peaks[0].date, date(2024, 1, 6));
        assert_eq!(peaks[0].diff, Some(53.0));
        assert_eq!(drops[0].date, date(2024, 1, 5));
        assert_eq!(drops[0].diff, Some(-51.0));

        let t = report.thresholds.unwrap();
        assert!(approx(t.upper, 50.0));
        assert!(approx(t.lower, -48.6));
        assert_eq!(report.points[0].diff, None);
        assert_eq!(report.points[0].kind, None);
    }

    #[test]
    fn test_peak_drop_orders_by_date() {
        let mut points = series(&[10.0, 12.0, 50.0, 11.0, -40.0, 13.0]);
        points.reverse();
        let report = detect_peaks_and_drops(&points, 95.0, 5.0);
        assert_eq!(report.points[0].date, date(2024, 1, 1));
        assert_eq!(report.peaks().count(), 1);
    }

    #[test]
    fn test_peak_drop_thresholds_follow_the_data() {
        let small = detect_peaks_and_drops(&series(&[1.0, 2.0, 3.0, 10.0]), 95.0, 5.0);
        let large = detect_peaks_and_drops(&series(&[100.0, 200.0, 300.0, 1000.0]), 95.0, 5.0);
        assert!(small.thresholds.unwrap().upper < large.thresholds.unwrap().upper);
    }

    #[test]
    fn test_peak_drop_short_series() {
        let empty = detect_peaks_and_drops(&[], 95.0, 5.0);
        assert!(empty.points.is_empty());
        assert!(empty.thresholds.is_none());

        let single = detect_peaks_and_drops(&series(&[3.0]), 95.0, 5.0);
        assert_eq!(single.points.len(), 1);
        assert!(single.thresholds.is_none());
        assert_eq!(single.peaks().count(), 0);
    }

    #[test]
    fn test_peak_drop_constant_series_flags_nothing() {
        let report = detect_peaks_and_drops(&series(&[5.0, 5.0, 5.0, 5.0]), 95.0, 5.0);
        assert_eq!(report.peaks().count() + report.drops().count(), 0);
    }

    // ── long series ───────────────────────────────────────────────────────────

    fn gps(d: NaiveDate, accel: [f64; 3], zones: [&str; 5]) -> GpsSessionRecord {
        GpsSessionRecord {
            date: d,
            opposition_code: "TRAINING".to_string(),
            opposition_full: None,
            season: "2023-24".to_string(),
            md_plus_code: None,
            md_minus_code: None,
            distance: 8_000.0,
            distance_bands: [0.0; 3],
            accel_decel: accel,
            day_duration: 90.0,
            peak_speed: 30.0,
            hr_zones: zones.map(String::from),
        }
    }

    #[test]
    fn test_accel_decel_series_melts_by_threshold() {
        let rows = vec![
            gps(date(2024, 1, 1), [80.0, 40.0, 10.0], ["00:00:00"; 5]),
            gps(date(2024, 1, 2), [90.0, 45.0, 12.0], ["00:00:00"; 5]),
        ];
        let points = accel_decel_series(&rows);
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].series, "accel_decel_over_2_5");
        assert_eq!(points[1].value, 90.0);
        assert_eq!(points[5].series, "accel_decel_over_4_5");
        assert_eq!(points[5].value, 12.0);
    }

    #[test]
    fn test_hr_zone_series_converts_durations() {
        let rows = vec![gps(
            date(2024, 1, 1),
            [0.0; 3],
            ["00:10:00", "00:20:30", "bad", "00:05:00", "00:00:00"],
        )];
        let points = hr_zone_series(&rows);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].series, "Zone 1");
        assert_eq!(points[1].value, 20.5);
        assert_eq!(points[2].value, 0.0);
    }

    #[test]
    fn test_long_series_empty_input() {
        assert!(accel_decel_series(&[]).is_empty());
        assert!(hr_zone_series(&[]).is_empty());
        assert!(recovery_category_series(&[], &RecoveryCategory::ALL).is_empty());
    }

    #[test]
    fn test_recovery_category_series_skips_missing() {
        let mut categories = [CategoryScore::default(); 6];
        categories[RecoveryCategory::Sleep.index()].composite = Some(0.3);
        let rows = vec![RecoveryRecord {
            date: date(2024, 1, 1),
            categories,
            emboss_baseline_score: None,
        }];
        let points = recovery_category_series(
            &rows,
            &[RecoveryCategory::Sleep, RecoveryCategory::Soreness],
        );
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].series, "Sleep");
        assert_eq!(points[0].value, 0.3);
    }
}
