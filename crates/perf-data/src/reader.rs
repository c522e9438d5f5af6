//! CSV loading for the three performance tables.
//!
//! Every loader resolves the header through the table's canonical schema,
//! parses dates, and keeps going past malformed rows: a row whose date or a
//! required numeric cell cannot be parsed is skipped and counted, optional
//! cells are stored as `None`. Only an unreadable source or a header missing a
//! required column is fatal.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use perf_core::error::{PerfError, Result};
use perf_core::models::{
    CategoryScore, GpsSessionRecord, PhysicalCapabilityRecord, RecoveryRecord, HR_ZONE_COUNT,
};
use perf_core::schema::{self, ColumnMap, TableSchema, GPS_SCHEMA, PHYSICAL_SCHEMA, RECOVERY_SCHEMA};
use perf_core::time_utils::{parse_date, season_for};
use tracing::{debug, info, warn};

/// The physical-capability sample shipped with the dashboard.
pub const EMBEDDED_PHYSICAL_CSV: &str = "\
testDate,expression,movement,quality,benchmarkPct
12/11/2024,isometric,agility,rotate,0.6795
18/06/2024,isometric,agility,rotate,
19/12/2024,isometric,jump,take off,0.4
08/07/2023,isometric,jump,take off,
19/05/2024,isometric,jump,pre-load,0.49
11/02/2024,dynamic,agility,deceleration,0.89
28/03/2024,dynamic,upper body,push,0.4345
12/01/2024,dynamic,jump,take off,0.625
28/12/2024,isometric,upper body,pull,0.46
20/03/2024,dynamic,sprint,acceleration,0.4445
22/11/2024,isometric,agility,deceleration,0.86
29/10/2024,dynamic,sprint,max velocity,0.652
28/07/2024,isometric,agility,rotate,0.278
23/02/2024,isometric,agility,acceleration,0.52
08/01/2024,isometric,agility,rotate,
27/06/2024,dynamic,sprint,acceleration,0.436
10/11/2023,isometric,agility,deceleration,1.038
26/12/2023,dynamic,jump,pre-load,0.484
02/02/2025,dynamic,agility,acceleration,0.4965
30/01/2024,dynamic,upper body,push,0.4345
";

// ── Public API ────────────────────────────────────────────────────────────────

/// Load physical-capability records from any reader.
pub fn load_physical<R: Read>(source: R) -> Result<Vec<PhysicalCapabilityRecord>> {
    read_table(source, &PHYSICAL_SCHEMA, map_physical)
}

/// Load GPS session records from any reader.
pub fn load_gps<R: Read>(source: R) -> Result<Vec<GpsSessionRecord>> {
    read_table(source, &GPS_SCHEMA, map_gps)
}

/// Load recovery records from any reader.
pub fn load_recovery<R: Read>(source: R) -> Result<Vec<RecoveryRecord>> {
    read_table(source, &RECOVERY_SCHEMA, map_recovery)
}

/// Parse the embedded physical-capability sample.
pub fn load_embedded_physical() -> Result<Vec<PhysicalCapabilityRecord>> {
    load_physical(EMBEDDED_PHYSICAL_CSV.as_bytes())
}

/// Open `path` for one of the `load_*` functions, mapping I/O failures to
/// [`PerfError::FileRead`].
pub fn open_source(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| PerfError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Shared driver: resolve the header, map every row, count what was skipped.
fn read_table<R, T, F>(source: R, schema: &TableSchema, map_row: F) -> Result<Vec<T>>
where
    R: Read,
    F: Fn(&ColumnMap, &StringRecord) -> Option<T>,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let columns = schema.resolve(reader.headers()?.iter())?;

    let mut rows = Vec::new();
    let mut read = 0usize;
    let mut skipped = 0usize;

    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("{} row {}: unreadable record: {}", schema.table, line + 2, e);
                skipped += 1;
                continue;
            }
        };
        read += 1;

        match map_row(&columns, &record) {
            Some(row) => rows.push(row),
            None => {
                debug!("{} row {}: skipped malformed row", schema.table, line + 2);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("{} data: skipped {} malformed rows", schema.table, skipped);
    }
    info!(
        "{} data: {} rows read, {} kept, {} skipped",
        schema.table,
        read,
        rows.len(),
        skipped
    );

    Ok(rows)
}

fn map_physical(columns: &ColumnMap, record: &StringRecord) -> Option<PhysicalCapabilityRecord> {
    use schema::physical::*;

    let test_date = parse_date(columns.get(record, TEST_DATE)?)?;

    // A non-numeric or negative score is a missed test, not a broken row.
    let benchmark_pct = columns
        .get_f64(record, BENCHMARK_PCT)
        .filter(|v| *v >= 0.0);
    if benchmark_pct.is_none() && columns.get(record, BENCHMARK_PCT).is_some() {
        debug!(
            "physical capability: ignoring invalid benchmark {:?}",
            columns.get(record, BENCHMARK_PCT)
        );
    }

    Some(PhysicalCapabilityRecord {
        test_date,
        movement: columns.get(record, MOVEMENT)?.to_string(),
        quality: columns.get(record, QUALITY)?.to_string(),
        expression: columns.get(record, EXPRESSION)?.to_string(),
        benchmark_pct,
    })
}

fn map_gps(columns: &ColumnMap, record: &StringRecord) -> Option<GpsSessionRecord> {
    use schema::gps::*;

    let date = parse_date(columns.get(record, DATE)?)?;
    let distance = non_negative(columns.get_f64(record, DISTANCE)?)?;
    let peak_speed = non_negative(columns.get_f64(record, PEAK_SPEED)?)?;

    let optional_amount = |field: &str| {
        columns
            .get_f64(record, field)
            .and_then(non_negative)
            .unwrap_or(0.0)
    };
    let text = |field: &str| columns.get(record, field).map(str::to_string);

    let hr_zones: [String; HR_ZONE_COUNT] = HR_ZONES.map(|field| text(field).unwrap_or_default());

    Some(GpsSessionRecord {
        date,
        opposition_code: text(OPPOSITION_CODE).unwrap_or_else(|| "TRAINING".to_string()),
        opposition_full: text(OPPOSITION_FULL),
        season: text(SEASON).unwrap_or_else(|| season_for(date)),
        md_plus_code: text(MD_PLUS_CODE),
        md_minus_code: text(MD_MINUS_CODE),
        distance,
        distance_bands: DISTANCE_BANDS.map(optional_amount),
        accel_decel: ACCEL_DECEL.map(optional_amount),
        day_duration: optional_amount(DAY_DURATION),
        peak_speed,
        hr_zones,
    })
}

fn map_recovery(columns: &ColumnMap, record: &StringRecord) -> Option<RecoveryRecord> {
    use schema::recovery::*;

    let date = parse_date(columns.get(record, DATE)?)?;
    let categories = CATEGORY_COLUMNS.map(|(completeness, composite)| CategoryScore {
        completeness: columns
            .get_f64(record, completeness)
            .filter(|v| (0.0..=1.0).contains(v)),
        composite: columns.get_f64(record, composite),
    });

    Some(RecoveryRecord {
        date,
        categories,
        emboss_baseline_score: columns.get_f64(record, EMBOSS_BASELINE_SCORE),
    })
}

fn non_negative(value: f64) -> Option<f64> {
    (value >= 0.0).then_some(value)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use perf_core::models::RecoveryCategory;
    use std::io::Write;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── physical capability ───────────────────────────────────────────────────

    #[test]
    fn test_embedded_physical_sample() {
        let rows = load_embedded_physical().unwrap();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows.iter().filter(|r| r.benchmark_pct.is_none()).count(), 3);
        assert_eq!(rows[0].test_date, date(2024, 11, 12));
        assert_eq!(rows[0].movement, "agility");
        assert_eq!(rows[0].benchmark_pct, Some(0.6795));
    }

    #[test]
    fn test_physical_uppercase_legacy_header() {
        let csv = "Date,MOVEMENT,QUALITY,EXPRESSION,Score\n\
                   2024-02-01,jump,take off,dynamic,0.7\n";
        let rows = load_physical(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].movement, "jump");
        assert_eq!(rows[0].benchmark_pct, Some(0.7));
    }

    #[test]
    fn test_physical_without_benchmark_column() {
        let csv = "testDate,movement,quality,expression\n2024-02-01,jump,take off,dynamic\n";
        let rows = load_physical(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].benchmark_pct, None);
    }

    #[test]
    fn test_physical_invalid_benchmark_is_missing() {
        let csv = "testDate,movement,quality,expression,benchmarkPct\n\
                   2024-02-01,jump,take off,dynamic,n/a\n\
                   2024-02-02,jump,take off,dynamic,-0.3\n";
        let rows = load_physical(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.benchmark_pct.is_none()));
    }

    #[test]
    fn test_physical_malformed_rows_skipped() {
        let csv = "testDate,movement,quality,expression,benchmarkPct\n\
                   not-a-date,jump,take off,dynamic,0.5\n\
                   2024-02-01,,take off,dynamic,0.5\n\
                   2024-02-02,jump\n\
                   2024-02-03,jump,take off,dynamic,0.6\n";
        let rows = load_physical(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].test_date, date(2024, 2, 3));
    }

    #[test]
    fn test_physical_missing_required_column_is_fatal() {
        let csv = "testDate,movement,benchmarkPct\n2024-02-01,jump,0.5\n";
        let err = load_physical(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PerfError::MissingColumn { .. }));
    }

    #[test]
    fn test_physical_header_only() {
        let csv = "testDate,movement,quality,expression,benchmarkPct\n";
        assert!(load_physical(csv.as_bytes()).unwrap().is_empty());
    }

    // ── GPS ───────────────────────────────────────────────────────────────────

    const GPS_HEADER: &str = "date,opposition_code,season,distance,distance_over_21,\
distance_over_24,distance_over_27,accel_decel_over_2_5,accel_decel_over_3_5,\
accel_decel_over_4_5,day_duration,peak_speed,hr_zone_1_hms,hr_zone_2_hms,\
hr_zone_3_hms,hr_zone_4_hms,hr_zone_5_hms";

    #[test]
    fn test_gps_full_row() {
        let csv = format!(
            "{}\n2024-03-02,OPP04,2023-24,9100.5,1300,850,410,90,50,20,95,33.4,\
             00:12:00,00:20:30,00:25:00,00:10:00,00:02:00\n",
            GPS_HEADER
        );
        let rows = load_gps(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.date, date(2024, 3, 2));
        assert_eq!(r.opposition_code, "OPP04");
        assert_eq!(r.distance, 9100.5);
        assert_eq!(r.distance_bands, [1300.0, 850.0, 410.0]);
        assert_eq!(r.accel_decel, [90.0, 50.0, 20.0]);
        assert_eq!(r.peak_speed, 33.4);
        assert_eq!(r.hr_zone_minutes()[1], 20.5);
    }

    #[test]
    fn test_gps_minimal_header_fills_defaults() {
        let csv = "DATE,Distance,Peak_Speed\n2024-08-10,8000,31\n";
        let rows = load_gps(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.opposition_code, "TRAINING");
        assert_eq!(r.season, "2024-25");
        assert_eq!(r.accel_decel, [0.0; 3]);
        assert_eq!(r.hr_zone_minutes(), [0.0; 5]);
    }

    #[test]
    fn test_gps_malformed_duration_kept_as_text() {
        let csv = "date,distance,peak_speed,hr_zone_1_hms\n2024-08-10,8000,31,garbage\n";
        let rows = load_gps(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].hr_zones[0], "garbage");
        assert_eq!(rows[0].hr_zone_minutes()[0], 0.0);
    }

    #[test]
    fn test_gps_negative_distance_skipped() {
        let csv = "date,distance,peak_speed\n2024-08-10,-5,31\n2024-08-11,7000,30\n";
        let rows = load_gps(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, date(2024, 8, 11));
    }

    // ── recovery ──────────────────────────────────────────────────────────────

    #[test]
    fn test_recovery_partial_columns() {
        let csv = "date,sleep_completeness,sleep_composite,emboss_baseline_score\n\
                   2024-04-01,0.9,-0.12,0.05\n\
                   2024-04-02,1.7,,\n";
        let rows = load_recovery(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        let sleep = rows[0].score(RecoveryCategory::Sleep);
        assert_eq!(sleep.completeness, Some(0.9));
        assert_eq!(sleep.composite, Some(-0.12));
        assert_eq!(rows[0].emboss_baseline_score, Some(0.05));
        assert_eq!(rows[0].score(RecoveryCategory::Bio), CategoryScore::default());

        // Out-of-range completeness and empty cells become missing values.
        let sleep = rows[1].score(RecoveryCategory::Sleep);
        assert_eq!(sleep.completeness, None);
        assert_eq!(sleep.composite, None);
        assert_eq!(rows[1].emboss_baseline_score, None);
    }

    // ── files ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_open_source_missing_file() {
        let err = open_source(Path::new("/tmp/does-not-exist-perf-test.csv")).unwrap_err();
        assert!(matches!(err, PerfError::FileRead { .. }));
    }

    #[test]
    fn test_load_physical_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("physical.csv");
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", EMBEDDED_PHYSICAL_CSV).unwrap();

        let rows = load_physical(open_source(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 20);
    }
}
