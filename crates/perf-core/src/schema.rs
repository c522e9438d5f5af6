//! Canonical column schemas and header normalisation.
//!
//! Source files spell the same column several ways (`MOVEMENT`, `movement`,
//! `Date` vs `testDate`). Each table declares its canonical fields once with
//! an ordered alias list, and [`TableSchema::resolve`] maps whatever header a
//! file carries onto those fields.

use std::collections::HashMap;

use csv::StringRecord;
use tracing::debug;

use crate::error::{PerfError, Result};

// ── FieldSpec / TableSchema ───────────────────────────────────────────────────

/// One canonical field and the header spellings that resolve to it.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical field name.
    pub name: &'static str,
    /// Additional spellings, in priority order after `name`.
    pub aliases: &'static [&'static str],
    /// Whether a header without this column is rejected.
    pub required: bool,
}

impl FieldSpec {
    const fn required(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases, required: true }
    }

    const fn optional(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases, required: false }
    }

    fn candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

/// The canonical schema of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    /// Table label used in error messages.
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Reduce a header to its comparison key: lowercase, without spaces,
/// underscores, hyphens or a leading byte-order mark.
pub fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl TableSchema {
    /// Map `headers` onto this schema's canonical fields.
    ///
    /// For each field the candidates are tried in order (canonical name first,
    /// then aliases) and the first header matching a candidate wins.
    pub fn resolve<'a, I>(&self, headers: I) -> Result<ColumnMap>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let normalized: Vec<String> = headers.into_iter().map(normalize_header).collect();
        let mut indices = HashMap::new();

        for field in self.fields {
            let found = field.candidates().find_map(|candidate| {
                let key = normalize_header(candidate);
                normalized.iter().position(|h| *h == key)
            });

            match found {
                Some(idx) => {
                    indices.insert(field.name, idx);
                }
                None if field.required => {
                    return Err(PerfError::MissingColumn {
                        table: self.table,
                        column: field.name,
                    });
                }
                None => debug!("{} data has no '{}' column", self.table, field.name),
            }
        }

        Ok(ColumnMap { indices })
    }
}

// ── ColumnMap ─────────────────────────────────────────────────────────────────

/// Resolved positions of canonical fields inside a CSV record.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    indices: HashMap<&'static str, usize>,
}

impl ColumnMap {
    /// `true` when the source header carried `field`.
    pub fn has(&self, field: &str) -> bool {
        self.indices.contains_key(field)
    }

    /// Trimmed cell for `field`, or `None` when the column is absent or the
    /// cell is empty.
    pub fn get<'r>(&self, record: &'r StringRecord, field: &str) -> Option<&'r str> {
        let idx = *self.indices.get(field)?;
        let value = record.get(idx)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Cell for `field` parsed as a finite float.
    pub fn get_f64(&self, record: &StringRecord, field: &str) -> Option<f64> {
        self.get(record, field)?
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

// ── Canonical schemas ─────────────────────────────────────────────────────────

/// Canonical field names of the physical-capability table.
pub mod physical {
    pub const TEST_DATE: &str = "testDate";
    pub const MOVEMENT: &str = "movement";
    pub const QUALITY: &str = "quality";
    pub const EXPRESSION: &str = "expression";
    pub const BENCHMARK_PCT: &str = "benchmarkPct";
}

pub const PHYSICAL_SCHEMA: TableSchema = TableSchema {
    table: "physical capability",
    fields: &[
        FieldSpec::required(physical::TEST_DATE, &["date", "test_date"]),
        FieldSpec::required(physical::MOVEMENT, &[]),
        FieldSpec::required(physical::QUALITY, &[]),
        FieldSpec::required(physical::EXPRESSION, &[]),
        FieldSpec::optional(physical::BENCHMARK_PCT, &["benchmark", "score"]),
    ],
};

/// Canonical field names of the GPS session table.
pub mod gps {
    pub const DATE: &str = "date";
    pub const OPPOSITION_CODE: &str = "opposition_code";
    pub const OPPOSITION_FULL: &str = "opposition_full";
    pub const SEASON: &str = "season";
    pub const MD_PLUS_CODE: &str = "md_plus_code";
    pub const MD_MINUS_CODE: &str = "md_minus_code";
    pub const DISTANCE: &str = "distance";
    pub const DISTANCE_BANDS: [&str; 3] = ["distance_over_21", "distance_over_24", "distance_over_27"];
    pub const ACCEL_DECEL: [&str; 3] = [
        "accel_decel_over_2_5",
        "accel_decel_over_3_5",
        "accel_decel_over_4_5",
    ];
    pub const DAY_DURATION: &str = "day_duration";
    pub const PEAK_SPEED: &str = "peak_speed";
    pub const HR_ZONES: [&str; 5] = [
        "hr_zone_1_hms",
        "hr_zone_2_hms",
        "hr_zone_3_hms",
        "hr_zone_4_hms",
        "hr_zone_5_hms",
    ];
}

pub const GPS_SCHEMA: TableSchema = TableSchema {
    table: "GPS",
    fields: &[
        FieldSpec::required(gps::DATE, &["session_date"]),
        FieldSpec::optional(gps::OPPOSITION_CODE, &["opposition"]),
        FieldSpec::optional(gps::OPPOSITION_FULL, &[]),
        FieldSpec::optional(gps::SEASON, &[]),
        FieldSpec::optional(gps::MD_PLUS_CODE, &[]),
        FieldSpec::optional(gps::MD_MINUS_CODE, &[]),
        FieldSpec::required(gps::DISTANCE, &["total_distance"]),
        FieldSpec::optional(gps::DISTANCE_BANDS[0], &[]),
        FieldSpec::optional(gps::DISTANCE_BANDS[1], &[]),
        FieldSpec::optional(gps::DISTANCE_BANDS[2], &[]),
        FieldSpec::optional(gps::ACCEL_DECEL[0], &[]),
        FieldSpec::optional(gps::ACCEL_DECEL[1], &[]),
        FieldSpec::optional(gps::ACCEL_DECEL[2], &[]),
        FieldSpec::optional(gps::DAY_DURATION, &[]),
        FieldSpec::required(gps::PEAK_SPEED, &["max_speed"]),
        FieldSpec::optional(gps::HR_ZONES[0], &["hr_zone_1"]),
        FieldSpec::optional(gps::HR_ZONES[1], &["hr_zone_2"]),
        FieldSpec::optional(gps::HR_ZONES[2], &["hr_zone_3"]),
        FieldSpec::optional(gps::HR_ZONES[3], &["hr_zone_4"]),
        FieldSpec::optional(gps::HR_ZONES[4], &["hr_zone_5"]),
    ],
};

/// Canonical field names of the recovery table.
pub mod recovery {
    pub const DATE: &str = "date";
    pub const EMBOSS_BASELINE_SCORE: &str = "emboss_baseline_score";
    /// `(completeness, composite)` column pairs, in `RecoveryCategory` order.
    pub const CATEGORY_COLUMNS: [(&str, &str); 6] = [
        ("bio_completeness", "bio_composite"),
        ("msk_joint_range_completeness", "msk_joint_range_composite"),
        ("msk_load_tolerance_completeness", "msk_load_tolerance_composite"),
        ("subjective_completeness", "subjective_composite"),
        ("soreness_completeness", "soreness_composite"),
        ("sleep_completeness", "sleep_composite"),
    ];
}

pub const RECOVERY_SCHEMA: TableSchema = TableSchema {
    table: "recovery",
    fields: &[
        FieldSpec::required(recovery::DATE, &["sessionDate"]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[0].0, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[0].1, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[1].0, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[1].1, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[2].0, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[2].1, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[3].0, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[3].1, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[4].0, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[4].1, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[5].0, &[]),
        FieldSpec::optional(recovery::CATEGORY_COLUMNS[5].1, &[]),
        FieldSpec::optional(recovery::EMBOSS_BASELINE_SCORE, &["baseline_score"]),
    ],
};

// ── Tests ─────────────────────────────────────────────────────────────────────
