use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time_utils::hms_to_minutes;

// ── Record traits ─────────────────────────────────────────────────────────────

/// A record placed on the shared date axis.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// A record that exposes categorical fields for set-membership filtering.
///
/// Returns `None` for fields the record type does not carry.
pub trait Categorized {
    fn category(&self, field: CategoryField) -> Option<&str>;
}

// ── CategoryField ─────────────────────────────────────────────────────────────

/// Categorical fields that can take part in a multi-select filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryField {
    Season,
    OppositionCode,
    Movement,
    Quality,
    Expression,
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CategoryField::Season => "season",
            CategoryField::OppositionCode => "opposition_code",
            CategoryField::Movement => "movement",
            CategoryField::Quality => "quality",
            CategoryField::Expression => "expression",
        };
        f.write_str(name)
    }
}

// ── PhysicalCapabilityRecord ──────────────────────────────────────────────────

/// A single physical-capability test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalCapabilityRecord {
    /// Day the test was performed.
    pub test_date: NaiveDate,
    /// Movement axis, e.g. `"jump"`.
    pub movement: String,
    /// Quality axis, e.g. `"take off"`.
    pub quality: String,
    /// Expression axis, e.g. `"isometric"`.
    pub expression: String,
    /// Score as a fraction of the reference standard. `None` for a missed test.
    pub benchmark_pct: Option<f64>,
}

impl Dated for PhysicalCapabilityRecord {
    fn date(&self) -> NaiveDate {
        self.test_date
    }
}

impl Categorized for PhysicalCapabilityRecord {
    fn category(&self, field: CategoryField) -> Option<&str> {
        match field {
            CategoryField::Movement => Some(&self.movement),
            CategoryField::Quality => Some(&self.quality),
            CategoryField::Expression => Some(&self.expression),
            CategoryField::Season | CategoryField::OppositionCode => None,
        }
    }
}

// ── GpsSessionRecord ──────────────────────────────────────────────────────────

/// Acceleration/deceleration thresholds (m/s²) for the three count buckets.
pub const ACCEL_DECEL_THRESHOLDS: [f64; 3] = [2.5, 3.5, 4.5];

/// Speed thresholds (km/h) for the three high-speed distance bands.
pub const DISTANCE_BAND_THRESHOLDS: [u32; 3] = [21, 24, 27];

/// Number of heart-rate zones tracked per session.
pub const HR_ZONE_COUNT: usize = 5;

/// One GPS-tracked training or match day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsSessionRecord {
    pub date: NaiveDate,
    /// `"TRAINING"` or an opposition code such as `"OPP07"`.
    pub opposition_code: String,
    #[serde(default)]
    pub opposition_full: Option<String>,
    /// Season label, e.g. `"2024-25"`.
    pub season: String,
    /// Days after the previous match, e.g. `"MD+2"`.
    #[serde(default)]
    pub md_plus_code: Option<String>,
    /// Days before the next match, e.g. `"MD-1"`.
    #[serde(default)]
    pub md_minus_code: Option<String>,
    /// Total distance in metres.
    pub distance: f64,
    /// Distance covered above 21, 24 and 27 km/h, in metres.
    pub distance_bands: [f64; 3],
    /// Acceleration/deceleration counts above 2.5, 3.5 and 4.5 m/s².
    pub accel_decel: [f64; 3],
    /// Session length in minutes.
    pub day_duration: f64,
    /// Peak speed in km/h.
    pub peak_speed: f64,
    /// Time in each heart-rate zone, text-encoded as `HH:MM:SS`.
    pub hr_zones: [String; HR_ZONE_COUNT],
}

impl GpsSessionRecord {
    /// Heart-rate zone durations converted to minutes (malformed text → 0).
    pub fn hr_zone_minutes(&self) -> [f64; HR_ZONE_COUNT] {
        let mut minutes = [0.0; HR_ZONE_COUNT];
        for (slot, text) in minutes.iter_mut().zip(self.hr_zones.iter()) {
            *slot = hms_to_minutes(text);
        }
        minutes
    }

    /// `true` when the session was played against an opponent.
    pub fn is_match(&self) -> bool {
        self.opposition_code != "TRAINING"
    }
}

impl Dated for GpsSessionRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Categorized for GpsSessionRecord {
    fn category(&self, field: CategoryField) -> Option<&str> {
        match field {
            CategoryField::Season => Some(&self.season),
            CategoryField::OppositionCode => Some(&self.opposition_code),
            CategoryField::Movement | CategoryField::Quality | CategoryField::Expression => None,
        }
    }
}

// ── Recovery ──────────────────────────────────────────────────────────────────

/// The six recovery categories scored each day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryCategory {
    Bio,
    MskJointRange,
    MskLoadTolerance,
    Subjective,
    Soreness,
    Sleep,
}

impl RecoveryCategory {
    pub const ALL: [RecoveryCategory; 6] = [
        RecoveryCategory::Bio,
        RecoveryCategory::MskJointRange,
        RecoveryCategory::MskLoadTolerance,
        RecoveryCategory::Subjective,
        RecoveryCategory::Soreness,
        RecoveryCategory::Sleep,
    ];

    /// Column prefix used in source files, e.g. `"msk_joint_range"`.
    pub fn key(self) -> &'static str {
        match self {
            RecoveryCategory::Bio => "bio",
            RecoveryCategory::MskJointRange => "msk_joint_range",
            RecoveryCategory::MskLoadTolerance => "msk_load_tolerance",
            RecoveryCategory::Subjective => "subjective",
            RecoveryCategory::Soreness => "soreness",
            RecoveryCategory::Sleep => "sleep",
        }
    }

    /// Human-readable label, e.g. `"Msk Joint Range"`.
    pub fn label(self) -> &'static str {
        match self {
            RecoveryCategory::Bio => "Bio",
            RecoveryCategory::MskJointRange => "Msk Joint Range",
            RecoveryCategory::MskLoadTolerance => "Msk Load Tolerance",
            RecoveryCategory::Subjective => "Subjective",
            RecoveryCategory::Soreness => "Soreness",
            RecoveryCategory::Sleep => "Sleep",
        }
    }

    /// Position of the category inside [`RecoveryRecord::categories`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve a key or label (case-insensitive, `_`/space agnostic).
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        let wanted = wanted.strip_suffix("_composite").unwrap_or(&wanted);
        Self::ALL.into_iter().find(|c| c.key() == wanted)
    }
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Completeness and composite score for one category on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Fraction of expected sub-measurements recorded, in `[0, 1]`.
    pub completeness: Option<f64>,
    /// Signed composite score.
    pub composite: Option<f64>,
}

/// Daily recovery scores across all categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub date: NaiveDate,
    /// Indexed by [`RecoveryCategory::index`].
    pub categories: [CategoryScore; 6],
    /// Overall recovery score relative to the athlete's baseline.
    pub emboss_baseline_score: Option<f64>,
}

impl RecoveryRecord {
    pub fn score(&self, category: RecoveryCategory) -> CategoryScore {
        self.categories[category.index()]
    }
}

impl Dated for RecoveryRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Categorized for RecoveryRecord {
    fn category(&self, _field: CategoryField) -> Option<&str> {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
