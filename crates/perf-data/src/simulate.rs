//! Deterministic simulated GPS and recovery tables.
//!
//! Used when no source file is configured. The same seed always produces the
//! same tables so dashboards and tests are reproducible.

use chrono::NaiveDate;
use perf_core::models::{CategoryScore, GpsSessionRecord, RecoveryRecord};
use perf_core::time_utils::season_for;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::debug;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

const OPPONENTS: [&str; 4] = ["Arsenal", "Liverpool", "Manchester City", "Tottenham"];

/// Minutes-in-zone ranges (`[lo, hi)`) for heart-rate zones 1..=5.
const HR_ZONE_MINUTES: [(u32, u32); 5] = [(5, 20), (10, 30), (15, 40), (5, 25), (0, 10)];

/// Completeness range and composite standard deviation per recovery category,
/// in `RecoveryCategory` order.
const RECOVERY_PROFILE: [((f64, f64), f64); 6] = [
    ((0.70, 1.0), 0.20),
    ((0.80, 1.0), 0.15),
    ((0.75, 1.0), 0.18),
    ((0.85, 1.0), 0.25),
    ((0.90, 1.0), 0.20),
    ((0.80, 1.0), 0.30),
];

// ── SimulationConfig ──────────────────────────────────────────────────────────

/// Calendar and seed for the simulated tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub seed: u64,
    /// First simulated day (inclusive).
    pub start: NaiveDate,
    /// Last simulated day (inclusive).
    pub end: NaiveDate,
}

impl SimulationConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            start: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap_or_default(),
        }
    }
}

// ── Sampler ───────────────────────────────────────────────────────────────────

struct Sampler {
    rng: StdRng,
}

impl Sampler {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        self.rng.gen_range(lo..hi)
    }

    fn int(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }

    /// Normal draw; an invalid `sd` yields the mean.
    fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        Normal::new(mean, sd).map_or(mean, |n| n.sample(&mut self.rng))
    }

    fn positive_normal(&mut self, mean: f64, sd: f64) -> f64 {
        self.normal(mean, sd).max(0.0)
    }

    fn match_day_code(&mut self, sign: char) -> Option<String> {
        self.chance(0.3)
            .then(|| format!("MD{}{}", sign, self.int(1, 4)))
    }
}

// ── Generators ────────────────────────────────────────────────────────────────

/// Simulate GPS sessions: roughly every other day carries a session, about a
/// third of them matches.
pub fn simulate_gps(config: &SimulationConfig) -> Vec<GpsSessionRecord> {
    let mut s = Sampler::new(config.seed);
    let mut rows = Vec::new();

    for date in config.days() {
        if !s.chance(0.5) {
            continue;
        }

        let (opposition_code, opposition_full) = if s.chance(0.3) {
            let code = format!("OPP{:02}", s.int(1, 20));
            let name = OPPONENTS[s.int(0, OPPONENTS.len() as u32) as usize];
            (code, name.to_string())
        } else {
            ("TRAINING".to_string(), "Training Session".to_string())
        };

        let hr_zones = HR_ZONE_MINUTES.map(|(lo, hi)| {
            format!("00:{:02}:{:02}", s.int(lo, hi), s.int(0, 59))
        });

        rows.push(GpsSessionRecord {
            date,
            opposition_code,
            opposition_full: Some(opposition_full),
            season: season_for(date),
            md_plus_code: s.match_day_code('+'),
            md_minus_code: s.match_day_code('-'),
            distance: s.positive_normal(8_500.0, 1_500.0),
            distance_bands: [
                s.positive_normal(1_200.0, 300.0),
                s.positive_normal(800.0, 200.0),
                s.positive_normal(400.0, 100.0),
            ],
            accel_decel: [
                f64::from(s.int(40, 120)),
                f64::from(s.int(20, 80)),
                f64::from(s.int(5, 40)),
            ],
            day_duration: f64::from(s.int(60, 120)),
            peak_speed: s.positive_normal(32.0, 3.0),
            hr_zones,
        });
    }

    debug!("simulated {} GPS sessions (seed {})", rows.len(), config.seed);
    rows
}

/// Simulate one recovery record per calendar day.
pub fn simulate_recovery(config: &SimulationConfig) -> Vec<RecoveryRecord> {
    let mut s = Sampler::new(config.seed);

    let rows: Vec<RecoveryRecord> = config
        .days()
        .map(|date| {
            let categories = RECOVERY_PROFILE.map(|((lo, hi), sd)| CategoryScore {
                completeness: Some(s.uniform(lo, hi)),
                composite: Some(s.normal(0.0, sd)),
            });
            RecoveryRecord {
                date,
                categories,
                emboss_baseline_score: Some(s.normal(0.0, 0.15)),
            }
        })
        .collect();

    debug!("simulated {} recovery days (seed {})", rows.len(), config.seed);
    rows
}

// ── Tests ─────────────────────────────────────────────────────────────────────
