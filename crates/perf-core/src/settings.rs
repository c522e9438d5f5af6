use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::error::{PerfError, Result};
use crate::models::RecoveryCategory;
use crate::time_utils::parse_date;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Athlete physical performance and recovery insights
#[derive(Parser, Debug, Clone)]
#[command(
    name = "perf-insights",
    about = "Athlete physical performance and recovery insights",
    version
)]
pub struct Settings {
    /// Physical capability CSV (the embedded sample is used when omitted)
    #[arg(long)]
    pub physical_csv: Option<PathBuf>,

    /// GPS session CSV (simulated when omitted)
    #[arg(long)]
    pub gps_csv: Option<PathBuf>,

    /// Recovery score CSV (simulated when omitted)
    #[arg(long)]
    pub recovery_csv: Option<PathBuf>,

    /// Seed for the simulated tables
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// First day of the analysis window (defaults to the first GPS session)
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Last day of the analysis window (defaults to the last GPS session)
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,

    /// Seasons to include (all when omitted)
    #[arg(long = "season", value_delimiter = ',')]
    pub seasons: Vec<String>,

    /// Movements to include (all when omitted)
    #[arg(long = "movement", value_delimiter = ',')]
    pub movements: Vec<String>,

    /// Qualities to include (all when omitted)
    #[arg(long = "quality", value_delimiter = ',')]
    pub qualities: Vec<String>,

    /// Expressions to include (all when omitted)
    #[arg(long = "expression", value_delimiter = ',')]
    pub expressions: Vec<String>,

    /// Quality shown in the performance trend
    #[arg(long)]
    pub focus_quality: Option<String>,

    /// Recovery categories shown in the evolution chart
    #[arg(long = "category", value_delimiter = ',', value_parser = parse_category_arg)]
    pub categories: Vec<RecoveryCategory>,

    /// Minimum number of tests for a movement to appear in the comparison
    #[arg(long, default_value = "3")]
    pub min_group_count: usize,

    /// Percentile above which a day-to-day change is flagged as a peak
    #[arg(long, default_value = "95", value_parser = parse_percentile_arg)]
    pub peak_percentile: f64,

    /// Percentile below which a day-to-day change is flagged as a drop
    #[arg(long, default_value = "5", value_parser = parse_percentile_arg)]
    pub drop_percentile: f64,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Check cross-field constraints that clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.drop_percentile >= self.peak_percentile {
            return Err(PerfError::Config(format!(
                "drop percentile ({}) must be below peak percentile ({})",
                self.drop_percentile, self.peak_percentile
            )));
        }
        Ok(())
    }

    /// Logging level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// `true` when the JSON report was requested.
    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }
}

// ── Value parsers ──────────────────────────────────────────────────────────────

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("unrecognised date '{}' (expected YYYY-MM-DD)", s))
}

fn parse_category_arg(s: &str) -> std::result::Result<RecoveryCategory, String> {
    RecoveryCategory::parse(s).ok_or_else(|| {
        let known: Vec<&str> = RecoveryCategory::ALL.iter().map(|c| c.key()).collect();
        format!("unknown recovery category '{}' (one of {})", s, known.join(", "))
    })
}

fn parse_percentile_arg(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("percentile must be within 0..=100, got {}", value))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Settings {
        let mut full = vec!["perf-insights"];
        full.extend_from_slice(args);
        Settings::try_parse_from(full).expect("arguments should parse")
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]);
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.min_group_count, 3);
        assert_eq!(settings.peak_percentile, 95.0);
        assert_eq!(settings.drop_percentile, 5.0);
        assert_eq!(settings.format, "text");
        assert!(settings.from.is_none());
        assert!(settings.seasons.is_empty());
        assert!(settings.physical_csv.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_date_range_arguments() {
        let settings = parse(&["--from", "2024-01-01", "--to", "31/03/2024"]);
        assert_eq!(settings.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(settings.to, NaiveDate::from_ymd_opt(2024, 3, 31));
    }

    #[test]
    fn test_invalid_date_rejected() {
        let result = Settings::try_parse_from(["perf-insights", "--from", "someday"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_multi_select_delimited_and_repeated() {
        let settings = parse(&[
            "--season",
            "2023-24,2024-25",
            "--movement",
            "jump",
            "--movement",
            "sprint",
            "--quality",
            "take off",
        ]);
        assert_eq!(settings.seasons, vec!["2023-24", "2024-25"]);
        assert_eq!(settings.movements, vec!["jump", "sprint"]);
        assert_eq!(settings.qualities, vec!["take off"]);
    }

    #[test]
    fn test_categories_parsed() {
        let settings = parse(&["--category", "sleep,Msk Joint Range"]);
        assert_eq!(
            settings.categories,
            vec![RecoveryCategory::Sleep, RecoveryCategory::MskJointRange]
        );
    }

    #[test]
    fn test_unknown_category_rejected() {
        let result = Settings::try_parse_from(["perf-insights", "--category", "hydration"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_percentile_range_enforced() {
        let result = Settings::try_parse_from(["perf-insights", "--peak-percentile", "120"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_percentile_order() {
        let settings = parse(&["--peak-percentile", "10", "--drop-percentile", "20"]);
        assert!(matches!(settings.validate(), Err(PerfError::Config(_))));
    }

    #[test]
    fn test_format_restricted() {
        assert!(parse(&["--format", "json"]).wants_json());
        assert!(Settings::try_parse_from(["perf-insights", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let settings = parse(&["--log-level", "ERROR", "--debug"]);
        assert_eq!(settings.effective_log_level(), "DEBUG");
        let settings = parse(&["--log-level", "ERROR"]);
        assert_eq!(settings.effective_log_level(), "ERROR");
    }
}
