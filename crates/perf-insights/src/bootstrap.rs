use std::path::PathBuf;

use anyhow::{bail, Context};
use perf_core::settings::Settings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name to an `EnvFilter` directive.
pub fn filter_directive(log_level: &str) -> &str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "warn",
    }
}

/// Initialise the global `tracing` subscriber on stderr.
///
/// Output goes to stderr so a JSON report on stdout stays machine-readable.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("failed to initialise logging")?;

    Ok(())
}

// ── Input checks ───────────────────────────────────────────────────────────────

/// Every CSV path given on the command line.
fn input_paths(settings: &Settings) -> Vec<(&'static str, &PathBuf)> {
    [
        ("--physical-csv", settings.physical_csv.as_ref()),
        ("--gps-csv", settings.gps_csv.as_ref()),
        ("--recovery-csv", settings.recovery_csv.as_ref()),
    ]
    .into_iter()
    .filter_map(|(flag, path)| Some((flag, path?)))
    .collect()
}

/// Fail early, naming the flag, when a configured input is not a file.
pub fn check_inputs(settings: &Settings) -> anyhow::Result<()> {
    for (flag, path) in input_paths(settings) {
        if !path.is_file() {
            bail!("{} {} is not a readable file", flag, path.display());
        }
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
