mod bootstrap;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use perf_core::settings::Settings;
use perf_runtime::data_manager::DataContext;
use perf_runtime::pipeline::{render, DashboardState};

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level())?;
    settings.validate()?;
    bootstrap::check_inputs(&settings)?;

    tracing::info!("perf-insights v{} starting", env!("CARGO_PKG_VERSION"));

    let context = DataContext::from_settings(&settings);
    let state = DashboardState::from_settings(&settings, &context)
        .context("failed to load input tables")?;
    tracing::debug!(?state, "dashboard selections");

    let outputs = render(&context, &state).context("failed to render dashboard")?;

    if settings.wants_json() {
        let json = serde_json::to_string_pretty(&outputs).context("failed to serialize report")?;
        println!("{}", json);
    } else {
        print!("{}", report::render_text(&outputs));
    }

    Ok(())
}
