//! Plain-text rendering of [`DashboardOutputs`].

use std::collections::BTreeMap;
use std::fmt::Write;

use perf_core::formatting::{
    format_delta, format_fraction_pct, format_number, format_optional, format_time,
    INSUFFICIENT_DATA,
};
use perf_data::aggregator::{ChangeKind, SeriesPoint};
use perf_data::analysis::{DISTANCE_TARGET_M, PEAK_SPEED_REFERENCE_KMH};
use perf_runtime::pipeline::DashboardOutputs;

// ── Sections ──────────────────────────────────────────────────────────────────

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}\n{}", title, "─".repeat(title.chars().count()));
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| INSUFFICIENT_DATA.to_string(), |v| format_fraction_pct(v, 1))
}

/// Per-series totals, in first-seen order.
fn series_totals(points: &[SeriesPoint]) -> Vec<(&str, f64)> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for p in points {
        let entry = totals.entry(p.series.as_str()).or_insert_with(|| {
            order.push(p.series.as_str());
            0.0
        });
        *entry += p.value;
    }
    order.into_iter().map(|s| (s, totals[s])).collect()
}

fn overview(out: &mut String, o: &DashboardOutputs) {
    let m = &o.overview.metrics;
    heading(out, "Overview");
    let _ = writeln!(
        out,
        "  Average distance     {} m ({} vs {} m target)",
        format_optional(m.avg_distance, 0),
        m.distance_vs_target
            .map_or_else(|| INSUFFICIENT_DATA.to_string(), |d| format_delta(d, 0)),
        format_number(DISTANCE_TARGET_M, 0),
    );
    let _ = writeln!(
        out,
        "  Average peak speed   {} km/h ({} vs {} km/h reference)",
        format_optional(m.avg_peak_speed, 1),
        m.peak_speed_vs_reference
            .map_or_else(|| INSUFFICIENT_DATA.to_string(), |d| format_delta(d, 1)),
        format_number(PEAK_SPEED_REFERENCE_KMH, 0),
    );
    let _ = writeln!(
        out,
        "  Recovery (last 7)    {} ({})",
        m.recovery_status.map_or(INSUFFICIENT_DATA, |s| s.label()),
        format_optional(m.recent_recovery, 2),
    );
    let _ = writeln!(out, "  Physical tests       {}", m.physical_tests);
}

fn gps(out: &mut String, o: &DashboardOutputs) {
    let g = &o.gps;
    heading(out, "GPS");
    let _ = writeln!(out, "  Sessions             {}", g.sessions);
    if let Some(bin) = g.distance_histogram.iter().max_by_key(|b| b.count) {
        let _ = writeln!(
            out,
            "  Most common distance {}-{} m ({} sessions)",
            format_number(bin.lower, 0),
            format_number(bin.upper, 0),
            bin.count
        );
    }
    if let Some(top) = g
        .speed_points
        .iter()
        .max_by(|a, b| a.peak_speed.total_cmp(&b.peak_speed))
    {
        let _ = writeln!(
            out,
            "  Top peak speed       {} km/h on {} ({})",
            format_number(top.peak_speed, 1),
            top.date,
            top.opposition_code
        );
    }
    for (series, total) in series_totals(&g.accel_decel) {
        let _ = writeln!(out, "  {:<20} {}", series, format_number(total, 0));
    }
    for (zone, minutes) in series_totals(&g.hr_zones) {
        let _ = writeln!(out, "  {:<20} {}", zone, format_time(minutes));
    }
}

fn physical(out: &mut String, o: &DashboardOutputs) {
    let p = &o.physical;
    heading(out, "Physical capability");
    let _ = writeln!(out, "  Tests                {}", p.tests);

    let _ = writeln!(
        out,
        "  By movement (objective {}):",
        format_fraction_pct(p.benchmark_objective, 0)
    );
    if p.movement_performance.is_empty() {
        let _ = writeln!(out, "    {}", INSUFFICIENT_DATA);
    }
    for g in &p.movement_performance {
        let _ = writeln!(out, "    {:<18} {:>8}  n={}", g.key, pct(g.mean), g.count);
    }

    let _ = writeln!(out, "  By expression:");
    for g in &p.expression_share {
        let _ = writeln!(out, "    {:<18} {:>8}  n={}", g.key, pct(g.mean), g.count);
    }

    let trend = &p.quality_trend;
    if let Some(quality) = &trend.quality {
        let slope = trend.trendline.as_ref().map(|t| {
            format!(
                "{} to {}",
                format_fraction_pct(t.start.1, 1),
                format_fraction_pct(t.end.1, 1)
            )
        });
        let _ = writeln!(
            out,
            "  Trend ({}): {} tests, {}",
            quality,
            trend.tests.len(),
            slope.as_deref().unwrap_or(INSUFFICIENT_DATA)
        );
    }

    for change in &p.peaks_and_drops.points {
        let label = match change.kind {
            Some(ChangeKind::Peak) => "Peak",
            Some(ChangeKind::Drop) => "Drop",
            None => continue,
        };
        let _ = writeln!(
            out,
            "  {} on {}: {} ({})",
            label,
            change.date,
            format_fraction_pct(change.value, 1),
            change.diff.map_or_else(String::new, |d| format_delta(d * 100.0, 1)),
        );
    }

    let corr = &p.correlation;
    for (i, a) in corr.labels.iter().enumerate() {
        for (j, b) in corr.labels.iter().enumerate().skip(i + 1) {
            let _ = writeln!(
                out,
                "  r({}, {}) = {}",
                a,
                b,
                format_optional(corr.values[i][j], 2)
            );
        }
    }
}

fn recovery(out: &mut String, o: &DashboardOutputs) {
    let r = &o.recovery;
    heading(out, "Recovery");
    let Some(latest) = &r.latest else {
        let _ = writeln!(out, "  {}", INSUFFICIENT_DATA);
        return;
    };
    let _ = writeln!(
        out,
        "  Status on {}        {} ({})",
        latest.date,
        latest.status.map_or(INSUFFICIENT_DATA, |s| s.label()),
        format_optional(latest.score, 2)
    );
    for c in &latest.categories {
        let _ = writeln!(
            out,
            "    {:<18} composite {:>8}  completeness {}",
            c.label,
            format_optional(c.composite, 2),
            pct(c.completeness)
        );
    }
}

/// Human-readable report of every dashboard section.
pub fn render_text(outputs: &DashboardOutputs) -> String {
    let mut out = String::new();
    if let Some(range) = outputs.date_range {
        let _ = writeln!(out, "Athlete performance {} to {}", range.start(), range.end());
    }
    overview(&mut out, outputs);
    gps(&mut out, outputs);
    physical(&mut out, outputs);
    recovery(&mut out, outputs);
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
