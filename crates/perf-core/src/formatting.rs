//! Text formatting for the plain-text report.

/// Placeholder shown wherever a value cannot be computed from the data.
pub const INSUFFICIENT_DATA: &str = "insufficient data";

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use perf_core::formatting::format_number;
///
/// assert_eq!(format_number(8543.2, 0), "8,543");
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(-0.25, 2), "-0.25");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let factor = 10_f64.powi(decimals as i32);
    let abs_value = value.abs();
    // Nudge by the representation error so exact midpoints round away from zero.
    let scaled = (abs_value * factor + f64::EPSILON * abs_value * factor).round() as u64;

    let unit = factor as u64;
    let grouped = group_thousands(&(scaled / unit).to_string());
    let body = if decimals == 0 {
        grouped
    } else {
        format!(
            "{}.{:0width$}",
            grouped,
            scaled % unit,
            width = decimals as usize
        )
    };

    if negative && scaled != 0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Format a signed delta with an explicit `+` for non-negative values.
///
/// # Examples
///
/// ```
/// use perf_core::formatting::format_delta;
///
/// assert_eq!(format_delta(543.0, 0), "+543");
/// assert_eq!(format_delta(-1.25, 1), "-1.3");
/// ```
pub fn format_delta(value: f64, decimals: u32) -> String {
    let text = format_number(value, decimals);
    if text.starts_with('-') {
        text
    } else {
        format!("+{}", text)
    }
}

/// Format an optional value, rendering `None` as [`INSUFFICIENT_DATA`].
pub fn format_optional(value: Option<f64>, decimals: u32) -> String {
    match value {
        Some(v) if v.is_finite() => format_number(v, decimals),
        _ => INSUFFICIENT_DATA.to_string(),
    }
}

/// Format a fraction (`0.679`) as a percentage string (`"67.9%"`).
pub fn format_fraction_pct(fraction: f64, decimals: u32) -> String {
    format!("{}%", format_number(fraction * 100.0, decimals))
}

/// Format a duration in minutes as `"45m"`, `"3h"` or `"3h 45m"`.
pub fn format_time(minutes: f64) -> String {
    let total_mins = minutes.round() as i64;
    if total_mins < 60 {
        return format!("{}m", total_mins);
    }
    match (total_mins / 60, total_mins % 60) {
        (hours, 0) => format!("{}h", hours),
        (hours, mins) => format!("{}h {}m", hours, mins),
    }
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let offset = s.len() % 3;
    for (i, c) in s.chars().enumerate() {
        if i != 0 && i % 3 == offset {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
