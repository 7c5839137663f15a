//! Display formatting for values and deltas.
//!
//! Signs are decided on the value as it will be displayed: a delta that
//! rounds to zero is neutral and carries no sign.

use crate::diff::Delta;
use crate::types::Metric;

/// Direction of a displayed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    fn of(rounded: f64) -> Self {
        if rounded > 0.0 {
            Trend::Up
        } else if rounded < 0.0 {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }

    fn sign(&self) -> &'static str {
        match self {
            Trend::Up => "+",
            Trend::Down => "-",
            Trend::Neutral => "",
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Collapse -0.0 so it never renders as "-0".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Decimal hours as zero-padded `HH:MM:SS`. Negative input is rendered by
/// magnitude.
pub fn format_hours(hours: f64) -> String {
    clock((hours.abs() * 3600.0).round() as u64)
}

/// Difference in decimal hours with an explicit sign, e.g. `+01:30:00`.
pub fn format_hours_delta(hours: f64) -> String {
    let seconds = (hours * 3600.0).round();
    let trend = Trend::of(seconds);
    format!("{}{}", trend.sign(), clock(seconds.abs() as u64))
}

/// A percentage with one decimal, e.g. `87.5%`.
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", round_to(value, 1))
}

/// A percent change with an explicit sign, e.g. `+12.5%`, `-3.0%`, `0.0%`.
pub fn format_percent_delta(percent: f64) -> String {
    let rounded = round_to(percent, 1);
    let trend = Trend::of(rounded);
    format!("{}{:.1}%", trend.sign(), rounded.abs())
}

/// A change in percentage points, e.g. `+10.0 p.p.`.
pub fn format_points_delta(points: f64) -> String {
    let rounded = round_to(points, 1);
    let trend = Trend::of(rounded);
    format!("{}{:.1} p.p.", trend.sign(), rounded.abs())
}

/// A whole count.
pub fn format_count(value: f64) -> String {
    format!("{}", round_to(value, 0).abs() as u64)
}

/// A change in a count with an explicit sign, e.g. `+5`, `-3`, `0`.
pub fn format_count_delta(value: f64) -> String {
    let rounded = round_to(value, 0);
    let trend = Trend::of(rounded);
    format!("{}{}", trend.sign(), rounded.abs() as u64)
}

/// Format a metric value for display.
pub fn format_metric_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Adherence => format_percent(value),
        Metric::PlannedHours | Metric::DeliveredHours => format_hours(value),
        _ => format_count(value),
    }
}

/// Format the absolute part of a delta in the metric's own unit.
pub fn format_metric_delta(metric: Metric, delta: &Delta) -> String {
    match metric {
        Metric::Adherence => format_points_delta(delta.absolute),
        Metric::PlannedHours | Metric::DeliveredHours => format_hours_delta(delta.absolute),
        _ => format_count_delta(delta.absolute),
    }
}

/// Trend of a percent change as displayed.
pub fn percent_trend(percent: f64) -> Trend {
    Trend::of(round_to(percent, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(0.0), "00:00:00");
        assert_eq!(format_hours(1.5), "01:30:00");
        assert_eq!(format_hours(2.0 + 5.0 / 60.0 + 9.0 / 3600.0), "02:05:09");
        assert_eq!(format_hours(125.25), "125:15:00");
    }

    #[test]
    fn test_format_hours_delta_signs() {
        assert_eq!(format_hours_delta(1.5), "+01:30:00");
        assert_eq!(format_hours_delta(-0.5), "-00:30:00");
        assert_eq!(format_hours_delta(0.0), "00:00:00");
        assert_eq!(format_hours_delta(-0.0001), "00:00:00");
    }

    #[test]
    fn test_zero_delta_is_never_plus_zero() {
        for value in [0.0, -0.0, 0.01, -0.04] {
            let text = format_percent_delta(value);
            assert!(!text.starts_with('+'), "{} -> {}", value, text);
            assert!(!text.starts_with('-'), "{} -> {}", value, text);
        }
        assert_eq!(format_count_delta(0.0), "0");
        assert_eq!(format_points_delta(0.0), "0.0 p.p.");
    }

    #[test]
    fn test_signed_deltas() {
        assert_eq!(format_percent_delta(12.5), "+12.5%");
        assert_eq!(format_percent_delta(100.0), "+100.0%");
        assert_eq!(format_percent_delta(-3.04), "-3.0%");
        assert_eq!(format_count_delta(5.0), "+5");
        assert_eq!(format_count_delta(-3.0), "-3");
        assert_eq!(format_points_delta(10.0), "+10.0 p.p.");
    }

    #[test]
    fn test_format_metric() {
        let delta = Delta::between(80.0, 90.0);
        assert_eq!(format_metric_value(Metric::Adherence, 90.0), "90.0%");
        assert_eq!(format_metric_delta(Metric::Adherence, &delta), "+10.0 p.p.");
        assert_eq!(format_metric_value(Metric::PlannedHours, 1.0), "01:00:00");
        assert_eq!(format_metric_value(Metric::Offered, 12.0), "12");
        assert_eq!(percent_trend(0.04), Trend::Neutral);
        assert_eq!(percent_trend(-1.0), Trend::Down);
    }
}
