use crate::AlertCandidate;
use gridmon_common::types::{MetricType, Severity};

/// Maximum number of recent readings inspected per metric type.
pub const PATTERN_WINDOW: usize = 10;

/// Metric types with meaningful waveform behavior. Current and power
/// factor are derived/banded quantities and are not pattern-checked.
pub const PATTERN_METRICS: [MetricType; 4] = [
    MetricType::Voltage,
    MetricType::Frequency,
    MetricType::Power,
    MetricType::Temperature,
];

const RAPID_CHANGE_THRESHOLD_PCT: f64 = 15.0;
const MIN_DIRECTION_REVERSALS: usize = 3;
const OUTSIDE_RANGE_FRACTION: f64 = 0.8;

/// Compares the two newest readings and returns the percentage change rate
/// when it exceeds the threshold. Values are newest-first. Requires at
/// least 3 readings; a near-zero previous value is treated as not detected
/// rather than producing an infinite rate.
pub fn rapid_change(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let latest = values[0];
    let previous = values[1];
    if previous.abs() < f64::EPSILON {
        return None;
    }
    let rate = ((latest - previous) / previous).abs() * 100.0;
    (rate > RAPID_CHANGE_THRESHOLD_PCT).then_some(rate)
}

/// Counts direction reversals across consecutive triplets; at least 3
/// reversals within the window indicates oscillation. Requires at least
/// 5 readings.
pub fn oscillation(values: &[f64]) -> bool {
    if values.len() < 5 {
        return false;
    }
    let mut reversals = 0;
    for i in 1..values.len() - 1 {
        let older_falling = values[i] > values[i + 1];
        let newer_falling = values[i - 1] > values[i];
        if older_falling != newer_falling {
            reversals += 1;
        }
    }
    reversals >= MIN_DIRECTION_REVERSALS
}

/// The normal operating range per metric type. Power is unconstrained
/// below its (dynamic, capacity-dependent) ceiling, so only negative
/// readings count as out of range.
fn normal_range(metric_type: MetricType) -> Option<(f64, f64)> {
    match metric_type {
        MetricType::Voltage => Some((220.0, 240.0)),
        MetricType::Frequency => Some((49.8, 50.2)),
        MetricType::Temperature => Some((20.0, 50.0)),
        MetricType::Power => Some((0.0, f64::INFINITY)),
        _ => None,
    }
}

/// Detected when at least 80% of the sampled readings fall outside the
/// metric's normal range. Requires at least 5 readings.
pub fn sustained_deviation(values: &[f64], metric_type: MetricType) -> bool {
    if values.len() < 5 {
        return false;
    }
    let Some((min, max)) = normal_range(metric_type) else {
        return false;
    };
    let outside = values.iter().filter(|v| **v < min || **v > max).count();
    outside >= (values.len() as f64 * OUTSIDE_RANGE_FRACTION).floor() as usize
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Runs all three detectors over the recent readings (newest first) of one
/// metric type for one connection. At most [`PATTERN_WINDOW`] readings are
/// inspected; fewer than 3 readings detects nothing.
pub fn detect_patterns(
    connection_id: &str,
    connection_name: &str,
    metric_type: MetricType,
    values: &[f64],
) -> Vec<AlertCandidate> {
    if values.len() < 3 {
        return Vec::new();
    }
    let values = &values[..values.len().min(PATTERN_WINDOW)];
    let mut candidates = Vec::new();

    if let Some(rate) = rapid_change(values) {
        candidates.push(AlertCandidate {
            connection_id: connection_id.to_string(),
            alert_type: format!("rapid_{metric_type}_change"),
            severity: Severity::Medium,
            message: format!(
                "Rapid {metric_type} change detected: {rate:.2}% change at {connection_name}"
            ),
        });
    }

    if oscillation(values) {
        candidates.push(AlertCandidate {
            connection_id: connection_id.to_string(),
            alert_type: format!("{metric_type}_oscillation"),
            severity: Severity::Medium,
            message: format!(
                "{} oscillation detected at {connection_name}",
                capitalize(&metric_type.to_string())
            ),
        });
    }

    if sustained_deviation(values, metric_type) {
        candidates.push(AlertCandidate {
            connection_id: connection_id.to_string(),
            alert_type: format!("sustained_{metric_type}_deviation"),
            severity: Severity::Low,
            message: format!(
                "Sustained {metric_type} deviation from normal range at {connection_name}"
            ),
        });
    }

    candidates
}
