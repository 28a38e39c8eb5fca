use crate::AlertCandidate;
use gridmon_common::types::{MetricSample, MetricType, Severity};
use std::str::FromStr;

/// Nominal grid frequency the deviation condition is anchored to.
pub const NOMINAL_FREQUENCY_HZ: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    GreaterThan,
    LessThan,
    /// Absolute deviation from the 50 Hz nominal; only defined for
    /// frequency and false for every other metric type.
    DeviationFrom,
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater_than" | "gt" => Ok(Self::GreaterThan),
            "less_than" | "lt" => Ok(Self::LessThan),
            "deviation_from" => Ok(Self::DeviationFrom),
            _ => Err(format!("unknown condition: {s}")),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, "greater_than"),
            Self::LessThan => write!(f, "less_than"),
            Self::DeviationFrom => write!(f, "deviation_from"),
        }
    }
}

/// A static threshold rule evaluated against the latest sample of its
/// metric type. Rules are independent; one sample may fire several rules
/// (temperature warning and critical both fire above 85 °C) and each
/// persists under its own alert type.
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    pub id: &'static str,
    pub metric_type: MetricType,
    pub condition: Condition,
    pub threshold: f64,
    pub severity: Severity,
    pub message: &'static str,
    pub enabled: bool,
}

impl ThresholdRule {
    pub fn evaluate(&self, value: f64) -> bool {
        match self.condition {
            Condition::GreaterThan => value > self.threshold,
            Condition::LessThan => value < self.threshold,
            Condition::DeviationFrom => {
                self.metric_type == MetricType::Frequency
                    && (value - NOMINAL_FREQUENCY_HZ).abs() > self.threshold
            }
        }
    }

    /// Builds the alert candidate for a fired rule, interpolating the
    /// metric value, unit, and connection name into the message.
    pub fn candidate(&self, sample: &MetricSample, connection_name: &str) -> AlertCandidate {
        AlertCandidate {
            connection_id: sample.connection_id.clone(),
            alert_type: self.id.to_string(),
            severity: self.severity,
            message: format!(
                "{} - {:.2}{} at {}",
                self.message, sample.value, sample.unit, connection_name
            ),
        }
    }
}

/// The fixed rule set evaluated against every fresh sample.
pub fn default_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule {
            id: "voltage_high",
            metric_type: MetricType::Voltage,
            condition: Condition::GreaterThan,
            threshold: 253.0,
            severity: Severity::High,
            message: "Critical high voltage detected",
            enabled: true,
        },
        ThresholdRule {
            id: "voltage_low",
            metric_type: MetricType::Voltage,
            condition: Condition::LessThan,
            threshold: 207.0,
            severity: Severity::High,
            message: "Critical low voltage detected",
            enabled: true,
        },
        ThresholdRule {
            id: "frequency_deviation",
            metric_type: MetricType::Frequency,
            condition: Condition::DeviationFrom,
            threshold: 0.5,
            severity: Severity::Medium,
            message: "Frequency deviation detected",
            enabled: true,
        },
        ThresholdRule {
            id: "temperature_warning",
            metric_type: MetricType::Temperature,
            condition: Condition::GreaterThan,
            threshold: 70.0,
            severity: Severity::Medium,
            message: "High temperature warning",
            enabled: true,
        },
        ThresholdRule {
            id: "temperature_critical",
            metric_type: MetricType::Temperature,
            condition: Condition::GreaterThan,
            threshold: 85.0,
            severity: Severity::High,
            message: "Critical temperature - immediate action required",
            enabled: true,
        },
        ThresholdRule {
            id: "power_factor_low",
            metric_type: MetricType::PowerFactor,
            condition: Condition::LessThan,
            threshold: 0.8,
            severity: Severity::Low,
            message: "Low power factor detected",
            enabled: true,
        },
    ]
}
