use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a monitored grid endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Generation,
    Transmission,
    Distribution,
    Substation,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::Generation => write!(f, "generation"),
            ConnectionType::Transmission => write!(f, "transmission"),
            ConnectionType::Distribution => write!(f, "distribution"),
            ConnectionType::Substation => write!(f, "substation"),
        }
    }
}

impl std::str::FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generation" => Ok(ConnectionType::Generation),
            "transmission" => Ok(ConnectionType::Transmission),
            "distribution" => Ok(ConnectionType::Distribution),
            "substation" => Ok(ConnectionType::Substation),
            _ => Err(format!("unknown connection type: {s}")),
        }
    }
}

/// Lifecycle status of a grid connection. Only `connected` endpoints
/// receive simulated telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
    Maintenance,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Error => write!(f, "error"),
            ConnectionStatus::Maintenance => write!(f, "maintenance"),
        }
    }
}

impl std::str::FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "connected" => Ok(ConnectionStatus::Connected),
            "disconnected" => Ok(ConnectionStatus::Disconnected),
            "error" => Ok(ConnectionStatus::Error),
            "maintenance" => Ok(ConnectionStatus::Maintenance),
            _ => Err(format!("unknown connection status: {s}")),
        }
    }
}

/// A monitored grid endpoint (substation, feeder, generation unit...).
///
/// Connections are registered once and status-toggled afterwards; they are
/// never hard-deleted while metrics or alerts still reference them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: String,
    pub connection_type: ConnectionType,
    /// Nominal voltage in volts (e.g. 230.0 for a LV distribution point).
    pub nominal_voltage: f64,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The closed set of physical quantities sampled per connection.
///
/// # Examples
///
/// ```
/// use gridmon_common::types::MetricType;
///
/// let mt: MetricType = "power_factor".parse().unwrap();
/// assert_eq!(mt, MetricType::PowerFactor);
/// assert_eq!(MetricType::Voltage.unit(), "V");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Voltage,
    Frequency,
    Power,
    Current,
    Temperature,
    PowerFactor,
}

impl MetricType {
    /// All metric types, in generation order.
    pub const ALL: [MetricType; 6] = [
        MetricType::Voltage,
        MetricType::Frequency,
        MetricType::Power,
        MetricType::Current,
        MetricType::Temperature,
        MetricType::PowerFactor,
    ];

    /// The fixed unit string for this metric type. Constant across all
    /// samples of the type for a given deployment.
    pub fn unit(&self) -> &'static str {
        match self {
            MetricType::Voltage => "V",
            MetricType::Frequency => "Hz",
            MetricType::Power => "kW",
            MetricType::Current => "A",
            MetricType::Temperature => "°C",
            MetricType::PowerFactor => "",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricType::Voltage => write!(f, "voltage"),
            MetricType::Frequency => write!(f, "frequency"),
            MetricType::Power => write!(f, "power"),
            MetricType::Current => write!(f, "current"),
            MetricType::Temperature => write!(f, "temperature"),
            MetricType::PowerFactor => write!(f, "power_factor"),
        }
    }
}

impl std::str::FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "voltage" => Ok(MetricType::Voltage),
            "frequency" => Ok(MetricType::Frequency),
            "power" => Ok(MetricType::Power),
            "current" => Ok(MetricType::Current),
            "temperature" => Ok(MetricType::Temperature),
            "power_factor" => Ok(MetricType::PowerFactor),
            _ => Err(format!("unknown metric type: {s}")),
        }
    }
}

/// One timestamped scalar reading for a connection. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub id: String,
    pub connection_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

/// Alert severity, ordered from lowest to highest.
///
/// `Info` is the non-actionable tier. Only `Low` and `Medium` alerts are
/// eligible for auto-resolution; `High` requires operator action.
///
/// # Examples
///
/// ```
/// use gridmon_common::types::Severity;
///
/// let sev: Severity = "medium".parse().unwrap();
/// assert_eq!(sev, Severity::Medium);
/// assert_eq!(sev.to_string(), "medium");
/// assert!(Severity::High > Severity::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn auto_resolvable(&self) -> bool {
        matches!(self, Severity::Low | Severity::Medium)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// A persisted, deduplicated notification that a rule or pattern fired.
///
/// Invariant: at most one unresolved alert exists per
/// (connection_id, alert_type) pair at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub connection_id: String,
    /// Rule id, pattern id, or `ai_anomaly_detected`.
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A confidence-scored analytic output. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub connection_id: String,
    pub model_type: String,
    pub prediction_type: String,
    /// Confidence score in [0, 1].
    pub confidence: f64,
    pub severity: Severity,
    pub is_anomaly: bool,
    /// Structured payload; always carries at least a `summary` field.
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
