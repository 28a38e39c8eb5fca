use anyhow::{Context, Result};
use gridmon_common::types::{ConnectionStatus, ConnectionType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Sample window evaluated by one alert round, minutes.
    #[serde(default = "default_alert_lookback_minutes")]
    pub alert_lookback_minutes: i64,
    /// How far back the dedup check looks for an open alert, minutes.
    #[serde(default = "default_dedup_window_minutes")]
    pub dedup_window_minutes: i64,
    /// Age past which unresolved low/medium alerts are swept, hours.
    #[serde(default = "default_auto_resolve_hours")]
    pub auto_resolve_hours: i64,
    /// Sample window aggregated by one analytics round, minutes.
    #[serde(default = "default_analytics_window_minutes")]
    pub analytics_window_minutes: i64,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// External model credentials. Absent (or with an empty key) the
    /// pipeline runs on the rule-based predictor alone.
    #[serde(default)]
    pub ai: Option<AiConfig>,
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            db_path: default_db_path(),
            alert_lookback_minutes: default_alert_lookback_minutes(),
            dedup_window_minutes: default_dedup_window_minutes(),
            auto_resolve_hours: default_auto_resolve_hours(),
            analytics_window_minutes: default_analytics_window_minutes(),
            telemetry: TelemetryConfig::default(),
            ai: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Base active power in kW at load factor 1.0.
    #[serde(default = "default_base_power")]
    pub base_power: f64,
    /// Ambient equipment temperature in °C at zero load.
    #[serde(default = "default_base_temperature")]
    pub base_temperature: f64,
    /// Nominal grid frequency in Hz.
    #[serde(default = "default_nominal_frequency")]
    pub nominal_frequency: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            base_power: default_base_power(),
            base_temperature: default_base_temperature(),
            nominal_frequency: default_nominal_frequency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

// ---- Seed file types (used by `init-connections` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionsSeedFile {
    #[serde(default)]
    pub connections: Vec<SeedConnection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConnection {
    pub name: String,
    pub connection_type: ConnectionType,
    pub nominal_voltage: f64,
    #[serde(default = "default_seed_status")]
    pub status: ConnectionStatus,
}

fn default_seed_status() -> ConnectionStatus {
    ConnectionStatus::Connected
}

fn default_http_port() -> u16 {
    8090
}

fn default_db_path() -> String {
    "data/gridmon.db".to_string()
}

fn default_alert_lookback_minutes() -> i64 {
    gridmon_alert::manager::ALERT_LOOKBACK_MINUTES
}

fn default_dedup_window_minutes() -> i64 {
    gridmon_alert::manager::DEDUP_WINDOW_MINUTES
}

fn default_auto_resolve_hours() -> i64 {
    gridmon_alert::manager::AUTO_RESOLVE_MAX_AGE_HOURS
}

fn default_analytics_window_minutes() -> i64 {
    gridmon_analytics::engine::ANALYTICS_WINDOW_MINUTES
}

fn default_base_power() -> f64 {
    1000.0
}

fn default_base_temperature() -> f64 {
    25.0
}

fn default_nominal_frequency() -> f64 {
    50.0
}
