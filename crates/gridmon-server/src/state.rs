use crate::config::ServerConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use gridmon_analytics::{ExternalModelPredictor, FallbackPredictor, Predictor, RuleBasedPredictor};
use gridmon_storage::engine::SqliteStorageEngine;
use gridmon_telemetry::TelemetryGenerator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SqliteStorageEngine>,
    pub predictor: Arc<dyn Predictor>,
    pub generator: Arc<TelemetryGenerator>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}

/// Builds the prediction strategy from configuration. With a model
/// credential present the chain is external-model-with-fallback;
/// without one the deterministic rule-based predictor runs alone.
pub fn build_predictor(config: &ServerConfig) -> Result<Arc<dyn Predictor>> {
    match &config.ai {
        Some(ai) if !ai.api_key.is_empty() => {
            let primary = ExternalModelPredictor::new(
                ai.api_key.clone(),
                ai.model.clone(),
                ai.base_url.clone(),
                ai.timeout_secs,
                ai.max_tokens,
                ai.temperature,
            )?;
            tracing::info!("External model predictor enabled with rule-based fallback");
            Ok(Arc::new(FallbackPredictor::new(
                Box::new(primary),
                Box::new(RuleBasedPredictor),
            )))
        }
        _ => {
            tracing::info!("No model credential configured, using rule-based predictor");
            Ok(Arc::new(RuleBasedPredictor))
        }
    }
}

/// Builds the telemetry generator from configuration.
pub fn build_generator(config: &ServerConfig) -> TelemetryGenerator {
    TelemetryGenerator {
        base_power: config.telemetry.base_power,
        base_temperature: config.telemetry.base_temperature,
        nominal_frequency: config.telemetry.nominal_frequency,
    }
}
