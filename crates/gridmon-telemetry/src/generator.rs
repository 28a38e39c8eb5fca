use crate::load::load_factor;
use chrono::{DateTime, Timelike, Utc};
use gridmon_common::types::{Connection, MetricSample, MetricType};
use gridmon_storage::StorageEngine;
use rand::Rng;

/// Synthesizes one sample of each metric type per connection, modulated by
/// the diurnal load curve.
pub struct TelemetryGenerator {
    /// Base active power in kW at load factor 1.0.
    pub base_power: f64,
    /// Ambient equipment temperature in °C at zero load.
    pub base_temperature: f64,
    /// Nominal grid frequency in Hz.
    pub nominal_frequency: f64,
}

impl Default for TelemetryGenerator {
    fn default() -> Self {
        Self {
            base_power: 1000.0,
            base_temperature: 25.0,
            nominal_frequency: 50.0,
        }
    }
}

impl TelemetryGenerator {
    /// Generates the six metric samples for one connection at the given
    /// hour of day. All samples share the `now` timestamp. Current is
    /// derived from the generated power and voltage using the three-phase
    /// approximation `I = P / (U * sqrt(3))`.
    pub fn generate(
        &self,
        connection: &Connection,
        hour: u32,
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) -> Vec<MetricSample> {
        let load = load_factor(hour);

        let voltage = connection.nominal_voltage
            * rng.gen_range(0.95..1.05)
            * (0.98 + 0.04 * load);
        let frequency = self.nominal_frequency * rng.gen_range(0.999..1.001);
        let power = self.base_power * load * rng.gen_range(0.95..1.05);
        let current = power / (voltage * 3.0_f64.sqrt());
        let temperature = self.base_temperature + load * 15.0 + rng.gen_range(-5.0..5.0);
        let power_factor = rng.gen_range(0.85..0.95);

        let sample = |metric_type: MetricType, value: f64| MetricSample {
            id: gridmon_common::id::next_id(),
            connection_id: connection.id.clone(),
            metric_type,
            value,
            unit: metric_type.unit().to_string(),
            timestamp: now,
        };

        vec![
            sample(MetricType::Voltage, voltage),
            sample(MetricType::Frequency, frequency),
            sample(MetricType::Power, power),
            sample(MetricType::Current, current),
            sample(MetricType::Temperature, temperature),
            sample(MetricType::PowerFactor, power_factor),
        ]
    }
}

/// Outcome of one telemetry generation stage.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GenerationOutcome {
    pub connections_processed: usize,
    pub samples_written: usize,
}

/// Runs one generation pass: fetch all connected endpoints and persist six
/// samples for each. A write failure for one connection is logged and
/// skipped; the rest of the batch proceeds. An empty connection set yields
/// zero counts without error.
pub fn generate_round(
    store: &dyn StorageEngine,
    generator: &TelemetryGenerator,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> gridmon_storage::Result<GenerationOutcome> {
    let connections =
        store.list_connections_by_status(gridmon_common::types::ConnectionStatus::Connected)?;

    if connections.is_empty() {
        tracing::info!("No connected endpoints, skipping telemetry generation");
        return Ok(GenerationOutcome::default());
    }

    let hour = now.hour();
    let mut outcome = GenerationOutcome::default();

    for connection in &connections {
        let samples = generator.generate(connection, hour, rng, now);
        match store.write_samples(&samples) {
            Ok(()) => {
                outcome.samples_written += samples.len();
                outcome.connections_processed += 1;
            }
            Err(e) => {
                tracing::error!(
                    connection_id = %connection.id,
                    error = %e,
                    "Failed to persist telemetry samples"
                );
            }
        }
    }

    tracing::info!(
        connections = outcome.connections_processed,
        samples = outcome.samples_written,
        "Telemetry generation completed"
    );

    Ok(outcome)
}
