use crate::predictor::{AnalysisInput, ModelPrediction, Predictor};
use anyhow::Result;
use async_trait::async_trait;
use gridmon_common::types::{MetricType, Severity};
use serde_json::json;

/// Reference voltage the failure-risk heuristic is anchored to.
const REFERENCE_VOLTAGE: f64 = 230.0;
/// Nominal grid frequency in Hz.
const NOMINAL_FREQUENCY: f64 = 50.0;
/// Milliseconds per day, the period of the sinusoidal load forecast.
const DAY_MS: f64 = 86_400_000.0;

/// Deterministic rule-based predictor. Always available; serves as the
/// fallback when no external model is configured or the external call
/// fails. Each prediction is only produced when its input metric types
/// are present in the window.
pub struct RuleBasedPredictor;

impl RuleBasedPredictor {
    fn failure_risk(&self, input: &AnalysisInput) -> Option<ModelPrediction> {
        let temperature = input.summaries.get(&MetricType::Temperature)?;
        let voltage = input.summaries.get(&MetricType::Voltage)?;

        let temp_risk: f64 = if temperature.latest > 60.0 { 0.8 } else { 0.2 };
        let voltage_risk = if (voltage.latest - REFERENCE_VOLTAGE).abs() > 20.0 {
            0.7
        } else {
            0.1
        };
        let overall_risk = temp_risk.max(voltage_risk);

        let severity = if overall_risk > 0.7 {
            Severity::High
        } else if overall_risk > 0.4 {
            Severity::Medium
        } else {
            Severity::Low
        };

        Some(ModelPrediction {
            model_type: "equipment_failure_prediction".to_string(),
            prediction_type: "failure_risk_7_days".to_string(),
            confidence: 0.75,
            is_anomaly: overall_risk > 0.6,
            severity,
            data: json!({
                "summary": format!("Equipment failure risk: {:.1}%", overall_risk * 100.0),
                "riskFactors": {
                    "temperature": temp_risk,
                    "voltage": voltage_risk,
                },
                "recommendation": if overall_risk > 0.6 {
                    "Schedule immediate inspection"
                } else {
                    "Normal monitoring"
                },
            }),
        })
    }

    fn load_forecast(&self, input: &AnalysisInput) -> Option<ModelPrediction> {
        let power = input.summaries.get(&MetricType::Power)?;

        let current_load = power.latest;
        let avg_load = power.average;
        let forecast_load = avg_load * (1.0 + (input.evaluated_at_ms as f64 / DAY_MS).sin() * 0.2);

        Some(ModelPrediction {
            model_type: "load_forecasting".to_string(),
            prediction_type: "load_forecast_24h".to_string(),
            confidence: 0.65,
            is_anomaly: (current_load - avg_load).abs() > avg_load * 0.3,
            severity: Severity::Low,
            data: json!({
                "summary": format!("24h forecast: {:.1}kW", forecast_load),
                "currentLoad": current_load,
                "forecastLoad": forecast_load,
                "trend": power.trend,
            }),
        })
    }

    fn frequency_stability(&self, input: &AnalysisInput) -> Option<ModelPrediction> {
        let frequency = input.summaries.get(&MetricType::Frequency)?;

        let deviation = (frequency.latest - NOMINAL_FREQUENCY).abs();
        let unstable = deviation > 0.2;

        Some(ModelPrediction {
            model_type: "frequency_stability".to_string(),
            prediction_type: "grid_stability_assessment".to_string(),
            confidence: 0.85,
            is_anomaly: unstable,
            severity: if unstable {
                Severity::Medium
            } else {
                Severity::Low
            },
            data: json!({
                "summary": format!("Grid frequency: {:.2}Hz", frequency.latest),
                "deviation": deviation,
                "stability": if unstable { "Unstable" } else { "Stable" },
            }),
        })
    }
}

#[async_trait]
impl Predictor for RuleBasedPredictor {
    fn name(&self) -> &str {
        "rule_based"
    }

    async fn predict(&self, input: &AnalysisInput) -> Result<Vec<ModelPrediction>> {
        let predictions = [
            self.failure_risk(input),
            self.load_forecast(input),
            self.frequency_stability(input),
        ]
        .into_iter()
        .flatten()
        .collect();
        Ok(predictions)
    }
}

/// Decorator guaranteeing the fallback contract: a primary failure is
/// logged and answered by the fallback, never propagated to the caller.
pub struct FallbackPredictor {
    primary: Box<dyn Predictor>,
    fallback: Box<dyn Predictor>,
}

impl FallbackPredictor {
    pub fn new(primary: Box<dyn Predictor>, fallback: Box<dyn Predictor>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Predictor for FallbackPredictor {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn predict(&self, input: &AnalysisInput) -> Result<Vec<ModelPrediction>> {
        match self.primary.predict(input).await {
            Ok(predictions) => Ok(predictions),
            Err(e) => {
                tracing::warn!(
                    predictor = self.primary.name(),
                    connection_id = %input.connection_id,
                    error = %e,
                    "Primary predictor failed, using fallback"
                );
                self.fallback.predict(input).await
            }
        }
    }
}
