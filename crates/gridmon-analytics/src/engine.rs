use crate::predictor::{AnalysisInput, Predictor};
use crate::summary::build_summaries;
use chrono::{DateTime, Duration, Utc};
use gridmon_alert::AlertCandidate;
use gridmon_common::types::{MetricSample, Prediction, Severity};
use gridmon_storage::{Result, StorageEngine};
use std::collections::HashMap;

/// Sample window aggregated by one analytics round.
pub const ANALYTICS_WINDOW_MINUTES: i64 = 30;

/// Outcome of one analytics stage. The candidates are high-severity
/// anomalous predictions the caller routes through the alert dedup path.
#[derive(Debug, Default)]
pub struct AnalyticsOutcome {
    pub connections_analyzed: usize,
    pub predictions: usize,
    pub anomalies: usize,
    pub candidates: Vec<AlertCandidate>,
}

/// Runs one analytics round: group the recent window by connection,
/// summarize, predict, persist. Prediction failures and insert failures
/// are logged per connection and never abort the round.
pub async fn run_analytics_round(
    store: &dyn StorageEngine,
    predictor: &dyn Predictor,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<AnalyticsOutcome> {
    let samples = store.query_recent_samples(now - window, now)?;
    if samples.is_empty() {
        tracing::info!("No recent samples, skipping analytics round");
        return Ok(AnalyticsOutcome::default());
    }

    let mut by_connection: HashMap<&str, Vec<&MetricSample>> = HashMap::new();
    for sample in &samples {
        by_connection
            .entry(sample.connection_id.as_str())
            .or_default()
            .push(sample);
    }

    let mut outcome = AnalyticsOutcome::default();

    for (connection_id, connection_samples) in &by_connection {
        let summaries = build_summaries(connection_samples);
        if summaries.is_empty() {
            continue;
        }

        let connection_name = match store.get_connection(connection_id) {
            Ok(Some(connection)) => connection.name,
            Ok(None) => "Unknown".to_string(),
            Err(e) => {
                tracing::error!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to load connection, skipping analysis"
                );
                continue;
            }
        };

        let input = AnalysisInput {
            connection_id: connection_id.to_string(),
            connection_name,
            summaries,
            evaluated_at_ms: now.timestamp_millis(),
        };

        let predictions = match predictor.predict(&input).await {
            Ok(predictions) => predictions,
            Err(e) => {
                tracing::error!(
                    connection_id = %connection_id,
                    predictor = predictor.name(),
                    error = %e,
                    "Prediction failed for connection"
                );
                continue;
            }
        };

        for prediction in &predictions {
            let record = Prediction {
                id: gridmon_common::id::next_id(),
                connection_id: connection_id.to_string(),
                model_type: prediction.model_type.clone(),
                prediction_type: prediction.prediction_type.clone(),
                confidence: prediction.confidence.clamp(0.0, 1.0),
                severity: prediction.severity,
                is_anomaly: prediction.is_anomaly,
                data: prediction.data.clone(),
                created_at: now,
            };
            if let Err(e) = store.insert_prediction(&record) {
                tracing::error!(
                    connection_id = %connection_id,
                    prediction_type = %prediction.prediction_type,
                    error = %e,
                    "Failed to persist prediction"
                );
                continue;
            }
            outcome.predictions += 1;
            if prediction.is_anomaly {
                outcome.anomalies += 1;
            }

            if prediction.is_anomaly && prediction.severity == Severity::High {
                let summary = prediction
                    .data
                    .get("summary")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Critical anomaly detected");
                outcome.candidates.push(AlertCandidate {
                    connection_id: connection_id.to_string(),
                    alert_type: "ai_anomaly_detected".to_string(),
                    severity: Severity::High,
                    message: format!("AI detected {}: {}", prediction.prediction_type, summary),
                });
            }
        }

        outcome.connections_analyzed += 1;
    }

    tracing::info!(
        connections = outcome.connections_analyzed,
        predictions = outcome.predictions,
        anomalies = outcome.anomalies,
        "Analytics round completed"
    );

    Ok(outcome)
}
