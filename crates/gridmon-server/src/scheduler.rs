use crate::state::AppState;
use chrono::{DateTime, Duration, Utc};
use gridmon_alert::manager::{run_alert_round, submit_candidates};
use gridmon_analytics::run_analytics_round;
use gridmon_telemetry::generate_round;
use serde::Serialize;

/// Interval the caller is asked to wait before triggering the next round.
/// The server never self-schedules; rescheduling is the caller's job.
const NEXT_RUN_MINUTES: i64 = 5;

/// Aggregate counts for one pipeline round. Stage errors are carried
/// alongside the counts so a partial failure still reports the stages
/// that did run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub total_connections: usize,
    pub metrics_generated: usize,
    pub alerts_generated: usize,
    pub ai_predictions: usize,
    pub anomalies_detected: usize,
    pub alerts_resolved: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerting_error: Option<String>,
    pub next_run: DateTime<Utc>,
}

impl RoundSummary {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            total_connections: 0,
            metrics_generated: 0,
            alerts_generated: 0,
            ai_predictions: 0,
            anomalies_detected: 0,
            alerts_resolved: 0,
            generation_error: None,
            analytics_error: None,
            alerting_error: None,
            next_run: now + Duration::minutes(NEXT_RUN_MINUTES),
        }
    }

    pub fn all_stages_failed(&self) -> bool {
        self.generation_error.is_some()
            && self.analytics_error.is_some()
            && self.alerting_error.is_some()
    }
}

/// Runs one pipeline round: generate telemetry, run analytics, manage
/// alerts. Each stage is wrapped so a failure is recorded in the summary
/// while the remaining stages still run; nothing in a round is fatal.
pub async fn run_round(state: &AppState, now: DateTime<Utc>) -> RoundSummary {
    let mut summary = RoundSummary::empty(now);
    let store = state.storage.as_ref();
    let dedup_window = Duration::minutes(state.config.dedup_window_minutes);

    match generate_round(store, &state.generator, &mut rand::thread_rng(), now) {
        Ok(outcome) => {
            summary.total_connections = outcome.connections_processed;
            summary.metrics_generated = outcome.samples_written;
        }
        Err(e) => {
            tracing::error!(error = %e, "Telemetry generation stage failed");
            summary.generation_error = Some(e.to_string());
        }
    }

    match run_analytics_round(
        store,
        state.predictor.as_ref(),
        now,
        Duration::minutes(state.config.analytics_window_minutes),
    )
    .await
    {
        Ok(outcome) => {
            summary.ai_predictions = outcome.predictions;
            summary.anomalies_detected = outcome.anomalies;
            // High-severity anomalies go through the same dedup path as
            // rule and pattern alerts.
            summary.alerts_generated +=
                submit_candidates(store, &outcome.candidates, now, dedup_window);
        }
        Err(e) => {
            tracing::error!(error = %e, "Analytics stage failed");
            summary.analytics_error = Some(e.to_string());
        }
    }

    match run_alert_round(
        store,
        now,
        Duration::minutes(state.config.alert_lookback_minutes),
        dedup_window,
        Duration::hours(state.config.auto_resolve_hours),
    ) {
        Ok(outcome) => {
            summary.alerts_generated += outcome.alerts_generated;
            summary.alerts_resolved = outcome.alerts_resolved;
        }
        Err(e) => {
            tracing::error!(error = %e, "Alert management stage failed");
            summary.alerting_error = Some(e.to_string());
        }
    }

    tracing::info!(
        connections = summary.total_connections,
        metrics = summary.metrics_generated,
        alerts = summary.alerts_generated,
        predictions = summary.ai_predictions,
        anomalies = summary.anomalies_detected,
        resolved = summary.alerts_resolved,
        "Pipeline round completed"
    );

    summary
}
