use crate::patterns::{detect_patterns, PATTERN_METRICS, PATTERN_WINDOW};
use crate::rules::default_rules;
use crate::AlertCandidate;
use chrono::{DateTime, Duration, Utc};
use gridmon_common::types::{Alert, MetricSample, MetricType, Severity};
use gridmon_storage::{Result, StorageEngine};
use std::collections::HashMap;

/// How far back the dedup existence check looks for an open alert with the
/// same (connection_id, alert_type) key.
pub const DEDUP_WINDOW_MINUTES: i64 = 10;

/// Sample window evaluated by one alert round.
pub const ALERT_LOOKBACK_MINUTES: i64 = 10;

/// Unresolved low/medium alerts older than this are swept by the
/// auto-resolver. High alerts always wait for operator action.
pub const AUTO_RESOLVE_MAX_AGE_HOURS: i64 = 24;

/// Deduplicates alert candidates against open alerts and persists the
/// survivors. Returns the number of alerts inserted.
///
/// The existence check and the insert are two separate store calls, so two
/// overlapping rounds can both pass the check and double-insert. At the
/// expected cadence (one round every few minutes) this race is accepted.
/// A failure on one candidate is logged and the rest of the batch proceeds.
pub fn submit_candidates(
    store: &dyn StorageEngine,
    candidates: &[AlertCandidate],
    now: DateTime<Utc>,
    dedup_window: Duration,
) -> usize {
    let since = now - dedup_window;
    let mut inserted = 0;

    for candidate in candidates {
        match store.find_open_alert(&candidate.connection_id, &candidate.alert_type, since) {
            Ok(Some(_)) => {
                tracing::debug!(
                    connection_id = %candidate.connection_id,
                    alert_type = %candidate.alert_type,
                    "Duplicate alert suppressed"
                );
            }
            Ok(None) => {
                let alert = Alert {
                    id: gridmon_common::id::next_id(),
                    connection_id: candidate.connection_id.clone(),
                    alert_type: candidate.alert_type.clone(),
                    severity: candidate.severity,
                    message: candidate.message.clone(),
                    resolved: false,
                    created_at: now,
                    resolved_at: None,
                };
                match store.insert_alert(&alert) {
                    Ok(()) => {
                        tracing::info!(
                            connection_id = %alert.connection_id,
                            alert_type = %alert.alert_type,
                            severity = %alert.severity,
                            "Alert created"
                        );
                        inserted += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            connection_id = %candidate.connection_id,
                            alert_type = %candidate.alert_type,
                            error = %e,
                            "Failed to insert alert"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::error!(
                    connection_id = %candidate.connection_id,
                    alert_type = %candidate.alert_type,
                    error = %e,
                    "Dedup lookup failed, skipping candidate"
                );
            }
        }
    }

    inserted
}

/// Resolves unresolved low/medium alerts older than `max_age`. Returns the
/// number of alerts resolved.
pub fn auto_resolve_stale(
    store: &dyn StorageEngine,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Result<u64> {
    let resolved = store.resolve_alerts_older_than(
        now - max_age,
        &[Severity::Low, Severity::Medium],
        now,
    )?;
    if resolved > 0 {
        tracing::info!(resolved, "Auto-resolved stale alerts");
    }
    Ok(resolved)
}

/// Outcome of one alert-management stage.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AlertRoundOutcome {
    pub alerts_generated: usize,
    pub alerts_resolved: u64,
}

/// Per-connection samples split by metric type, newest first.
type SamplesByType<'a> = HashMap<MetricType, Vec<&'a MetricSample>>;

fn group_samples(samples: &[MetricSample]) -> HashMap<&str, SamplesByType<'_>> {
    let mut grouped: HashMap<&str, SamplesByType<'_>> = HashMap::new();
    for sample in samples {
        grouped
            .entry(sample.connection_id.as_str())
            .or_default()
            .entry(sample.metric_type)
            .or_default()
            .push(sample);
    }
    grouped
}

/// Runs one alert round: evaluate the static rule set against the latest
/// sample of each metric type per connection, run pattern detection over
/// the recent window, submit everything through dedup, then sweep alerts
/// older than `auto_resolve_age`.
pub fn run_alert_round(
    store: &dyn StorageEngine,
    now: DateTime<Utc>,
    lookback: Duration,
    dedup_window: Duration,
    auto_resolve_age: Duration,
) -> Result<AlertRoundOutcome> {
    let samples = store.query_recent_samples(now - lookback, now)?;
    if samples.is_empty() {
        tracing::info!("No recent samples, skipping rule evaluation");
        let resolved = auto_resolve_stale(store, now, auto_resolve_age)?;
        return Ok(AlertRoundOutcome {
            alerts_generated: 0,
            alerts_resolved: resolved,
        });
    }

    let rules = default_rules();
    let grouped = group_samples(&samples);
    let mut candidates = Vec::new();

    for (connection_id, by_type) in &grouped {
        let connection_name = match store.get_connection(connection_id) {
            Ok(Some(connection)) => connection.name,
            Ok(None) => "Unknown".to_string(),
            Err(e) => {
                tracing::error!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to load connection, skipping"
                );
                continue;
            }
        };

        for rule in rules.iter().filter(|r| r.enabled) {
            // query_recent_samples returns descending order, so the first
            // sample of a type is the latest.
            let Some(latest) = by_type.get(&rule.metric_type).and_then(|s| s.first()) else {
                continue;
            };
            if rule.evaluate(latest.value) {
                candidates.push(rule.candidate(latest, &connection_name));
            }
        }

        for metric_type in PATTERN_METRICS {
            let Some(type_samples) = by_type.get(&metric_type) else {
                continue;
            };
            let values: Vec<f64> = type_samples
                .iter()
                .take(PATTERN_WINDOW)
                .map(|s| s.value)
                .collect();
            candidates.extend(detect_patterns(
                connection_id,
                &connection_name,
                metric_type,
                &values,
            ));
        }
    }

    let generated = submit_candidates(store, &candidates, now, dedup_window);
    let resolved = auto_resolve_stale(store, now, auto_resolve_age)?;

    tracing::info!(
        candidates = candidates.len(),
        generated,
        resolved,
        "Alert round completed"
    );

    Ok(AlertRoundOutcome {
        alerts_generated: generated,
        alerts_resolved: resolved,
    })
}
