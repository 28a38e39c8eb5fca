//! Alerting pipeline: threshold rules, multi-point pattern detection, and
//! the deduplicating alert manager.
//!
//! Threshold rules ([`rules::ThresholdRule`]) evaluate the single latest
//! sample of a metric type; pattern detectors ([`patterns`]) inspect the
//! up-to-10 most recent samples. Both produce [`AlertCandidate`]s which the
//! manager ([`manager`]) routes through the (connection, alert_type) dedup
//! key before persisting.

pub mod manager;
pub mod patterns;
pub mod rules;

#[cfg(test)]
mod tests;

use gridmon_common::types::Severity;

/// A not-yet-persisted alert produced by a rule, a pattern detector, or
/// the analytics engine. The manager deduplicates candidates against open
/// alerts before insertion.
#[derive(Debug, Clone)]
pub struct AlertCandidate {
    pub connection_id: String,
    /// Rule id, synthesized pattern id, or `ai_anomaly_detected`.
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
}
