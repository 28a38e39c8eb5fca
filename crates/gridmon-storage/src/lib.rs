//! Persistence layer for grid connections, metric samples, alerts, and
//! AI predictions.
//!
//! The default implementation ([`engine::SqliteStorageEngine`]) uses a
//! single SQLite database with WAL mode. Alert insertion is deliberately
//! split into [`StorageEngine::find_open_alert`] followed by
//! [`StorageEngine::insert_alert`] so the deduplication check is explicit
//! and testable against a fake store. The read-then-insert pair is racy
//! under truly concurrent pipeline rounds; at the expected invocation
//! cadence (minutes apart) this is accepted.

pub mod engine;
pub mod error;


use chrono::{DateTime, Utc};
use gridmon_common::types::{
    Alert, Connection, ConnectionStatus, MetricSample, MetricType, Prediction, Severity,
};

pub use error::{Result, StorageError};

/// Persistence backend for the monitoring pipeline.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because the store is reached from the HTTP handlers and the pipeline
/// round concurrently.
pub trait StorageEngine: Send + Sync {
    /// Registers a new grid connection.
    fn insert_connection(&self, connection: &Connection) -> Result<()>;

    /// Fetches a single connection by ID.
    fn get_connection(&self, id: &str) -> Result<Option<Connection>>;

    /// Lists all registered connections, newest first.
    fn list_connections(&self) -> Result<Vec<Connection>>;

    /// Lists connections with the given lifecycle status.
    fn list_connections_by_status(&self, status: ConnectionStatus) -> Result<Vec<Connection>>;

    /// Updates a connection's lifecycle status. Returns true if found.
    fn update_connection_status(
        &self,
        id: &str,
        status: ConnectionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Writes a batch of metric samples transactionally.
    fn write_samples(&self, samples: &[MetricSample]) -> Result<()>;

    /// Queries samples across all connections in a time range, descending
    /// by timestamp.
    fn query_recent_samples(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>>;

    /// Queries samples for one connection and metric type, descending by
    /// timestamp, capped at `limit`.
    fn query_samples(
        &self,
        connection_id: &str,
        metric_type: MetricType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MetricSample>>;

    /// Looks up an unresolved alert for the dedup key
    /// (connection_id, alert_type), bounded to alerts created at or after
    /// `since`.
    fn find_open_alert(
        &self,
        connection_id: &str,
        alert_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>>;

    /// Persists a new alert.
    fn insert_alert(&self, alert: &Alert) -> Result<()>;

    /// Lists unresolved alerts, newest first.
    fn list_open_alerts(&self, limit: usize, offset: usize) -> Result<Vec<Alert>>;

    /// Counts unresolved alerts.
    fn count_open_alerts(&self) -> Result<u64>;

    /// Marks unresolved alerts created before `cutoff` with one of the
    /// given severities as resolved at `resolved_at`. Returns the number
    /// of alerts resolved.
    fn resolve_alerts_older_than(
        &self,
        cutoff: DateTime<Utc>,
        severities: &[Severity],
        resolved_at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Persists an analytic prediction.
    fn insert_prediction(&self, prediction: &Prediction) -> Result<()>;

    /// Lists predictions, newest first, optionally filtered by connection.
    fn list_predictions(
        &self,
        connection_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Prediction>>;
}
