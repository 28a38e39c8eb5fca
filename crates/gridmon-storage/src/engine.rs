use crate::error::{Result, StorageError};
use crate::StorageEngine;
use chrono::{DateTime, Utc};
use gridmon_common::types::{
    Alert, Connection, ConnectionStatus, MetricSample, MetricType, Prediction, Severity,
};
use rusqlite::Connection as SqliteConnection;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS grid_connections (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    connection_type TEXT NOT NULL,
    nominal_voltage REAL NOT NULL,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS grid_metrics (
    id TEXT PRIMARY KEY,
    connection_id TEXT NOT NULL,
    metric_type TEXT NOT NULL,
    value REAL NOT NULL,
    unit TEXT NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_metrics_conn_type_time
    ON grid_metrics(connection_id, metric_type, timestamp);
CREATE INDEX IF NOT EXISTS idx_metrics_time
    ON grid_metrics(timestamp);

CREATE TABLE IF NOT EXISTS grid_alerts (
    id TEXT PRIMARY KEY,
    connection_id TEXT NOT NULL,
    alert_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    message TEXT NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    resolved_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_alerts_dedup
    ON grid_alerts(connection_id, alert_type, resolved);
CREATE INDEX IF NOT EXISTS idx_alerts_created
    ON grid_alerts(created_at);

CREATE TABLE IF NOT EXISTS ai_predictions (
    id TEXT PRIMARY KEY,
    connection_id TEXT NOT NULL,
    model_type TEXT NOT NULL,
    prediction_type TEXT NOT NULL,
    confidence REAL NOT NULL,
    severity TEXT NOT NULL,
    is_anomaly INTEGER NOT NULL,
    data TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_predictions_created
    ON ai_predictions(created_at);
";

/// SQLite-backed [`StorageEngine`] using a single database file in WAL mode.
pub struct SqliteStorageEngine {
    conn: Mutex<SqliteConnection>,
}

impl SqliteStorageEngine {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Other(format!("create data dir: {e}")))?;
            }
        }
        let conn = SqliteConnection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %path.display(), "Opened storage database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering from a poisoned Mutex if necessary.
    fn lock(&self) -> MutexGuard<'_, SqliteConnection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_enum<T: FromStr>(column: &'static str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| StorageError::InvalidEnum {
        column,
        value: value.to_string(),
    })
}

fn ts_from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl StorageEngine for SqliteStorageEngine {
    fn insert_connection(&self, connection: &Connection) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO grid_connections (id, name, connection_type, nominal_voltage, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        stmt.execute(rusqlite::params![
            &connection.id,
            &connection.name,
            connection.connection_type.to_string(),
            connection.nominal_voltage,
            connection.status.to_string(),
            connection.created_at.timestamp_millis(),
            connection.updated_at.timestamp_millis(),
        ])?;
        Ok(())
    }

    fn get_connection(&self, id: &str) -> Result<Option<Connection>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, connection_type, nominal_voltage, status, created_at, updated_at
             FROM grid_connections WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(rusqlite::params![id], map_connection_row)?;
        match rows.next() {
            Some(row) => Ok(Some(finish_connection(row?)?)),
            None => Ok(None),
        }
    }

    fn list_connections(&self) -> Result<Vec<Connection>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, connection_type, nominal_voltage, status, created_at, updated_at
             FROM grid_connections ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], map_connection_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(finish_connection(row?)?);
        }
        Ok(results)
    }

    fn list_connections_by_status(&self, status: ConnectionStatus) -> Result<Vec<Connection>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, connection_type, nominal_voltage, status, created_at, updated_at
             FROM grid_connections WHERE status = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(rusqlite::params![status.to_string()], map_connection_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(finish_connection(row?)?);
        }
        Ok(results)
    }

    fn update_connection_status(
        &self,
        id: &str,
        status: ConnectionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE grid_connections SET status = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![status.to_string(), updated_at.timestamp_millis(), id],
        )?;
        Ok(updated > 0)
    }

    fn write_samples(&self, samples: &[MetricSample]) -> Result<()> {
        let conn = self.lock();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO grid_metrics (id, connection_id, metric_type, value, unit, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for sample in samples {
                stmt.execute(rusqlite::params![
                    &sample.id,
                    &sample.connection_id,
                    sample.metric_type.to_string(),
                    sample.value,
                    &sample.unit,
                    sample.timestamp.timestamp_millis(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn query_recent_samples(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, connection_id, metric_type, value, unit, timestamp
             FROM grid_metrics WHERE timestamp >= ?1 AND timestamp <= ?2
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![from.timestamp_millis(), to.timestamp_millis()],
            map_sample_row,
        )?;
        let mut results = Vec::new();
        for row in rows {
            results.push(finish_sample(row?)?);
        }
        Ok(results)
    }

    fn query_samples(
        &self,
        connection_id: &str,
        metric_type: MetricType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MetricSample>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, connection_id, metric_type, value, unit, timestamp
             FROM grid_metrics
             WHERE connection_id = ?1 AND metric_type = ?2 AND timestamp >= ?3 AND timestamp <= ?4
             ORDER BY timestamp DESC LIMIT ?5",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![
                connection_id,
                metric_type.to_string(),
                from.timestamp_millis(),
                to.timestamp_millis(),
                limit as i64,
            ],
            map_sample_row,
        )?;
        let mut results = Vec::new();
        for row in rows {
            results.push(finish_sample(row?)?);
        }
        Ok(results)
    }

    fn find_open_alert(
        &self,
        connection_id: &str,
        alert_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Alert>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, connection_id, alert_type, severity, message, resolved, created_at, resolved_at
             FROM grid_alerts
             WHERE connection_id = ?1 AND alert_type = ?2 AND resolved = 0 AND created_at >= ?3
             ORDER BY created_at DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(
            rusqlite::params![connection_id, alert_type, since.timestamp_millis()],
            map_alert_row,
        )?;
        match rows.next() {
            Some(row) => Ok(Some(finish_alert(row?)?)),
            None => Ok(None),
        }
    }

    fn insert_alert(&self, alert: &Alert) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO grid_alerts (id, connection_id, alert_type, severity, message, resolved, created_at, resolved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        stmt.execute(rusqlite::params![
            &alert.id,
            &alert.connection_id,
            &alert.alert_type,
            alert.severity.to_string(),
            &alert.message,
            alert.resolved as i64,
            alert.created_at.timestamp_millis(),
            alert.resolved_at.map(|t| t.timestamp_millis()),
        ])?;
        Ok(())
    }

    fn list_open_alerts(&self, limit: usize, offset: usize) -> Result<Vec<Alert>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, connection_id, alert_type, severity, message, resolved, created_at, resolved_at
             FROM grid_alerts WHERE resolved = 0
             ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit as i64, offset as i64], map_alert_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(finish_alert(row?)?);
        }
        Ok(results)
    }

    fn count_open_alerts(&self) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM grid_alerts WHERE resolved = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn resolve_alerts_older_than(
        &self,
        cutoff: DateTime<Utc>,
        severities: &[Severity],
        resolved_at: DateTime<Utc>,
    ) -> Result<u64> {
        if severities.is_empty() {
            return Ok(0);
        }
        let placeholders: Vec<String> = (0..severities.len())
            .map(|i| format!("?{}", i + 3))
            .collect();
        let sql = format!(
            "UPDATE grid_alerts SET resolved = 1, resolved_at = ?1
             WHERE resolved = 0 AND created_at < ?2 AND severity IN ({})",
            placeholders.join(", ")
        );

        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
            Box::new(resolved_at.timestamp_millis()),
            Box::new(cutoff.timestamp_millis()),
        ];
        for severity in severities {
            params.push(Box::new(severity.to_string()));
        }
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();

        let conn = self.lock();
        let updated = conn.execute(&sql, param_refs.as_slice())?;
        Ok(updated as u64)
    }

    fn insert_prediction(&self, prediction: &Prediction) -> Result<()> {
        let data_json = serde_json::to_string(&prediction.data)?;
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO ai_predictions (id, connection_id, model_type, prediction_type, confidence, severity, is_anomaly, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        stmt.execute(rusqlite::params![
            &prediction.id,
            &prediction.connection_id,
            &prediction.model_type,
            &prediction.prediction_type,
            prediction.confidence,
            prediction.severity.to_string(),
            prediction.is_anomaly as i64,
            data_json,
            prediction.created_at.timestamp_millis(),
        ])?;
        Ok(())
    }

    fn list_predictions(
        &self,
        connection_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Prediction>> {
        let conn = self.lock();
        let mut sql = String::from(
            "SELECT id, connection_id, model_type, prediction_type, confidence, severity, is_anomaly, data, created_at
             FROM ai_predictions",
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(cid) = connection_id {
            sql.push_str(" WHERE connection_id = ?1");
            params.push(Box::new(cid.to_string()));
        }
        let limit_idx = params.len() + 1;
        sql.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            limit_idx,
            limit_idx + 1
        ));
        params.push(Box::new(limit as i64));
        params.push(Box::new(offset as i64));
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, i64>(8)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, connection_id, model_type, prediction_type, confidence, sev, is_anomaly, data, created_ms) =
                row?;
            results.push(Prediction {
                id,
                connection_id,
                model_type,
                prediction_type,
                confidence,
                severity: parse_enum("severity", &sev)?,
                is_anomaly: is_anomaly != 0,
                data: serde_json::from_str(&data).unwrap_or_default(),
                created_at: ts_from_millis(created_ms),
            });
        }
        Ok(results)
    }
}

type ConnectionRow = (String, String, String, f64, String, i64, i64);

fn map_connection_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConnectionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn finish_connection(row: ConnectionRow) -> Result<Connection> {
    let (id, name, conn_type, nominal_voltage, status, created_ms, updated_ms) = row;
    Ok(Connection {
        id,
        name,
        connection_type: parse_enum("connection_type", &conn_type)?,
        nominal_voltage,
        status: parse_enum("status", &status)?,
        created_at: ts_from_millis(created_ms),
        updated_at: ts_from_millis(updated_ms),
    })
}

type SampleRow = (String, String, String, f64, String, i64);

fn map_sample_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SampleRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn finish_sample(row: SampleRow) -> Result<MetricSample> {
    let (id, connection_id, metric_type, value, unit, ts_ms) = row;
    Ok(MetricSample {
        id,
        connection_id,
        metric_type: parse_enum("metric_type", &metric_type)?,
        value,
        unit,
        timestamp: ts_from_millis(ts_ms),
    })
}

type AlertRow = (String, String, String, String, String, i64, i64, Option<i64>);

fn map_alert_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AlertRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn finish_alert(row: AlertRow) -> Result<Alert> {
    let (id, connection_id, alert_type, severity, message, resolved, created_ms, resolved_ms) = row;
    Ok(Alert {
        id,
        connection_id,
        alert_type,
        severity: parse_enum("severity", &severity)?,
        message,
        resolved: resolved != 0,
        created_at: ts_from_millis(created_ms),
        resolved_at: resolved_ms.map(ts_from_millis),
    })
}
