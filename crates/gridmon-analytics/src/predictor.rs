use crate::summary::MetricSummary;
use anyhow::Result;
use async_trait::async_trait;
use gridmon_common::types::{MetricType, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a predictor may look at for one connection. The evaluation
/// time is passed in rather than sampled inside so predictions are
/// reproducible in tests.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisInput {
    pub connection_id: String,
    pub connection_name: String,
    pub summaries: BTreeMap<MetricType, MetricSummary>,
    /// Epoch milliseconds of the analysis round.
    pub evaluated_at_ms: i64,
}

/// One prediction in the external wire shape (camelCase JSON, shared by
/// the external-model contract and the persisted payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPrediction {
    pub model_type: String,
    pub prediction_type: String,
    /// Confidence score in [0, 1]. External models occasionally stray
    /// outside the range; the engine clamps before persisting.
    pub confidence: f64,
    pub is_anomaly: bool,
    pub severity: Severity,
    /// Free-form payload carrying at least a `summary` field.
    pub data: serde_json::Value,
}

/// Prediction strategy. Implementations must be shareable across the
/// HTTP handlers and the pipeline round.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Strategy name, used in logs.
    fn name(&self) -> &str;

    /// Produces predictions for one connection's summarized window.
    async fn predict(&self, input: &AnalysisInput) -> Result<Vec<ModelPrediction>>;
}
