use gridmon_common::types::{MetricSample, MetricType};
use serde::Serialize;
use std::collections::BTreeMap;

/// Coarse direction of a metric over the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Summary statistics for one metric type over the analysis window.
/// Serialized camelCase because the JSON form is embedded in the
/// external-model prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub count: usize,
    pub latest: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub trend: Trend,
    pub unit: String,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Classifies the window trend. Input is newest-first (the storage query
/// order); the values are reversed to oldest-first before splitting, so
/// the "later" half genuinely is the more recent data. The later half's
/// mean more than 5% above the earlier half's reads as increasing, more
/// than 5% below as decreasing.
fn classify_trend(values_desc: &[f64]) -> Trend {
    if values_desc.len() < 2 {
        return Trend::Stable;
    }
    let mut ascending = values_desc.to_vec();
    ascending.reverse();

    let mid = ascending.len() / 2;
    let earlier_avg = mean(&ascending[..mid]);
    let later_avg = mean(&ascending[mid..]);
    if earlier_avg.abs() < f64::EPSILON {
        return Trend::Stable;
    }

    let change = (later_avg - earlier_avg) / earlier_avg;
    if change > 0.05 {
        Trend::Increasing
    } else if change < -0.05 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Summarizes one metric type's values (newest first). Returns `None` for
/// an empty window: no data means no summary and no prediction.
pub fn summarize_values(values_desc: &[f64], unit: &str) -> Option<MetricSummary> {
    if values_desc.is_empty() {
        return None;
    }
    Some(MetricSummary {
        count: values_desc.len(),
        latest: values_desc[0],
        average: mean(values_desc),
        min: values_desc.iter().copied().fold(f64::INFINITY, f64::min),
        max: values_desc.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std_dev: std_dev(values_desc),
        trend: classify_trend(values_desc),
        unit: unit.to_string(),
    })
}

/// Builds per-metric-type summaries from one connection's samples
/// (newest first, types mixed).
pub fn build_summaries(samples_desc: &[&MetricSample]) -> BTreeMap<MetricType, MetricSummary> {
    let mut summaries = BTreeMap::new();
    for metric_type in MetricType::ALL {
        let values: Vec<f64> = samples_desc
            .iter()
            .filter(|s| s.metric_type == metric_type)
            .map(|s| s.value)
            .collect();
        if let Some(summary) = summarize_values(&values, metric_type.unit()) {
            summaries.insert(metric_type, summary);
        }
    }
    summaries
}
