//! Analytics and prediction engine.
//!
//! Each round aggregates a window of recent samples into per-metric-type
//! summary statistics ([`summary`]), then asks a [`Predictor`] for
//! confidence-scored predictions. The primary predictor calls an
//! OpenAI-compatible chat-completions endpoint
//! ([`providers::external::ExternalModelPredictor`]); the
//! [`fallback::FallbackPredictor`] decorator guarantees that any primary
//! failure is swallowed and answered by the deterministic
//! [`fallback::RuleBasedPredictor`] instead. High-severity anomalous
//! predictions are handed back to the caller as alert candidates.

pub mod engine;
pub mod fallback;
pub mod models;
pub mod predictor;
pub mod prompt;
pub mod providers;
pub mod summary;


pub use engine::{run_analytics_round, AnalyticsOutcome};
pub use fallback::{FallbackPredictor, RuleBasedPredictor};
pub use predictor::{AnalysisInput, ModelPrediction, Predictor};
pub use providers::external::ExternalModelPredictor;
pub use summary::{build_summaries, MetricSummary, Trend};
