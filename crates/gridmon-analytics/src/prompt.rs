use crate::predictor::AnalysisInput;
use anyhow::Result;

pub const SYSTEM_PROMPT: &str =
    "You are an AI analytics engine for electrical grid monitoring. Respond only with valid JSON.";

const ANALYSIS_PROMPT: &str = r#"You are an expert electrical grid analyst. Analyze this substation data and provide predictions:

Connection: {{CONNECTION_NAME}}
Data Summary:
{{DATA_SUMMARY}}

Provide predictions for:
1. Equipment failure risk (next 7 days)
2. Maintenance needs assessment
3. Load forecasting (next 24 hours)
4. Anomaly detection

Format response as JSON array with objects containing:
- modelType: string
- predictionType: string
- confidence: number (0-1)
- isAnomaly: boolean
- severity: "low" | "medium" | "high"
- data: object with summary and details

Keep responses concise and actionable."#;

/// Renders the analysis prompt: connection name plus the summary
/// statistics as pretty-printed JSON.
pub fn build_analysis_prompt(input: &AnalysisInput) -> Result<String> {
    let summary_json = serde_json::to_string_pretty(&input.summaries)?;
    Ok(ANALYSIS_PROMPT
        .replace("{{CONNECTION_NAME}}", &input.connection_name)
        .replace("{{DATA_SUMMARY}}", &summary_json))
}
