use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::predictor::{AnalysisInput, ModelPrediction, Predictor};
use crate::prompt;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Predictor backed by an OpenAI-compatible chat-completions endpoint.
///
/// Every transport, status, or parse failure surfaces as an `Err`; callers
/// wrap this predictor in [`crate::fallback::FallbackPredictor`] so those
/// errors never reach the pipeline.
#[derive(Clone)]
pub struct ExternalModelPredictor {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl ExternalModelPredictor {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
        max_tokens: Option<usize>,
        temperature: Option<f32>,
    ) -> Result<Self> {
        let timeout = timeout_secs.unwrap_or(30);
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()?;

        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| "gpt-4.1-2025-04-14".to_string()),
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            client,
            max_tokens,
            temperature,
        })
    }

    async fn call_api(&self, prompt_text: &str) -> Result<String> {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt_text.to_string(),
                },
            ],
            temperature: Some(self.temperature.unwrap_or(0.3)),
            max_tokens: Some(self.max_tokens.unwrap_or(1500)),
        };

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt_text.len(),
            "Calling external model API"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await
            .context("Failed to send request to model API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Model API request failed");
            anyhow::bail!("Model API error {}: {}", status, body);
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse model API response")?;

        tracing::debug!(usage = ?chat_resp.usage, "Model API response received");

        chat_resp
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("Empty response from model API"))
    }
}

#[async_trait]
impl Predictor for ExternalModelPredictor {
    fn name(&self) -> &str {
        "external_model"
    }

    async fn predict(&self, input: &AnalysisInput) -> Result<Vec<ModelPrediction>> {
        let prompt_text = prompt::build_analysis_prompt(input)?;
        let content = self.call_api(&prompt_text).await?;

        let payload = strip_code_fence(&content);
        let predictions: Vec<ModelPrediction> = serde_json::from_str(payload)
            .with_context(|| format!("Model response is not a prediction array: {content}"))?;

        Ok(predictions)
    }
}

/// Models often wrap the JSON array in a markdown code fence; strip it.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the fence's language tag line and the closing fence.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end_matches('`')
        .trim()
}
