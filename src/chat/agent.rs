use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use log::{debug, info, warn};
use serde_json::{Value, json};
use thiserror::Error;

use crate::utils::config::LLMConfig;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to the model failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("the model refused the prompt: {0}")]
    Blocked(String),
    #[error("the model returned no text")]
    Empty,
}

impl BackendError {
    /// Worth another attempt when retries are enabled.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Http(e) => e.is_timeout() || e.is_connect(),
            BackendError::Api { status, .. } => *status == 429 || *status >= 500,
            BackendError::Blocked(_) | BackendError::Empty => false,
        }
    }
}

/// The generative model that writes the critique.
pub trait CritiqueBackend {
    fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;
}

/// Gemini `generateContent` client.
pub struct CritiqueAgent {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_retries: u32,
}

impl CritiqueAgent {
    pub fn new(api_key: String, config: &LLMConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    async fn send_once(&self, body: &Value) -> Result<Value, BackendError> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: api_error_message(&error_body),
            });
        }

        Ok(response.json().await?)
    }
}

impl CritiqueBackend for CritiqueAgent {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, BackendError> {
        info!(
            "calling Gemini API (model: {}, temperature: {}, max retries: {})",
            self.model, self.temperature, self.max_retries
        );
        debug!("prompt length: {} characters", prompt.len());

        let body = request_body(prompt, system_instruction, self.temperature);

        let response = (|| self.send_once(&body))
            .retry(
                ExponentialBuilder::default().with_max_times(self.max_retries as usize),
            )
            .when(BackendError::is_transient)
            .notify(|err, after| warn!("retrying Gemini call in {:?}: {}", after, err))
            .await?;

        let text = candidate_text(&response)?;
        debug!("Gemini returned {} characters", text.len());

        Ok(text)
    }
}

fn request_body(prompt: &str, system_instruction: &str, temperature: f32) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [{ "text": prompt }]
            }
        ],
        "systemInstruction": {
            "parts": [{ "text": system_instruction }]
        },
        "generationConfig": {
            "temperature": temperature
        }
    })
}

/// Joins the text parts of the first candidate, skipping thought parts.
fn candidate_text(body: &Value) -> Result<String, BackendError> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let Some(parts) = parts else {
        if let Some(reason) = body
            .get("promptFeedback")
            .and_then(|f| f.get("blockReason"))
            .and_then(|r| r.as_str())
        {
            return Err(BackendError::Blocked(reason.to_string()));
        }
        return Err(BackendError::Empty);
    };

    let text: String = parts
        .iter()
        .filter(|p| !p.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(BackendError::Empty);
    }

    Ok(text)
}

/// Pulls `error.message` out of a Gemini error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
