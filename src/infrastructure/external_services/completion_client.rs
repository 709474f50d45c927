use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::application::ports::answer_generator::{AnswerGenerator, AnswerGeneratorError};
use crate::config::CompletionClientConfig;

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    /// The prompt already carries its own chat markers.
    pub raw: bool,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_ctx: u32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct CompletionClient {
    client: Client,
    config: CompletionClientConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionClientConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt,
            raw: true,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_ctx: self.config.context_size,
            },
        }
    }
}

#[async_trait]
impl AnswerGenerator for CompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerGeneratorError> {
        debug!("Requesting completion from {}", self.config.service_url);

        let response = self
            .client
            .post(&self.config.service_url)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| AnswerGeneratorError::NetworkError(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerGeneratorError::ApiError(format!("{}: {}", status, body)));
        }

        let generated = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| AnswerGeneratorError::ApiError(e.to_string()))?;

        Ok(generated.response.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let client = CompletionClient::new(CompletionClientConfig::default()).unwrap();
        let body = serde_json::to_value(client.request("<|im_start|>user\nhi")).unwrap();

        assert_eq!(body["model"], "llama3");
        assert_eq!(body["raw"], true);
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_ctx"], 2048);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"model":"llama3","response":"  Vacuum reclaims space. ","done":true}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();

        assert!(parsed.done);
        assert_eq!(parsed.response.trim(), "Vacuum reclaims space.");
    }
}
