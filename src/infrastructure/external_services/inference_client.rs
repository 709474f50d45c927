use async_trait::async_trait;
use pgvector::Vector;
use reqwest::{Client, Error as ReqwestError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::application::ports::embedding_provider::{EmbeddingProvider, EmbeddingProviderError};
use crate::config::EmbeddingsClientConfig;

#[derive(Serialize)]
pub struct EmbeddingsRequest {
    pub text: TextInput,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingsResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    pub embeddings: Vec<Vector>,
    #[serde(default)]
    pub shape: Vec<usize>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug)]
pub enum EmbeddingsError {
    RequestError(String),
    ParseError(String),
    MaxRetriesExceeded(String),
}

impl std::fmt::Display for EmbeddingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingsError::RequestError(msg) => write!(f, "Request error: {}", msg),
            EmbeddingsError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            EmbeddingsError::MaxRetriesExceeded(msg) => write!(f, "Max retries exceeded: {}", msg),
        }
    }
}

impl From<EmbeddingsError> for EmbeddingProviderError {
    fn from(error: EmbeddingsError) -> Self {
        match error {
            EmbeddingsError::RequestError(msg) => EmbeddingProviderError::NetworkError(msg),
            EmbeddingsError::ParseError(msg) => EmbeddingProviderError::ApiError(msg),
            EmbeddingsError::MaxRetriesExceeded(_) => EmbeddingProviderError::ServiceUnavailable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    config: EmbeddingsClientConfig,
}

impl InferenceClient {
    pub fn new(config: EmbeddingsClientConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EmbeddingsClientConfig {
        &self.config
    }

    pub async fn get_embeddings(
        &self,
        texts: &[String],
    ) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let request = EmbeddingsRequest {
            text: TextInput::Multiple(texts.to_vec()),
        };

        self.send_request(request).await
    }

    async fn send_request(
        &self,
        request: EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let error = match self.execute_request(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if attempts > self.config.max_retries {
                return Err(EmbeddingsError::MaxRetriesExceeded(format!(
                    "{} attempts, last error: {}",
                    attempts, error
                )));
            }

            let backoff_time = Duration::from_millis(
                (self.config.backoff_factor.powi(attempts as i32 - 1) * 1000.0) as u64,
            );
            warn!(
                "Embeddings request failed ({}), retrying in {:?}",
                error, backoff_time
            );

            tokio::time::sleep(backoff_time).await;
        }
    }

    async fn execute_request(
        &self,
        request: &EmbeddingsRequest,
    ) -> Result<EmbeddingsResponse, EmbeddingsError> {
        let response = self
            .client
            .post(&self.config.service_url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EmbeddingsError::RequestError(format!("Error: {}", e.without_url())))?;

        let response_data = response
            .json::<EmbeddingsResponse>()
            .await
            .map_err(|e| EmbeddingsError::ParseError(e.to_string()))?;

        if !response_data.success {
            return Err(EmbeddingsError::ParseError(
                "service reported an unsuccessful embedding".to_string(),
            ));
        }

        Ok(response_data)
    }
}

/// Adapts the HTTP client to the embedding port, batching and checking sizes.
pub struct InferenceEmbeddingProvider {
    client: InferenceClient,
}

impl InferenceEmbeddingProvider {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: EmbeddingsClientConfig) -> Result<Self, ReqwestError> {
        Ok(Self::new(InferenceClient::new(config)?))
    }
}

fn validate_embeddings(
    expected_count: usize,
    dimension: usize,
    embeddings: &[Vector],
) -> Result<(), EmbeddingProviderError> {
    if embeddings.len() != expected_count {
        return Err(EmbeddingProviderError::ApiError(format!(
            "expected {} embeddings, got {}",
            expected_count,
            embeddings.len()
        )));
    }

    if let Some(bad) = embeddings.iter().find(|v| v.as_slice().len() != dimension) {
        return Err(EmbeddingProviderError::DimensionMismatch {
            expected: dimension,
            actual: bad.as_slice().len(),
        });
    }

    Ok(())
}

#[async_trait]
impl EmbeddingProvider for InferenceEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingProviderError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingProviderError::InvalidInput(
                "Cannot embed empty text".to_string(),
            ));
        }

        let config = self.client.config();
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(config.batch_size.max(1)) {
            let response = self.client.get_embeddings(batch).await?;
            validate_embeddings(batch.len(), config.dimension, &response.embeddings)?;
            vectors.extend(response.embeddings);
        }

        Ok(vectors)
    }

    fn model_info(&self) -> (String, Option<String>) {
        (self.client.config().model_name.clone(), None)
    }

    fn embedding_dimension(&self) -> usize {
        self.client.config().dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_construction() {
        let request = EmbeddingsRequest {
            text: TextInput::Multiple(vec!["Hello".to_string(), "World".to_string()]),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "text": ["Hello", "World"] }));

        let single = EmbeddingsRequest {
            text: TextInput::Single("Hello world".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            serde_json::json!({ "text": "Hello world" })
        );
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"success": true, "embeddings": [[0.5, 0.25], [1.0, 0.0]], "shape": [2, 2]}"#;
        let response: EmbeddingsResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[0].as_slice(), &[0.5, 0.25]);
        assert_eq!(response.shape, vec![2, 2]);
    }

    #[test]
    fn test_validate_embeddings() {
        let good = vec![Vector::from(vec![0.0, 1.0]), Vector::from(vec![1.0, 0.0])];
        assert!(validate_embeddings(2, 2, &good).is_ok());

        assert!(matches!(
            validate_embeddings(3, 2, &good),
            Err(EmbeddingProviderError::ApiError(_))
        ));
        assert!(matches!(
            validate_embeddings(2, 384, &good),
            Err(EmbeddingProviderError::DimensionMismatch {
                expected: 384,
                actual: 2
            })
        ));
    }
}
