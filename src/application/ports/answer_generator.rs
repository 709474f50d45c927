use async_trait::async_trait;

#[derive(Debug)]
pub enum AnswerGeneratorError {
    NetworkError(String),
    ApiError(String),
}

impl std::fmt::Display for AnswerGeneratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerGeneratorError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            AnswerGeneratorError::ApiError(msg) => write!(f, "API error: {}", msg),
        }
    }
}

impl std::error::Error for AnswerGeneratorError {}

/// The language model that turns a rendered prompt into an answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerGeneratorError>;

    fn model_name(&self) -> &str;
}
