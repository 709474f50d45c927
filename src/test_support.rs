//! Stubs shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pgvector::Vector;

use crate::application::ports::answer_generator::{AnswerGenerator, AnswerGeneratorError};
use crate::application::ports::embedding_provider::{EmbeddingProvider, EmbeddingProviderError};
use crate::domain::entities::NewArticle;
use crate::domain::value_objects::ContentHash;

pub fn article(title: &str, content: &str) -> NewArticle {
    NewArticle::new(
        "Test Author".to_string(),
        title.to_string(),
        content.to_string(),
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        ContentHash::from_bytes(format!("{}\n{}", title, content).as_bytes()),
    )
}

/// Deterministic bag-of-words embedder: each lowercase word bumps one bucket.
pub struct HashEmbedder {
    dimension: usize,
    /// Texts containing this marker come back with one extra dimension.
    corrupt_marker: Option<String>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            corrupt_marker: None,
        }
    }

    pub fn corrupting(dimension: usize, marker: &str) -> Self {
        Self {
            dimension,
            corrupt_marker: Some(marker.to_string()),
        }
    }

    pub fn vector_for(&self, text: &str) -> Vector {
        let mut values = vec![0.0_f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dimension;
            values[bucket] += 1.0;
        }

        if let Some(marker) = &self.corrupt_marker {
            if text.contains(marker.as_str()) {
                values.push(0.0);
            }
        }

        Vector::from(values)
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingProviderError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn model_info(&self) -> (String, Option<String>) {
        ("hash-embedder".to_string(), None)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }
}

/// Always embeds to the same vector.
pub struct FixedEmbedder(pub Vec<f32>);

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>, EmbeddingProviderError> {
        Ok(texts.iter().map(|_| Vector::from(self.0.clone())).collect())
    }

    fn model_info(&self) -> (String, Option<String>) {
        ("fixed".to_string(), None)
    }

    fn embedding_dimension(&self) -> usize {
        self.0.len()
    }
}

/// Records prompts and answers with a canned reply.
#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerGeneratorError> {
        self.prompts
            .lock()
            .map_err(|e| AnswerGeneratorError::ApiError(e.to_string()))?
            .push(prompt.to_string());
        Ok("canned answer".to_string())
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}
