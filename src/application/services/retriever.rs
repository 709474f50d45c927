use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::ports::EmbeddingProvider;
use crate::config::{ConfigError, RetrievalConfig};
use crate::domain::entities::Reference;
use crate::domain::ranking::rerank_by_popularity;
use crate::domain::repositories::{CorpusQuery, CorpusStore, RankingCapability};

#[derive(Debug)]
pub enum RetrievalError {
    EmbeddingError(String),
    RepositoryError(String),
}

impl std::fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalError::EmbeddingError(msg) => write!(f, "Embedding error: {}", msg),
            RetrievalError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for RetrievalError {}

/// Two-stage retrieval: nearest neighbours, then popularity re-rank.
pub struct Retriever {
    store: Arc<dyn CorpusStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    overfetch: usize,
    final_count: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn CorpusStore>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            overfetch: config.overfetch,
            final_count: config.final_count,
        }
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<Reference>, RetrievalError> {
        self.retrieve_with(question, self.overfetch, self.final_count)
            .await
    }

    /// An empty or failing Stage 1 yields no references rather than an error.
    pub async fn retrieve_with(
        &self,
        question: &str,
        overfetch: usize,
        final_count: usize,
    ) -> Result<Vec<Reference>, RetrievalError> {
        if overfetch == 0 || final_count == 0 {
            return Ok(Vec::new());
        }

        let query = self.prepare_query(question).await?;

        if self.store.capability() == RankingCapability::NativeRanking {
            return match self.store.ranked_search(&query, overfetch, final_count).await {
                Ok(references) => Ok(references),
                Err(e) => {
                    warn!("Ranked search failed, continuing without references: {}", e);
                    Ok(Vec::new())
                }
            };
        }

        let candidates = match self.store.search(&query, overfetch).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Search failed, continuing without references: {}", e);
                return Ok(Vec::new());
            }
        };

        if candidates.is_empty() {
            info!("No candidate chunks found for question");
            return Ok(Vec::new());
        }

        let selected = rerank_by_popularity(&candidates, final_count);
        debug!(
            "Selected {} of {} candidates after re-rank",
            selected.len(),
            candidates.len()
        );

        self.store
            .load_references(&selected)
            .await
            .map_err(|e| RetrievalError::RepositoryError(e.to_string()))
    }

    async fn prepare_query(&self, question: &str) -> Result<CorpusQuery, RetrievalError> {
        match &self.embedder {
            Some(embedder) => embedder
                .embed_one(question)
                .await
                .map(CorpusQuery::Vector)
                .map_err(|e| RetrievalError::EmbeddingError(e.to_string())),
            None => Ok(CorpusQuery::Text(question.to_string())),
        }
    }
}

/// The embedder must produce exactly the vectors the corpus schema declares.
pub fn ensure_embedding_compatibility(
    store: &dyn CorpusStore,
    embedder: Option<&dyn EmbeddingProvider>,
) -> Result<(), ConfigError> {
    match (store.embedding_dimension(), embedder) {
        (Some(declared), Some(embedder)) if declared == embedder.embedding_dimension() => Ok(()),
        (Some(declared), Some(embedder)) => Err(ConfigError::Incompatible(format!(
            "embedder '{}' produces {} dimensions but the corpus schema declares vector({})",
            embedder.model_info().0,
            embedder.embedding_dimension(),
            declared
        ))),
        (Some(declared), None) => Err(ConfigError::Incompatible(format!(
            "corpus stores vector({}) embeddings but no embedder is configured",
            declared
        ))),
        (None, Some(_)) => Err(ConfigError::Incompatible(
            "corpus is text-only but an embedder is configured".to_string(),
        )),
        (None, None) => Ok(()),
    }
}
