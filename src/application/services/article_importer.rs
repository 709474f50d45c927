use std::sync::Arc;

use tracing::{debug, info};

use crate::application::ports::EmbeddingProvider;
use crate::application::services::text_splitter::TextSplitter;
use crate::domain::entities::{ArticleId, NewArticle, NewChunk};
use crate::domain::repositories::CorpusStore;

#[derive(Debug)]
pub enum ArticleImportError {
    EmbeddingError(String),
    RepositoryError(String),
}

impl std::fmt::Display for ArticleImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArticleImportError::EmbeddingError(msg) => write!(f, "Embedding error: {}", msg),
            ArticleImportError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for ArticleImportError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { article_id: ArticleId, chunks: usize },
    /// An article with the same content hash is already stored.
    Skipped { article_id: ArticleId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusTotals {
    pub articles: i64,
    pub chunks: i64,
}

/// Splits, embeds and stores one article at a time.
///
/// The whole article is handed to the embedder in one call; request
/// batching belongs to the provider.
pub struct ArticleImporter {
    store: Arc<dyn CorpusStore>,
    splitter: Arc<dyn TextSplitter>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl ArticleImporter {
    pub fn new(
        store: Arc<dyn CorpusStore>,
        splitter: Arc<dyn TextSplitter>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        Self {
            store,
            splitter,
            embedder,
        }
    }

    pub async fn corpus_totals(&self) -> Result<CorpusTotals, ArticleImportError> {
        let articles = self
            .store
            .count_articles()
            .await
            .map_err(|e| ArticleImportError::RepositoryError(e.to_string()))?;
        let chunks = self
            .store
            .count_chunks()
            .await
            .map_err(|e| ArticleImportError::RepositoryError(e.to_string()))?;

        Ok(CorpusTotals { articles, chunks })
    }

    pub async fn import(&self, article: &NewArticle) -> Result<ImportOutcome, ArticleImportError> {
        if let Some(article_id) = self
            .store
            .find_article_by_hash(article.content_hash())
            .await
            .map_err(|e| ArticleImportError::RepositoryError(e.to_string()))?
        {
            info!(
                "Article '{}' already imported as {}, skipping",
                article.title(),
                article_id
            );
            return Ok(ImportOutcome::Skipped { article_id });
        }

        let texts = self.splitter.split(article.content());
        debug!("Split '{}' into {} chunks", article.title(), texts.len());

        let chunks = self.build_chunks(texts).await?;

        let stored = self
            .store
            .import_article(article, &chunks)
            .await
            .map_err(|e| ArticleImportError::RepositoryError(e.to_string()))?;

        info!(
            "Imported article {} '{}' with {} chunks",
            stored.article_id,
            article.title(),
            stored.chunk_ids.len()
        );

        Ok(ImportOutcome::Imported {
            article_id: stored.article_id,
            chunks: stored.chunk_ids.len(),
        })
    }

    async fn build_chunks(&self, texts: Vec<String>) -> Result<Vec<NewChunk>, ArticleImportError> {
        let Some(embedder) = &self.embedder else {
            return Ok(texts
                .into_iter()
                .enumerate()
                .map(|(index, text)| NewChunk::new(index as i32, text, None))
                .collect());
        };

        let vectors = embedder
            .embed(&texts)
            .await
            .map_err(|e| ArticleImportError::EmbeddingError(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(ArticleImportError::EmbeddingError(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        let chunks = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (text, vector))| NewChunk::new(index as i32, text, Some(vector)))
            .collect();

        Ok(chunks)
    }
}
