use async_trait::async_trait;
use pgvector::Vector;

use crate::domain::entities::{
    ArticleId, Candidate, ChunkId, NewArticle, NewChunk, Reference, StoredArticle,
};
use crate::domain::value_objects::ContentHash;

#[derive(Debug)]
pub enum StoreError {
    DatabaseError(String),
    ConstraintViolation(String),
    MissingArticle(ArticleId),
    Unsupported(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            StoreError::ConstraintViolation(msg) => write!(f, "Constraint violation: {}", msg),
            StoreError::MissingArticle(id) => {
                write!(f, "Referential error: article {} does not exist", id)
            }
            StoreError::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Stage-1 query, already prepared for the store's variant.
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusQuery {
    Vector(Vector),
    Text(String),
}

/// Whether a store can run the popularity re-rank itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingCapability {
    NearestNeighbor,
    NativeRanking,
}

/// Row-level inserts, scoped to one open transaction.
pub trait CorpusWriter {
    fn insert_article(&mut self, article: &NewArticle) -> Result<ArticleId, StoreError>;

    fn insert_chunk(
        &mut self,
        article_id: ArticleId,
        chunk: &NewChunk,
    ) -> Result<ChunkId, StoreError>;
}

/// Writes one article and all of its chunks. Callers run this inside a
/// transaction and roll back on `Err`.
pub fn write_article<W>(
    writer: &mut W,
    article: &NewArticle,
    chunks: &[NewChunk],
) -> Result<StoredArticle, StoreError>
where
    W: CorpusWriter + ?Sized,
{
    let article_id = writer.insert_article(article)?;

    let chunk_ids = chunks
        .iter()
        .map(|chunk| writer.insert_chunk(article_id, chunk))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StoredArticle {
        article_id,
        chunk_ids,
    })
}

#[async_trait]
pub trait CorpusStore: Send + Sync {
    fn capability(&self) -> RankingCapability;

    /// Declared vector dimension, or `None` for a text-only corpus.
    fn embedding_dimension(&self) -> Option<usize>;

    async fn find_article_by_hash(
        &self,
        hash: &ContentHash,
    ) -> Result<Option<ArticleId>, StoreError>;

    /// Inserts the article and its chunks atomically.
    async fn import_article(
        &self,
        article: &NewArticle,
        chunks: &[NewChunk],
    ) -> Result<StoredArticle, StoreError>;

    /// Up to `limit` candidates, ascending by distance.
    async fn search(&self, query: &CorpusQuery, limit: usize)
    -> Result<Vec<Candidate>, StoreError>;

    async fn ranked_search(
        &self,
        _query: &CorpusQuery,
        _overfetch: usize,
        _final_count: usize,
    ) -> Result<Vec<Reference>, StoreError> {
        Err(StoreError::Unsupported(
            "store does not rank candidates natively".to_string(),
        ))
    }

    /// References for the given candidates, in the same order.
    async fn load_references(&self, candidates: &[Candidate])
    -> Result<Vec<Reference>, StoreError>;

    async fn count_articles(&self) -> Result<i64, StoreError>;

    async fn count_chunks(&self) -> Result<i64, StoreError>;
}
