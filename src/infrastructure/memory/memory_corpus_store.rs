use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::config::DistanceMetric;
use crate::domain::entities::{
    ArticleId, Candidate, ChunkId, NewArticle, NewChunk, Reference, StoredArticle,
};
use crate::domain::ranking::rerank_by_popularity;
use crate::domain::repositories::{
    CorpusQuery, CorpusStore, CorpusWriter, RankingCapability, StoreError, write_article,
};
use crate::domain::value_objects::ContentHash;

#[derive(Debug, Clone)]
struct ArticleRow {
    id: ArticleId,
    title: String,
    content_hash: String,
}

#[derive(Debug, Clone)]
struct ChunkRow {
    id: ChunkId,
    article_id: ArticleId,
    chunk_index: i32,
    text: String,
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryTables {
    articles: Vec<ArticleRow>,
    chunks: Vec<ChunkRow>,
    last_article_id: ArticleId,
    last_chunk_id: ChunkId,
}

/// In-process corpus with the same constraints and transaction semantics as
/// the Postgres schema. Transactions work on a copy of the tables that
/// replaces the committed state only on success.
pub struct MemoryCorpusStore {
    tables: Mutex<MemoryTables>,
    dimension: Option<usize>,
    metric: DistanceMetric,
    capability: RankingCapability,
}

impl MemoryCorpusStore {
    pub fn new(dimension: Option<usize>) -> Self {
        Self {
            tables: Mutex::new(MemoryTables::default()),
            dimension,
            metric: DistanceMetric::L2,
            capability: RankingCapability::NearestNeighbor,
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_native_ranking(mut self) -> Self {
        self.capability = RankingCapability::NativeRanking;
        self
    }

    pub fn transaction<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn CorpusWriter) -> Result<T, StoreError>,
    {
        let mut tables = self.lock()?;
        let mut staged = tables.clone();

        let result = work(&mut MemoryWriter {
            tables: &mut staged,
            dimension: self.dimension,
        })?;

        *tables = staged;
        Ok(result)
    }

    /// Chunk texts of one article in split order.
    pub fn chunk_texts(&self, article_id: ArticleId) -> Result<Vec<String>, StoreError> {
        let tables = self.lock()?;
        let mut rows: Vec<&ChunkRow> = tables
            .chunks
            .iter()
            .filter(|c| c.article_id == article_id)
            .collect();
        rows.sort_by_key(|c| c.chunk_index);

        Ok(rows.into_iter().map(|c| c.text.clone()).collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryTables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    fn vector_candidates(
        &self,
        tables: &MemoryTables,
        query: &[f32],
    ) -> Result<Vec<Candidate>, StoreError> {
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(StoreError::DatabaseError(format!(
                    "different vector dimensions {} and {}",
                    expected,
                    query.len()
                )));
            }
        }

        Ok(tables
            .chunks
            .iter()
            .filter_map(|chunk| {
                chunk.embedding.as_ref().map(|embedding| {
                    Candidate::new(
                        chunk.id,
                        chunk.article_id,
                        distance(self.metric, embedding, query),
                    )
                })
            })
            .collect())
    }

    fn text_candidates(tables: &MemoryTables, query: &str) -> Vec<Candidate> {
        let terms = tokenize(query);

        tables
            .chunks
            .iter()
            .filter_map(|chunk| {
                let words = tokenize(&chunk.text);
                let hits = terms.iter().filter(|t| words.contains(*t)).count();
                (hits > 0).then(|| Candidate::new(chunk.id, chunk.article_id, -(hits as f64)))
            })
            .collect()
    }
}

fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f64 {
    match metric {
        DistanceMetric::L2 => a
            .iter()
            .zip(b)
            .map(|(x, y)| (*x as f64 - *y as f64).powi(2))
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Cosine => {
            let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
            let norm_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
            let norm_b = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

            // pgvector returns NaN here; treat a zero vector as unrelated instead
            if norm_a == 0.0 || norm_b == 0.0 {
                return 1.0;
            }

            1.0 - dot / (norm_a * norm_b)
        }
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

struct MemoryWriter<'a> {
    tables: &'a mut MemoryTables,
    dimension: Option<usize>,
}

impl CorpusWriter for MemoryWriter<'_> {
    fn insert_article(&mut self, article: &NewArticle) -> Result<ArticleId, StoreError> {
        if article.author().trim().is_empty() || article.title().trim().is_empty() {
            return Err(StoreError::ConstraintViolation(
                "article author and title must not be empty".to_string(),
            ));
        }

        let hash = article.content_hash().as_str();
        if self.tables.articles.iter().any(|a| a.content_hash == hash) {
            return Err(StoreError::ConstraintViolation(format!(
                "duplicate content_hash {}",
                hash
            )));
        }

        self.tables.last_article_id += 1;
        let id = self.tables.last_article_id;

        self.tables.articles.push(ArticleRow {
            id,
            title: article.title().to_string(),
            content_hash: hash.to_string(),
        });

        Ok(id)
    }

    fn insert_chunk(
        &mut self,
        article_id: ArticleId,
        chunk: &NewChunk,
    ) -> Result<ChunkId, StoreError> {
        if !self.tables.articles.iter().any(|a| a.id == article_id) {
            return Err(StoreError::MissingArticle(article_id));
        }

        if chunk.text().is_empty() {
            return Err(StoreError::ConstraintViolation(
                "chunk text must not be empty".to_string(),
            ));
        }

        if let Some(actual) = chunk.dimension() {
            match self.dimension {
                Some(expected) if expected == actual => {}
                Some(expected) => {
                    return Err(StoreError::ConstraintViolation(format!(
                        "expected {} dimensions, not {}",
                        expected, actual
                    )));
                }
                None => {
                    return Err(StoreError::ConstraintViolation(
                        "corpus does not store embeddings".to_string(),
                    ));
                }
            }
        }

        self.tables.last_chunk_id += 1;
        let id = self.tables.last_chunk_id;

        self.tables.chunks.push(ChunkRow {
            id,
            article_id,
            chunk_index: chunk.chunk_index(),
            text: chunk.text().to_string(),
            embedding: chunk.embedding().map(|v| v.as_slice().to_vec()),
        });

        Ok(id)
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpusStore {
    fn capability(&self) -> RankingCapability {
        self.capability
    }

    fn embedding_dimension(&self) -> Option<usize> {
        self.dimension
    }

    async fn find_article_by_hash(
        &self,
        hash: &ContentHash,
    ) -> Result<Option<ArticleId>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .articles
            .iter()
            .find(|a| a.content_hash == hash.as_str())
            .map(|a| a.id))
    }

    async fn import_article(
        &self,
        article: &NewArticle,
        chunks: &[NewChunk],
    ) -> Result<StoredArticle, StoreError> {
        self.transaction(|writer| write_article(writer, article, chunks))
    }

    async fn search(
        &self,
        query: &CorpusQuery,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError> {
        let tables = self.lock()?;

        let mut candidates = match query {
            CorpusQuery::Vector(vector) => self.vector_candidates(&tables, vector.as_slice())?,
            CorpusQuery::Text(text) => Self::text_candidates(&tables, text),
        };

        candidates.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        candidates.truncate(limit);

        Ok(candidates)
    }

    async fn ranked_search(
        &self,
        query: &CorpusQuery,
        overfetch: usize,
        final_count: usize,
    ) -> Result<Vec<Reference>, StoreError> {
        if self.capability != RankingCapability::NativeRanking {
            return Err(StoreError::Unsupported(
                "native ranking is disabled for this store".to_string(),
            ));
        }

        let candidates = self.search(query, overfetch).await?;
        let selected = rerank_by_popularity(&candidates, final_count);
        self.load_references(&selected).await
    }

    async fn load_references(
        &self,
        candidates: &[Candidate],
    ) -> Result<Vec<Reference>, StoreError> {
        let tables = self.lock()?;

        Ok(candidates
            .iter()
            .filter_map(|candidate| {
                let chunk = tables.chunks.iter().find(|c| c.id == candidate.chunk_id)?;
                let article = tables.articles.iter().find(|a| a.id == chunk.article_id)?;

                Some(Reference {
                    chunk_id: chunk.id,
                    article_id: article.id,
                    article_title: article.title.clone(),
                    chunk_text: chunk.text.clone(),
                })
            })
            .collect())
    }

    async fn count_articles(&self) -> Result<i64, StoreError> {
        Ok(self.lock()?.articles.len() as i64)
    }

    async fn count_chunks(&self) -> Result<i64, StoreError> {
        Ok(self.lock()?.chunks.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::article;
    use pgvector::Vector;

    fn vector_chunk(index: i32, text: &str, values: Vec<f32>) -> NewChunk {
        NewChunk::new(index, text.to_string(), Some(Vector::from(values)))
    }

    #[tokio::test]
    async fn test_import_assigns_ids() {
        let store = MemoryCorpusStore::new(Some(2));
        let stored = store
            .import_article(
                &article("One", "body one"),
                &[
                    vector_chunk(0, "first", vec![0.0, 1.0]),
                    vector_chunk(1, "second", vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(stored.article_id, 1);
        assert_eq!(stored.chunk_ids, vec![1, 2]);
        assert_eq!(store.count_articles().await.unwrap(), 1);
        assert_eq!(store.count_chunks().await.unwrap(), 2);
        assert_eq!(store.chunk_texts(1).unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failed_chunk_rolls_back_article() {
        let store = MemoryCorpusStore::new(Some(2));
        let result = store
            .import_article(
                &article("Broken", "body"),
                &[
                    vector_chunk(0, "fine", vec![0.0, 1.0]),
                    vector_chunk(1, "wrong size", vec![1.0, 0.0, 0.5]),
                ],
            )
            .await;

        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
        assert_eq!(store.count_articles().await.unwrap(), 0);
        assert_eq!(store.count_chunks().await.unwrap(), 0);
    }

    #[test]
    fn test_chunk_requires_existing_article() {
        let store = MemoryCorpusStore::new(None);
        let result = store.transaction(|writer| {
            writer.insert_chunk(42, &NewChunk::new(0, "orphan".to_string(), None))
        });

        assert!(matches!(result, Err(StoreError::MissingArticle(42))));
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let store = MemoryCorpusStore::new(None);
        let result = store.transaction(|writer| writer.insert_article(&article("  ", "body")));

        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_vector_search_orders_by_distance() {
        let store = MemoryCorpusStore::new(Some(2));
        store
            .import_article(
                &article("A", "a"),
                &[
                    vector_chunk(0, "far", vec![5.0, 5.0]),
                    vector_chunk(1, "near", vec![0.1, 0.0]),
                    vector_chunk(2, "middle", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let query = CorpusQuery::Vector(Vector::from(vec![0.0, 0.0]));
        let hits = store.search(&query, 2).await.unwrap();

        assert_eq!(hits.iter().map(|c| c.chunk_id).collect::<Vec<_>>(), vec![2, 3]);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn test_cosine_metric_ignores_magnitude() {
        let store = MemoryCorpusStore::new(Some(2)).with_metric(DistanceMetric::Cosine);
        store
            .import_article(
                &article("A", "a"),
                &[
                    vector_chunk(0, "close but off-axis", vec![0.5, 0.5]),
                    vector_chunk(1, "far but aligned", vec![10.0, 0.0]),
                    vector_chunk(2, "zero", vec![0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let query = CorpusQuery::Vector(Vector::from(vec![1.0, 0.0]));
        let hits = store.search(&query, 3).await.unwrap();

        assert_eq!(hits.iter().map(|c| c.chunk_id).collect::<Vec<_>>(), vec![2, 1, 3]);
        assert!(hits[0].distance.abs() < 1e-9);
        assert!((hits[2].distance - 1.0).abs() < 1e-9);

        let l2 = MemoryCorpusStore::new(Some(2));
        l2.import_article(
            &article("A", "a"),
            &[
                vector_chunk(0, "close but off-axis", vec![0.5, 0.5]),
                vector_chunk(1, "far but aligned", vec![10.0, 0.0]),
            ],
        )
        .await
        .unwrap();

        let hits = l2.search(&query, 2).await.unwrap();
        assert_eq!(hits[0].chunk_id, 1);
    }

    #[test]
    fn test_distance_metrics() {
        let a = [1.0_f32, 0.0];
        let b = [0.0_f32, 1.0];

        assert!((distance(DistanceMetric::L2, &a, &b) - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!((distance(DistanceMetric::Cosine, &a, &b) - 1.0).abs() < 1e-9);
        assert!(distance(DistanceMetric::Cosine, &a, &a).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_vector_search_rejects_wrong_dimension() {
        let store = MemoryCorpusStore::new(Some(2));
        let query = CorpusQuery::Vector(Vector::from(vec![0.0, 0.0, 0.0]));

        assert!(store.search(&query, 5).await.is_err());
    }

    #[tokio::test]
    async fn test_text_search() {
        let store = MemoryCorpusStore::new(None);
        store
            .import_article(
                &article("Text", "t"),
                &[
                    NewChunk::new(0, "Vacuum reclaims dead tuples".to_string(), None),
                    NewChunk::new(1, "Indexes speed up queries".to_string(), None),
                    NewChunk::new(2, "Autovacuum runs vacuum on dead tuples".to_string(), None),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search(&CorpusQuery::Text("dead tuples vacuum".to_string()), 10)
            .await
            .unwrap();

        assert_eq!(hits.iter().map(|c| c.chunk_id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_load_references_keeps_order() {
        let store = MemoryCorpusStore::new(None);
        store
            .import_article(
                &article("Ordered", "o"),
                &[
                    NewChunk::new(0, "zero".to_string(), None),
                    NewChunk::new(1, "one".to_string(), None),
                ],
            )
            .await
            .unwrap();

        let refs = store
            .load_references(&[Candidate::new(2, 1, 0.0), Candidate::new(1, 1, 0.1)])
            .await
            .unwrap();

        assert_eq!(refs[0].chunk_text, "one");
        assert_eq!(refs[1].chunk_text, "zero");
        assert_eq!(refs[0].article_title, "Ordered");
    }

    #[tokio::test]
    async fn test_duplicate_hash_lookup() {
        let store = MemoryCorpusStore::new(None);
        let first = article("Same", "same body");
        store.import_article(&first, &[]).await.unwrap();

        assert_eq!(
            store.find_article_by_hash(first.content_hash()).await.unwrap(),
            Some(1)
        );
        assert!(store.import_article(&first, &[]).await.is_err());
    }
}
