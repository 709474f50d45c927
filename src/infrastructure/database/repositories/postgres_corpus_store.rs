use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use pgvector::sql_types::Vector as VectorType;
use tracing::{debug, info};

use crate::config::{CorpusVariant, DistanceMetric, RankingMode, RetrievalConfig};
use crate::domain::entities::{
    ArticleId, Candidate, ChunkId, NewArticle, NewChunk, Reference, StoredArticle,
};
use crate::domain::repositories::{
    CorpusQuery, CorpusStore, CorpusWriter, RankingCapability, StoreError, write_article,
};
use crate::domain::value_objects::ContentHash;
use crate::infrastructure::database::models::{
    CandidateRow, DimensionRow, NewArticleModel, NewChunkModel, ReferenceRow,
};
use crate::infrastructure::database::schema::{article_chunks, articles};
use crate::infrastructure::database::{DbConnection, DbPool, get_connection_from_pool};

impl From<DieselError> for StoreError {
    fn from(error: DieselError) -> Self {
        match error {
            DieselError::DatabaseError(
                kind @ (DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation),
                info,
            ) => StoreError::ConstraintViolation(format!("{:?}: {}", kind, info.message())),
            other => StoreError::DatabaseError(other.to_string()),
        }
    }
}

/// A chunk insert that trips the foreign key means its article row is gone.
fn chunk_insert_error(article_id: ArticleId, error: DieselError) -> StoreError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            StoreError::MissingArticle(article_id)
        }
        other => StoreError::from(other),
    }
}

/// Row limits are bound as BIGINT; saturate instead of wrapping negative.
fn sql_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

const TEXT_MATCHES: &str = "SELECT c.id AS chunk_id, c.article_id, \
(-ts_rank(to_tsvector('english', c.chunk_text), q.query))::float8 AS distance \
FROM article_chunks c, \
(SELECT replace(plainto_tsquery('english', $1)::text, ' & ', ' | ')::tsquery AS query) q \
WHERE to_tsvector('english', c.chunk_text) @@ q.query \
ORDER BY distance, c.id \
LIMIT $2";

const DECLARED_DIMENSION: &str = "SELECT a.atttypmod AS dimension \
FROM pg_attribute a \
WHERE a.attrelid = 'article_chunks'::regclass AND a.attname = 'embedding'";

/// Stage-1 query: `$1` is the vector or text, `$2` the candidate limit.
fn stage_one_sql(metric: DistanceMetric, query: &CorpusQuery) -> String {
    match query {
        CorpusQuery::Vector(_) => format!(
            "SELECT c.id AS chunk_id, c.article_id, (c.embedding {op} $1)::float8 AS distance \
FROM article_chunks c \
WHERE c.embedding IS NOT NULL \
ORDER BY distance, c.id \
LIMIT $2",
            op = metric.operator()
        ),
        CorpusQuery::Text(_) => TEXT_MATCHES.to_string(),
    }
}

/// Both stages in one statement; `$3` is the final count. Ties on score keep
/// Stage-1 order, same as the in-process re-rank.
fn ranked_sql(metric: DistanceMetric, query: &CorpusQuery) -> String {
    format!(
        "WITH matches AS ({stage_one}), \
scored AS (SELECT m.chunk_id, m.article_id, m.distance, \
count(*) OVER (PARTITION BY m.article_id) AS score FROM matches m) \
SELECT s.chunk_id, s.article_id, a.title, c.chunk_text \
FROM scored s \
JOIN article_chunks c ON c.id = s.chunk_id \
JOIN articles a ON a.id = s.article_id \
ORDER BY s.score DESC, s.distance, s.chunk_id \
LIMIT $3",
        stage_one = stage_one_sql(metric, query)
    )
}

struct PgCorpusWriter<'a> {
    conn: &'a mut PgConnection,
}

impl CorpusWriter for PgCorpusWriter<'_> {
    fn insert_article(&mut self, article: &NewArticle) -> Result<ArticleId, StoreError> {
        diesel::insert_into(articles::table)
            .values(NewArticleModel::from(article))
            .returning(articles::id)
            .get_result::<i64>(self.conn)
            .map_err(StoreError::from)
    }

    fn insert_chunk(
        &mut self,
        article_id: ArticleId,
        chunk: &NewChunk,
    ) -> Result<ChunkId, StoreError> {
        diesel::insert_into(article_chunks::table)
            .values(NewChunkModel::new(article_id, chunk))
            .returning(article_chunks::id)
            .get_result::<i64>(self.conn)
            .map_err(|e| chunk_insert_error(article_id, e))
    }
}

pub struct PostgresCorpusStore {
    pool: DbPool,
    metric: DistanceMetric,
    capability: RankingCapability,
    dimension: Option<usize>,
}

impl PostgresCorpusStore {
    /// The vector variant reads the declared `vector(n)` dimension from the
    /// catalog; the full-text variant stores no embeddings.
    pub fn connect(pool: DbPool, settings: &RetrievalConfig) -> Result<Self, StoreError> {
        let dimension = match settings.variant {
            CorpusVariant::Vector => Some(declared_dimension(&pool)?),
            CorpusVariant::FullText => None,
        };

        let capability = match settings.ranking {
            RankingMode::Application => RankingCapability::NearestNeighbor,
            RankingMode::Native => RankingCapability::NativeRanking,
        };

        info!(
            "Postgres corpus store ready ({:?}, {:?}, dimension {:?})",
            settings.variant, capability, dimension
        );

        Ok(Self {
            pool,
            metric: settings.metric,
            capability,
            dimension,
        })
    }

    fn connection(&self) -> Result<DbConnection, StoreError> {
        get_connection_from_pool(&self.pool).map_err(|e| StoreError::DatabaseError(e.to_string()))
    }
}

fn declared_dimension(pool: &DbPool) -> Result<usize, StoreError> {
    let mut conn =
        get_connection_from_pool(pool).map_err(|e| StoreError::DatabaseError(e.to_string()))?;

    let row = sql_query(DECLARED_DIMENSION).get_result::<DimensionRow>(&mut conn)?;

    usize::try_from(row.dimension)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| {
            StoreError::Unsupported(
                "article_chunks.embedding has no declared vector dimension".to_string(),
            )
        })
}

#[async_trait]
impl CorpusStore for PostgresCorpusStore {
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
        let mut conn = self.connection()?;

        articles::table
            .filter(articles::content_hash.eq(hash.as_str()))
            .select(articles::id)
            .first::<i64>(&mut conn)
            .optional()
            .map_err(StoreError::from)
    }

    async fn import_article(
        &self,
        article: &NewArticle,
        chunks: &[NewChunk],
    ) -> Result<StoredArticle, StoreError> {
        let mut pooled = self.connection()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, StoreError, _>(|conn| {
            let mut writer = PgCorpusWriter { conn };
            write_article(&mut writer, article, chunks)
        })
    }

    async fn search(
        &self,
        query: &CorpusQuery,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError> {
        let mut conn = self.connection()?;
        let sql = stage_one_sql(self.metric, query);
        let limit = sql_limit(limit);

        let rows = match query {
            CorpusQuery::Vector(vector) => sql_query(sql)
                .bind::<VectorType, _>(vector.clone())
                .bind::<BigInt, _>(limit)
                .load::<CandidateRow>(&mut conn)?,
            CorpusQuery::Text(text) => sql_query(sql)
                .bind::<Text, _>(text.as_str())
                .bind::<BigInt, _>(limit)
                .load::<CandidateRow>(&mut conn)?,
        };

        debug!("Stage-1 search returned {} candidates", rows.len());
        Ok(rows.into_iter().map(Candidate::from).collect())
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

        let mut conn = self.connection()?;
        let sql = ranked_sql(self.metric, query);
        let (overfetch, final_count) = (sql_limit(overfetch), sql_limit(final_count));

        let rows = match query {
            CorpusQuery::Vector(vector) => sql_query(sql)
                .bind::<VectorType, _>(vector.clone())
                .bind::<BigInt, _>(overfetch)
                .bind::<BigInt, _>(final_count)
                .load::<ReferenceRow>(&mut conn)?,
            CorpusQuery::Text(text) => sql_query(sql)
                .bind::<Text, _>(text.as_str())
                .bind::<BigInt, _>(overfetch)
                .bind::<BigInt, _>(final_count)
                .load::<ReferenceRow>(&mut conn)?,
        };

        Ok(rows.into_iter().map(Reference::from).collect())
    }

    async fn load_references(
        &self,
        candidates: &[Candidate],
    ) -> Result<Vec<Reference>, StoreError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection()?;
        let ids: Vec<i64> = candidates.iter().map(|c| c.chunk_id).collect();

        let rows = article_chunks::table
            .inner_join(articles::table)
            .filter(article_chunks::id.eq_any(ids))
            .select((
                article_chunks::id,
                article_chunks::article_id,
                articles::title,
                article_chunks::chunk_text,
            ))
            .load::<(i64, i64, String, String)>(&mut conn)?;

        let mut by_id: HashMap<i64, Reference> = rows
            .into_iter()
            .map(|(chunk_id, article_id, article_title, chunk_text)| {
                (
                    chunk_id,
                    Reference {
                        chunk_id,
                        article_id,
                        article_title,
                        chunk_text,
                    },
                )
            })
            .collect();

        Ok(candidates
            .iter()
            .filter_map(|c| by_id.remove(&c.chunk_id))
            .collect())
    }

    async fn count_articles(&self) -> Result<i64, StoreError> {
        let mut conn = self.connection()?;

        articles::table
            .count()
            .get_result(&mut conn)
            .map_err(StoreError::from)
    }

    async fn count_chunks(&self) -> Result<i64, StoreError> {
        let mut conn = self.connection()?;

        article_chunks::table
            .count()
            .get_result(&mut conn)
            .map_err(StoreError::from)
    }
}
