use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Text};
use pgvector::Vector;

use crate::domain::entities::{Candidate, NewChunk, Reference};
use crate::infrastructure::database::schema::article_chunks;

#[derive(Debug, Insertable)]
#[diesel(table_name = article_chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewChunkModel<'a> {
    pub article_id: i64,
    pub chunk_index: i32,
    pub chunk_text: &'a str,
    pub embedding: Option<Vector>,
}

impl<'a> NewChunkModel<'a> {
    pub fn new(article_id: i64, chunk: &'a NewChunk) -> Self {
        Self {
            article_id,
            chunk_index: chunk.chunk_index(),
            chunk_text: chunk.text(),
            embedding: chunk.embedding().cloned(),
        }
    }
}

/// Stage-1 row from a raw nearest-neighbour query.
#[derive(Debug, QueryableByName)]
pub struct CandidateRow {
    #[diesel(sql_type = BigInt)]
    pub chunk_id: i64,
    #[diesel(sql_type = BigInt)]
    pub article_id: i64,
    #[diesel(sql_type = Double)]
    pub distance: f64,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        Candidate::new(row.chunk_id, row.article_id, row.distance)
    }
}

#[derive(Debug, QueryableByName)]
pub struct ReferenceRow {
    #[diesel(sql_type = BigInt)]
    pub chunk_id: i64,
    #[diesel(sql_type = BigInt)]
    pub article_id: i64,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Text)]
    pub chunk_text: String,
}

impl From<ReferenceRow> for Reference {
    fn from(row: ReferenceRow) -> Self {
        Reference {
            chunk_id: row.chunk_id,
            article_id: row.article_id,
            article_title: row.title,
            chunk_text: row.chunk_text,
        }
    }
}

/// Declared type modifier of a `vector(n)` column, which is `n` itself.
#[derive(Debug, QueryableByName)]
pub struct DimensionRow {
    #[diesel(sql_type = Integer)]
    pub dimension: i32,
}
