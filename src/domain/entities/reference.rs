use serde::Serialize;

use super::{ArticleId, ChunkId};

/// A Stage-1 search hit. Lower distance means more relevant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub article_id: ArticleId,
    pub distance: f64,
}

impl Candidate {
    pub fn new(chunk_id: ChunkId, article_id: ArticleId, distance: f64) -> Self {
        Self {
            chunk_id,
            article_id,
            distance,
        }
    }
}

/// A retrieved chunk with enough context to cite it in a prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub chunk_id: ChunkId,
    pub article_id: ArticleId,
    pub article_title: String,
    pub chunk_text: String,
}
