use pgvector::Vector;

use super::ArticleId;

/// Store-assigned chunk identifier.
pub type ChunkId = i64;

/// A chunk awaiting insertion, in original split order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    chunk_index: i32,
    text: String,
    embedding: Option<Vector>,
}

impl NewChunk {
    pub fn new(chunk_index: i32, text: String, embedding: Option<Vector>) -> Self {
        Self {
            chunk_index,
            text,
            embedding,
        }
    }

    pub fn chunk_index(&self) -> i32 {
        self.chunk_index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn embedding(&self) -> Option<&Vector> {
        self.embedding.as_ref()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.embedding.as_ref().map(|v| v.as_slice().len())
    }

    pub fn character_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Ids handed back once an article and its chunks are committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArticle {
    pub article_id: ArticleId,
    pub chunk_ids: Vec<ChunkId>,
}
