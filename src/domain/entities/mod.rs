pub mod article;
pub mod chunk;
pub mod reference;

pub use article::{ArticleId, NewArticle};
pub use chunk::{ChunkId, NewChunk, StoredArticle};
pub use reference::{Candidate, Reference};
