pub mod article_importer;
pub mod prompt_builder;
pub mod retriever;
pub mod text_splitter;

pub use article_importer::{ArticleImportError, ArticleImporter, CorpusTotals, ImportOutcome};
pub use prompt_builder::PromptTemplate;
pub use retriever::{RetrievalError, Retriever, ensure_embedding_compatibility};
pub use text_splitter::{RecursiveSplitter, TextSplitter};
