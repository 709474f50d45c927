pub mod answer_generator;
pub mod corpus_source;
pub mod embedding_provider;

pub use answer_generator::AnswerGenerator;
pub use corpus_source::CorpusSource;
pub use embedding_provider::EmbeddingProvider;
