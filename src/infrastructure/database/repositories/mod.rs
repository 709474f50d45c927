pub mod postgres_corpus_store;

pub use postgres_corpus_store::PostgresCorpusStore;
