pub mod memory_corpus_store;

pub use memory_corpus_store::MemoryCorpusStore;
