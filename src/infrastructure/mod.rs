pub mod container;
pub mod database;
pub mod external_services;
pub mod file_system;
pub mod memory;

pub use container::AppContainer;
pub use database::{DbPool, PostgresCorpusStore, create_connection_pool};
pub use external_services::{CompletionClient, InferenceEmbeddingProvider};
pub use file_system::MarkdownCorpusReader;
pub use memory::MemoryCorpusStore;
