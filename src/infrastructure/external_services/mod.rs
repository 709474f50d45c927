pub mod completion_client;
pub mod inference_client;

pub use completion_client::CompletionClient;
pub use inference_client::{InferenceClient, InferenceEmbeddingProvider};
