use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum CorpusSourceError {
    DirectoryNotFound(String),
    IoError(String),
    InvalidEncoding(String),
}

impl std::fmt::Display for CorpusSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusSourceError::DirectoryNotFound(path) => write!(f, "Directory not found: {}", path),
            CorpusSourceError::IoError(msg) => write!(f, "IO error: {}", msg),
            CorpusSourceError::InvalidEncoding(path) => {
                write!(f, "File is not valid UTF-8: {}", path)
            }
        }
    }
}

impl std::error::Error for CorpusSourceError {}

/// Where article sources come from.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Article files under `dir`, in a stable order.
    async fn list_documents(&self, dir: &Path) -> Result<Vec<PathBuf>, CorpusSourceError>;

    async fn read_document(&self, path: &Path) -> Result<String, CorpusSourceError>;
}
