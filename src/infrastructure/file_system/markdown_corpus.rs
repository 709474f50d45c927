use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::corpus_source::{CorpusSource, CorpusSourceError};

/// Reads `*.md` files from a single directory level.
pub struct MarkdownCorpusReader {
    extension: String,
}

impl Default for MarkdownCorpusReader {
    fn default() -> Self {
        Self::new("md")
    }
}

impl MarkdownCorpusReader {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

#[async_trait]
impl CorpusSource for MarkdownCorpusReader {
    async fn list_documents(&self, dir: &Path) -> Result<Vec<PathBuf>, CorpusSourceError> {
        if !dir.is_dir() {
            return Err(CorpusSourceError::DirectoryNotFound(
                dir.to_string_lossy().to_string(),
            ));
        }

        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| CorpusSourceError::IoError(e.to_string()))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CorpusSourceError::IoError(e.to_string()))?
        {
            let path = entry.path();
            if path.is_file() && self.matches(&path) {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    async fn read_document(&self, path: &Path) -> Result<String, CorpusSourceError> {
        let bytes = fs::read(path)
            .await
            .map_err(|e| CorpusSourceError::IoError(format!("{}: {}", path.display(), e)))?;

        String::from_utf8(bytes)
            .map_err(|_| CorpusSourceError::InvalidEncoding(path.to_string_lossy().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_lists_markdown_in_order() {
        let dir = tempdir().unwrap();
        std_fs::write(dir.path().join("b.md"), "b").unwrap();
        std_fs::write(dir.path().join("a.MD"), "a").unwrap();
        std_fs::write(dir.path().join("notes.txt"), "skip").unwrap();
        std_fs::create_dir(dir.path().join("nested.md")).unwrap();

        let paths = MarkdownCorpusReader::default()
            .list_documents(dir.path())
            .await
            .unwrap();

        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.MD", "b.md"]);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let result = MarkdownCorpusReader::default()
            .list_documents(&dir.path().join("absent"))
            .await;

        assert!(matches!(result, Err(CorpusSourceError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.md");
        std_fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let result = MarkdownCorpusReader::default().read_document(&path).await;
        assert!(matches!(result, Err(CorpusSourceError::InvalidEncoding(_))));
    }
}
