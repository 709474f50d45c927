use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::application::ports::CorpusSource;
use crate::application::services::{ArticleImporter, CorpusTotals, ImportOutcome};
use crate::domain::entities::{ArticleId, NewArticle};

#[derive(Debug)]
pub enum ImportCorpusError {
    SourceError(String),
}

impl std::fmt::Display for ImportCorpusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportCorpusError::SourceError(msg) => write!(f, "Source error: {}", msg),
        }
    }
}

impl std::error::Error for ImportCorpusError {}

/// What to do when a single file fails to import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Abort,
    KeepGoing,
}

#[derive(Debug, Clone)]
pub struct ImportCorpusRequest {
    pub corpus_dir: PathBuf,
    pub policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Imported { article_id: ArticleId, chunks: usize },
    Skipped { article_id: ArticleId },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub title: Option<String>,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ImportCorpusResponse {
    pub files: Vec<FileReport>,
    /// Set when the abort policy stopped the run before every file was tried.
    pub stopped_early: bool,
    /// Corpus size after the run, when the store could be counted.
    pub totals: Option<CorpusTotals>,
}

impl ImportCorpusResponse {
    pub fn imported_count(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Imported { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn count(&self, predicate: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.status)).count()
    }
}

pub struct ImportCorpusUseCase {
    source: Arc<dyn CorpusSource>,
    importer: Arc<ArticleImporter>,
}

impl ImportCorpusUseCase {
    pub fn new(source: Arc<dyn CorpusSource>, importer: Arc<ArticleImporter>) -> Self {
        Self { source, importer }
    }

    pub async fn execute(
        &self,
        request: ImportCorpusRequest,
    ) -> Result<ImportCorpusResponse, ImportCorpusError> {
        let paths = self
            .source
            .list_documents(&request.corpus_dir)
            .await
            .map_err(|e| ImportCorpusError::SourceError(e.to_string()))?;

        info!(
            "Importing {} files from {}",
            paths.len(),
            request.corpus_dir.display()
        );

        let mut response = ImportCorpusResponse::default();

        for (position, path) in paths.iter().enumerate() {
            let report = self.import_file(path.clone()).await;
            let failed = matches!(report.status, FileStatus::Failed { .. });
            response.files.push(report);

            if failed && request.policy == FailurePolicy::Abort {
                response.stopped_early = position + 1 < paths.len();
                break;
            }
        }

        response.totals = match self.importer.corpus_totals().await {
            Ok(totals) => Some(totals),
            Err(e) => {
                warn!("Could not count the corpus: {}", e);
                None
            }
        };

        info!(
            "Import finished: {} imported, {} skipped, {} failed",
            response.imported_count(),
            response.skipped_count(),
            response.failed_count()
        );

        Ok(response)
    }

    async fn import_file(&self, path: PathBuf) -> FileReport {
        let source = match self.source.read_document(&path).await {
            Ok(source) => source,
            Err(e) => return failed(path, None, e.to_string()),
        };

        let article = match NewArticle::from_markdown(&source) {
            Ok(article) => article,
            Err(e) => return failed(path, None, e.to_string()),
        };

        let title = Some(article.title().to_string());

        match self.importer.import(&article).await {
            Ok(ImportOutcome::Imported { article_id, chunks }) => FileReport {
                path,
                title,
                status: FileStatus::Imported { article_id, chunks },
            },
            Ok(ImportOutcome::Skipped { article_id }) => {
                warn!("{} is already imported, skipping", path.display());
                FileReport {
                    path,
                    title,
                    status: FileStatus::Skipped { article_id },
                }
            }
            Err(e) => failed(path, title, e.to_string()),
        }
    }
}

fn failed(path: PathBuf, title: Option<String>, error: String) -> FileReport {
    error!("Failed to import {}: {}", path.display(), error);
    FileReport {
        path,
        title,
        status: FileStatus::Failed { error },
    }
}
