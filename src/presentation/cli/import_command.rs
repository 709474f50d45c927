use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use crate::application::use_cases::{
    FailurePolicy, FileStatus, ImportCorpusRequest, ImportCorpusResponse, ImportCorpusUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "rag-import",
    about = "Import Markdown articles with front matter into the RAG corpus"
)]
pub struct ImportCli {
    /// Directory of Markdown articles (defaults to CORPUS_DIR)
    pub corpus_dir: Option<PathBuf>,

    /// Skip files that fail to import instead of stopping at the first one
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,
}

impl ImportCli {
    pub fn request(&self, default_dir: &Path) -> ImportCorpusRequest {
        ImportCorpusRequest {
            corpus_dir: self.corpus_dir.clone().unwrap_or_else(|| default_dir.to_path_buf()),
            policy: if self.keep_going {
                FailurePolicy::KeepGoing
            } else {
                FailurePolicy::Abort
            },
        }
    }
}

fn report<W: Write>(response: &ImportCorpusResponse, out: &mut W) -> std::io::Result<()> {
    for file in &response.files {
        let name = file
            .title
            .clone()
            .unwrap_or_else(|| file.path.display().to_string());

        match &file.status {
            FileStatus::Imported { chunks, .. } => {
                writeln!(out, "Importing {} ({} chunks)", name, chunks)?
            }
            FileStatus::Skipped { .. } => writeln!(out, "Skipping {} (already imported)", name)?,
            FileStatus::Failed { error } => {
                writeln!(out, "Failed {}: {}", file.path.display(), error)?
            }
        }
    }

    writeln!(
        out,
        "Imported {}, skipped {}, failed {}.",
        response.imported_count(),
        response.skipped_count(),
        response.failed_count()
    )?;

    if let Some(totals) = response.totals {
        writeln!(
            out,
            "Corpus now holds {} articles and {} chunks.",
            totals.articles, totals.chunks
        )?;
    }

    if response.stopped_early {
        writeln!(out, "Stopped at the first failure; rerun with --keep-going to continue past it.")?;
    }

    Ok(())
}

pub async fn run_import<W: Write>(
    use_case: &ImportCorpusUseCase,
    request: ImportCorpusRequest,
    out: &mut W,
) -> std::io::Result<ExitCode> {
    let response = match use_case.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Import failed: {}", e);
            writeln!(out, "Import failed: {}", e)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    report(&response, out)?;

    Ok(if response.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
