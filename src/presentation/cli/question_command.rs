use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

use crate::application::use_cases::{AskQuestionError, AskQuestionRequest, AskQuestionUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "rag-question",
    about = "Answer a question using references retrieved from the article corpus"
)]
pub struct QuestionCli {
    /// The question to answer
    pub question: Option<String>,

    /// Number of nearest chunks fetched before the popularity re-rank
    #[arg(long)]
    pub overfetch: Option<usize>,

    /// Number of references passed to the model
    #[arg(long)]
    pub final_count: Option<usize>,

    /// Print the references and rendered prompt without calling the model
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

pub fn usage(program: &str) -> String {
    format!(
        "\nA question is required. Example:\n\n    {} \"Is Postgres the best database engine?\"\n",
        program
    )
}

/// Runs one question end to end and reports progress on `out`.
pub async fn run_question<W: Write>(
    use_case: &AskQuestionUseCase,
    cli: QuestionCli,
    out: &mut W,
) -> std::io::Result<ExitCode> {
    let Some(question) = cli.question else {
        writeln!(out, "{}", usage("rag-question"))?;
        return Ok(ExitCode::FAILURE);
    };

    writeln!(out, "Checking information corpus for answers...")?;

    let request = AskQuestionRequest {
        question,
        overfetch: cli.overfetch,
        final_count: cli.final_count,
        dry_run: cli.dry_run,
    };

    let prepared = match use_case.prepare(&request).await {
        Ok(prepared) => prepared,
        Err(e) => return failure(e, out),
    };

    if prepared.references.is_empty() {
        writeln!(out, "No references found; the answer will not be grounded.")?;
    }
    for reference in &prepared.references {
        writeln!(out, "Found reference in {}", reference.article_title)?;
    }

    if request.dry_run {
        writeln!(out, "\n{}", prepared.prompt)?;
        return Ok(ExitCode::SUCCESS);
    }

    writeln!(out, "Sending your question and references to the LLM...")?;
    out.flush()?;

    let answered = match use_case.answer(prepared).await {
        Ok(answered) => answered,
        Err(e) => return failure(e, out),
    };

    writeln!(out, "Response:\n\n{}", answered.answer.unwrap_or_default())?;

    Ok(ExitCode::SUCCESS)
}

fn failure<W: Write>(error: AskQuestionError, out: &mut W) -> std::io::Result<ExitCode> {
    tracing::error!("Question failed: {}", error);
    writeln!(out, "Unable to answer: {}", error)?;
    Ok(ExitCode::FAILURE)
}
