use std::process::ExitCode;

use clap::Parser;
use pgrag::config::AppConfig;
use pgrag::infrastructure::AppContainer;
use pgrag::presentation::cli::{QuestionCli, run_question, usage};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = QuestionCli::parse();
    if cli.question.is_none() {
        println!("{}", usage("rag-question"));
        return ExitCode::FAILURE;
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let container = match AppContainer::new(config).await {
        Ok(container) => container,
        Err(e) => {
            eprintln!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    run_question(&container.ask_question_use_case, cli, &mut stdout)
        .await
        .unwrap_or(ExitCode::FAILURE)
}
