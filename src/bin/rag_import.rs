use std::process::ExitCode;

use clap::Parser;
use pgrag::config::AppConfig;
use pgrag::infrastructure::AppContainer;
use pgrag::presentation::cli::{ImportCli, run_import};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = ImportCli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let request = cli.request(&config.corpus_dir);

    let container = match AppContainer::new(config).await {
        Ok(container) => container,
        Err(e) => {
            eprintln!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    run_import(&container.import_corpus_use_case, request, &mut stdout)
        .await
        .unwrap_or(ExitCode::FAILURE)
}
