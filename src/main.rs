use log::error;
use recipe_scraper::{load_config, RecipeScraper, ScrapeError};
use std::env;
use std::process::ExitCode;

async fn run(url: &str) -> Result<String, ScrapeError> {
    let config = load_config()?;
    let recipe = RecipeScraper::from_config(&config)?.scrape(url).await?;
    serde_json::to_string_pretty(&recipe).map_err(|e| ScrapeError::Unexpected(e.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    // Get the URL from command-line arguments
    let Some(url) = env::args().nth(1) else {
        eprintln!("Usage: recipe-scraper <url>");
        return ExitCode::FAILURE;
    };

    match run(&url).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Import of {} failed: {:?}", url, e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
