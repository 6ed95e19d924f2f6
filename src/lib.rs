pub mod config;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod formatter;
pub mod model;
pub mod pipelines;
pub mod store;
pub mod text;

pub use config::{load_config, ExtractionPolicy, FetchConfig, ScraperConfig};
pub use error::{FetchError, ScrapeError, StoreError};
pub use fetchers::{PageFetcher, RequestFetcher};
pub use formatter::format_recipe;
pub use model::{CanonicalRecipe, RecipeDraft, RecipeField};
pub use pipelines::RecipeScraper;
pub use store::{MemoryStore, RecipeRecord, RecipeStore};

/// Import a recipe from a URL using configuration from `config.toml` and the
/// environment.
///
/// The error's `Display` text is suitable for showing to the user.
pub async fn scrape(url: &str) -> Result<CanonicalRecipe, ScrapeError> {
    let config = load_config()?;
    RecipeScraper::from_config(&config)?.scrape(url).await
}

/// Validate and clean up a manually entered recipe.
pub fn format(draft: &RecipeDraft) -> Result<CanonicalRecipe, ScrapeError> {
    format_recipe(draft)
}
