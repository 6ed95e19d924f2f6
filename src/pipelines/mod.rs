pub mod url;

pub use url::{extract_recipe, validate_url, RecipeScraper};
