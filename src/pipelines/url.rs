use crate::config::{ExtractionPolicy, ScraperConfig};
use crate::error::ScrapeError;
use crate::extractors::{
    FieldExtractor, HtmlClassExtractor, JsonLdExtractor, MicroDataExtractor, ParsingContext,
};
use crate::fetchers::{PageFetcher, RequestFetcher};
use crate::formatter::format_recipe;
use crate::model::{CanonicalRecipe, ExtractionCandidate, RawPage, RecipeDraft, RecipeField};
use log::{debug, error, info};
use url::Url;

/// Imports recipes from URLs.
///
/// Holds the fetch collaborator and the heuristic thresholds; each call to
/// [`RecipeScraper::scrape`] is independent and shares no state with others.
pub struct RecipeScraper<F: PageFetcher = RequestFetcher> {
    fetcher: F,
    policy: ExtractionPolicy,
}

impl RecipeScraper<RequestFetcher> {
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let fetcher = RequestFetcher::new(config.fetch.clone())?;
        Ok(Self::new(fetcher, config.extraction.clone()))
    }
}

impl<F: PageFetcher> RecipeScraper<F> {
    pub fn new(fetcher: F, policy: ExtractionPolicy) -> Self {
        Self { fetcher, policy }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Process a URL into a canonical recipe
    ///
    /// This pipeline:
    /// 1. Validates the URL (no request is made for an invalid one)
    /// 2. Fetches the page and checks it is markup
    /// 3. Extracts title, ingredients and instructions (see [`extract_recipe`])
    /// 4. Formats and re-validates the result
    ///
    /// The error's `Display` text is the message to show to the user.
    pub async fn scrape(&self, url: &str) -> Result<CanonicalRecipe, ScrapeError> {
        let url = validate_url(url)?;

        let page = self.fetcher.fetch(url).await?;
        if !page.is_markup() {
            debug!("Rejecting {} with content type '{}'", url, page.content_type);
            return Err(ScrapeError::UnsupportedContentType(page.content_type));
        }

        let draft = extract_page(url, &page, &self.policy)?;
        format_recipe(&draft)
    }
}

/// Accepts absolute `http`/`https` URLs with a host. Returns the trimmed input.
pub fn validate_url(url: &str) -> Result<&str, ScrapeError> {
    let url = url.trim();
    let lowered = url.to_ascii_lowercase();
    if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
        return Err(ScrapeError::InvalidUrl);
    }

    let parsed = Url::parse(url).map_err(|e| {
        debug!("Invalid URL {}: {}", url, e);
        ScrapeError::InvalidUrl
    })?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ScrapeError::InvalidUrl);
    }
    Ok(url)
}

fn extract_page(
    url: &str,
    page: &RawPage,
    policy: &ExtractionPolicy,
) -> Result<RecipeDraft, ScrapeError> {
    let html = page.text();
    debug!(
        "Decoded {} bytes from {} as {}",
        page.body.len(),
        page.url,
        page.detected_encoding().name()
    );
    let context = ParsingContext::new(url, &html);
    extract_recipe(&context, policy)
}

/// Runs the extraction strategies over a parsed page.
///
/// Structured data wins outright when it has both ingredients and
/// instructions. Otherwise every field is looked up on its own: microdata
/// first, then the heuristic HTML chains for whatever microdata missed.
pub fn extract_recipe(
    context: &ParsingContext,
    policy: &ExtractionPolicy,
) -> Result<RecipeDraft, ScrapeError> {
    if let Some(draft) = JsonLdExtractor.extract(context) {
        return Ok(draft);
    }
    debug!("No structured data on {}, extracting fields individually", context.url);

    let microdata = MicroDataExtractor;
    let html_class = HtmlClassExtractor::new(policy.clone());
    let mut draft = RecipeDraft::new(context.url.as_str());

    for field in RecipeField::ALL {
        match find_field(context, field, &microdata, &html_class) {
            Some(candidate) => {
                info!(
                    "Found {} {} using {}",
                    candidate.items.len(),
                    field,
                    candidate.strategy
                );
                draft.apply(candidate);
            }
            None => debug!("No strategy found {}", field),
        }
    }

    let missing = draft.missing_fields();
    if !missing.is_empty() {
        let err = ScrapeError::ExtractionIncomplete { missing };
        error!("{} ({})", err, context.url);
        return Err(err);
    }
    Ok(draft)
}

fn find_field(
    context: &ParsingContext,
    field: RecipeField,
    primary: &impl FieldExtractor,
    fallback: &impl FieldExtractor,
) -> Option<ExtractionCandidate> {
    primary.extract(context, field).or_else(|| {
        debug!("{} found no {}, trying {}", primary.name(), field, fallback.name());
        fallback.extract(context, field)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Result<RecipeDraft, ScrapeError> {
        let context = ParsingContext::new("https://example.com/recipe", html);
        extract_recipe(&context, &ExtractionPolicy::default())
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url("  https://example.com/recipe ").unwrap(),
            "https://example.com/recipe"
        );
        assert!(validate_url("HTTP://EXAMPLE.COM").is_ok());
        assert!(matches!(
            validate_url("ftp://example.com/recipe"),
            Err(ScrapeError::InvalidUrl)
        ));
        assert!(matches!(validate_url("not-a-url"), Err(ScrapeError::InvalidUrl)));
        assert!(matches!(validate_url("example.com"), Err(ScrapeError::InvalidUrl)));
        assert!(matches!(validate_url("http://"), Err(ScrapeError::InvalidUrl)));
    }

    #[test]
    fn test_structured_data_short_circuits() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
            {"@type": "Recipe", "name": "Tea",
             "recipeIngredient": ["1 tsp tea leaves", "1 cup water"],
             "recipeInstructions": "Boil water.\nSteep tea."}
            </script>
            </head><body>
                <h1 class="recipe-title">Something Else</h1>
                <li class="ingredient">2 cups flour</li>
                <li class="instruction">Mix everything together well.</li>
            </body></html>
        "#;
        let draft = extract(html).unwrap();
        assert_eq!(draft.title, "Tea");
        assert_eq!(draft.ingredients, vec!["1 tsp tea leaves", "1 cup water"]);
        assert!(!draft.ingredients.contains(&"2 cups flour".to_string()));
    }

    #[test]
    fn test_fields_fall_back_independently() {
        let html = r#"
            <html><body>
            <div itemscope itemtype="https://schema.org/Recipe">
                <h1 itemprop="name">Pancakes</h1>
                <span itemprop="recipeIngredient">1 cup milk</span>
                <span itemprop="recipeIngredient">1 cup flour</span>
            </div>
            <div class="directions">
                <p>Whisk everything into a smooth batter.</p>
            </div>
            </body></html>
        "#;
        let draft = extract(html).unwrap();
        assert_eq!(draft.title, "Pancakes");
        assert_eq!(draft.ingredients, vec!["1 cup milk", "1 cup flour"]);
        assert_eq!(
            draft.instructions,
            vec!["Whisk everything into a smooth batter."]
        );
        assert_eq!(draft.source_url.as_deref(), Some("https://example.com/recipe"));
    }

    #[test]
    fn test_all_fields_missing() {
        let html = r#"<html><body><div class="content">Nothing to see.</div></body></html>"#;
        match extract(html) {
            Err(ScrapeError::ExtractionIncomplete { missing }) => {
                assert_eq!(missing, RecipeField::ALL.to_vec());
            }
            other => panic!("expected ExtractionIncomplete, got {:?}", other),
        }
    }

    #[test]
    fn test_only_missing_fields_are_reported() {
        let html = r#"
            <html><body>
                <h1>Toast</h1>
                <ul><li>2 slices bread, grated butter</li></ul>
            </body></html>
        "#;
        let err = extract(html).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to extract recipe: Could not find recipe instructions"
        );
    }
}
