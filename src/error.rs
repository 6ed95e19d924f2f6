use crate::model::RecipeField;
use thiserror::Error;

/// Errors that can occur while importing a recipe from a URL.
///
/// The `Display` text of each variant is written for end users and is what
/// the web layer shows next to the import form.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Missing scheme, unsupported scheme or no host
    #[error("Invalid URL. Please include http:// or https://")]
    InvalidUrl,

    /// Network, DNS, TLS or HTTP status failure
    #[error("Could not access the webpage. Please check the URL and try again.")]
    Unreachable(String),

    /// The request did not finish within the configured timeout
    #[error("Request timed out. Please try again.")]
    Timeout,

    /// The response was not HTML, XHTML or XML
    #[error("URL does not point to a webpage")]
    UnsupportedContentType(String),

    /// No strategy found one or more of the required fields
    #[error("Failed to extract recipe: {}", describe_missing(.missing))]
    ExtractionIncomplete { missing: Vec<RecipeField> },

    /// A field became empty during the final clean-up pass
    #[error("Failed to format recipe: Recipe {missing} {} missing", verb(.missing))]
    FormattingFailed { missing: RecipeField },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Anything else; the detail is logged, not shown
    #[error("An unexpected error occurred while processing the recipe.")]
    Unexpected(String),
}

/// Errors returned by the page fetcher.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("TLS verification failed: {0}")]
    Tls(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl From<FetchError> for ScrapeError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => ScrapeError::Timeout,
            FetchError::Unreachable(detail) | FetchError::Tls(detail) => {
                ScrapeError::Unreachable(detail)
            }
            FetchError::Status(status) => ScrapeError::Unreachable(format!("HTTP {status}")),
            FetchError::Client(e) if e.is_timeout() => ScrapeError::Timeout,
            FetchError::Client(e) if e.is_connect() || e.is_request() || e.is_status() => {
                ScrapeError::Unreachable(e.to_string())
            }
            FetchError::Client(e) => ScrapeError::Unexpected(e.to_string()),
        }
    }
}

/// Errors from the recipe record store.
#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("Recipe {0} not found")]
    NotFound(u64),

    #[error("Invalid recipe: {0}")]
    Invalid(String),
}

fn describe_missing(missing: &[RecipeField]) -> String {
    missing
        .iter()
        .map(|field| format!("Could not find recipe {field}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn verb(field: &RecipeField) -> &'static str {
    match field {
        RecipeField::Title => "is",
        RecipeField::Ingredients | RecipeField::Instructions => "are",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_message_lists_missing_fields() {
        let err = ScrapeError::ExtractionIncomplete {
            missing: vec![RecipeField::Title, RecipeField::Instructions],
        };
        assert_eq!(
            err.to_string(),
            "Failed to extract recipe: Could not find recipe title; Could not find recipe instructions"
        );
    }

    #[test]
    fn test_formatting_message_names_field() {
        let err = ScrapeError::FormattingFailed {
            missing: RecipeField::Title,
        };
        assert_eq!(err.to_string(), "Failed to format recipe: Recipe title is missing");

        let err = ScrapeError::FormattingFailed {
            missing: RecipeField::Ingredients,
        };
        assert_eq!(
            err.to_string(),
            "Failed to format recipe: Recipe ingredients are missing"
        );
    }

    #[test]
    fn test_fetch_errors_map_to_user_messages() {
        assert!(matches!(ScrapeError::from(FetchError::Timeout), ScrapeError::Timeout));
        assert!(matches!(
            ScrapeError::from(FetchError::Status(404)),
            ScrapeError::Unreachable(_)
        ));
        assert!(matches!(
            ScrapeError::from(FetchError::Tls("bad cert".into())),
            ScrapeError::Unreachable(_)
        ));
    }
}
