use crate::model::{ExtractionCandidate, RecipeField};
use log::debug;
use scraper::{ElementRef, Html, Selector};

mod html_class;
mod json_ld;
mod microdata;

pub use html_class::HtmlClassExtractor;
pub use json_ld::JsonLdExtractor;
pub use microdata::MicroDataExtractor;

pub struct ParsingContext {
    pub url: String,
    pub document: Html,
}

impl ParsingContext {
    pub fn new(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            document: Html::parse_document(html),
        }
    }
}

/// A strategy that can look for each recipe field on its own.
///
/// Returning `None` means "nothing usable here", and the orchestrator moves on
/// to the next strategy for that field only.
pub trait FieldExtractor {
    fn name(&self) -> &'static str;

    fn extract(&self, context: &ParsingContext, field: RecipeField)
        -> Option<ExtractionCandidate>;
}

/// Every element matching `css`, in document order.
pub(crate) fn select<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => {
            debug!("Skipping invalid selector: {}", css);
            Vec::new()
        }
    }
}

/// Same as [`select`] but scoped to the descendants of `root`.
pub(crate) fn select_within<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => root.select(&selector).collect(),
        Err(_) => {
            debug!("Skipping invalid selector: {}", css);
            Vec::new()
        }
    }
}

/// Visible text of an element with whitespace runs, including source line
/// wraps, collapsed to single spaces.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether the lower-cased `class` attribute contains any of `words`.
pub(crate) fn class_contains_any(element: &ElementRef, words: &[&str]) -> bool {
    element
        .value()
        .attr("class")
        .map(str::to_lowercase)
        .is_some_and(|class| words.iter().any(|word| class.contains(word)))
}

/// Whether one of the element's `itemprop` tokens is in `props`.
pub(crate) fn has_itemprop(element: &ElementRef, props: &[&str]) -> bool {
    element
        .value()
        .attr("itemprop")
        .is_some_and(|value| value.split_whitespace().any(|token| props.contains(&token)))
}
