use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Match `<meta charset="...">`
#[allow(clippy::expect_used)]
static CHARSET_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s>;]+)"#).expect("valid regex")
});

/// Content types that are parsed as markup.
const MARKUP_TYPES: &[&str] = &["text/html", "application/xhtml", "application/xml"];

/// The three fields every recipe needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeField {
    Title,
    Ingredients,
    Instructions,
}

impl RecipeField {
    pub const ALL: [RecipeField; 3] = [
        RecipeField::Title,
        RecipeField::Ingredients,
        RecipeField::Instructions,
    ];
}

impl fmt::Display for RecipeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecipeField::Title => "title",
            RecipeField::Ingredients => "ingredients",
            RecipeField::Instructions => "instructions",
        };
        f.write_str(name)
    }
}

/// Text fragments one strategy found for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionCandidate {
    pub field: RecipeField,
    pub items: Vec<String>,
    /// Name of the strategy that produced the items, for logging.
    pub strategy: &'static str,
}

impl ExtractionCandidate {
    pub fn new(field: RecipeField, items: Vec<String>, strategy: &'static str) -> Self {
        Self {
            field,
            items,
            strategy,
        }
    }
}

/// Working accumulator filled field by field during extraction.
///
/// Also the input shape for manually entered recipes, where ingredients and
/// instructions may arrive as a single newline-separated entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl RecipeDraft {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: Some(source_url.into()),
            ..Default::default()
        }
    }

    /// Stores a candidate in the field it was found for.
    pub fn apply(&mut self, candidate: ExtractionCandidate) {
        match candidate.field {
            RecipeField::Title => {
                self.title = candidate.items.into_iter().next().unwrap_or_default();
            }
            RecipeField::Ingredients => self.ingredients = candidate.items,
            RecipeField::Instructions => self.instructions = candidate.items,
        }
    }

    pub fn is_filled(&self, field: RecipeField) -> bool {
        match field {
            RecipeField::Title => !self.title.trim().is_empty(),
            RecipeField::Ingredients => self.ingredients.iter().any(|i| !i.trim().is_empty()),
            RecipeField::Instructions => self.instructions.iter().any(|i| !i.trim().is_empty()),
        }
    }

    /// Fields that are still empty, in display order.
    pub fn missing_fields(&self) -> Vec<RecipeField> {
        RecipeField::ALL
            .into_iter()
            .filter(|field| !self.is_filled(*field))
            .collect()
    }
}

/// A validated recipe, ready to hand to storage.
///
/// Ingredients and instructions are normalized, non-empty and unique under
/// case-insensitive comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub source_url: Option<String>,
}

/// A fetched document, before decoding.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: String,
    /// Charset from the `Content-Type` header, if any.
    pub declared_encoding: Option<String>,
}

impl RawPage {
    pub fn new(url: impl Into<String>, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        let content_type = content_type.into();
        let declared_encoding = charset_from_content_type(&content_type);
        Self {
            url: url.into(),
            status: 200,
            body: body.into(),
            content_type,
            declared_encoding,
        }
    }

    /// Whether the content type is one the extractors can read.
    pub fn is_markup(&self) -> bool {
        let content_type = self.content_type.to_lowercase();
        MARKUP_TYPES.iter().any(|t| content_type.contains(t))
    }

    /// The encoding used to decode the body.
    ///
    /// A declared charset wins unless it is missing or ISO-8859-1, which
    /// servers commonly send by default. Then the document's own `<meta>`
    /// declaration in the first 1024 bytes is used, falling back to UTF-8.
    pub fn detected_encoding(&self) -> &'static Encoding {
        let declared = self
            .declared_encoding
            .as_deref()
            .and_then(|label| Encoding::for_label(label.trim().as_bytes()));

        match declared {
            Some(encoding) if !is_latin1_label(self.declared_encoding.as_deref()) => encoding,
            _ => sniff_meta_charset(&self.body).unwrap_or(UTF_8),
        }
    }

    /// The decoded body. Invalid sequences become U+FFFD.
    pub fn text(&self) -> String {
        let (decoded, _, _) = self.detected_encoding().decode(&self.body);
        decoded.into_owned()
    }
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

fn is_latin1_label(label: Option<&str>) -> bool {
    label.is_some_and(|l| l.trim().eq_ignore_ascii_case("iso-8859-1"))
}

/// A `<meta>` that could be read as ASCII cannot really be UTF-16, so those
/// labels resolve to UTF-8.
fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(1024)]);
    CHARSET_META_RE
        .captures(&head)
        .and_then(|c| c.get(1))
        .and_then(|m| Encoding::for_label(m.as_str().as_bytes()))
        .map(Encoding::output_encoding)
}
