use super::{select, ParsingContext};
use crate::model::RecipeDraft;
use crate::text::split_lines;
use html_escape::decode_html_entities;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

/// Reads schema.org `Recipe` objects from `application/ld+json` scripts.
///
/// Always tried first. A hit here ends the extraction; nothing else runs.
pub struct JsonLdExtractor;

#[derive(Debug, Deserialize)]
struct JsonLdRecipe {
    #[serde(default)]
    name: Option<Value>,
    #[serde(rename = "recipeIngredient", default)]
    recipe_ingredient: Option<Ingredients>,
    #[serde(default)]
    ingredients: Option<Ingredients>,
    #[serde(rename = "recipeInstructions", default)]
    recipe_instructions: Option<Instructions>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Ingredients {
    Text(String),
    List(Vec<IngredientEntry>),
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IngredientEntry {
    Text(String),
    Object(IngredientObject),
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct IngredientObject {
    name: String,
    amount: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Instructions {
    Text(String),
    List(Vec<InstructionEntry>),
    Single(InstructionEntry),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstructionEntry {
    Text(String),
    Section(HowToSection),
    Step(HowToStep),
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct HowToSection {
    #[serde(rename = "itemListElement")]
    item_list_element: SectionItems,
}

/// `itemListElement` is usually a list but some sites emit a single step.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SectionItems {
    List(Vec<InstructionEntry>),
    Single(Box<InstructionEntry>),
}

impl SectionItems {
    fn into_entries(self) -> Vec<InstructionEntry> {
        match self {
            SectionItems::List(entries) => entries,
            SectionItems::Single(entry) => vec![*entry],
        }
    }
}

#[derive(Debug, Deserialize)]
struct HowToStep {
    text: Option<String>,
    name: Option<String>,
}

impl Ingredients {
    fn into_lines(self) -> Vec<String> {
        match self {
            Ingredients::Text(text) => split_lines(&decode_html_symbols(&text)),
            Ingredients::List(entries) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    IngredientEntry::Text(text) => Some(decode_html_symbols(&text)),
                    IngredientEntry::Object(obj) => {
                        let name = decode_html_symbols(&obj.name);
                        match obj.amount.as_ref().map(value_to_string) {
                            Some(amount) if !amount.is_empty() => Some(format!("{amount} {name}")),
                            _ => Some(name),
                        }
                    }
                    IngredientEntry::Other(_) => None,
                })
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect(),
            Ingredients::Other(_) => Vec::new(),
        }
    }
}

impl Instructions {
    fn into_lines(self) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            Instructions::Text(text) => lines.extend(split_lines(&decode_html_symbols(&text))),
            Instructions::List(entries) => {
                for entry in entries {
                    entry.collect_into(&mut lines);
                }
            }
            Instructions::Single(entry) => entry.collect_into(&mut lines),
        }
        lines
    }
}

impl InstructionEntry {
    /// Appends step texts in document order, flattening sections.
    fn collect_into(self, lines: &mut Vec<String>) {
        let text = match self {
            InstructionEntry::Text(text) => Some(text),
            InstructionEntry::Section(section) => {
                for entry in section.item_list_element.into_entries() {
                    entry.collect_into(lines);
                }
                None
            }
            // Prefer text over name
            InstructionEntry::Step(step) => step.text.or(step.name),
            InstructionEntry::Other(_) => None,
        };

        if let Some(text) = text {
            let decoded = decode_html_symbols(&text);
            let trimmed = decoded.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
    }
}

fn decode_html_symbols(text: &str) -> String {
    // some sites double-encode entities
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

/// Finds the first recipe object: the root itself, an `@graph` member, the
/// `mainEntity`, or an element of a top-level array.
fn find_recipe(json_ld: &Value) -> Option<&Value> {
    match json_ld {
        Value::Array(items) => items.iter().find(|item| is_recipe_type(item)),
        Value::Object(_) if is_recipe_type(json_ld) => Some(json_ld),
        Value::Object(_) => {
            if let Some(graph) = json_ld.get("@graph").and_then(Value::as_array) {
                return graph.iter().find(|item| is_recipe_type(item));
            }
            json_ld
                .get("mainEntity")
                .filter(|entity| is_recipe_type(entity))
        }
        _ => None,
    }
}

fn sanitize_json(json_str: &str) -> &str {
    let cleaned = json_str.trim();
    let cleaned = cleaned.strip_prefix("<!--").unwrap_or(cleaned);
    let cleaned = cleaned.strip_suffix("-->").unwrap_or(cleaned);
    let cleaned = cleaned.trim();
    let cleaned = cleaned.strip_prefix("//<![CDATA[").unwrap_or(cleaned);
    let cleaned = cleaned.strip_suffix("//]]>").unwrap_or(cleaned);
    cleaned.trim()
}

impl JsonLdExtractor {
    /// Returns a draft when a script holds a recipe with both ingredients and
    /// instructions. `None` means the page has no usable structured data.
    pub fn extract(&self, context: &ParsingContext) -> Option<RecipeDraft> {
        let scripts = select(&context.document, "script[type='application/ld+json']");
        debug!("JsonLdExtractor: Found {} JSON-LD script tags", scripts.len());

        for (index, script) in scripts.iter().enumerate() {
            let raw_json = script.text().collect::<String>();
            if raw_json.trim().is_empty() {
                debug!("JsonLdExtractor: Script {} is empty, skipping", index);
                continue;
            }

            let json_ld = match serde_json::from_str::<Value>(sanitize_json(&raw_json)) {
                Ok(json_ld) => json_ld,
                Err(e) => {
                    debug!("JsonLdExtractor: Invalid JSON in script {}: {}", index, e);
                    continue;
                }
            };

            let Some(recipe_json) = find_recipe(&json_ld) else {
                debug!("JsonLdExtractor: No recipe found in script {}", index);
                continue;
            };

            let recipe = match JsonLdRecipe::deserialize(recipe_json) {
                Ok(recipe) => recipe,
                Err(e) => {
                    debug!("JsonLdExtractor: Unreadable recipe in script {}: {}", index, e);
                    continue;
                }
            };

            let draft = self.to_draft(recipe, &context.url);
            if draft.ingredients.is_empty() || draft.instructions.is_empty() {
                debug!(
                    "JsonLdExtractor: Recipe in script {} lacks ingredients or instructions",
                    index
                );
                continue;
            }

            info!("Successfully extracted recipe from JSON-LD");
            return Some(draft);
        }

        debug!("JsonLdExtractor: No valid recipe found in any JSON-LD script");
        None
    }

    fn to_draft(&self, recipe: JsonLdRecipe, url: &str) -> RecipeDraft {
        let mut ingredients = recipe
            .recipe_ingredient
            .map(Ingredients::into_lines)
            .unwrap_or_default();
        if ingredients.is_empty() {
            ingredients = recipe
                .ingredients
                .map(Ingredients::into_lines)
                .unwrap_or_default();
        }

        let instructions = recipe
            .recipe_instructions
            .map(Instructions::into_lines)
            .unwrap_or_default();

        let title = recipe
            .name
            .as_ref()
            .map(value_to_string)
            .map(|name| decode_html_symbols(&name))
            .unwrap_or_default();

        RecipeDraft {
            title,
            ingredients,
            instructions,
            source_url: Some(url.to_string()),
        }
    }
}
