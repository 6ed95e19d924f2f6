use super::{
    class_contains_any, element_text, has_itemprop, select, select_within, FieldExtractor,
    ParsingContext,
};
use crate::config::ExtractionPolicy;
use crate::model::{ExtractionCandidate, RecipeField};
use crate::text::{clean_instruction, dedupe, looks_like_ingredient, repair_artifacts};
use log::debug;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

/// Paragraphs that open like a numbered step: "1. ", "2) ", "Step 3".
#[allow(clippy::expect_used)]
static NUMBERED_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[0-9]+[.)]\s|step\s+[0-9]+)").expect("valid regex")
});

/// One DOM query in a fallback chain.
type Query = for<'a> fn(&'a Html, &ExtractionPolicy) -> Vec<ElementRef<'a>>;

const TITLE_QUERIES: &[(&str, Query)] = &[
    ("title-heading-class", title_heading_class),
    ("title-itemprop", title_itemprop),
    ("heading-class-keyword", heading_class_keyword),
    ("recipe-title-class", recipe_title_class),
    ("first-h1", first_h1),
];

const INGREDIENT_QUERIES: &[(&str, Query)] = &[
    ("ingredient-class", ingredient_class),
    ("ingredient-itemprop", ingredient_itemprop),
    ("data-ingredient", data_ingredient),
    ("data-recipe-ingredient", data_recipe_ingredient),
    ("ingredient-list-item", ingredient_list_item),
    ("ingredient-like-list-item", ingredient_like_list_item),
];

const INSTRUCTION_QUERIES: &[(&str, Query)] = &[
    ("instruction-class", instruction_class),
    ("instruction-itemprop", instruction_itemprop),
    ("data-instruction", data_instruction),
    ("data-recipe-instruction", data_recipe_instruction),
    ("ordered-list-item", ordered_list_item),
    ("method-paragraph", method_paragraph),
    ("numbered-paragraph", numbered_paragraph),
];

fn title_heading_class<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "h1.recipe-title, h1.entry-title, h1.title, h1.heading-title")
}

fn title_itemprop<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "h1[itemprop]")
        .into_iter()
        .filter(|el| has_itemprop(el, &["name"]))
        .collect()
}

fn heading_class_keyword<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "h1[class], h2[class]")
        .into_iter()
        .filter(|el| class_contains_any(el, &["recipe", "title", "heading", "name"]))
        .collect()
}

fn recipe_title_class<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "[class]")
        .into_iter()
        .filter(|el| class_contains_any(el, &["recipe"]) && class_contains_any(el, &["title"]))
        .collect()
}

fn first_h1<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "h1")
}

fn ingredient_class<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "li[class], div[class], span[class], p[class]")
        .into_iter()
        .filter(|el| class_contains_any(el, &["ingredient", "ingredients-item", "ingredient-list"]))
        .collect()
}

fn ingredient_itemprop<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "li[itemprop], div[itemprop], span[itemprop]")
        .into_iter()
        .filter(|el| has_itemprop(el, &["recipeIngredient", "ingredients"]))
        .collect()
}

fn data_ingredient<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "[data-ingredient]")
}

fn data_recipe_ingredient<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "[data-recipe-ingredient]")
}

fn ingredient_list_item<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "li[class]")
        .into_iter()
        .filter(|el| class_contains_any(el, &["ingredient"]))
        .collect()
}

fn ingredient_like_list_item<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "li")
        .into_iter()
        .filter(|el| looks_like_ingredient(&element_text(el)))
        .collect()
}

fn instruction_class<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "li[class], div[class], p[class]")
        .into_iter()
        .filter(|el| {
            class_contains_any(
                el,
                &["instruction", "directions", "steps", "method", "preparation"],
            )
        })
        .collect()
}

fn instruction_itemprop<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "li[itemprop], div[itemprop], p[itemprop]")
        .into_iter()
        .filter(|el| {
            has_itemprop(
                el,
                &["recipeInstructions", "instructions", "step", "preparationStep"],
            )
        })
        .collect()
}

fn data_instruction<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "[data-instruction]")
}

fn data_recipe_instruction<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "[data-recipe-instruction]")
}

fn ordered_list_item<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "ol li")
}

fn method_paragraph<'a>(doc: &'a Html, _: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "[class]")
        .into_iter()
        .find(|el| class_contains_any(el, &["method"]))
        .map(|container| select_within(container, "p"))
        .unwrap_or_default()
}

fn numbered_paragraph<'a>(doc: &'a Html, policy: &ExtractionPolicy) -> Vec<ElementRef<'a>> {
    select(doc, "p")
        .into_iter()
        .filter(|el| {
            let text = element_text(el);
            text.chars().count() > policy.min_fallback_paragraph_chars
                && NUMBERED_STEP.is_match(&text)
        })
        .collect()
}

/// Drops matches that contain another match, so a wrapper whose class also
/// matches does not swallow its items into one string.
fn innermost<'a>(elements: &[ElementRef<'a>]) -> Vec<ElementRef<'a>> {
    elements
        .iter()
        .filter(|element| {
            !elements.iter().any(|other| {
                other.id() != element.id()
                    && other.ancestors().any(|ancestor| ancestor.id() == element.id())
            })
        })
        .copied()
        .collect()
}

/// Pattern-based fallback over conventional class names, attributes and
/// document structure. Each field has its own ordered chain of queries and
/// the first query with a usable result wins.
pub struct HtmlClassExtractor {
    policy: ExtractionPolicy,
}

impl HtmlClassExtractor {
    pub fn new(policy: ExtractionPolicy) -> Self {
        Self { policy }
    }

    fn run_chain<F>(
        &self,
        document: &Html,
        field: RecipeField,
        queries: &[(&'static str, Query)],
        accept: F,
    ) -> Option<ExtractionCandidate>
    where
        F: Fn(Vec<String>) -> Option<Vec<String>>,
    {
        for &(name, query) in queries {
            let elements = query(document, &self.policy);
            let texts: Vec<String> = innermost(&elements)
                .iter()
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect();
            if texts.is_empty() {
                continue;
            }

            match accept(texts) {
                Some(items) => {
                    debug!("Found {} {} using pattern: {}", items.len(), field, name);
                    return Some(ExtractionCandidate::new(field, items, name));
                }
                None => debug!("Pattern {} matched but nothing usable for {}", name, field),
            }
        }

        debug!("No HTML pattern found {}", field);
        None
    }

    fn title(&self, document: &Html) -> Option<ExtractionCandidate> {
        self.run_chain(document, RecipeField::Title, TITLE_QUERIES, |texts| {
            texts.into_iter().next().map(|title| vec![title])
        })
    }

    fn ingredients(&self, document: &Html) -> Option<ExtractionCandidate> {
        self.run_chain(document, RecipeField::Ingredients, INGREDIENT_QUERIES, |texts| {
            // A class-name hit alone is not enough; something must read like an ingredient
            if !texts.iter().any(|text| looks_like_ingredient(text)) {
                return None;
            }
            let repaired = texts.iter().map(|text| repair_artifacts(text));
            let cleaned: Vec<String> = dedupe(repaired, "ingredient")
                .into_iter()
                .filter(|text| looks_like_ingredient(text))
                .collect();
            (!cleaned.is_empty()).then_some(cleaned)
        })
    }

    fn instructions(&self, document: &Html) -> Option<ExtractionCandidate> {
        let min_chars = self.policy.min_instruction_chars;
        self.run_chain(document, RecipeField::Instructions, INSTRUCTION_QUERIES, |texts| {
            let cleaned: Vec<String> = texts
                .iter()
                .filter_map(|text| clean_instruction(text, min_chars))
                .collect();
            (!cleaned.is_empty()).then_some(cleaned)
        })
    }
}

impl FieldExtractor for HtmlClassExtractor {
    fn name(&self) -> &'static str {
        "html_class"
    }

    fn extract(
        &self,
        context: &ParsingContext,
        field: RecipeField,
    ) -> Option<ExtractionCandidate> {
        match field {
            RecipeField::Title => self.title(&context.document),
            RecipeField::Ingredients => self.ingredients(&context.document),
            RecipeField::Instructions => self.instructions(&context.document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str, field: RecipeField) -> Option<ExtractionCandidate> {
        let context = ParsingContext::new("https://example.com/recipe", html);
        HtmlClassExtractor::new(ExtractionPolicy::default()).extract(&context, field)
    }

    #[test]
    fn test_wprm_recipe_extraction() {
        let html = r#"
        <html>
            <body>
                <h1 class="entry-title">Chocolate Chip Cookies</h1>
                <ul class="wprm-recipe-ingredients">
                    <li class="wprm-recipe-ingredient">2 cups all-purpose flour</li>
                    <li class="wprm-recipe-ingredient">1 cup butter, softened</li>
                    <li class="wprm-recipe-ingredient">2x 2 eggs</li>
                    <li class="wprm-recipe-ingredient">2 cups chocolate chips (semi-sweet)</li>
                </ul>
                <ul class="wprm-recipe-instructions">
                    <li class="wprm-recipe-instruction">Step 1: Preheat oven to 350°F</li>
                    <li class="wprm-recipe-instruction">Mix butter and sugar until fluffy</li>
                    <li class="wprm-recipe-instruction">Bake</li>
                </ul>
            </body>
        </html>
        "#;

        let title = extract(html, RecipeField::Title).unwrap();
        assert_eq!(title.items, vec!["Chocolate Chip Cookies"]);
        assert_eq!(title.strategy, "title-heading-class");

        let ingredients = extract(html, RecipeField::Ingredients).unwrap();
        assert_eq!(ingredients.strategy, "ingredient-class");
        assert_eq!(
            ingredients.items,
            vec![
                "2 cups all-purpose flour",
                "1 cup butter, softened",
                "2 cups chocolate chips"
            ]
        );

        let instructions = extract(html, RecipeField::Instructions).unwrap();
        assert_eq!(instructions.strategy, "instruction-class");
        assert!(instructions
            .items
            .contains(&"Preheat oven to 350°F".to_string()));
        assert!(instructions
            .items
            .contains(&"Mix butter and sugar until fluffy".to_string()));
        assert!(!instructions.items.contains(&"Bake".to_string()));
    }

    #[test]
    fn test_title_chain_order() {
        let html = r#"
            <h1>Site Name</h1>
            <h2 class="post-heading">Lemon Tart</h2>
        "#;
        let title = extract(html, RecipeField::Title).unwrap();
        assert_eq!(title.items, vec!["Lemon Tart"]);
        assert_eq!(title.strategy, "heading-class-keyword");

        let html = r#"<div class="Recipe-Card-Title">Plum Cake</div><h1>Blog</h1>"#;
        let title = extract(html, RecipeField::Title).unwrap();
        assert_eq!(title.items, vec!["Plum Cake"]);

        let html = r#"<h1 itemprop="name">Pea Soup</h1>"#;
        assert_eq!(extract(html, RecipeField::Title).unwrap().strategy, "title-itemprop");

        let html = r#"<h1>  </h1><h1>Only Heading</h1>"#;
        let title = extract(html, RecipeField::Title).unwrap();
        assert_eq!(title.items, vec!["Only Heading"]);
        assert_eq!(title.strategy, "first-h1");
    }

    #[test]
    fn test_ingredient_class_needs_ingredient_like_text() {
        let html = r#"
            <div class="ingredients-sidebar">Click here to subscribe</div>
            <ul>
                <li>Home</li>
                <li>1 tsp salt</li>
                <li>3 tbsp olive oil</li>
            </ul>
        "#;
        let ingredients = extract(html, RecipeField::Ingredients).unwrap();
        assert_eq!(ingredients.strategy, "ingredient-like-list-item");
        assert_eq!(ingredients.items, vec!["1 tsp salt", "3 tbsp olive oil"]);
    }

    #[test]
    fn test_ingredient_data_attributes_and_repair() {
        let html = r#"
            <span data-ingredient="sugar">Â½ cup sugar</span>
            <span data-ingredient="sugar">½ cup sugar</span>
            <span data-ingredient="ad">ADVERTISEMENT</span>
        "#;
        let ingredients = extract(html, RecipeField::Ingredients).unwrap();
        assert_eq!(ingredients.strategy, "data-ingredient");
        assert_eq!(ingredients.items, vec!["1/2 cup sugar", "½ cup sugar"]);
    }

    #[test]
    fn test_matching_wrapper_does_not_swallow_items() {
        let html = r#"
            <div class="recipe-ingredients">
                <p class="ingredient">1 cup rice</p>
                <p class="ingredient">2 cups water</p>
            </div>
            <div class="recipe-instructions">
                <p>Rinse the rice until the water runs clear.</p>
                <p>Simmer covered for fifteen minutes.</p>
            </div>
        "#;
        let ingredients = extract(html, RecipeField::Ingredients).unwrap();
        assert_eq!(ingredients.items, vec!["1 cup rice", "2 cups water"]);

        // No classed children, so the wrapper is the only match
        let instructions = extract(html, RecipeField::Instructions).unwrap();
        assert_eq!(instructions.items.len(), 1);
        assert!(instructions.items[0].starts_with("Rinse the rice"));
    }

    #[test]
    fn test_instructions_from_ordered_list() {
        let html = r#"
            <ol>
                <li>1. Whisk the eggs with the milk.</li>
                <li>2) Pour into a hot buttered pan.</li>
                <li>Serve</li>
            </ol>
        "#;
        let instructions = extract(html, RecipeField::Instructions).unwrap();
        assert_eq!(instructions.strategy, "ordered-list-item");
        assert_eq!(
            instructions.items,
            vec!["Whisk the eggs with the milk.", "Pour into a hot buttered pan."]
        );
    }

    #[test]
    fn test_instructions_from_method_container() {
        let html = r#"
            <section class="Method">
                <h3>Method</h3>
                <p>Fry the onions slowly until golden.</p>
                <p>Add the rice and the stock.</p>
            </section>
        "#;
        let instructions = extract(html, RecipeField::Instructions).unwrap();
        assert_eq!(instructions.strategy, "method-paragraph");
        assert_eq!(instructions.items.len(), 2);
    }

    #[test]
    fn test_instructions_from_numbered_paragraphs() {
        let html = r#"
            <p>This is a long introduction about my holiday that is not a recipe step at all.</p>
            <p>1. Bring a large pot of salted water to the boil and add the pasta to it.</p>
            <p>Step 2 Drain the pasta, keeping a cup of the cooking water for the sauce.</p>
            <p>3. Too short.</p>
        "#;
        let instructions = extract(html, RecipeField::Instructions).unwrap();
        assert_eq!(instructions.strategy, "numbered-paragraph");
        assert_eq!(
            instructions.items,
            vec![
                "Bring a large pot of salted water to the boil and add the pasta to it.",
                "Step 2 Drain the pasta, keeping a cup of the cooking water for the sauce."
            ]
        );
    }

    #[test]
    fn test_nothing_matches() {
        let html = r#"<div class="content"><p>Nothing to see here.</p></div>"#;
        assert!(extract(html, RecipeField::Title).is_none());
        assert!(extract(html, RecipeField::Ingredients).is_none());
        assert!(extract(html, RecipeField::Instructions).is_none());
    }
}
