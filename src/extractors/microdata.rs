use super::{element_text, has_itemprop, select, select_within, FieldExtractor, ParsingContext};
use crate::model::{ExtractionCandidate, RecipeField};
use log::debug;
use scraper::ElementRef;

const INGREDIENT_PROPS: &[&str] = &["recipeIngredient", "ingredients"];
const INSTRUCTION_PROPS: &[&str] = &["recipeInstructions", "instructions"];

/// Reads `itemprop` annotations inside schema.org `Recipe` items.
///
/// Each field is looked up on its own, so a page can supply ingredients
/// through microdata while its instructions come from somewhere else.
pub struct MicroDataExtractor;

impl MicroDataExtractor {
    fn find_recipe_containers<'a>(&self, context: &'a ParsingContext) -> Vec<ElementRef<'a>> {
        select(&context.document, "[itemscope][itemtype]")
            .into_iter()
            .filter(|element| {
                element.value().attr("itemtype").is_some_and(|itemtype| {
                    itemtype.contains("schema.org/Recipe")
                        || itemtype.contains("data-vocabulary.org/Recipe")
                })
            })
            .collect()
    }

    fn get_itemprop_list(&self, containers: &[ElementRef], props: &[&str]) -> Vec<String> {
        containers
            .iter()
            .flat_map(|container| select_within(*container, "[itemprop]"))
            .filter(|element| has_itemprop(element, props))
            .map(|element| element_text(&element))
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// The recipe's own `name`, skipping names of nested items such as the author.
    fn get_name(&self, containers: &[ElementRef]) -> Option<String> {
        containers.iter().find_map(|container| {
            select_within(*container, "[itemprop]")
                .into_iter()
                .filter(|element| has_itemprop(element, &["name"]))
                .filter(|element| {
                    owning_item(*element).is_some_and(|owner| owner.id() == container.id())
                })
                .map(|element| element_text(&element))
                .find(|text| !text.is_empty())
        })
    }
}

/// The closest ancestor that starts a new microdata item.
fn owning_item(element: ElementRef) -> Option<ElementRef> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().attr("itemscope").is_some())
}

impl FieldExtractor for MicroDataExtractor {
    fn name(&self) -> &'static str {
        "microdata"
    }

    fn extract(
        &self,
        context: &ParsingContext,
        field: RecipeField,
    ) -> Option<ExtractionCandidate> {
        let containers = self.find_recipe_containers(context);
        if containers.is_empty() {
            debug!("No MicroData Recipe container found");
            return None;
        }

        let items = match field {
            RecipeField::Title => self.get_name(&containers).into_iter().collect(),
            RecipeField::Ingredients => self.get_itemprop_list(&containers, INGREDIENT_PROPS),
            RecipeField::Instructions => self.get_itemprop_list(&containers, INSTRUCTION_PROPS),
        };

        if items.is_empty() {
            debug!("MicroData: no {} found", field);
            return None;
        }
        Some(ExtractionCandidate::new(field, items, self.name()))
    }
}
