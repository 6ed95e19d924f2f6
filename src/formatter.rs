use crate::error::ScrapeError;
use crate::model::{CanonicalRecipe, RecipeDraft, RecipeField};
use crate::text::{dedupe, normalize, split_lines};
use log::{debug, error};

/// Turns an extracted (or manually entered) draft into the canonical shape.
///
/// A field holding a single newline-joined entry is split into lines first,
/// then everything is normalized and deduplicated again. Fails with the first
/// field, in title/ingredients/instructions order, that ends up empty.
pub fn format_recipe(draft: &RecipeDraft) -> Result<CanonicalRecipe, ScrapeError> {
    let title = normalize(&draft.title);
    let ingredients = dedupe(entry_lines(&draft.ingredients), "ingredient");
    let instructions = dedupe(entry_lines(&draft.instructions), "instruction");

    let missing = if title.is_empty() {
        Some(RecipeField::Title)
    } else if ingredients.is_empty() {
        Some(RecipeField::Ingredients)
    } else if instructions.is_empty() {
        Some(RecipeField::Instructions)
    } else {
        None
    };
    if let Some(missing) = missing {
        let err = ScrapeError::FormattingFailed { missing };
        error!("{}", err);
        return Err(err);
    }

    let source_url = draft
        .source_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from);

    debug!(
        "Formatted '{}' with {} ingredients and {} instructions",
        title,
        ingredients.len(),
        instructions.len()
    );

    Ok(CanonicalRecipe {
        title,
        ingredients,
        instructions,
        source_url,
    })
}

/// A lone entry is treated as manually entered newline-joined text and split
/// into lines. Lists are taken item by item.
fn entry_lines(entries: &[String]) -> Vec<String> {
    match entries {
        [single] => split_lines(single),
        _ => entries.to_vec(),
    }
}
