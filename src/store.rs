//! The persisted recipe shape and the record-store seam.
//!
//! Ingredients and instructions are stored as newline-joined text, one entry
//! per line, so a record round-trips through any plain text column.

use crate::error::StoreError;
use crate::model::CanonicalRecipe;
use crate::text::split_lines;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

const MAX_TITLE_CHARS: usize = 200;
const MAX_SOURCE_URL_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: u64,
    pub title: String,
    pub ingredients: String,
    pub instructions: String,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last time the recipe was added to an aggregated shopping list.
    pub last_added_to_aggregation: Option<DateTime<Utc>>,
}

impl RecipeRecord {
    pub fn ingredient_lines(&self) -> Vec<String> {
        split_lines(&self.ingredients)
    }

    pub fn instruction_lines(&self) -> Vec<String> {
        split_lines(&self.instructions)
    }

    pub fn to_recipe(&self) -> CanonicalRecipe {
        CanonicalRecipe {
            title: self.title.clone(),
            ingredients: self.ingredient_lines(),
            instructions: self.instruction_lines(),
            source_url: self.source_url.clone(),
        }
    }
}

/// Storage for imported and manually entered recipes.
pub trait RecipeStore: Send + Sync {
    fn create(&self, recipe: &CanonicalRecipe) -> Result<RecipeRecord, StoreError>;
    fn get(&self, id: u64) -> Result<RecipeRecord, StoreError>;
    /// All records, oldest first.
    fn list(&self) -> Result<Vec<RecipeRecord>, StoreError>;
    fn update(&self, id: u64, recipe: &CanonicalRecipe) -> Result<RecipeRecord, StoreError>;
    fn delete(&self, id: u64) -> Result<(), StoreError>;
    fn mark_added_to_aggregation(
        &self,
        id: u64,
        at: DateTime<Utc>,
    ) -> Result<RecipeRecord, StoreError>;
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    records: BTreeMap<u64, RecipeRecord>,
}

/// Process-local [`RecipeStore`]; contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecipeStore for MemoryStore {
    fn create(&self, recipe: &CanonicalRecipe) -> Result<RecipeRecord, StoreError> {
        validate(recipe)?;
        let now = Utc::now();
        let mut state = self.lock();
        state.next_id += 1;

        let record = RecipeRecord {
            id: state.next_id,
            title: recipe.title.clone(),
            ingredients: recipe.ingredients.join("\n"),
            instructions: recipe.instructions.join("\n"),
            source_url: recipe.source_url.clone(),
            created_at: now,
            updated_at: now,
            last_added_to_aggregation: None,
        };
        state.records.insert(record.id, record.clone());
        debug!("Stored recipe {} '{}'", record.id, record.title);
        Ok(record)
    }

    fn get(&self, id: u64) -> Result<RecipeRecord, StoreError> {
        self.lock()
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Result<Vec<RecipeRecord>, StoreError> {
        Ok(self.lock().records.values().cloned().collect())
    }

    fn update(&self, id: u64, recipe: &CanonicalRecipe) -> Result<RecipeRecord, StoreError> {
        validate(recipe)?;
        let mut state = self.lock();
        let record = state.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        record.title = recipe.title.clone();
        record.ingredients = recipe.ingredients.join("\n");
        record.instructions = recipe.instructions.join("\n");
        record.source_url = recipe.source_url.clone();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.lock()
            .records
            .remove(&id)
            .map(|_| debug!("Deleted recipe {}", id))
            .ok_or(StoreError::NotFound(id))
    }

    fn mark_added_to_aggregation(
        &self,
        id: u64,
        at: DateTime<Utc>,
    ) -> Result<RecipeRecord, StoreError> {
        let mut state = self.lock();
        let record = state.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.last_added_to_aggregation = Some(at);
        Ok(record.clone())
    }
}

fn validate(recipe: &CanonicalRecipe) -> Result<(), StoreError> {
    if recipe.title.trim().is_empty() {
        return Err(StoreError::Invalid("title is required".to_string()));
    }
    if recipe.title.chars().count() > MAX_TITLE_CHARS {
        return Err(StoreError::Invalid(format!(
            "title is longer than {MAX_TITLE_CHARS} characters"
        )));
    }
    if recipe.ingredients.is_empty() {
        return Err(StoreError::Invalid("ingredients are required".to_string()));
    }
    if recipe
        .source_url
        .as_ref()
        .is_some_and(|url| url.chars().count() > MAX_SOURCE_URL_CHARS)
    {
        return Err(StoreError::Invalid(format!(
            "source URL is longer than {MAX_SOURCE_URL_CHARS} characters"
        )));
    }
    Ok(())
}
