use itertools::Itertools;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::supply::question::Difficulty;

pub type CategoryId = u32;

/// One entry of the category catalogue, as served by the remote source.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// User choices the pools read but never own: current difficulty, the
/// category catalogue and which categories are enabled. Mutated only by the
/// front-end.
#[derive(Debug)]
pub struct SelectionState {
    difficulty: Difficulty,
    catalogue: Vec<Category>,
    selected_category_ids: HashSet<CategoryId>,
    categories_initialized: bool,
}

pub type SelectionHandle = Arc<RwLock<SelectionState>>;

impl Default for SelectionState {
    fn default() -> Self {
        SelectionState {
            difficulty: Difficulty::Easy,
            catalogue: Vec::new(),
            selected_category_ids: HashSet::new(),
            categories_initialized: false,
        }
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    pub fn catalogue(&self) -> &[Category] {
        &self.catalogue
    }

    pub fn categories_initialized(&self) -> bool {
        self.categories_initialized
    }

    /// Installs the fetched catalogue. On first load everything is selected
    /// by default; a reload keeps the existing selection but drops ids that
    /// no longer exist.
    pub fn install_catalogue(&mut self, categories: Vec<Category>) {
        self.catalogue = categories
            .into_iter()
            .unique_by(|category| category.id)
            .collect();
        if self.categories_initialized {
            let known: HashSet<CategoryId> =
                self.catalogue.iter().map(|category| category.id).collect();
            self.selected_category_ids
                .retain(|id| known.contains(id));
        } else {
            self.selected_category_ids =
                self.catalogue.iter().map(|category| category.id).collect();
            self.categories_initialized = true;
        }
    }

    pub fn selected_category_ids(&self) -> &HashSet<CategoryId> {
        &self.selected_category_ids
    }

    pub fn set_selected_categories(&mut self, ids: HashSet<CategoryId>) {
        self.selected_category_ids = ids;
    }

    pub fn toggle_category(&mut self, id: CategoryId) {
        if !self.selected_category_ids.remove(&id) {
            self.selected_category_ids.insert(id);
        }
    }

    /// True once the catalogue has loaded and the user has deselected every
    /// category. In that state the pools supply nothing.
    pub fn is_empty_selection(&self) -> bool {
        self.categories_initialized && self.selected_category_ids.is_empty()
    }

    /// The id to pass upstream for server-side filtering. Only meaningful
    /// when exactly one category is selected.
    pub fn single_selected_category(&self) -> Option<CategoryId> {
        if self.selected_category_ids.len() == 1 {
            self.selected_category_ids.iter().next().copied()
        } else {
            None
        }
    }
}
