use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

use crate::selection::{Category, CategoryId, SelectionHandle, SelectionState};
use crate::supply::question::Difficulty;
use crate::supply::source::QuestionSource;
use crate::supply::QuestionPool;

/// Everything the front-end needs, injected explicitly: one pool per
/// difficulty plus the shared selection state. Pools keep their buffers
/// across difficulty switches, so flipping back does not refetch.
pub struct AppContext<S: QuestionSource + 'static> {
    pub selection: SelectionHandle,
    easy: QuestionPool<S>,
    medium: QuestionPool<S>,
    hard: QuestionPool<S>,
}

impl<S: QuestionSource + 'static> AppContext<S> {
    pub fn new(source: Arc<S>) -> Self {
        let selection: SelectionHandle = Arc::new(RwLock::new(SelectionState::new()));
        AppContext {
            easy: QuestionPool::new(Difficulty::Easy, Arc::clone(&source), Arc::clone(&selection)),
            medium: QuestionPool::new(
                Difficulty::Medium,
                Arc::clone(&source),
                Arc::clone(&selection),
            ),
            hard: QuestionPool::new(Difficulty::Hard, source, Arc::clone(&selection)),
            selection,
        }
    }

    pub fn pool(&self, difficulty: Difficulty) -> &QuestionPool<S> {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    /// The pool for the currently selected difficulty.
    pub fn current_pool(&self) -> &QuestionPool<S> {
        self.pool(self.selection.read().difficulty())
    }

    pub fn set_difficulty(&self, difficulty: Difficulty) {
        self.selection.write().set_difficulty(difficulty);
    }

    pub fn install_catalogue(&self, categories: Vec<Category>) {
        self.selection.write().install_catalogue(categories);
        self.notify_selection_changed();
    }

    pub fn toggle_category(&self, id: CategoryId) {
        self.selection.write().toggle_category(id);
        self.notify_selection_changed();
    }

    pub fn set_selected_categories(&self, ids: HashSet<CategoryId>) {
        self.selection.write().set_selected_categories(ids);
        self.notify_selection_changed();
    }

    pub fn shutdown(&self) {
        for difficulty in Difficulty::ALL {
            self.pool(difficulty).shutdown();
        }
    }

    fn notify_selection_changed(&self) {
        for difficulty in Difficulty::ALL {
            self.pool(difficulty).handle_selection_changed();
        }
    }
}
