use std::collections::HashSet;

use crate::selection::{Category, CategoryId};
use crate::supply::question::QuestionRecord;

/// Retains the records whose category is currently selected. Before the
/// catalogue has loaded there is nothing meaningful to filter against, so an
/// empty selection with an empty catalogue passes everything through.
pub fn filter_by_categories(
    records: Vec<QuestionRecord>,
    catalogue: &[Category],
    selected_ids: &HashSet<CategoryId>,
) -> Vec<QuestionRecord> {
    if selected_ids.is_empty() && catalogue.is_empty() {
        return records;
    }

    let allowed_names: HashSet<&str> = catalogue
        .iter()
        .filter(|category| selected_ids.contains(&category.id))
        .map(|category| category.name.as_str())
        .collect();

    records
        .into_iter()
        .filter(|record| allowed_names.contains(record.category.as_str()))
        .collect()
}
