//! Search filter over derived columns.
//!
//! Filtering is a display-time narrowing: it never touches `order` and never
//! mutates the columns it is given.

use join_proto::task::Task;

use crate::columns::Column;

/// Trims and lowercases a search term. Blank terms mean "no filter".
#[must_use]
pub fn normalize_term(term: &str) -> Option<String> {
    let term = term.trim();
    (!term.is_empty()).then(|| term.to_lowercase())
}

/// Case-insensitive substring match on title, description and category.
///
/// `needle` must already be normalized.
#[must_use]
pub fn task_matches(task: &Task, needle: &str) -> bool {
    [&task.title, &task.description, &task.category]
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Tasks from `tasks` that match `needle`, in their original order.
#[must_use]
pub fn filter_tasks(tasks: &[Task], needle: &str) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| task_matches(t, needle))
        .cloned()
        .collect()
}

/// Narrows `columns` to tasks matching `term`.
///
/// A column whose title matches keeps all of its tasks. A blank term
/// returns an unchanged copy.
#[must_use]
pub fn filter_columns(columns: &[Column], term: &str) -> Vec<Column> {
    let Some(needle) = normalize_term(term) else {
        return columns.to_vec();
    };
    columns
        .iter()
        .map(|column| {
            if column.title().to_lowercase().contains(&needle) {
                column.clone()
            } else {
                Column {
                    id: column.id,
                    tasks: filter_tasks(&column.tasks, &needle),
                }
            }
        })
        .collect()
}

/// `true` iff every column is empty.
#[must_use]
pub fn no_tasks_found(columns: &[Column]) -> bool {
    columns.iter().all(|c| c.tasks.is_empty())
}
