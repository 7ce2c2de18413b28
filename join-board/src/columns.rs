//! Column partitioner: derives the four board columns from a flat task list.

use std::cmp::Ordering;

use join_proto::column::ColumnId;
use join_proto::task::Task;

/// A derived, non-persisted group of tasks sharing one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Which column this is.
    pub id: ColumnId,
    /// Tasks in display order.
    pub tasks: Vec<Task>,
}

impl Column {
    /// Creates an empty column.
    #[must_use]
    pub const fn new(id: ColumnId) -> Self {
        Self {
            id,
            tasks: Vec::new(),
        }
    }

    /// Display title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        self.id.title()
    }

    /// Position of the task with `id`, if present.
    #[must_use]
    pub fn position_of(&self, id: &join_proto::task::TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.has_id(id))
    }
}

/// Result of partitioning: the four columns plus tasks whose stored status
/// matches none of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Columns in board order.
    pub columns: Vec<Column>,
    /// Tasks with an unrecognized status, in input order.
    pub unrecognized: Vec<Task>,
}

/// Splits `tasks` into the four columns and sorts each one.
#[must_use]
pub fn partition(tasks: &[Task]) -> Partition {
    let mut columns: Vec<Column> = ColumnId::ALL.into_iter().map(Column::new).collect();
    let mut unrecognized = Vec::new();

    for task in tasks {
        match task.known_status() {
            Some(status) => columns[ColumnId::for_status(status).index()]
                .tasks
                .push(task.clone()),
            None => unrecognized.push(task.clone()),
        }
    }
    for column in &mut columns {
        column.tasks.sort_by(compare_tasks);
    }

    Partition {
        columns,
        unrecognized,
    }
}

/// Returns the four sorted columns, leaving out unrecognized tasks.
#[must_use]
pub fn update_columns(tasks: &[Task]) -> Vec<Column> {
    partition(tasks).columns
}

/// Total order within a column.
///
/// Tasks with an `order` come first, ascending. Ties and unordered tasks
/// fall back to case-insensitive title, then id.
#[must_use]
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    let by_order = match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_order
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Finds the column with `id`.
#[must_use]
pub fn column(columns: &[Column], id: ColumnId) -> Option<&Column> {
    columns.iter().find(|c| c.id == id)
}
