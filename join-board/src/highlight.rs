//! Resolves which tasks the board should highlight.

use join_proto::task::{Priority, Task, TaskId, TaskStatus};

/// What to highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightRequest {
    /// A single task.
    Task(TaskId),
    /// Every task with this status.
    Status(TaskStatus),
    /// Every urgent task.
    Urgent,
}

impl HighlightRequest {
    /// Picks a request from optional parameters. A task id wins over a
    /// status, and a status wins over the urgent flag. An unknown status
    /// falls through to the next option.
    #[must_use]
    pub fn from_params(task_id: Option<&str>, status: Option<&str>, urgent: bool) -> Option<Self> {
        if let Some(id) = task_id.filter(|id| !id.is_empty()) {
            return Some(Self::Task(TaskId::from(id)));
        }
        if let Some(status) = status.and_then(|s| s.parse().ok()) {
            return Some(Self::Status(status));
        }
        urgent.then_some(Self::Urgent)
    }

    /// Ids of the tasks in `tasks` selected by this request.
    ///
    /// A task id request returns that id even when the task is not loaded
    /// yet. Tasks without an id are never selected.
    #[must_use]
    pub fn resolve(&self, tasks: &[Task]) -> Vec<TaskId> {
        match self {
            Self::Task(id) => vec![id.clone()],
            Self::Status(status) => ids_where(tasks, |t| t.known_status() == Some(*status)),
            Self::Urgent => ids_where(tasks, |t| t.priority == Priority::Urgent),
        }
    }
}

fn ids_where(tasks: &[Task], pred: impl Fn(&Task) -> bool) -> Vec<TaskId> {
    tasks
        .iter()
        .filter(|t| pred(t))
        .filter_map(|t| t.id.clone())
        .collect()
}
