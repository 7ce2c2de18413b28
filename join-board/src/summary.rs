//! Board summary counters.

use chrono::NaiveDate;
use join_proto::task::{Priority, Task, TaskStatus};

/// Aggregate counts over a task collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardSummary {
    /// Tasks in "To Do".
    pub todo: usize,
    /// Tasks in "In Progress".
    pub in_progress: usize,
    /// Tasks in "Await Feedback".
    pub feedback: usize,
    /// Tasks in "Done".
    pub done: usize,
    /// Urgent tasks, in any column.
    pub urgent: usize,
    /// Tasks across the four columns.
    pub total: usize,
    /// Tasks whose status matches no column.
    pub unrecognized: usize,
    /// Earliest due date among urgent tasks that are not done.
    pub upcoming_deadline: Option<NaiveDate>,
}

impl BoardSummary {
    /// Counts `tasks`.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut summary = Self::default();
        for task in tasks {
            match task.known_status() {
                Some(TaskStatus::Todo) => summary.todo += 1,
                Some(TaskStatus::InProgress) => summary.in_progress += 1,
                Some(TaskStatus::Feedback) => summary.feedback += 1,
                Some(TaskStatus::Done) => summary.done += 1,
                None => summary.unrecognized += 1,
            }
            if task.priority == Priority::Urgent {
                summary.urgent += 1;
                if task.known_status() != Some(TaskStatus::Done)
                    && let Some(due) = task.due_date
                {
                    summary.upcoming_deadline =
                        Some(summary.upcoming_deadline.map_or(due, |d| d.min(due)));
                }
            }
        }
        summary.total = summary.todo + summary.in_progress + summary.feedback + summary.done;
        summary
    }

    /// Count for one status.
    #[must_use]
    pub const fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Feedback => self.feedback,
            TaskStatus::Done => self.done,
        }
    }
}

/// Greeting for the local hour of day (0-23).
#[must_use]
pub const fn greeting(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}
