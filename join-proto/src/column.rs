//! The four fixed board columns and their list identifiers.
//!
//! UI surfaces render the same logical column more than once (desktop grid,
//! mobile carousel) and tag each rendering with a suffix on the list id.
//! [`normalize_list_id`] strips those suffixes so both renderings compare
//! equal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::TaskStatus;

/// Suffix used by the mobile carousel rendering of a column.
pub const MOBILE_LIST_SUFFIX: &str = "-mobile-list";

/// Suffix used by the desktop grid rendering of a column.
pub const LIST_SUFFIX: &str = "-list";

/// Logical board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnId {
    /// `todoList`
    #[serde(rename = "todoList")]
    Todo,
    /// `progressList`
    #[serde(rename = "progressList")]
    Progress,
    /// `feedbackList`
    #[serde(rename = "feedbackList")]
    Feedback,
    /// `doneList`
    #[serde(rename = "doneList")]
    Done,
}

impl ColumnId {
    /// All columns in display order.
    pub const ALL: [Self; 4] = [Self::Todo, Self::Progress, Self::Feedback, Self::Done];

    /// The list identifier used by drop targets.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todoList",
            Self::Progress => "progressList",
            Self::Feedback => "feedbackList",
            Self::Done => "doneList",
        }
    }

    /// Human-readable column title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::Progress => "In Progress",
            Self::Feedback => "Await Feedback",
            Self::Done => "Done",
        }
    }

    /// Status carried by every task in this column.
    #[must_use]
    pub const fn status(self) -> TaskStatus {
        match self {
            Self::Todo => TaskStatus::Todo,
            Self::Progress => TaskStatus::InProgress,
            Self::Feedback => TaskStatus::Feedback,
            Self::Done => TaskStatus::Done,
        }
    }

    /// Column that holds tasks of `status`.
    #[must_use]
    pub const fn for_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Todo => Self::Todo,
            TaskStatus::InProgress => Self::Progress,
            TaskStatus::Feedback => Self::Feedback,
            TaskStatus::Done => Self::Done,
        }
    }

    /// Position of this column on the board.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::Progress => 1,
            Self::Feedback => 2,
            Self::Done => 3,
        }
    }

    /// Resolves a raw list id, with or without a rendering suffix.
    ///
    /// Returns `None` for ids outside the fixed table.
    #[must_use]
    pub fn from_list_id(raw: &str) -> Option<Self> {
        let id = normalize_list_id(raw);
        Self::ALL.into_iter().find(|column| column.as_str() == id)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strips a trailing [`MOBILE_LIST_SUFFIX`] or, failing that, a trailing
/// [`LIST_SUFFIX`]. Other ids pass through unchanged.
#[must_use]
pub fn normalize_list_id(raw: &str) -> &str {
    raw.strip_suffix(MOBILE_LIST_SUFFIX)
        .or_else(|| raw.strip_suffix(LIST_SUFFIX))
        .unwrap_or(raw)
}

/// Maps a raw list id to the status a task dropped there receives.
#[must_use]
pub fn status_for_list(raw: &str) -> Option<TaskStatus> {
    ColumnId::from_list_id(raw).map(ColumnId::status)
}
