//! Task document types for the `Join` board.
//!
//! A [`Task`] is the document stored in the realtime collection. Decoding is
//! deliberately tolerant: documents written by older clients may carry an
//! unknown status, a non-numeric `order`, legacy string subtasks, a
//! differently-cased or unknown priority, or `null` where text is expected,
//! and must still load. A value that cannot be interpreted falls back to the
//! field's default instead of failing the document.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque identifier assigned to a task by the store on creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new identifier from any string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh time-ordered identifier (UUID v7).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the string form of this identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Workflow status of a task. Each status owns one board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Waiting for feedback.
    Feedback,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// All statuses in board column order.
    pub const ALL: [Self; 4] = [Self::Todo, Self::InProgress, Self::Feedback, Self::Done];

    /// Returns the stored string form (`todo`, `inProgress`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inProgress",
            Self::Feedback => "feedback",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not one of the four known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Status as found in a stored document.
///
/// Documents with a status outside the known set are kept rather than
/// rejected, so callers can surface them instead of losing them. A
/// non-string status is kept as its JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StoredStatus {
    /// One of the four board statuses.
    Known(TaskStatus),
    /// Any other string value.
    Unrecognized(String),
}

impl StoredStatus {
    /// Returns the known status, if any.
    #[must_use]
    pub const fn known(&self) -> Option<TaskStatus> {
        match self {
            Self::Known(status) => Some(*status),
            Self::Unrecognized(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for StoredStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(raw) => raw
                .parse()
                .map_or(Self::Unrecognized(raw), Self::Known),
            other => Self::Unrecognized(other.to_string()),
        })
    }
}

impl Default for StoredStatus {
    fn default() -> Self {
        Self::Known(TaskStatus::Todo)
    }
}

impl From<TaskStatus> for StoredStatus {
    fn from(status: TaskStatus) -> Self {
        Self::Known(status)
    }
}

impl fmt::Display for StoredStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(status) => status.fmt(f),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Task priority. Parsing is case-insensitive and accepts the legacy
/// `High` spelling as [`Priority::Urgent`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority.
    #[default]
    Medium,
    /// Urgent priority.
    Urgent,
}

impl Priority {
    /// Returns the stored lowercase form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a priority string outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority: {0}")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "urgent" | "high" => Ok(Self::Urgent),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(priority_from_value(&value))
    }
}

/// Interprets a raw JSON `priority` value.
///
/// Unknown strings and non-string values fall back to the default
/// priority and are logged.
#[must_use]
pub fn priority_from_value(value: &Value) -> Priority {
    match value {
        Value::Null => Priority::default(),
        Value::String(raw) => raw.parse().unwrap_or_else(|e: UnknownPriority| {
            tracing::warn!(raw = %raw, error = %e, "falling back to default priority");
            Priority::default()
        }),
        other => {
            tracing::warn!(raw = %other, "non-string priority, falling back to default");
            Priority::default()
        }
    }
}

/// A checklist item inside a task. Display order is the sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SubtaskRepr")]
pub struct Subtask {
    /// Subtask text.
    pub title: String,
    /// Whether the subtask is finished.
    pub done: bool,
}

impl Subtask {
    /// Creates an unfinished subtask.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            done: false,
        }
    }
}

/// Accepted encodings of a subtask: the object form, or a bare string
/// written by older clients.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubtaskRepr {
    Full {
        title: String,
        #[serde(default)]
        done: bool,
    },
    Legacy(String),
}

impl From<SubtaskRepr> for Subtask {
    fn from(repr: SubtaskRepr) -> Self {
        match repr {
            SubtaskRepr::Full { title, done } => Self { title, done },
            SubtaskRepr::Legacy(title) => Self::new(title),
        }
    }
}

/// Reasons a task is rejected before creation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Title is empty or whitespace.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Description is empty or whitespace.
    #[error("task description cannot be empty")]
    DescriptionEmpty,
    /// Category is empty or whitespace.
    #[error("task category cannot be empty")]
    CategoryEmpty,
    /// Status is not one of the four board statuses.
    #[error("task status is not a board column: {0}")]
    UnrecognizedStatus(String),
    /// Due date lies before the reference day.
    #[error("due date {due} is in the past (today is {today})")]
    DueDateInPast {
        /// The rejected due date.
        due: NaiveDate,
        /// The reference day.
        today: NaiveDate,
    },
}

/// A task document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier; absent before the first persist.
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<TaskId>,
    /// Column membership.
    #[serde(default)]
    pub status: StoredStatus,
    /// Short title.
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    /// Free-text description.
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    /// Category, e.g. "User Story" or "Technical Task".
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: String,
    /// Due date.
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Contact ids assigned to the task.
    #[serde(default, deserialize_with = "lenient_assignees")]
    pub assigned_to: BTreeSet<String>,
    /// Checklist in display order.
    #[serde(default, deserialize_with = "lenient_subtasks")]
    pub subtasks: Vec<Subtask>,
    /// Position within the status column; meaningless across columns.
    #[serde(
        default,
        deserialize_with = "lenient_order",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<i64>,
}

impl Task {
    /// Creates an unsaved task with the given title and status.
    pub fn new(title: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            title: title.into(),
            status: StoredStatus::Known(status),
            ..Self::default()
        }
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the column order.
    #[must_use]
    pub const fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Returns the known status, or `None` for an unrecognized one.
    #[must_use]
    pub const fn known_status(&self) -> Option<TaskStatus> {
        self.status.known()
    }

    /// Returns `true` if the task carries the given id.
    #[must_use]
    pub fn has_id(&self, id: &TaskId) -> bool {
        self.id.as_ref() == Some(id)
    }

    /// Number of finished subtasks.
    #[must_use]
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.done).count()
    }

    /// Rounded percentage of finished subtasks, or `None` without subtasks.
    #[must_use]
    pub fn subtask_progress(&self) -> Option<u8> {
        let total = self.subtasks.len();
        if total == 0 {
            return None;
        }
        let percent = (self.completed_subtasks() * 200 + total) / (total * 2);
        Some(u8::try_from(percent).unwrap_or(100))
    }

    /// Flips the `done` flag of the subtask at `index`.
    ///
    /// Returns the new flag, or `None` if the index is out of range.
    pub fn toggle_subtask(&mut self, index: usize) -> Option<bool> {
        let subtask = self.subtasks.get_mut(index)?;
        subtask.done = !subtask.done;
        Some(subtask.done)
    }

    /// Checks the fields a new task must carry.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleEmpty);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::DescriptionEmpty);
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::CategoryEmpty);
        }
        if let StoredStatus::Unrecognized(raw) = &self.status {
            return Err(ValidationError::UnrecognizedStatus(raw.clone()));
        }
        if let Some(due) = self.due_date
            && due < today
        {
            return Err(ValidationError::DueDateInPast { due, today });
        }
        Ok(())
    }
}

/// A partial update. Absent fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New column order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// New assignee set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<BTreeSet<String>>,
    /// New subtask list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
}

impl TaskPatch {
    /// Patch that only rewrites the column order.
    #[must_use]
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    /// Patch that moves a task into another column at `order`.
    #[must_use]
    pub fn reposition(status: TaskStatus, order: i64) -> Self {
        Self {
            status: Some(status),
            order: Some(order),
            ..Self::default()
        }
    }

    /// Patch that replaces the subtask list.
    #[must_use]
    pub fn subtasks(subtasks: Vec<Subtask>) -> Self {
        Self {
            subtasks: Some(subtasks),
            ..Self::default()
        }
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the present fields to `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(status) = self.status {
            task.status = StoredStatus::Known(status);
        }
        if let Some(order) = self.order {
            task.order = Some(order);
        }
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            task.category.clone_from(category);
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assigned_to) = &self.assigned_to {
            task.assigned_to.clone_from(assigned_to);
        }
        if let Some(subtasks) = &self.subtasks {
            task.subtasks.clone_from(subtasks);
        }
    }
}

/// Interprets a raw JSON `order` value.
///
/// Integers and integral floats are orders; every other value (strings,
/// fractions, booleans, null) means "no order".
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn order_from_value(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    let in_range = f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64;
    in_range.then_some(f as i64)
}

fn lenient_order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(order_from_value))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<TaskId>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => Some(TaskId(id)),
        Value::Number(n) => Some(TaskId(n.to_string())),
        _ => None,
    })
}

/// `null` reads as empty text; other non-strings keep their JSON text.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_assignees<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(contact) => Some(contact),
                _ => None,
            })
            .collect(),
        _ => BTreeSet::new(),
    })
}

fn lenient_subtasks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Subtask>, D::Error> {
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(subtask) => Some(subtask),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed subtask");
                None
            }
        })
        .collect())
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|raw| raw.get(..10))
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()))
}
