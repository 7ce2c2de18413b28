//! Drag-drop engine: turns a completed drag gesture into column mutations
//! and persisted task patches.
//!
//! A drop is handled in two steps. [`DragDropEngine::plan`] validates the
//! gesture and applies it to the caller's columns immediately, returning
//! the patches the store must accept. [`DragDropEngine::persist`] issues
//! those patches concurrently, waits for all of them to settle, and reports
//! which were applied. The engine keeps no state between drops: columns are
//! owned by the caller and passed in per call.
//!
//! Same-column drops (a *reorder*) renumber the whole column densely.
//! Cross-column drops (a *transfer*) rewrite the dragged task's status and
//! order and, under the default [`DropPolicy`], renumber the destination.
//! Only tasks whose order actually changed are written.

use std::time::Duration;

use futures_util::future::join_all;
use join_proto::column::ColumnId;
use join_proto::task::{StoredStatus, Task, TaskId, TaskPatch};

use crate::columns::Column;
use crate::notify::{
    MSG_MOVE_DENIED, MSG_MOVE_FAILED, MSG_MOVE_OK, MSG_REORDER_FAILED, MSG_REORDER_OK,
    NotificationDurations, Notifier,
};
use crate::store::{StoreError, TaskStore};

/// A completed drag gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEvent {
    /// The dragged task, identified by its id.
    pub task: Task,
    /// Raw id of the list the drag started in. May carry a rendering suffix.
    pub source_list: String,
    /// Raw id of the list the task was dropped on.
    pub target_list: String,
    /// Index in the source list when the drag started.
    pub previous_index: usize,
    /// Final index in the target list.
    pub current_index: usize,
}

impl DropEvent {
    /// Builds a drop event.
    pub fn new(
        task: Task,
        source_list: impl Into<String>,
        target_list: impl Into<String>,
        previous_index: usize,
        current_index: usize,
    ) -> Self {
        Self {
            task,
            source_list: source_list.into(),
            target_list: target_list.into(),
            previous_index,
            current_index,
        }
    }
}

/// Why a drop was refused. A refused drop mutates nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropRejection {
    /// The edit capability is not granted.
    #[error("permission denied")]
    PermissionDenied,

    /// The dragged task has never been persisted.
    #[error("dragged task has no id")]
    MissingTaskId,

    /// The source list id maps to no column.
    #[error("unknown source list: {0}")]
    InvalidSource(String),

    /// The target list id maps to no column.
    #[error("unknown target list: {0}")]
    InvalidTarget(String),

    /// The dragged task is not in the source column.
    #[error("task {0} is not in the source column")]
    TaskNotInSource(TaskId),
}

/// Shape of an accepted drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    /// Moved within one column.
    Reorder {
        /// The column that was reordered.
        column: ColumnId,
    },
    /// Moved to another column.
    Transfer {
        /// Column the task left.
        from: ColumnId,
        /// Column the task entered.
        to: ColumnId,
    },
}

/// An accepted drop: the local mutation has been applied and these patches
/// remain to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPlan {
    /// Reorder or transfer.
    pub kind: DropKind,
    /// The dragged task.
    pub task_id: TaskId,
    /// Final index of the dragged task in its column.
    pub index: usize,
    /// One patch per task whose stored fields change.
    pub patches: Vec<(TaskId, TaskPatch)>,
}

impl DropPlan {
    /// `true` if nothing needs to be written.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Settled result of persisting a plan.
#[derive(Debug, Default)]
pub struct PersistReport {
    /// Patches the store accepted.
    pub applied: Vec<(TaskId, TaskPatch)>,
    /// Patches the store rejected, with the reason.
    pub failed: Vec<(TaskId, StoreError)>,
}

impl PersistReport {
    /// `true` if every patch was accepted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What happened to a drop.
#[derive(Debug)]
pub enum DropOutcome {
    /// Refused before any mutation.
    Rejected(DropRejection),
    /// Accepted, but the board already looked like this.
    Unchanged(DropKind),
    /// Accepted and persisted, fully or partially.
    Completed {
        /// Reorder or transfer.
        kind: DropKind,
        /// Store results.
        report: PersistReport,
    },
}

impl DropOutcome {
    /// `true` for a fully persisted drop.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { report, .. } if report.is_success())
    }
}

/// Tunables for cross-column drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropPolicy {
    /// Renumber every task in the destination column after a transfer.
    /// When off, only the dragged task is written and duplicate orders
    /// may appear in the destination.
    pub renumber_destination: bool,
}

impl Default for DropPolicy {
    fn default() -> Self {
        Self {
            renumber_destination: true,
        }
    }
}

/// Stateless drop handler over an injected store and notifier.
pub struct DragDropEngine<S, N> {
    store: S,
    notifier: N,
    policy: DropPolicy,
    durations: NotificationDurations,
}

impl<S: TaskStore, N: Notifier> DragDropEngine<S, N> {
    /// Creates an engine with the default policy and toast durations.
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            policy: DropPolicy::default(),
            durations: NotificationDurations::default(),
        }
    }

    /// Replaces the drop policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: DropPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the toast durations.
    #[must_use]
    pub const fn with_durations(mut self, durations: NotificationDurations) -> Self {
        self.durations = durations;
        self
    }

    /// The store patches are written to.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The notification sink.
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Active drop policy.
    #[must_use]
    pub const fn policy(&self) -> DropPolicy {
        self.policy
    }

    /// Toast durations.
    #[must_use]
    pub const fn durations(&self) -> NotificationDurations {
        self.durations
    }

    /// Validates `event` and applies it to `columns`.
    ///
    /// On success the columns already show the result and the returned
    /// plan lists the patches to persist.
    ///
    /// # Errors
    ///
    /// Returns a [`DropRejection`] and leaves `columns` untouched when the
    /// edit capability is missing, the task has no id, either list id is
    /// unknown, or the task is not in the source column. Only a missing
    /// capability is shown to the user.
    pub fn plan(
        &self,
        columns: &mut [Column],
        event: &DropEvent,
        can_edit: bool,
    ) -> Result<DropPlan, DropRejection> {
        if !can_edit {
            tracing::info!(target_list = %event.target_list, "drop refused: edit not permitted");
            self.notifier.notify(MSG_MOVE_DENIED, self.durations.failure);
            return Err(DropRejection::PermissionDenied);
        }
        let Some(task_id) = event.task.id.clone() else {
            tracing::debug!(title = %event.task.title, "drop ignored: task has no id");
            return Err(DropRejection::MissingTaskId);
        };
        let Some(to) = ColumnId::from_list_id(&event.target_list) else {
            tracing::warn!(target_list = %event.target_list, "drop ignored: unknown target list");
            return Err(DropRejection::InvalidTarget(event.target_list.clone()));
        };
        let Some(from) = ColumnId::from_list_id(&event.source_list) else {
            tracing::warn!(source_list = %event.source_list, "drop ignored: unknown source list");
            return Err(DropRejection::InvalidSource(event.source_list.clone()));
        };
        let Some(source_pos) = column_index(columns, from)
            .and_then(|c| columns[c].position_of(&task_id))
        else {
            tracing::warn!(task_id = %task_id, column = %from, "drop ignored: task not in source column");
            return Err(DropRejection::TaskNotInSource(task_id));
        };
        if source_pos != event.previous_index {
            tracing::debug!(
                task_id = %task_id,
                previous_index = event.previous_index,
                actual = source_pos,
                "drop index drifted from column state"
            );
        }

        let plan = if from == to {
            Self::plan_reorder(columns, from, task_id, source_pos, event.current_index)
        } else {
            self.plan_transfer(columns, from, to, task_id, source_pos, event.current_index)
        };
        let plan = plan.ok_or_else(|| DropRejection::InvalidTarget(event.target_list.clone()))?;

        tracing::debug!(
            task_id = %plan.task_id,
            kind = ?plan.kind,
            index = plan.index,
            patches = plan.patches.len(),
            "drop planned"
        );
        Ok(plan)
    }

    fn plan_reorder(
        columns: &mut [Column],
        column: ColumnId,
        task_id: TaskId,
        from: usize,
        to: usize,
    ) -> Option<DropPlan> {
        let idx = column_index(columns, column)?;
        let tasks = &mut columns[idx].tasks;
        let index = move_item_in_array(tasks, from, to);
        let patches = renumber(tasks)
            .into_iter()
            .map(|(id, order)| (id, TaskPatch::order(order)))
            .collect();
        Some(DropPlan {
            kind: DropKind::Reorder { column },
            task_id,
            index,
            patches,
        })
    }

    fn plan_transfer(
        &self,
        columns: &mut [Column],
        from: ColumnId,
        to: ColumnId,
        task_id: TaskId,
        source_pos: usize,
        current_index: usize,
    ) -> Option<DropPlan> {
        let status = to.status();
        let src = column_index(columns, from)?;
        let dst = column_index(columns, to)?;

        let (source, dest) = pair_mut(columns, src, dst);
        let index =
            transfer_array_item(&mut source.tasks, &mut dest.tasks, source_pos, current_index)?;
        let dest = &mut dest.tasks;
        dest[index].status = StoredStatus::Known(status);

        let mut patches = Vec::new();
        if self.policy.renumber_destination {
            for (id, order) in renumber(dest) {
                if id != task_id {
                    patches.push((id, TaskPatch::order(order)));
                }
            }
        } else {
            dest[index].order = Some(position_order(index));
        }
        patches.insert(
            0,
            (task_id.clone(), TaskPatch::reposition(status, position_order(index))),
        );

        Some(DropPlan {
            kind: DropKind::Transfer { from, to },
            task_id,
            index,
            patches,
        })
    }

    /// Writes every patch of `plan` concurrently and waits for all of them.
    ///
    /// Shows one success or failure toast for the whole drop. A plan with
    /// no patches issues no store calls and shows nothing.
    pub async fn persist(&self, plan: &DropPlan) -> PersistReport {
        let mut report = PersistReport::default();
        if plan.is_noop() {
            return report;
        }

        let mut updates = Vec::with_capacity(plan.patches.len());
        for (id, patch) in plan.patches.iter().cloned() {
            updates.push(self.update_one(id, patch));
        }

        for (id, patch, result) in join_all(updates).await {
            match result {
                Ok(()) => report.applied.push((id, patch)),
                Err(e) => {
                    tracing::warn!(task_id = %id, error = %e, "task update failed");
                    report.failed.push((id, e));
                }
            }
        }

        let (ok_msg, failed_msg) = match plan.kind {
            DropKind::Reorder { .. } => (MSG_REORDER_OK, MSG_REORDER_FAILED),
            DropKind::Transfer { .. } => (MSG_MOVE_OK, MSG_MOVE_FAILED),
        };
        if report.is_success() {
            tracing::info!(
                task_id = %plan.task_id,
                kind = ?plan.kind,
                updates = report.applied.len(),
                "drop persisted"
            );
            self.notify(ok_msg, self.durations.success);
        } else {
            tracing::error!(
                task_id = %plan.task_id,
                kind = ?plan.kind,
                applied = report.applied.len(),
                failed = report.failed.len(),
                "drop not fully persisted"
            );
            self.notify(failed_msg, self.durations.failure);
        }
        report
    }

    /// Plans and persists a drop against caller-owned columns.
    pub async fn handle_drop(
        &self,
        columns: &mut [Column],
        event: &DropEvent,
        can_edit: bool,
    ) -> DropOutcome {
        let plan = match self.plan(columns, event, can_edit) {
            Ok(plan) => plan,
            Err(rejection) => return DropOutcome::Rejected(rejection),
        };
        if plan.is_noop() {
            return DropOutcome::Unchanged(plan.kind);
        }
        let report = self.persist(&plan).await;
        DropOutcome::Completed {
            kind: plan.kind,
            report,
        }
    }

    async fn update_one(
        &self,
        id: TaskId,
        patch: TaskPatch,
    ) -> (TaskId, TaskPatch, Result<(), StoreError>) {
        let result = self.store.update(&id, patch.clone()).await;
        (id, patch, result)
    }

    fn notify(&self, message: &str, duration: Duration) {
        self.notifier.notify(message, duration);
    }
}

/// Index of column `id` within `columns`.
fn column_index(columns: &[Column], id: ColumnId) -> Option<usize> {
    columns.iter().position(|c| c.id == id)
}

/// Mutable access to two distinct columns.
fn pair_mut(columns: &mut [Column], a: usize, b: usize) -> (&mut Column, &mut Column) {
    if a < b {
        let (left, right) = columns.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = columns.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// Converts a column position to a stored order value.
fn position_order(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

/// Moves the item at `from` so that it ends up at `to`. Items in between
/// shift by one. Both indices are clamped. Returns the final index.
pub fn move_item_in_array<T>(items: &mut Vec<T>, from: usize, to: usize) -> usize {
    let Some(last) = items.len().checked_sub(1) else {
        return 0;
    };
    let from = from.min(last);
    let to = to.min(last);
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    to
}

/// Moves the item at `from` in `source` to position `to` in `target`.
/// Both indices are clamped. Returns the final index, or `None` if
/// `source` is empty.
pub fn transfer_array_item<T>(
    source: &mut Vec<T>,
    target: &mut Vec<T>,
    from: usize,
    to: usize,
) -> Option<usize> {
    let last = source.len().checked_sub(1)?;
    let item = source.remove(from.min(last));
    Some(insert_clamped(target, to, item))
}

fn insert_clamped<T>(items: &mut Vec<T>, index: usize, item: T) -> usize {
    let index = index.min(items.len());
    items.insert(index, item);
    index
}

/// Sets each task's order to its position and returns the ids whose order
/// changed, with the new value.
pub fn renumber(tasks: &mut [Task]) -> Vec<(TaskId, i64)> {
    let mut changed = Vec::new();
    for (i, task) in tasks.iter_mut().enumerate() {
        let order = position_order(i);
        if task.order != Some(order) {
            task.order = Some(order);
            if let Some(id) = &task.id {
                changed.push((id.clone(), order));
            }
        }
    }
    changed
}

/// Maps a final index in a filtered rendering of a column onto the full
/// column.
///
/// `visible` is what the user saw, `full` is the complete column, and
/// `moving` is the dragged task (which may be in neither list for a
/// transfer). The task is placed directly before the visible task it was
/// dropped in front of, or directly after the last visible task when
/// dropped at the end.
#[must_use]
pub fn map_visible_index(
    full: &[Task],
    visible: &[Task],
    visible_index: usize,
    moving: &TaskId,
) -> usize {
    let full_rest: Vec<&Task> = full.iter().filter(|t| !t.has_id(moving)).collect();
    let visible_rest: Vec<&Task> = visible.iter().filter(|t| !t.has_id(moving)).collect();
    let position = |anchor: &Task| {
        full_rest
            .iter()
            .position(|t| t.id.is_some() && t.id == anchor.id)
    };

    if let Some(anchor) = visible_rest.get(visible_index) {
        if let Some(pos) = position(anchor) {
            return pos;
        }
    } else if let Some(anchor) = visible_rest.last() {
        if let Some(pos) = position(anchor) {
            return pos + 1;
        }
    } else {
        return full_rest.len();
    }
    visible_index.min(full_rest.len())
}
