//! Integration tests for drag-and-drop reorders and status transitions.
//!
//! Drives the board controller against a recording store that counts
//! every call and can be told to reject updates for chosen tasks.
//!
//! Verification command: `cargo test --test drag_drop`

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use join_board::controller::BoardController;
use join_board::dragdrop::{DragDropEngine, DropEvent, DropKind, DropOutcome, DropPolicy, DropRejection};
use join_board::notify::{
    ChannelNotifier, MSG_MOVE_DENIED, MSG_MOVE_FAILED, MSG_MOVE_OK, MSG_REORDER_FAILED,
    MSG_REORDER_OK, Notification,
};
use join_board::permission::{Capabilities, PermissionHandle, PermissionService};
use join_board::store::memory::InMemoryTaskStore;
use join_board::store::{StoreError, TaskStore};
use join_proto::column::ColumnId;
use join_proto::task::{Task, TaskId, TaskPatch, TaskStatus};

// ---------------------------------------------------------------------------
// Recording store
// ---------------------------------------------------------------------------

/// In-memory store that records every call and can reject chosen updates.
#[derive(Clone, Default)]
struct RecordingStore {
    inner: InMemoryTaskStore,
    updates: Arc<Mutex<Vec<(TaskId, TaskPatch)>>>,
    creates: Arc<Mutex<usize>>,
    failing: Arc<Mutex<HashSet<TaskId>>>,
}

impl RecordingStore {
    fn seeded(tasks: Vec<Task>) -> Self {
        Self {
            inner: InMemoryTaskStore::with_tasks(tasks),
            ..Self::default()
        }
    }

    fn fail_updates_for(&self, id: &str) {
        self.failing.lock().insert(TaskId::from(id));
    }

    fn updates(&self) -> Vec<(TaskId, TaskPatch)> {
        self.updates.lock().clone()
    }

    fn mutation_calls(&self) -> usize {
        self.updates.lock().len() + *self.creates.lock()
    }

    fn order_of(&self, id: &str) -> Option<i64> {
        self.inner.get(&TaskId::from(id)).and_then(|t| t.order)
    }

    fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.inner.get(&TaskId::from(id)).and_then(|t| t.known_status())
    }
}

impl TaskStore for RecordingStore {
    fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.inner.subscribe()
    }

    async fn create(&self, task: Task) -> Result<TaskId, StoreError> {
        *self.creates.lock() += 1;
        self.inner.create(task).await
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        self.updates.lock().push((id.clone(), patch.clone()));
        if self.failing.lock().contains(id) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

type Board = BoardController<RecordingStore, ChannelNotifier, PermissionService>;

struct Harness {
    store: RecordingStore,
    board: Board,
    toasts: mpsc::Receiver<Notification>,
    permissions: PermissionHandle,
}

fn harness(tasks: Vec<Task>, policy: DropPolicy) -> Harness {
    let store = RecordingStore::seeded(tasks);
    let (notifier, toasts) = ChannelNotifier::new(16);
    let (service, permissions) = PermissionService::new(Capabilities::default());
    let engine = DragDropEngine::new(store.clone(), notifier).with_policy(policy);
    let mut board = BoardController::new(engine, service);
    board.apply_snapshot(store.inner.snapshot());
    Harness {
        store,
        board,
        toasts,
        permissions,
    }
}

fn task(id: &str, status: TaskStatus, order: i64) -> Task {
    Task::new(format!("Task {id}"), status)
        .with_id(id)
        .with_order(order)
}

fn column_ids(board: &Board, column: ColumnId) -> Vec<String> {
    board.columns()[column.index()]
        .tasks
        .iter()
        .map(|t| t.id.as_ref().unwrap().to_string())
        .collect()
}

fn column_orders(board: &Board, column: ColumnId) -> Vec<Option<i64>> {
    board.columns()[column.index()]
        .tasks
        .iter()
        .map(|t| t.order)
        .collect()
}

fn drain(toasts: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = toasts.try_recv() {
        out.push(n);
    }
    out
}

// ---------------------------------------------------------------------------
// Reorder within a column
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reorder_renumbers_every_task_in_the_column() {
    let mut h = harness(
        vec![
            task("a", TaskStatus::Todo, 0),
            task("b", TaskStatus::Todo, 1),
            task("c", TaskStatus::Todo, 2),
            task("d", TaskStatus::Todo, 3),
        ],
        DropPolicy::default(),
    );

    let event = DropEvent::new(task("a", TaskStatus::Todo, 0), "todoList", "todoList", 0, 2);
    let outcome = h.board.on_drop(event).await;

    assert!(outcome.is_success());
    assert_eq!(column_ids(&h.board, ColumnId::Todo), ["b", "c", "a", "d"]);
    assert_eq!(
        column_orders(&h.board, ColumnId::Todo),
        [Some(0), Some(1), Some(2), Some(3)]
    );
    for (id, order) in [("b", 0), ("c", 1), ("a", 2), ("d", 3)] {
        assert_eq!(h.store.order_of(id), Some(order), "stored order of {id}");
    }

    let toasts = drain(&mut h.toasts);
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, MSG_REORDER_OK);
    assert_eq!(toasts[0].duration, Duration::from_millis(2000));
}

#[tokio::test]
async fn reorder_repairs_sparse_and_missing_orders() {
    let mut h = harness(
        vec![
            task("a", TaskStatus::Feedback, 10),
            task("b", TaskStatus::Feedback, 20),
            Task::new("zeta", TaskStatus::Feedback).with_id("c"),
        ],
        DropPolicy::default(),
    );

    let event = DropEvent::new(task("b", TaskStatus::Feedback, 20), "feedbackList", "feedbackList", 1, 0);
    h.board.on_drop(event).await;

    assert_eq!(column_ids(&h.board, ColumnId::Feedback), ["b", "a", "c"]);
    assert_eq!(h.store.order_of("c"), Some(2));
    assert_eq!(h.store.updates().len(), 3);
}

#[tokio::test]
async fn dragging_second_task_to_top_swaps_orders() {
    let mut h = harness(
        vec![
            Task::new("A", TaskStatus::Todo).with_id("1").with_order(0),
            Task::new("B", TaskStatus::Todo).with_id("2").with_order(1),
        ],
        DropPolicy::default(),
    );

    let dragged = h.board.columns()[0].tasks[1].clone();
    let event = DropEvent::new(dragged, "todoList", "todoList", 1, 0);
    h.board.on_drop(event).await;

    assert_eq!(column_ids(&h.board, ColumnId::Todo), ["2", "1"]);
    assert_eq!(h.store.order_of("2"), Some(0));
    assert_eq!(h.store.order_of("1"), Some(1));
}

#[tokio::test]
async fn mobile_and_desktop_renderings_are_one_column() {
    let mut h = harness(
        vec![task("a", TaskStatus::Done, 0), task("b", TaskStatus::Done, 1)],
        DropPolicy::default(),
    );

    let event = DropEvent::new(task("a", TaskStatus::Done, 0), "doneList-mobile-list", "doneList-list", 0, 1);
    let outcome = h.board.on_drop(event).await;

    let DropOutcome::Completed { kind, .. } = outcome else {
        panic!("expected completed drop, got {outcome:?}");
    };
    assert_eq!(kind, DropKind::Reorder { column: ColumnId::Done });
    assert!(h.store.updates().iter().all(|(_, p)| p.status.is_none()));
    assert_eq!(column_ids(&h.board, ColumnId::Done), ["b", "a"]);
}

#[tokio::test]
async fn dropping_in_place_writes_nothing() {
    let mut h = harness(
        vec![task("a", TaskStatus::Todo, 0), task("b", TaskStatus::Todo, 1)],
        DropPolicy::default(),
    );

    let event = DropEvent::new(task("b", TaskStatus::Todo, 1), "todoList", "todoList", 1, 1);
    let outcome = h.board.on_drop(event).await;

    assert!(matches!(outcome, DropOutcome::Unchanged(_)));
    assert_eq!(h.store.mutation_calls(), 0);
    assert!(drain(&mut h.toasts).is_empty());
}

// ---------------------------------------------------------------------------
// Cross-column transitions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cross_column_move_writes_exactly_one_update() {
    let mut h = harness(
        vec![
            task("t", TaskStatus::Todo, 0),
            task("u", TaskStatus::Todo, 1),
            task("p", TaskStatus::InProgress, 0),
        ],
        DropPolicy::default(),
    );

    let event = DropEvent::new(task("t", TaskStatus::Todo, 0), "todoList", "progressList", 0, 1);
    let outcome = h.board.on_drop(event).await;
    assert!(outcome.is_success());

    assert_eq!(
        h.store.updates(),
        [(TaskId::from("t"), TaskPatch::reposition(TaskStatus::InProgress, 1))]
    );
    assert_eq!(h.store.status_of("t"), Some(TaskStatus::InProgress));
    assert_eq!(h.store.order_of("t"), Some(1));
    assert_eq!(h.store.order_of("u"), Some(1));
    assert_eq!(h.store.order_of("p"), Some(0));

    assert_eq!(column_ids(&h.board, ColumnId::Todo), ["u"]);
    assert_eq!(column_ids(&h.board, ColumnId::Progress), ["p", "t"]);
    let toasts = drain(&mut h.toasts);
    assert_eq!(toasts[0].message, MSG_MOVE_OK);
}

#[tokio::test]
async fn cross_column_move_keeps_destination_dense() {
    let mut h = harness(
        vec![
            task("t", TaskStatus::Todo, 0),
            task("d0", TaskStatus::Done, 0),
            task("d1", TaskStatus::Done, 1),
            task("d2", TaskStatus::Done, 2),
        ],
        DropPolicy::default(),
    );

    let event = DropEvent::new(task("t", TaskStatus::Todo, 0), "todoList", "doneList", 0, 1);
    h.board.on_drop(event).await;

    assert_eq!(column_ids(&h.board, ColumnId::Done), ["d0", "t", "d1", "d2"]);
    for (id, order) in [("d0", 0), ("t", 1), ("d1", 2), ("d2", 3)] {
        assert_eq!(h.store.order_of(id), Some(order), "stored order of {id}");
    }
    assert_eq!(h.store.updates().len(), 3);
}

#[tokio::test]
async fn preserve_policy_leaves_destination_alone() {
    let mut h = harness(
        vec![
            task("t", TaskStatus::Todo, 0),
            task("d0", TaskStatus::Done, 0),
            task("d1", TaskStatus::Done, 1),
        ],
        DropPolicy {
            renumber_destination: false,
        },
    );

    let event = DropEvent::new(task("t", TaskStatus::Todo, 0), "todoList", "doneList", 0, 1);
    h.board.on_drop(event).await;

    assert_eq!(h.store.updates().len(), 1);
    assert_eq!(h.store.order_of("d1"), Some(1));
    assert_eq!(h.store.order_of("t"), Some(1));
}

#[tokio::test]
async fn unknown_target_aborts_silently() {
    let mut h = harness(vec![task("t", TaskStatus::Todo, 0)], DropPolicy::default());

    let event = DropEvent::new(task("t", TaskStatus::Todo, 0), "todoList", "archiveList", 0, 0);
    let outcome = h.board.on_drop(event).await;

    assert!(matches!(
        outcome,
        DropOutcome::Rejected(DropRejection::InvalidTarget(_))
    ));
    assert_eq!(h.store.mutation_calls(), 0);
    assert!(drain(&mut h.toasts).is_empty());
    assert_eq!(column_ids(&h.board, ColumnId::Todo), ["t"]);
}

#[tokio::test]
async fn unsaved_task_is_ignored() {
    let mut h = harness(vec![task("t", TaskStatus::Todo, 0)], DropPolicy::default());

    let event = DropEvent::new(Task::new("draft", TaskStatus::Todo), "todoList", "doneList", 0, 0);
    let outcome = h.board.on_drop(event).await;

    assert!(matches!(
        outcome,
        DropOutcome::Rejected(DropRejection::MissingTaskId)
    ));
    assert_eq!(h.store.mutation_calls(), 0);
    assert!(drain(&mut h.toasts).is_empty());
}

// ---------------------------------------------------------------------------
// Permission gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn without_edit_permission_nothing_is_written() {
    let mut h = harness(
        vec![task("a", TaskStatus::Todo, 0), task("b", TaskStatus::Todo, 1)],
        DropPolicy::default(),
    );
    h.permissions.set_edit(false);
    let before = h.board.columns().to_vec();

    let same = DropEvent::new(task("a", TaskStatus::Todo, 0), "todoList", "todoList", 0, 1);
    let cross = DropEvent::new(task("a", TaskStatus::Todo, 0), "todoList", "doneList", 0, 0);
    for event in [same, cross] {
        let outcome = h.board.on_drop(event).await;
        assert!(matches!(
            outcome,
            DropOutcome::Rejected(DropRejection::PermissionDenied)
        ));
    }

    assert_eq!(h.store.mutation_calls(), 0);
    assert_eq!(h.board.columns(), before.as_slice());
    let toasts = drain(&mut h.toasts);
    assert_eq!(toasts.len(), 2);
    assert!(toasts.iter().all(|t| t.message == MSG_MOVE_DENIED));
    assert!(toasts.iter().all(|t| t.duration == Duration::from_millis(3000)));
}

#[tokio::test]
async fn permission_is_read_at_drop_time() {
    let mut h = harness(vec![task("a", TaskStatus::Todo, 0)], DropPolicy::default());
    h.permissions.set_edit(false);
    h.permissions.set_edit(true);

    let event = DropEvent::new(task("a", TaskStatus::Todo, 0), "todoList", "doneList", 0, 0);
    assert!(h.board.on_drop(event).await.is_success());
}

// ---------------------------------------------------------------------------
// Persistence failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_move_reports_and_restores_view() {
    let mut h = harness(vec![task("t", TaskStatus::Todo, 0)], DropPolicy::default());
    h.store.fail_updates_for("t");

    let event = DropEvent::new(task("t", TaskStatus::Todo, 0), "todoList", "feedbackList", 0, 0);
    let outcome = h.board.on_drop(event).await;

    assert!(!outcome.is_success());
    assert_eq!(column_ids(&h.board, ColumnId::Todo), ["t"]);
    assert!(h.board.columns()[ColumnId::Feedback.index()].tasks.is_empty());
    assert_eq!(h.store.status_of("t"), Some(TaskStatus::Todo));

    let toasts = drain(&mut h.toasts);
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, MSG_MOVE_FAILED);
    assert_eq!(toasts[0].duration, Duration::from_millis(3000));
}

#[tokio::test]
async fn partially_failed_reorder_shows_what_the_store_accepted() {
    let mut h = harness(
        vec![
            task("a", TaskStatus::Todo, 0),
            task("b", TaskStatus::Todo, 1),
            task("c", TaskStatus::Todo, 2),
        ],
        DropPolicy::default(),
    );
    h.store.fail_updates_for("a");

    let event = DropEvent::new(task("c", TaskStatus::Todo, 2), "todoList", "todoList", 2, 0);
    let outcome = h.board.on_drop(event).await;

    let DropOutcome::Completed { report, .. } = outcome else {
        panic!("expected completed drop");
    };
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.applied.len(), 2);
    assert_eq!(h.store.order_of("a"), Some(0));
    assert_eq!(h.store.order_of("c"), Some(0));

    let local: Vec<_> = h.board.tasks().iter().map(|t| (t.title.clone(), t.order)).collect();
    let stored: Vec<_> = h.store.inner.snapshot().iter().map(|t| (t.title.clone(), t.order)).collect();
    assert_eq!(local, stored);
    assert_eq!(drain(&mut h.toasts)[0].message, MSG_REORDER_FAILED);
}

// ---------------------------------------------------------------------------
// Drops on a filtered board
// ---------------------------------------------------------------------------

#[tokio::test]
async fn filtered_drop_keeps_hidden_tasks_in_place() {
    let mut h = harness(
        vec![
            Task::new("apple", TaskStatus::Todo).with_id("a").with_order(0),
            Task::new("hidden", TaskStatus::Todo).with_id("h").with_order(1),
            Task::new("apricot", TaskStatus::Todo).with_id("b").with_order(2),
        ],
        DropPolicy::default(),
    );
    h.board.apply_filter("ap");
    assert_eq!(h.board.visible_columns()[0].tasks.len(), 2);

    let dragged = h.board.visible_columns()[0].tasks[1].clone();
    let event = DropEvent::new(dragged, "todoList", "todoList", 1, 0);
    h.board.on_drop(event).await;

    assert_eq!(column_ids(&h.board, ColumnId::Todo), ["b", "a", "h"]);
    assert_eq!(
        column_orders(&h.board, ColumnId::Todo),
        [Some(0), Some(1), Some(2)]
    );
    let visible: Vec<_> = h.board.visible_columns()[0]
        .tasks
        .iter()
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(visible, ["apricot", "apple"]);
    assert_eq!(h.board.search_term(), "ap");
}

#[tokio::test]
async fn filtered_transfer_lands_after_last_visible_task() {
    let mut h = harness(
        vec![
            Task::new("apple", TaskStatus::Todo).with_id("a").with_order(0),
            Task::new("ape", TaskStatus::Done).with_id("d0").with_order(0),
            Task::new("zebra", TaskStatus::Done).with_id("d1").with_order(1),
        ],
        DropPolicy::default(),
    );
    h.board.apply_filter("ap");

    let dragged = h.board.visible_columns()[0].tasks[0].clone();
    let event = DropEvent::new(dragged, "todoList", "doneList", 0, 1);
    h.board.on_drop(event).await;

    assert_eq!(column_ids(&h.board, ColumnId::Done), ["d0", "a", "d1"]);
    assert_eq!(h.store.order_of("d1"), Some(2));
}
