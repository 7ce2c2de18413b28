//! Board controller: owns the task list and every view derived from it.
//!
//! The controller is the only owner of board state. Store emissions replace
//! the task list wholesale; drops, filters and task commands go through
//! [`BoardController`] methods or, when running as a task, through
//! [`BoardCommand`]s. After every change a [`BoardView`] snapshot is
//! published on a watch channel for the UI.
//!
//! While running, store calls are not awaited in line. The local change is
//! applied and published at once, the call is parked in an in-flight set,
//! and its result is folded back into the board when it settles. A store
//! call that never completes therefore stalls nothing but itself.
//!
//! # Architecture
//!
//! ```text
//! TaskStore ── watch<Vec<Task>> ──▶ BoardController ── watch<BoardView> ──▶ UI
//!     ▲                                  ▲   │
//!     └──── in-flight store calls ◀──────┼───┘
//! UI ──────────── BoardCommand ──────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use join_proto::column::ColumnId;
use join_proto::task::{Task, TaskId, TaskPatch, ValidationError};
use tokio::sync::{mpsc, watch};

use crate::columns::{self, Column};
use crate::dragdrop::{DragDropEngine, DropEvent, DropOutcome, DropPlan, PersistReport, map_visible_index};
use crate::filter;
use crate::highlight::HighlightRequest;
use crate::notify::{MSG_SUBTASK_FAILED, Notifier};
use crate::permission::Permissions;
use crate::store::{StoreError, TaskStore};
use crate::summary::BoardSummary;

/// How long shutdown waits for in-flight store calls before abandoning them.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors returned by controller task operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The required capability is not granted.
    #[error("permission denied: cannot {0} tasks")]
    PermissionDenied(&'static str),

    /// The task failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No task with this id is on the board.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The task has no subtask at this index.
    #[error("task {id} has no subtask {index}")]
    SubtaskOutOfRange {
        /// The task.
        id: TaskId,
        /// The requested index.
        index: usize,
    },
}

/// Commands accepted by [`BoardController::run`].
#[derive(Debug)]
pub enum BoardCommand {
    /// A completed drag gesture.
    Drop(DropEvent),
    /// Replace the search term.
    ApplyFilter(String),
    /// Recompute columns from the current task list.
    Refresh,
    /// Create a task.
    CreateTask(Task),
    /// Delete a task.
    DeleteTask(TaskId),
    /// Flip a subtask's `done` flag.
    ToggleSubtask {
        /// The task.
        id: TaskId,
        /// Subtask position.
        index: usize,
    },
    /// Stop the run loop.
    Shutdown,
}

/// Snapshot of what the UI should render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    /// Columns after the active filter.
    pub columns: Vec<Column>,
    /// Active search term, as entered.
    pub search_term: String,
    /// `true` iff every visible column is empty.
    pub no_tasks_found: bool,
    /// Counters over the whole task list.
    pub summary: BoardSummary,
    /// Tasks whose status matches no column.
    pub unrecognized: Vec<Task>,
}

/// A finished store call, carrying what is needed to fold it back in.
enum Settled {
    Drop {
        plan: DropPlan,
        report: PersistReport,
    },
    Create {
        task: Task,
        result: Result<TaskId, StoreError>,
    },
    Delete {
        id: TaskId,
        result: Result<(), StoreError>,
    },
    Toggle {
        id: TaskId,
        index: usize,
        done: bool,
        result: Result<(), StoreError>,
    },
}

type InFlight = FuturesUnordered<BoxFuture<'static, Settled>>;

/// Owner of the task list, derived columns and filtered view.
pub struct BoardController<S, N, P> {
    engine: Arc<DragDropEngine<S, N>>,
    permissions: P,
    tasks: Vec<Task>,
    columns: Vec<Column>,
    unrecognized: Vec<Task>,
    search_term: String,
    filtered: Vec<Column>,
    view_tx: watch::Sender<BoardView>,
}

impl<S: TaskStore, N: Notifier, P: Permissions> BoardController<S, N, P> {
    /// Creates an empty board.
    pub fn new(engine: DragDropEngine<S, N>, permissions: P) -> Self {
        let columns = columns::update_columns(&[]);
        let (view_tx, _rx) = watch::channel(BoardView::default());
        let controller = Self {
            engine: Arc::new(engine),
            permissions,
            tasks: Vec::new(),
            filtered: columns.clone(),
            columns,
            unrecognized: Vec::new(),
            search_term: String::new(),
            view_tx,
        };
        controller.publish();
        controller
    }

    /// Subscribes to board views.
    pub fn subscribe_view(&self) -> watch::Receiver<BoardView> {
        self.view_tx.subscribe()
    }

    /// The drag-drop engine.
    pub fn engine(&self) -> &DragDropEngine<S, N> {
        &self.engine
    }

    /// The authoritative task list.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// All four columns, unfiltered.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns after the active filter.
    pub fn visible_columns(&self) -> &[Column] {
        &self.filtered
    }

    /// Tasks whose status matches no column.
    pub fn unrecognized(&self) -> &[Task] {
        &self.unrecognized
    }

    /// Active search term.
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// `true` iff every visible column is empty.
    pub fn no_tasks_found(&self) -> bool {
        filter::no_tasks_found(&self.filtered)
    }

    /// Counters over the whole task list.
    pub fn summary(&self) -> BoardSummary {
        BoardSummary::from_tasks(&self.tasks)
    }

    /// Ids selected by a highlight request.
    pub fn highlight(&self, request: &HighlightRequest) -> Vec<TaskId> {
        request.resolve(&self.tasks)
    }

    /// Replaces the task list with a store emission.
    pub fn apply_snapshot(&mut self, tasks: Vec<Task>) {
        tracing::debug!(tasks = tasks.len(), "applying store snapshot");
        self.tasks = tasks;
        self.update_columns();
    }

    /// Recomputes columns from the task list and reapplies the filter.
    pub fn update_columns(&mut self) {
        let partition = columns::partition(&self.tasks);
        if !partition.unrecognized.is_empty() {
            tracing::warn!(
                count = partition.unrecognized.len(),
                "tasks with unrecognized status are not shown in any column"
            );
        }
        self.columns = partition.columns;
        self.unrecognized = partition.unrecognized;
        self.refilter();
        self.publish();
    }

    /// Sets the search term and narrows the visible columns.
    pub fn apply_filter(&mut self, term: &str) {
        self.search_term = term.to_string();
        self.refilter();
        self.publish();
    }

    fn is_filtered(&self) -> bool {
        filter::normalize_term(&self.search_term).is_some()
    }

    fn refilter(&mut self) {
        self.filtered = filter::filter_columns(&self.columns, &self.search_term);
    }

    fn publish(&self) {
        let view = BoardView {
            columns: self.filtered.clone(),
            search_term: self.search_term.clone(),
            no_tasks_found: self.no_tasks_found(),
            summary: self.summary(),
            unrecognized: self.unrecognized.clone(),
        };
        self.view_tx.send_replace(view);
    }

    /// Handles a completed drag gesture.
    ///
    /// Indices in `event` refer to the visible columns. The drop is shown
    /// immediately; once the store has settled, only the patches it
    /// accepted remain visible.
    pub async fn on_drop(&mut self, event: DropEvent) -> DropOutcome {
        let plan = match self.begin_drop(event) {
            Ok(plan) => plan,
            Err(outcome) => return outcome,
        };
        let report = self.engine.persist(&plan).await;
        self.finish_drop(plan, report)
    }

    /// Plans a drop and shows it. Returns the final outcome directly when
    /// there is nothing to persist.
    fn begin_drop(&mut self, mut event: DropEvent) -> Result<DropPlan, DropOutcome> {
        if self.is_filtered() {
            event.current_index = self.full_index(&event);
        }

        let can_edit = self.permissions.can_edit();
        let plan = self
            .engine
            .plan(&mut self.columns, &event, can_edit)
            .map_err(DropOutcome::Rejected)?;
        if plan.is_noop() {
            self.update_columns();
            return Err(DropOutcome::Unchanged(plan.kind));
        }
        self.refilter();
        self.publish();
        Ok(plan)
    }

    /// Folds the patches the store accepted into the task list.
    fn finish_drop(&mut self, plan: DropPlan, report: PersistReport) -> DropOutcome {
        for (id, patch) in &report.applied {
            if let Some(task) = self.tasks.iter_mut().find(|t| t.has_id(id)) {
                patch.apply_to(task);
            }
        }
        self.update_columns();

        DropOutcome::Completed {
            kind: plan.kind,
            report,
        }
    }

    /// Maps a drop index on the filtered target column onto the full one.
    fn full_index(&self, event: &DropEvent) -> usize {
        let (Some(target), Some(id)) = (ColumnId::from_list_id(&event.target_list), &event.task.id)
        else {
            return event.current_index;
        };
        match (
            columns::column(&self.columns, target),
            columns::column(&self.filtered, target),
        ) {
            (Some(full), Some(visible)) => {
                map_visible_index(&full.tasks, &visible.tasks, event.current_index, id)
            }
            _ => event.current_index,
        }
    }

    /// Validates and creates a task, returning the id the store assigned.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PermissionDenied`] without the create
    /// capability, [`BoardError::Validation`] for an invalid task, or
    /// [`BoardError::Store`] if the store rejects it.
    pub async fn create_task(&mut self, task: Task) -> Result<TaskId, BoardError> {
        self.create_task_on(task, Local::now().date_naive()).await
    }

    /// Like [`Self::create_task`], validating due dates against `today`.
    ///
    /// # Errors
    ///
    /// See [`Self::create_task`].
    pub async fn create_task_on(&mut self, task: Task, today: NaiveDate) -> Result<TaskId, BoardError> {
        let task = self.begin_create(task, today)?;
        let result = self.engine.store().create(task.clone()).await;
        self.finish_create(task, result)
    }

    fn begin_create(&self, mut task: Task, today: NaiveDate) -> Result<Task, BoardError> {
        if !self.permissions.can_create() {
            return Err(BoardError::PermissionDenied("create"));
        }
        task.validate(today)?;
        task.id = None;
        Ok(task)
    }

    fn finish_create(
        &mut self,
        mut task: Task,
        result: Result<TaskId, StoreError>,
    ) -> Result<TaskId, BoardError> {
        let id = result?;
        tracing::info!(task_id = %id, title = %task.title, "task created");
        if !self.tasks.iter().any(|t| t.has_id(&id)) {
            task.id = Some(id.clone());
            self.tasks.push(task);
            self.update_columns();
        }
        Ok(id)
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PermissionDenied`] without the delete
    /// capability, or [`BoardError::Store`] if the store rejects it.
    pub async fn delete_task(&mut self, id: &TaskId) -> Result<(), BoardError> {
        self.begin_delete()?;
        let result = self.engine.store().delete(id).await;
        self.finish_delete(id, result)
    }

    fn begin_delete(&self) -> Result<(), BoardError> {
        if self.permissions.can_delete() {
            Ok(())
        } else {
            Err(BoardError::PermissionDenied("delete"))
        }
    }

    fn finish_delete(&mut self, id: &TaskId, result: Result<(), StoreError>) -> Result<(), BoardError> {
        result?;
        tracing::info!(task_id = %id, "task deleted");
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.has_id(id));
        if self.tasks.len() != before {
            self.update_columns();
        }
        Ok(())
    }

    /// Flips a subtask's `done` flag and returns the new value.
    ///
    /// The change is shown immediately and reverted if the store rejects
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PermissionDenied`] without the edit
    /// capability, [`BoardError::TaskNotFound`] or
    /// [`BoardError::SubtaskOutOfRange`] for a bad target, or
    /// [`BoardError::Store`] if the store rejects the update.
    pub async fn toggle_subtask(&mut self, id: &TaskId, index: usize) -> Result<bool, BoardError> {
        let (patch, done) = self.begin_toggle(id, index)?;
        let result = self.engine.store().update(id, patch).await;
        self.finish_toggle(id, index, done, result)
    }

    fn begin_toggle(&mut self, id: &TaskId, index: usize) -> Result<(TaskPatch, bool), BoardError> {
        if !self.permissions.can_edit() {
            return Err(BoardError::PermissionDenied("edit"));
        }
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.has_id(id))
            .ok_or_else(|| BoardError::TaskNotFound(id.clone()))?;
        let done = task
            .toggle_subtask(index)
            .ok_or_else(|| BoardError::SubtaskOutOfRange {
                id: id.clone(),
                index,
            })?;
        let patch = TaskPatch::subtasks(task.subtasks.clone());
        self.update_columns();
        Ok((patch, done))
    }

    fn finish_toggle(
        &mut self,
        id: &TaskId,
        index: usize,
        done: bool,
        result: Result<(), StoreError>,
    ) -> Result<bool, BoardError> {
        let Err(e) = result else {
            return Ok(done);
        };
        tracing::warn!(task_id = %id, index, error = %e, "subtask update failed, reverting");
        // A snapshot may have replaced the task meanwhile; restore the value
        // rather than flipping again.
        if let Some(subtask) = self
            .tasks
            .iter_mut()
            .find(|t| t.has_id(id))
            .and_then(|t| t.subtasks.get_mut(index))
        {
            subtask.done = !done;
        }
        self.update_columns();
        self.engine
            .notifier()
            .notify(MSG_SUBTASK_FAILED, self.engine.durations().failure);
        Err(e.into())
    }

    fn settle(&mut self, settled: Settled) {
        match settled {
            Settled::Drop { plan, report } => {
                let outcome = self.finish_drop(plan, report);
                tracing::debug!(?outcome, "drop settled");
            }
            Settled::Create { task, result } => {
                if let Err(e) = self.finish_create(task, result) {
                    tracing::warn!(error = %e, "create task failed");
                }
            }
            Settled::Delete { id, result } => {
                if let Err(e) = self.finish_delete(&id, result) {
                    tracing::warn!(task_id = %id, error = %e, "delete task failed");
                }
            }
            Settled::Toggle {
                id,
                index,
                done,
                result,
            } => {
                if let Err(e) = self.finish_toggle(&id, index, done, result) {
                    tracing::warn!(task_id = %id, index, error = %e, "toggle subtask failed");
                }
            }
        }
    }
}

impl<S, N, P> BoardController<S, N, P>
where
    S: TaskStore + 'static,
    N: Notifier + 'static,
    P: Permissions,
{
    /// Applies the local part of a command and returns the store call it
    /// still needs, if any.
    fn dispatch(&mut self, command: BoardCommand) -> Option<BoxFuture<'static, Settled>> {
        let engine = Arc::clone(&self.engine);
        match command {
            BoardCommand::Drop(event) => match self.begin_drop(event) {
                Ok(plan) => Some(
                    async move {
                        let report = engine.persist(&plan).await;
                        Settled::Drop { plan, report }
                    }
                    .boxed(),
                ),
                Err(outcome) => {
                    tracing::debug!(?outcome, "drop handled");
                    None
                }
            },
            BoardCommand::ApplyFilter(term) => {
                self.apply_filter(&term);
                None
            }
            BoardCommand::Refresh => {
                self.update_columns();
                None
            }
            BoardCommand::CreateTask(task) => match self.begin_create(task, Local::now().date_naive()) {
                Ok(task) => Some(
                    async move {
                        let result = engine.store().create(task.clone()).await;
                        Settled::Create { task, result }
                    }
                    .boxed(),
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "create task failed");
                    None
                }
            },
            BoardCommand::DeleteTask(id) => match self.begin_delete() {
                Ok(()) => Some(
                    async move {
                        let result = engine.store().delete(&id).await;
                        Settled::Delete { id, result }
                    }
                    .boxed(),
                ),
                Err(e) => {
                    tracing::warn!(task_id = %id, error = %e, "delete task failed");
                    None
                }
            },
            BoardCommand::ToggleSubtask { id, index } => match self.begin_toggle(&id, index) {
                Ok((patch, done)) => Some(
                    async move {
                        let result = engine.store().update(&id, patch).await;
                        Settled::Toggle {
                            id,
                            index,
                            done,
                            result,
                        }
                    }
                    .boxed(),
                ),
                Err(e) => {
                    tracing::warn!(task_id = %id, index, error = %e, "toggle subtask failed");
                    None
                }
            },
            BoardCommand::Shutdown => None,
        }
    }

    /// Executes one command and waits for its store call.
    pub async fn handle_command(&mut self, command: BoardCommand) {
        if let Some(call) = self.dispatch(command) {
            let settled = call.await;
            self.settle(settled);
        }
    }

    /// Runs the board until [`BoardCommand::Shutdown`], the command channel
    /// closes, or the store subscription ends.
    ///
    /// Store calls run concurrently with the loop. On shutdown, calls still
    /// in flight get [`SHUTDOWN_GRACE`] to settle. Returns the controller so
    /// callers can inspect the final state.
    pub async fn run(mut self, mut commands: mpsc::Receiver<BoardCommand>) -> Self {
        let mut subscription = self.engine.store().subscribe();
        let initial = subscription.borrow_and_update().clone();
        self.apply_snapshot(initial);
        tracing::info!(tasks = self.tasks.len(), "board controller started");

        let mut in_flight = InFlight::new();
        loop {
            tokio::select! {
                changed = subscription.changed() => {
                    if changed.is_err() {
                        tracing::info!("task store closed");
                        break;
                    }
                    let tasks = subscription.borrow_and_update().clone();
                    self.apply_snapshot(tasks);
                }
                Some(settled) = in_flight.next(), if !in_flight.is_empty() => self.settle(settled),
                command = commands.recv() => match command {
                    None | Some(BoardCommand::Shutdown) => {
                        tracing::info!("board controller shutting down");
                        break;
                    }
                    Some(command) => {
                        if let Some(call) = self.dispatch(command) {
                            in_flight.push(call);
                            tracing::trace!(pending = in_flight.len(), "store call started");
                        }
                    }
                },
            }
        }

        self.drain(in_flight).await;
        self
    }

    async fn drain(&mut self, mut in_flight: InFlight) {
        if in_flight.is_empty() {
            return;
        }
        tracing::debug!(pending = in_flight.len(), "waiting for in-flight store calls");
        let deadline = tokio::time::sleep(SHUTDOWN_GRACE);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                settled = in_flight.next() => match settled {
                    Some(settled) => self.settle(settled),
                    None => break,
                },
                () = &mut deadline => {
                    tracing::warn!(pending = in_flight.len(), "abandoning in-flight store calls");
                    break;
                }
            }
        }
    }
}
