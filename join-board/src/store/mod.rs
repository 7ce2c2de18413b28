//! Task store abstraction for the board.
//!
//! Defines the [`TaskStore`] trait: a realtime collection of task documents
//! with CRUD operations and a push subscription that re-emits the full
//! collection after every change. Concrete implementations:
//! - [`memory::InMemoryTaskStore`]: shared in-process collection
//! - [`file::JsonFileStore`]: in-process collection mirrored to a JSON file

pub mod file;
pub mod memory;

use join_proto::codec::CodecError;
use join_proto::task::{Task, TaskId, TaskPatch};
use tokio::sync::watch;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document exists with the given id.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The store cannot be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the backing file failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing data could not be encoded or decoded.
    #[error("store codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Realtime task collection.
///
/// Every successful mutation results in a new emission of the full task
/// list on all receivers returned by [`TaskStore::subscribe`]. Receivers
/// always observe the latest collection; intermediate emissions may be
/// coalesced.
pub trait TaskStore: Send + Sync {
    /// Subscribe to the full task collection.
    ///
    /// The receiver starts with the current collection marked as seen.
    fn subscribe(&self) -> watch::Receiver<Vec<Task>>;

    /// Persist a new task and return the id the store assigned.
    ///
    /// An id already present on `task` is ignored.
    fn create(
        &self,
        task: Task,
    ) -> impl std::future::Future<Output = Result<TaskId, StoreError>> + Send;

    /// Apply a partial update to an existing task.
    fn update(
        &self,
        id: &TaskId,
        patch: TaskPatch,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Remove a task.
    fn delete(&self, id: &TaskId)
    -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
