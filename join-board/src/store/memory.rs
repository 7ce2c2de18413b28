//! In-memory realtime task store.
//!
//! [`InMemoryTaskStore`] is a cheaply cloneable handle over a shared
//! document map. Every mutation pushes the whole collection, ordered by id,
//! through a [`tokio::sync::watch`] channel to all subscribers.

use std::collections::BTreeMap;
use std::sync::Arc;

use join_proto::task::{Task, TaskId, TaskPatch};
use parking_lot::RwLock;
use tokio::sync::watch;

use super::{StoreError, TaskStore};

/// Shared state behind every clone of the store.
struct Inner {
    docs: RwLock<BTreeMap<TaskId, Task>>,
    tx: watch::Sender<Vec<Task>>,
}

/// In-process task collection with push notifications.
#[derive(Clone)]
pub struct InMemoryTaskStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                docs: RwLock::new(BTreeMap::new()),
                tx,
            }),
        }
    }

    /// Creates a store seeded with `tasks`.
    ///
    /// Tasks without an id are given a generated one.
    #[must_use]
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let store = Self::new();
        {
            let mut docs = store.inner.docs.write();
            for mut task in tasks {
                let id = task.id.clone().unwrap_or_else(TaskId::generate);
                task.id = Some(id.clone());
                docs.insert(id, task);
            }
        }
        store.publish();
        store
    }

    /// Returns the current collection ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.inner.docs.read().values().cloned().collect()
    }

    /// Returns a single task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.inner.docs.read().get(id).cloned()
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.docs.read().len()
    }

    /// Returns `true` if the store holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.docs.read().is_empty()
    }

    /// Inserts a task under its own id without emitting, returning the id.
    pub(crate) fn insert_silently(&self, mut task: Task) -> TaskId {
        let id = task.id.clone().unwrap_or_else(TaskId::generate);
        task.id = Some(id.clone());
        self.inner.docs.write().insert(id.clone(), task);
        id
    }

    /// Removes a task without emitting. Returns whether it was present.
    pub(crate) fn remove_silently(&self, id: &TaskId) -> bool {
        self.inner.docs.write().remove(id).is_some()
    }

    /// Pushes the current collection to all subscribers.
    pub(crate) fn publish(&self) {
        let snapshot = self.snapshot();
        tracing::trace!(tasks = snapshot.len(), "publishing task collection");
        self.inner.tx.send_replace(snapshot);
    }

    pub(crate) fn create_now(&self, mut task: Task) -> TaskId {
        let id = TaskId::generate();
        task.id = Some(id.clone());
        self.inner.docs.write().insert(id.clone(), task);
        tracing::debug!(task_id = %id, "task created");
        self.publish();
        id
    }

    pub(crate) fn update_now(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        {
            let mut docs = self.inner.docs.write();
            let task = docs
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            patch.apply_to(task);
        }
        tracing::debug!(task_id = %id, ?patch, "task updated");
        self.publish();
        Ok(())
    }

    pub(crate) fn delete_now(&self, id: &TaskId) -> Result<(), StoreError> {
        let removed = self.inner.docs.write().remove(id);
        if removed.is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        tracing::debug!(task_id = %id, "task deleted");
        self.publish();
        Ok(())
    }
}

impl TaskStore for InMemoryTaskStore {
    fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.inner.tx.subscribe()
    }

    async fn create(&self, task: Task) -> Result<TaskId, StoreError> {
        Ok(self.create_now(task))
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        self.update_now(id, &patch)
    }

    async fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        self.delete_now(id)
    }
}
