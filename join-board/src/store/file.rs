//! JSON file backed task store.
//!
//! [`JsonFileStore`] keeps the collection in an [`InMemoryTaskStore`] and
//! rewrites the whole file on each mutation. A mutation is staged on a copy
//! of the collection and only committed to memory, and pushed to
//! subscribers, once the file write has succeeded. Writes go to a sibling
//! temporary file that is then renamed over the target, so a crash never
//! leaves a half-written collection behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use join_proto::codec;
use join_proto::task::{Task, TaskId, TaskPatch};
use tokio::sync::{Mutex, watch};

use super::memory::InMemoryTaskStore;
use super::{StoreError, TaskStore};

/// Task store persisted as a JSON array on disk.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    memory: InMemoryTaskStore,
    /// Held across stage, write and commit so mutations never interleave.
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file opens as an empty board.
    ///
    /// Documents without an id, or sharing an id with an earlier document,
    /// are given a fresh one and the file is rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read,
    /// or [`StoreError::Codec`] if it is not a task collection.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tasks = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => codec::decode_tasks(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "task file not found, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let memory = InMemoryTaskStore::new();
        let mut seen = HashSet::new();
        let mut assigned = false;
        for mut task in tasks {
            if let Some(id) = &task.id
                && !seen.insert(id.clone())
            {
                let fresh = TaskId::generate();
                tracing::warn!(duplicate = %id, task_id = %fresh, "duplicate task id in file, reassigning");
                task.id = Some(fresh);
                assigned = true;
            }
            assigned |= task.id.is_none();
            let id = memory.insert_silently(task);
            seen.insert(id);
        }
        memory.publish();
        tracing::info!(path = %path.display(), tasks = memory.len(), "task file loaded");

        let store = Self {
            path,
            memory,
            write_lock: Arc::new(Mutex::new(())),
        };
        if assigned {
            store.flush().await?;
        }
        Ok(store)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current collection ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.memory.snapshot()
    }

    /// Writes the current collection to disk.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Codec`] if the write
    /// fails.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_file(&self.memory.snapshot()).await
    }

    /// Writes `tasks` to disk. Callers hold `write_lock`.
    async fn write_file(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let json = codec::encode_tasks(tasks)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), tasks = tasks.len(), "task file written");
        Ok(())
    }
}

impl TaskStore for JsonFileStore {
    fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.memory.subscribe()
    }

    async fn create(&self, mut task: Task) -> Result<TaskId, StoreError> {
        let _guard = self.write_lock.lock().await;
        let id = TaskId::generate();
        task.id = Some(id.clone());

        let mut staged = self.memory.snapshot();
        staged.push(task.clone());
        self.write_file(&staged).await?;

        self.memory.insert_silently(task);
        self.memory.publish();
        tracing::debug!(task_id = %id, "task created");
        Ok(id)
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut task = self
            .memory
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply_to(&mut task);

        let staged: Vec<Task> = self
            .memory
            .snapshot()
            .into_iter()
            .map(|t| if t.has_id(id) { task.clone() } else { t })
            .collect();
        self.write_file(&staged).await?;

        self.memory.insert_silently(task);
        self.memory.publish();
        tracing::debug!(task_id = %id, ?patch, "task updated");
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if self.memory.get(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }

        let staged: Vec<Task> = self
            .memory
            .snapshot()
            .into_iter()
            .filter(|t| !t.has_id(id))
            .collect();
        self.write_file(&staged).await?;

        self.memory.remove_silently(id);
        self.memory.publish();
        tracing::debug!(task_id = %id, "task deleted");
        Ok(())
    }
}
