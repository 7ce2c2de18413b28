//! JSON document codec for task collections.
//!
//! Tasks are stored as JSON documents. A collection is encoded as a JSON
//! array of task documents, each carrying its `id`.

use serde_json::Value;

use crate::task::Task;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Encodes a single task document.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the task cannot be serialized.
pub fn encode_task(task: &Task) -> Result<String, CodecError> {
    Ok(serde_json::to_string(task)?)
}

/// Decodes a single task document.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the input is not a task document.
pub fn decode_task(json: &str) -> Result<Task, CodecError> {
    Ok(serde_json::from_str(json)?)
}

/// Encodes a task collection as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if any task cannot be serialized.
pub fn encode_tasks(tasks: &[Task]) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// Decodes a JSON array of task documents.
///
/// Blank input decodes as an empty collection. Elements that are not task
/// documents are skipped with a warning; the rest still load.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the input is not a JSON array.
pub fn decode_tasks(json: &str) -> Result<Vec<Task>, CodecError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let documents: Vec<Value> = serde_json::from_str(json)?;
    let total = documents.len();
    let tasks: Vec<Task> = documents
        .into_iter()
        .enumerate()
        .filter_map(|(index, document)| match serde_json::from_value(document) {
            Ok(task) => Some(task),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping undecodable task document");
                None
            }
        })
        .collect();
    if tasks.len() < total {
        tracing::warn!(loaded = tasks.len(), total, "task collection partially loaded");
    }
    Ok(tasks)
}
