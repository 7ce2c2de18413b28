//! Transient user notifications ("toasts").
//!
//! The board never waits on a notification: [`Notifier::notify`] is
//! synchronous and must not block. [`ChannelNotifier`] hands toasts to a
//! UI task over a bounded channel; [`LogNotifier`] writes them to the log.

use std::time::Duration;

use tokio::sync::mpsc;

/// Shown when a drop is attempted without edit permission.
pub const MSG_MOVE_DENIED: &str = "You do not have permission to move tasks";
/// Shown after a cross-column move persisted.
pub const MSG_MOVE_OK: &str = "Task moved successfully!";
/// Shown when a cross-column move could not be persisted.
pub const MSG_MOVE_FAILED: &str = "Failed to move task. Please try again.";
/// Shown after a same-column reorder persisted.
pub const MSG_REORDER_OK: &str = "Tasks reordered successfully!";
/// Shown when a same-column reorder could not be persisted.
pub const MSG_REORDER_FAILED: &str = "Failed to reorder tasks.";
/// Shown when a subtask toggle could not be persisted.
pub const MSG_SUBTASK_FAILED: &str = "Failed to update subtask.";

/// A single toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Text shown to the user.
    pub message: String,
    /// How long the toast stays visible.
    pub duration: Duration,
}

/// How long success and failure toasts stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationDurations {
    /// Duration of success toasts.
    pub success: Duration,
    /// Duration of failure and permission toasts.
    pub failure: Duration,
}

impl Default for NotificationDurations {
    fn default() -> Self {
        Self {
            success: Duration::from_millis(2000),
            failure: Duration::from_millis(3000),
        }
    }
}

/// Fire-and-forget notification sink.
pub trait Notifier: Send + Sync {
    /// Shows `message` for `duration`. Must return immediately.
    fn notify(&self, message: &str, duration: Duration);
}

/// Forwards notifications into a bounded channel.
///
/// A full or closed channel drops the toast.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiver the UI drains.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str, duration: Duration) {
        let notification = Notification {
            message: message.to_string(),
            duration,
        };
        if let Err(e) = self.tx.try_send(notification) {
            tracing::warn!(message, error = %e, "dropping notification");
        }
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, duration: Duration) {
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = duration.as_millis() as u64;
        tracing::info!(duration_ms, "{message}");
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, message: &str, duration: Duration) {
        (**self).notify(message, duration);
    }
}
