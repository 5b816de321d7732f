// ─── Progress Channel ───
// One-way event stream from the sync core to whatever UI is attached.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

/// Event emitted to the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Free-text status line.
    Status { message: String },
    /// Structured `{type, task, total, current}` tuple.
    Progress {
        #[serde(rename = "type")]
        kind: String,
        task: String,
        total: u64,
        current: u64,
    },
}

/// Cheap, cloneable producer side of the progress channel.
///
/// A sink without a receiver only logs.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn status(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "packsync::status", "{}", message);
        self.emit(ProgressEvent::Status { message });
    }

    pub fn progress(&self, kind: &str, task: &str, current: u64, total: u64) {
        self.emit(ProgressEvent::Progress {
            kind: kind.to_string(),
            task: task.to_string(),
            total,
            current,
        });
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // A closed receiver just means nobody is watching anymore.
            let _ = sender.send(event);
        }
    }
}
