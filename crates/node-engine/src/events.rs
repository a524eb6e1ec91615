//! Event types for streaming execution progress
//!
//! Events are sent from the execution worker (or the batch runner) back to
//! whoever owns the graph, to report progress, skipped branches, the
//! terminal outcome and per-item batch results.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::artifact::Artifact;
use crate::types::NodeId;

/// Trait for sending execution events
///
/// This abstracts over the transport mechanism (channel, collector, logger)
/// so the scheduler can be driven from a CLI, a test or an editor.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: ExecutionEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted during graph or batch execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Execution towards `target` started with `total` stale nodes to compute
    Started { target: NodeId, total: usize },

    /// A node finished; `step` counts from 1
    Progress {
        node_id: NodeId,
        label: String,
        step: usize,
        total: usize,
    },

    /// A node was skipped because an upstream artifact is missing
    NodeSkipped { node_id: NodeId, node_type: String },

    /// Terminal success; `artifact` is `None` when the target was skipped
    Completed {
        target: NodeId,
        artifact: Option<Arc<Artifact>>,
    },

    /// Terminal failure of the node that raised it
    Failed {
        node_id: NodeId,
        node_type: String,
        error: String,
    },

    /// Terminal cancellation observed between nodes or batch items
    Cancelled,

    /// A batch item is about to run; `index` counts from 1
    BatchItemStarted {
        index: usize,
        total: usize,
        name: String,
    },

    /// A batch item produced an output file
    BatchItemCompleted {
        index: usize,
        output_path: PathBuf,
        artifact: Arc<Artifact>,
    },

    /// A batch item failed; the batch carries on
    BatchItemFailed {
        index: usize,
        item: String,
        error: String,
    },

    /// The batch ended, either exhausted or stopped early
    BatchFinished {
        completed: usize,
        failed: usize,
        stopped: bool,
    },
}

impl ExecutionEvent {
    /// Whether this event ends a single-target execution
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled
        )
    }
}

/// Send an event, logging rather than failing when the receiver is gone
pub(crate) fn emit(sink: &dyn EventSink, event: ExecutionEvent) {
    if let Err(e) = sink.send(event) {
        log::debug!("Dropping execution event: {}", e);
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: ExecutionEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: ExecutionEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Forwards events over an unbounded tokio channel
///
/// The worker side never blocks; the owner awaits `recv()` on the other
/// half.
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: ExecutionEvent) -> Result<(), EventError> {
        self.tx.send(event).map_err(|_| EventError::channel_closed())
    }
}
