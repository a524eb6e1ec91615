//! Interactive ownership of a live graph
//!
//! A [`GraphSession`] holds the editor's graph and runs executions on a
//! blocking worker so the owning task is never stalled by node processing.
//! At most one worker runs against the graph at a time: starting a new run
//! cancels the previous one and waits for it to stop first. While a worker
//! is active, edits are rejected with [`NodeEngineError::GraphBusy`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::artifact::Artifact;
use crate::error::{NodeEngineError, Result};
use crate::events::EventSink;
use crate::graph::Graph;
use crate::scheduler::{CancellationFlag, Scheduler};
use crate::types::NodeId;

type ExecutionResult = Result<Option<Arc<Artifact>>>;

/// A worker currently evaluating the graph
struct ActiveExecution {
    target: NodeId,
    cancel: CancellationFlag,
    handle: JoinHandle<ExecutionResult>,
}

/// Clears the busy flag when the worker finishes, panics included
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owner of a live graph and its (single) execution worker
pub struct GraphSession {
    graph: Arc<Mutex<Graph>>,
    busy: Arc<AtomicBool>,
    active: Option<ActiveExecution>,
}

impl GraphSession {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: Arc::new(Mutex::new(graph)),
            busy: Arc::new(AtomicBool::new(false)),
            active: None,
        }
    }

    /// Whether a worker currently holds the graph
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Apply an edit to the graph
    ///
    /// Fails with `GraphBusy` while an execution is in flight; edits are
    /// never interleaved with a run.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> Result<R> {
        if self.is_running() {
            return Err(NodeEngineError::GraphBusy);
        }
        let mut graph = self.graph.try_lock().ok_or(NodeEngineError::GraphBusy)?;
        Ok(f(&mut graph))
    }

    /// Read the graph, subject to the same exclusion as [`edit`](Self::edit)
    pub fn inspect<R>(&self, f: impl FnOnce(&Graph) -> R) -> Result<R> {
        if self.is_running() {
            return Err(NodeEngineError::GraphBusy);
        }
        let graph = self.graph.try_lock().ok_or(NodeEngineError::GraphBusy)?;
        Ok(f(&graph))
    }

    /// Start evaluating `target` on a blocking worker
    ///
    /// A run already in flight is cancelled and awaited before the new one
    /// is spawned. Returns the new run's cancellation flag.
    pub async fn start_execution(
        &mut self,
        target: NodeId,
        sink: Arc<dyn EventSink>,
    ) -> Result<CancellationFlag> {
        if let Some(previous) = self.active.take() {
            log::debug!("Cancelling execution towards {} before restarting", previous.target);
            previous.cancel.cancel();
            match previous.handle.await {
                Ok(Err(NodeEngineError::Cancelled)) | Ok(Ok(_)) => {}
                Ok(Err(e)) => log::debug!("Previous execution ended with error: {}", e),
                Err(e) => log::warn!("Previous execution worker panicked: {}", e),
            }
        }

        self.inspect(|graph| graph.require(target).map(|_| ()))??;

        let cancel = CancellationFlag::new();
        let scheduler = Scheduler::new(cancel.clone(), sink);
        let graph = self.graph.clone();

        self.busy.store(true, Ordering::SeqCst);
        let busy = BusyGuard(self.busy.clone());
        let handle = tokio::task::spawn_blocking(move || {
            let _busy = busy;
            let mut graph = graph.lock();
            scheduler.run(&mut graph, target)
        });

        self.active = Some(ActiveExecution {
            target,
            cancel: cancel.clone(),
            handle,
        });
        Ok(cancel)
    }

    /// Request cancellation of the running execution, if any
    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }

    /// Wait for the running execution to finish and return its outcome
    ///
    /// Returns `Ok(None)` when nothing was running.
    pub async fn wait(&mut self) -> ExecutionResult {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        match active.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(NodeEngineError::Cancelled),
            Err(e) => Err(NodeEngineError::processing("execution worker", e)),
        }
    }

    /// Evaluate `target` and wait for the result
    pub async fn execute(&mut self, target: NodeId, sink: Arc<dyn EventSink>) -> ExecutionResult {
        self.start_execution(target, sink).await?;
        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, Channels};
    use crate::descriptor::NodeMetadata;
    use crate::events::{ExecutionEvent, NullEventSink, VecEventSink};
    use crate::parameter::Parameters;
    use crate::registry::NodeRegistry;
    use crate::test_support::stub_registry;
    use crate::types::NodeCategory;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn chain_session() -> (GraphSession, NodeId, NodeId) {
        let (registry, _) = stub_registry();
        let mut graph = Graph::new(registry);
        let a = graph.add_node("Input").unwrap();
        let b = graph.add_node("Add").unwrap();
        let c = graph.add_node("Output").unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        (GraphSession::new(graph), b, c)
    }

    /// A source node that blocks until released
    fn gated_registry() -> (Arc<NodeRegistry>, std::sync::mpsc::Sender<()>, oneshot::Receiver<()>) {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let (entered_tx, entered_rx) = oneshot::channel::<()>();
        let release_rx = std::sync::Mutex::new(release_rx);
        let entered_tx = std::sync::Mutex::new(Some(entered_tx));

        let mut builder = NodeRegistry::builder();
        builder.register_shared(
            NodeMetadata::new("Slow", NodeCategory::Uncategorized).with_min_inputs(0),
            Arc::new(move |_: &[Arc<Artifact>], _: &Parameters| -> Result<Artifact> {
                if let Some(tx) = entered_tx.lock().unwrap().take() {
                    let _ = tx.send(());
                }
                let _ = release_rx.lock().unwrap().recv_timeout(Duration::from_secs(5));
                Ok(Artifact::filled(1, 1, Channels::Gray, 1))
            }),
        );
        builder.register_shared(
            NodeMetadata::new("Output", NodeCategory::InputOutput),
            Arc::new(|inputs: &[Arc<Artifact>], _: &Parameters| -> Result<Artifact> {
                Ok(inputs[0].as_ref().clone())
            }),
        );
        (Arc::new(builder.build()), release_tx, entered_rx)
    }

    #[tokio::test]
    async fn test_execute_off_thread() {
        let (mut session, _, out) = chain_session();
        let sink = Arc::new(VecEventSink::new());

        let artifact = session.execute(out, sink.clone()).await.unwrap().unwrap();
        assert_eq!(artifact.data()[0], 11);
        assert!(!session.is_running());
        assert!(matches!(sink.events().last(), Some(ExecutionEvent::Completed { .. })));

        let clean = session.inspect(|g| g.node(out).unwrap().is_fresh()).unwrap();
        assert!(clean);
    }

    #[tokio::test]
    async fn test_edit_between_runs() {
        let (mut session, add, out) = chain_session();
        session.execute(out, Arc::new(NullEventSink)).await.unwrap();

        let changed = session.edit(|g| g.set_parameter(add, "amount", 4i64)).unwrap().unwrap();
        assert!(changed);

        let artifact = session.execute(out, Arc::new(NullEventSink)).await.unwrap().unwrap();
        assert_eq!(artifact.data()[0], 14);
    }

    #[tokio::test]
    async fn test_edit_rejected_while_running() {
        let (registry, release, entered) = gated_registry();
        let mut graph = Graph::new(registry);
        let slow = graph.add_node("Slow").unwrap();
        let out = graph.add_node("Output").unwrap();
        graph.connect(slow, out).unwrap();
        let mut session = GraphSession::new(graph);

        session.start_execution(out, Arc::new(NullEventSink)).await.unwrap();
        entered.await.unwrap();

        assert!(session.is_running());
        let err = session.edit(|g| g.len()).unwrap_err();
        assert!(matches!(err, NodeEngineError::GraphBusy));

        release.send(()).unwrap();
        assert!(session.wait().await.unwrap().is_some());
        assert_eq!(session.edit(|g| g.len()).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_restart_waits_for_cancelled_run() {
        let (registry, release, entered) = gated_registry();
        let mut graph = Graph::new(registry);
        let slow = graph.add_node("Slow").unwrap();
        let out = graph.add_node("Output").unwrap();
        graph.connect(slow, out).unwrap();
        let mut session = GraphSession::new(graph);

        let first_sink = Arc::new(VecEventSink::new());
        let first = session.start_execution(out, first_sink.clone()).await.unwrap();
        entered.await.unwrap();

        // Slow runs to completion, the flag is observed before Output
        session.cancel();
        release.send(()).unwrap();

        let second_sink = Arc::new(VecEventSink::new());
        session.start_execution(out, second_sink.clone()).await.unwrap();
        assert!(first.is_cancelled());
        assert!(matches!(first_sink.events().last(), Some(ExecutionEvent::Cancelled)));

        let artifact = session.wait().await.unwrap();
        assert!(artifact.is_some());
        assert!(matches!(
            second_sink.events().first(),
            Some(ExecutionEvent::Started { total: 1, .. })
        ));
        assert!(matches!(second_sink.events().last(), Some(ExecutionEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let (mut session, _, _) = chain_session();
        let err = session
            .start_execution(NodeId::new(), Arc::new(NullEventSink))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeEngineError::UnknownNode(_)));
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_wait_without_run() {
        let (mut session, _, _) = chain_session();
        assert!(session.wait().await.unwrap().is_none());
    }
}
