//! Graph evaluation
//!
//! Two ways to produce the artifact of a target node:
//!
//! - [`Graph::execute`] is the memoized recursive evaluation. Clean cached
//!   nodes are returned immediately without visiting their ancestors, so
//!   only the stale subtree behind the target is ever recomputed.
//! - [`Scheduler::run`] first computes the ordered list of stale ancestors
//!   and then evaluates them one at a time, emitting progress events and
//!   polling a [`CancellationFlag`] between nodes.
//!
//! A node whose required inputs did not all produce an artifact is skipped:
//! it stays dirty, yields `None`, and only its own branch is affected.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::artifact::Artifact;
use crate::error::{NodeEngineError, Result};
use crate::events::{emit, EventSink, ExecutionEvent};
use crate::graph::Graph;
use crate::types::NodeId;

/// Cooperative cancellation shared between an owner and its worker
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Graph {
    /// Evaluate `target`, recomputing only what is stale
    ///
    /// Returns `Ok(None)` when some required upstream artifact is missing.
    /// A processing failure leaves the failing node dirty and is returned
    /// as the error; nodes computed before it keep their caches.
    pub fn execute(&mut self, target: NodeId) -> Result<Option<Arc<Artifact>>> {
        let node = self.require(target)?;
        if let (false, Some(cached)) = (node.is_dirty(), node.cached()) {
            return Ok(Some(cached.clone()));
        }

        let upstream = node.inputs().to_vec();
        let mut inputs = Vec::with_capacity(upstream.len());
        for id in upstream {
            inputs.push(self.execute(id)?);
        }
        self.process_node(target, inputs)
    }

    /// Nodes that must be recomputed to produce `target`, dependencies
    /// before dependents. Empty when the target is clean and cached.
    pub fn stale_ancestors(&self, target: NodeId) -> Result<Vec<NodeId>> {
        self.require(target)?;
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        // (node, inputs already pushed)
        let mut stack = vec![(target, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.node(id) else { continue };
            if node.is_fresh() {
                continue;
            }
            stack.push((id, true));
            for &input in node.inputs().iter().rev() {
                if !visited.contains(&input) {
                    stack.push((input, false));
                }
            }
        }
        Ok(order)
    }

    /// Evaluate a single node from its inputs' current caches
    ///
    /// The caller is responsible for evaluating the inputs first.
    pub(crate) fn evaluate_node(&mut self, id: NodeId) -> Result<Option<Arc<Artifact>>> {
        let node = self.require(id)?;
        if node.is_fresh() {
            return Ok(node.cached().cloned());
        }
        let inputs = node
            .inputs()
            .iter()
            .map(|input| self.node(*input).and_then(|n| n.cached().cloned()))
            .collect();
        self.process_node(id, inputs)
    }

    fn process_node(
        &mut self,
        id: NodeId,
        inputs: Vec<Option<Arc<Artifact>>>,
    ) -> Result<Option<Arc<Artifact>>> {
        let node = self.node_mut(id).ok_or(NodeEngineError::UnknownNode(id))?;
        let node_type = node.node_type().to_string();

        let available = inputs.iter().all(Option::is_some);
        if !available || inputs.len() < node.metadata().min_inputs {
            log::warn!(
                "Skipping node '{}' ({}): missing upstream artifact ({} of {} inputs available)",
                node_type,
                id,
                inputs.iter().filter(|i| i.is_some()).count(),
                inputs.len().max(node.metadata().min_inputs),
            );
            return Ok(None);
        }
        let inputs: Vec<Arc<Artifact>> = inputs.into_iter().flatten().collect();

        log::debug!("Processing node '{}' ({})", node_type, id);
        match node.processor().process(&inputs, node.parameters()) {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                node.store(artifact.clone());
                Ok(Some(artifact))
            }
            Err(e @ NodeEngineError::ProcessingFailure { .. }) => Err(e),
            Err(e) => Err(NodeEngineError::processing(node_type, e)),
        }
    }
}

/// Runs a graph towards a target with progress and cancellation
///
/// # Example
///
/// ```ignore
/// let sink = Arc::new(VecEventSink::new());
/// let scheduler = Scheduler::new(CancellationFlag::new(), sink.clone());
/// let artifact = scheduler.run(&mut graph, output_id)?;
/// ```
#[derive(Clone)]
pub struct Scheduler {
    cancel: CancellationFlag,
    sink: Arc<dyn EventSink>,
}

impl Scheduler {
    pub fn new(cancel: CancellationFlag, sink: Arc<dyn EventSink>) -> Self {
        Self { cancel, sink }
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Evaluate the stale ancestors of `target` in dependency order
    ///
    /// Exactly one terminal event is emitted: `Completed`, `Failed` for the
    /// first node that raised an error, or `Cancelled` when the flag was
    /// observed between nodes. Nothing further is emitted or mutated after
    /// cancellation is observed.
    pub fn run(&self, graph: &mut Graph, target: NodeId) -> Result<Option<Arc<Artifact>>> {
        let plan = graph.stale_ancestors(target)?;
        let total = plan.len();
        let sink = self.sink.as_ref();
        emit(sink, ExecutionEvent::Started { target, total });

        if plan.is_empty() {
            let artifact = graph.node(target).and_then(|n| n.cached().cloned());
            emit(sink, ExecutionEvent::Completed { target, artifact: artifact.clone() });
            return Ok(artifact);
        }

        log::debug!("Executing {} stale node(s) towards {}", total, target);
        for (step, id) in plan.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("Execution towards {} cancelled after {} step(s)", target, step);
                emit(sink, ExecutionEvent::Cancelled);
                return Err(NodeEngineError::Cancelled);
            }

            let label = graph
                .node(id)
                .map(|n| n.node_type().to_string())
                .unwrap_or_default();
            match graph.evaluate_node(id) {
                Ok(Some(_)) => {}
                Ok(None) => emit(
                    sink,
                    ExecutionEvent::NodeSkipped {
                        node_id: id,
                        node_type: label.clone(),
                    },
                ),
                Err(e) => {
                    log::error!("Execution towards {} failed at '{}': {}", target, label, e);
                    emit(
                        sink,
                        ExecutionEvent::Failed {
                            node_id: id,
                            node_type: label,
                            error: e.to_string(),
                        },
                    );
                    return Err(e);
                }
            }
            emit(
                sink,
                ExecutionEvent::Progress {
                    node_id: id,
                    label,
                    step: step + 1,
                    total,
                },
            );
        }

        let artifact = graph.node(target).and_then(|n| n.cached().cloned());
        emit(sink, ExecutionEvent::Completed { target, artifact: artifact.clone() });
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::test_support::stub_registry;

    /// Input -> Add -> Output
    fn chain(graph: &mut Graph) -> (NodeId, NodeId, NodeId) {
        let a = graph.add_node("Input").unwrap();
        let b = graph.add_node("Add").unwrap();
        let c = graph.add_node("Output").unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        (a, b, c)
    }

    fn scheduler() -> (Scheduler, Arc<VecEventSink>) {
        let sink = Arc::new(VecEventSink::new());
        (Scheduler::new(CancellationFlag::new(), sink.clone()), sink)
    }

    #[test]
    fn test_execute_computes_and_cleans() {
        let (registry, _) = stub_registry();
        let mut graph = Graph::new(registry);
        let (a, b, c) = chain(&mut graph);

        let out = graph.execute(c).unwrap().unwrap();
        assert_eq!(out.data(), &[11, 11, 11, 11]);
        for id in [a, b, c] {
            let node = graph.node(id).unwrap();
            assert!(!node.is_dirty());
            assert!(node.cached().is_some());
        }
    }

    #[test]
    fn test_execute_is_memoized() {
        let (registry, counts) = stub_registry();
        let mut graph = Graph::new(registry);
        let (_, _, c) = chain(&mut graph);

        let first = graph.execute(c).unwrap().unwrap();
        let second = graph.execute(c).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counts.get("Input"), 1);
        assert_eq!(counts.get("Add"), 1);
        assert_eq!(counts.get("Output"), 1);
    }

    #[test]
    fn test_parameter_change_recomputes_only_downstream() {
        let (registry, counts) = stub_registry();
        let mut graph = Graph::new(registry);
        let (_, b, c) = chain(&mut graph);

        graph.execute(c).unwrap();
        graph.set_parameter(b, "amount", 5i64).unwrap();
        let out = graph.execute(c).unwrap().unwrap();

        assert_eq!(out.data()[0], 15);
        assert_eq!(counts.get("Input"), 1);
        assert_eq!(counts.get("Add"), 2);
        assert_eq!(counts.get("Output"), 2);
    }

    #[test]
    fn test_missing_input_skips_branch() {
        let (registry, counts) = stub_registry();
        let mut graph = Graph::new(registry);
        let add = graph.add_node("Add").unwrap();
        let out = graph.add_node("Output").unwrap();
        graph.connect(add, out).unwrap();

        assert!(graph.execute(out).unwrap().is_none());
        assert_eq!(counts.get("Add"), 0);
        assert_eq!(counts.get("Output"), 0);
        assert!(graph.node(add).unwrap().is_dirty());
        assert!(graph.node(out).unwrap().cached().is_none());
    }

    #[test]
    fn test_blend_waits_for_both_slots() {
        let (registry, counts) = stub_registry();
        let mut graph = Graph::new(registry);
        let a = graph.add_node("Input").unwrap();
        let blend = graph.add_node("Blend").unwrap();
        graph.connect(a, blend).unwrap();

        assert!(graph.execute(blend).unwrap().is_none());
        assert_eq!(counts.get("Blend"), 0);

        let b = graph.add_node("Input").unwrap();
        graph.set_parameter(b, "value", 30i64).unwrap();
        graph.connect(b, blend).unwrap();
        let out = graph.execute(blend).unwrap().unwrap();
        assert_eq!(out.data()[0], 20);
    }

    #[test]
    fn test_failure_leaves_node_dirty() {
        let (registry, _) = stub_registry();
        let mut graph = Graph::new(registry);
        let input = graph.add_node("Input").unwrap();
        let fail = graph.add_node("Fail").unwrap();
        graph.connect(input, fail).unwrap();

        let err = graph.execute(fail).unwrap_err();
        match err {
            NodeEngineError::ProcessingFailure { node_type, .. } => assert_eq!(node_type, "Fail"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(graph.node(input).unwrap().is_fresh());
        assert!(graph.node(fail).unwrap().is_dirty());
        assert!(graph.node(fail).unwrap().cached().is_none());
    }

    #[test]
    fn test_stale_ancestors_order() {
        let (registry, _) = stub_registry();
        let mut graph = Graph::new(registry);
        let (a, b, c) = chain(&mut graph);

        assert_eq!(graph.stale_ancestors(c).unwrap(), vec![a, b, c]);

        graph.execute(c).unwrap();
        assert!(graph.stale_ancestors(c).unwrap().is_empty());

        graph.set_parameter(b, "amount", 2i64).unwrap();
        assert_eq!(graph.stale_ancestors(c).unwrap(), vec![b, c]);
    }

    #[test]
    fn test_stale_ancestors_diamond_visits_once() {
        let (registry, _) = stub_registry();
        let mut graph = Graph::new(registry);
        let src = graph.add_node("Input").unwrap();
        let left = graph.add_node("Add").unwrap();
        let right = graph.add_node("Add").unwrap();
        let join = graph.add_node("Blend").unwrap();
        graph.connect(src, left).unwrap();
        graph.connect(src, right).unwrap();
        graph.connect(left, join).unwrap();
        graph.connect(right, join).unwrap();

        let plan = graph.stale_ancestors(join).unwrap();
        assert_eq!(plan, vec![src, left, right, join]);
    }

    #[test]
    fn test_scheduler_reports_progress() {
        let (registry, _) = stub_registry();
        let mut graph = Graph::new(registry);
        let (_, _, c) = chain(&mut graph);
        let (scheduler, sink) = scheduler();

        let out = scheduler.run(&mut graph, c).unwrap().unwrap();
        assert_eq!(out.data()[0], 11);

        let events = sink.events();
        assert!(matches!(events[0], ExecutionEvent::Started { total: 3, .. }));
        let steps: Vec<(String, usize)> = events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::Progress { label, step, .. } => Some((label.clone(), *step)),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps,
            vec![("Input".to_string(), 1), ("Add".to_string(), 2), ("Output".to_string(), 3)]
        );
        assert!(matches!(events.last(), Some(ExecutionEvent::Completed { artifact: Some(_), .. })));
    }

    #[test]
    fn test_scheduler_clean_target_single_event() {
        let (registry, counts) = stub_registry();
        let mut graph = Graph::new(registry);
        let (_, _, c) = chain(&mut graph);
        graph.execute(c).unwrap();
        let (scheduler, sink) = scheduler();

        scheduler.run(&mut graph, c).unwrap().unwrap();
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ExecutionEvent::Started { total: 0, .. }));
        assert!(matches!(events[1], ExecutionEvent::Completed { .. }));
        assert_eq!(counts.get("Add"), 1);
    }

    #[test]
    fn test_scheduler_failure_is_terminal() {
        let (registry, counts) = stub_registry();
        let mut graph = Graph::new(registry);
        let input = graph.add_node("Input").unwrap();
        let fail = graph.add_node("Fail").unwrap();
        let out = graph.add_node("Output").unwrap();
        graph.connect(input, fail).unwrap();
        graph.connect(fail, out).unwrap();
        let (scheduler, sink) = scheduler();

        assert!(scheduler.run(&mut graph, out).is_err());
        assert_eq!(counts.get("Output"), 0);

        let events = sink.events();
        match events.last() {
            Some(ExecutionEvent::Failed { node_type, error, .. }) => {
                assert_eq!(node_type, "Fail");
                assert!(error.contains("wrong channel count"));
            }
            other => panic!("unexpected terminal event: {other:?}"),
        }
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[test]
    fn test_scheduler_cancelled_before_first_node() {
        let (registry, counts) = stub_registry();
        let mut graph = Graph::new(registry);
        let (a, _, c) = chain(&mut graph);
        let (scheduler, sink) = scheduler();
        scheduler.cancellation().cancel();

        let err = scheduler.run(&mut graph, c).unwrap_err();
        assert!(matches!(err, NodeEngineError::Cancelled));
        assert_eq!(counts.get("Input"), 0);
        assert!(graph.node(a).unwrap().is_dirty());
        assert!(matches!(sink.events().last(), Some(ExecutionEvent::Cancelled)));
    }

    #[test]
    fn test_scheduler_skipped_node_event() {
        let (registry, _) = stub_registry();
        let mut graph = Graph::new(registry);
        let add = graph.add_node("Add").unwrap();
        let out = graph.add_node("Output").unwrap();
        graph.connect(add, out).unwrap();
        let (scheduler, sink) = scheduler();

        assert!(scheduler.run(&mut graph, out).unwrap().is_none());
        let skipped = sink
            .events()
            .iter()
            .filter(|e| matches!(e, ExecutionEvent::NodeSkipped { .. }))
            .count();
        assert_eq!(skipped, 2);
    }
}
