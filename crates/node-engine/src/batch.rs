//! Batch execution of a stored workflow over many inputs
//!
//! Every input gets its own throwaway [`Graph`] recreated from the
//! document, so no cache or parameter state leaks between items. The input
//! path is bound to each input-role node, the designated output node is
//! evaluated and its artifact written next to the others in the output
//! folder. Failures are recorded per item and never stop the batch; the
//! stop flag is only checked between items.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::artifact::Artifact;
use crate::codec::ImageCodec;
use crate::descriptor::INPUT_PATH_PARAM;
use crate::document::WorkflowDocument;
use crate::error::{NodeEngineError, Result};
use crate::events::{emit, EventSink, ExecutionEvent};
use crate::graph::Graph;
use crate::registry::NodeRegistry;
use crate::scheduler::CancellationFlag;

/// Extension used when an input has none
const DEFAULT_EXTENSION: &str = "png";

/// One successfully processed input
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub input: PathBuf,
    pub output: PathBuf,
    pub artifact: Arc<Artifact>,
}

/// One failed input; `error` is always a `BatchItemFailure`
#[derive(Debug)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: NodeEngineError,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<BatchOutput>,
    pub failed: Vec<BatchFailure>,
    /// The stop flag ended the run before every input was processed
    pub stopped: bool,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

/// Runs a workflow document over a list of input files
#[derive(Clone)]
pub struct BatchRunner {
    registry: Arc<NodeRegistry>,
    codec: Arc<dyn ImageCodec>,
}

impl BatchRunner {
    pub fn new(registry: Arc<NodeRegistry>, codec: Arc<dyn ImageCodec>) -> Self {
        Self { registry, codec }
    }

    /// Process `inputs` in order, writing results into `output_dir`
    ///
    /// Fails up front with `CorruptWorkflow`, before any item runs, when the
    /// document's output node cannot be resolved. Every other failure is
    /// recorded in the report.
    pub fn run(
        &self,
        doc: &WorkflowDocument,
        inputs: &[PathBuf],
        output_dir: &Path,
        stop: &CancellationFlag,
        sink: &dyn EventSink,
    ) -> Result<BatchReport> {
        self.check_document(doc)?;
        std::fs::create_dir_all(output_dir)?;

        let total = inputs.len();
        let mut report = BatchReport::default();
        log::info!(
            "Running workflow '{}' over {} input(s) into {:?}",
            doc.metadata.name,
            total,
            output_dir
        );

        for (index, input) in inputs.iter().enumerate() {
            if stop.is_cancelled() {
                log::info!("Batch stopped after {} of {} item(s)", index, total);
                report.stopped = true;
                break;
            }

            let name = item_name(input);
            emit(
                sink,
                ExecutionEvent::BatchItemStarted {
                    index: index + 1,
                    total,
                    name: name.clone(),
                },
            );

            match self.process_item(doc, input, output_dir) {
                Ok((output, artifact)) => {
                    log::debug!("Wrote {:?}", output);
                    emit(
                        sink,
                        ExecutionEvent::BatchItemCompleted {
                            index: index + 1,
                            output_path: output.clone(),
                            artifact: artifact.clone(),
                        },
                    );
                    report.completed.push(BatchOutput {
                        input: input.clone(),
                        output,
                        artifact,
                    });
                }
                Err(e) => {
                    let error = NodeEngineError::BatchItemFailure {
                        item: name.clone(),
                        cause: e.to_string(),
                    };
                    log::warn!("{}", error);
                    emit(
                        sink,
                        ExecutionEvent::BatchItemFailed {
                            index: index + 1,
                            item: name,
                            error: e.to_string(),
                        },
                    );
                    report.failed.push(BatchFailure {
                        input: input.clone(),
                        error,
                    });
                }
            }
        }

        log::info!(
            "Batch finished: {} written, {} failed",
            report.completed.len(),
            report.failed.len()
        );
        emit(
            sink,
            ExecutionEvent::BatchFinished {
                completed: report.completed.len(),
                failed: report.failed.len(),
                stopped: report.stopped,
            },
        );
        Ok(report)
    }

    /// [`run`](Self::run) on a blocking worker
    pub fn spawn(
        &self,
        doc: WorkflowDocument,
        inputs: Vec<PathBuf>,
        output_dir: PathBuf,
        stop: CancellationFlag,
        sink: Arc<dyn EventSink>,
    ) -> JoinHandle<Result<BatchReport>> {
        let runner = self.clone();
        tokio::task::spawn_blocking(move || runner.run(&doc, &inputs, &output_dir, &stop, sink.as_ref()))
    }

    fn check_document(&self, doc: &WorkflowDocument) -> Result<()> {
        let mut probe = Graph::new(self.registry.clone());
        let remap = probe.recreate_from_document(doc);
        if doc.output_node(&remap).is_none() {
            return Err(NodeEngineError::corrupt(format!(
                "workflow '{}' has no resolvable output node",
                doc.metadata.name
            )));
        }
        if doc.input_nodes(&remap).is_empty() {
            log::warn!("Workflow '{}' declares no input nodes", doc.metadata.name);
        }
        Ok(())
    }

    fn process_item(
        &self,
        doc: &WorkflowDocument,
        input: &Path,
        output_dir: &Path,
    ) -> Result<(PathBuf, Arc<Artifact>)> {
        let mut graph = Graph::new(self.registry.clone());
        let remap = graph.recreate_from_document(doc);
        let target = doc
            .output_node(&remap)
            .ok_or_else(|| NodeEngineError::corrupt("output node vanished"))?;

        let source = input.to_string_lossy().into_owned();
        for id in doc.input_nodes(&remap) {
            let declares_path = graph
                .node(id)
                .map(|n| n.parameters().contains(INPUT_PATH_PARAM))
                .unwrap_or(false);
            if !declares_path {
                log::warn!("Input role node {} has no '{}' parameter", id, INPUT_PATH_PARAM);
                continue;
            }
            graph.set_parameter(id, INPUT_PATH_PARAM, source.as_str())?;
            graph.mark_dirty(id)?;
        }

        let artifact = graph
            .execute(target)?
            .ok_or_else(|| NodeEngineError::processing("Output", "workflow produced no artifact"))?;

        let output = free_output_path(output_dir, input);
        self.codec.write(&output, &artifact)?;
        Ok((output, artifact))
    }
}

fn item_name(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_string_lossy().into_owned())
}

/// `<stem>_processed.<ext>`, then `<stem>_processed_<n>.<ext>` on collision
pub fn free_output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let mut path = output_dir.join(format!("{stem}_processed.{ext}"));
    let mut counter = 1;
    while path.exists() {
        path = output_dir.join(format!("{stem}_processed_{counter}.{ext}"));
        counter += 1;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Channels;
    use crate::events::VecEventSink;
    use crate::test_support::stub_registry;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Records writes instead of encoding files
    #[derive(Default)]
    struct RecordingCodec {
        written: Mutex<Vec<(PathBuf, Artifact)>>,
    }

    impl ImageCodec for RecordingCodec {
        fn read(&self, _path: &Path) -> Result<Artifact> {
            Ok(Artifact::filled(1, 1, Channels::Gray, 0))
        }

        fn write(&self, path: &Path, artifact: &Artifact) -> Result<()> {
            std::fs::write(path, b"")?;
            self.written.lock().push((path.to_path_buf(), artifact.clone()));
            Ok(())
        }
    }

    fn boost_document() -> WorkflowDocument {
        let (registry, _) = stub_registry();
        let mut graph = Graph::new(registry);
        let input = graph.add_node("Input").unwrap();
        let add = graph.add_node("Add").unwrap();
        let out = graph.add_node("Output").unwrap();
        graph.connect(input, add).unwrap();
        graph.connect(add, out).unwrap();
        WorkflowDocument::from_graph(&graph, "boost", &HashMap::new())
    }

    fn runner() -> (BatchRunner, Arc<RecordingCodec>) {
        let (registry, _) = stub_registry();
        let codec = Arc::new(RecordingCodec::default());
        (BatchRunner::new(registry, codec.clone()), codec)
    }

    #[test]
    fn test_failure_isolated_per_item() {
        let temp = tempfile::tempdir().unwrap();
        let (runner, codec) = runner();
        let inputs: Vec<PathBuf> = ["one.png", "bad.png", "three.jpg"].iter().map(PathBuf::from).collect();
        let sink = VecEventSink::new();

        let report = runner
            .run(&boost_document(), &inputs, temp.path(), &CancellationFlag::new(), &sink)
            .unwrap();

        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.stopped);
        assert_eq!(report.failed[0].input, PathBuf::from("bad.png"));
        assert!(matches!(
            &report.failed[0].error,
            NodeEngineError::BatchItemFailure { item, .. } if item == "bad.png"
        ));

        let outputs: Vec<_> = report.completed.iter().map(|o| o.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                temp.path().join("one_processed.png"),
                temp.path().join("three_processed.jpg")
            ]
        );
        assert_eq!(codec.written.lock().len(), 2);
        assert_eq!(report.completed[0].artifact.data()[0], 11);

        let started: Vec<(usize, usize, String)> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::BatchItemStarted { index, total, name } => Some((index, total, name)),
                _ => None,
            })
            .collect();
        assert_eq!(started[1], (2, 3, "bad.png".to_string()));
        assert!(matches!(
            sink.events().last(),
            Some(ExecutionEvent::BatchFinished { completed: 2, failed: 1, stopped: false })
        ));
    }

    #[test]
    fn test_output_names_do_not_collide() {
        let temp = tempfile::tempdir().unwrap();
        let (runner, _) = runner();
        let inputs = vec![PathBuf::from("a/photo.png"), PathBuf::from("b/photo.png"), PathBuf::from("raw")];

        let report = runner
            .run(&boost_document(), &inputs, temp.path(), &CancellationFlag::new(), &VecEventSink::new())
            .unwrap();

        let names: Vec<String> = report
            .completed
            .iter()
            .map(|o| o.output.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["photo_processed.png", "photo_processed_1.png", "raw_processed.png"]);
    }

    #[test]
    fn test_stop_flag_checked_between_items() {
        let temp = tempfile::tempdir().unwrap();
        let (runner, _) = runner();
        let stop = CancellationFlag::new();
        stop.cancel();

        let report = runner
            .run(&boost_document(), &[PathBuf::from("x.png")], temp.path(), &stop, &VecEventSink::new())
            .unwrap();
        assert!(report.stopped);
        assert_eq!(report.processed(), 0);
    }

    #[test]
    fn test_unresolvable_output_aborts_before_items() {
        let temp = tempfile::tempdir().unwrap();
        let (runner, codec) = runner();
        let mut doc = boost_document();
        doc.execution.output_node_id = Some("missing".into());
        let sink = VecEventSink::new();

        let err = runner
            .run(&doc, &[PathBuf::from("x.png")], temp.path(), &CancellationFlag::new(), &sink)
            .unwrap_err();
        assert!(matches!(err, NodeEngineError::CorruptWorkflow(_)));
        assert!(sink.events().is_empty());
        assert!(codec.written.lock().is_empty());
    }

    #[test]
    fn test_no_artifact_counts_as_failure() {
        let temp = tempfile::tempdir().unwrap();
        let (runner, _) = runner();
        let mut doc = boost_document();
        // leave Add without its upstream Input
        doc.connections.retain(|c| {
            doc.nodes
                .iter()
                .find(|n| n.id == c.from_node)
                .map(|n| n.node_type != "Input")
                .unwrap_or(true)
        });

        let report = runner
            .run(&doc, &[PathBuf::from("x.png")], temp.path(), &CancellationFlag::new(), &VecEventSink::new())
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].error.to_string().contains("no artifact"));
    }

    #[tokio::test]
    async fn test_spawned_batch() {
        let temp = tempfile::tempdir().unwrap();
        let (runner, _) = runner();
        let handle = runner.spawn(
            boost_document(),
            vec![PathBuf::from("one.png")],
            temp.path().to_path_buf(),
            CancellationFlag::new(),
            Arc::new(VecEventSink::new()),
        );
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.completed.len(), 1);
    }
}
