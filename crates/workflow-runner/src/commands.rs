//! Subcommand implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use node_engine::{
    BatchRunner, CancellationFlag, ChannelEventSink, ExecutionEvent, Graph, GraphSession,
    ImageCodec, NodeEngineError, NodeRegistry, WorkflowStore, INPUT_PATH_PARAM,
};
use thiserror::Error;
use tokio::sync::mpsc;
use workflow_nodes::{builtin_registry, thumbnail_data_url, FsImageCodec};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] NodeEngineError),

    #[error("workflow '{0}' has no output node")]
    NoOutputNode(String),

    #[error("workflow produced no image")]
    NoArtifact,

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type CliResult<T> = std::result::Result<T, CliError>;

/// Shared state for every subcommand
pub struct Context {
    pub store: WorkflowStore,
    pub codec: Arc<dyn ImageCodec>,
    pub registry: Arc<NodeRegistry>,
}

impl Context {
    pub fn new(workflows_dir: Option<PathBuf>) -> Self {
        let codec: Arc<dyn ImageCodec> = Arc::new(FsImageCodec);
        Self {
            store: WorkflowStore::new(workflows_dir.unwrap_or_else(WorkflowStore::default_dir)),
            registry: builtin_registry(codec.clone()),
            codec,
        }
    }

    /// Paths that don't exist as given are looked up in the store directory
    fn resolve(&self, workflow: &Path) -> PathBuf {
        if workflow.is_absolute() || workflow.exists() {
            return workflow.to_path_buf();
        }
        let in_store = self.store.dir().join(workflow);
        if in_store.extension().is_none() {
            in_store.with_extension("json")
        } else {
            in_store
        }
    }
}

pub fn nodes(ctx: &Context) -> CliResult<()> {
    for (category, types) in ctx.registry.list_by_category() {
        println!("{}", category.label());
        for node_type in types {
            let description = ctx
                .registry
                .get_metadata(&node_type)
                .map(|m| m.description.as_str())
                .unwrap_or_default();
            println!("  {:<22} {}", node_type, description);
        }
    }
    Ok(())
}

pub fn list(ctx: &Context) -> CliResult<()> {
    let summaries = ctx.store.list()?;
    if summaries.is_empty() {
        println!("No workflows in {}", ctx.store.dir().display());
        return Ok(());
    }
    for summary in summaries {
        println!(
            "{:<28} {:>3} nodes  updated {}  {}",
            summary.name,
            summary.node_count,
            summary.updated_at.format("%Y-%m-%d %H:%M"),
            summary.path.display()
        );
    }
    Ok(())
}

pub fn show(ctx: &Context, workflow: &Path) -> CliResult<()> {
    let doc = ctx.store.load(&ctx.resolve(workflow))?;
    println!("{} (v{})", doc.metadata.name, doc.metadata.version);
    if !doc.metadata.description.is_empty() {
        println!("{}", doc.metadata.description);
    }

    println!("\nNodes:");
    for node in &doc.nodes {
        let role = if doc.execution.output_node_id.as_deref() == Some(node.id.as_str()) {
            " [output]"
        } else if doc.execution.input_node_ids.contains(&node.id) {
            " [input]"
        } else {
            ""
        };
        println!("  {} {}{}", node.id, node.node_type, role);
        for (name, param) in &node.parameters {
            println!("      {} = {}", name, param.value);
        }
    }

    println!("\nConnections:");
    for edge in &doc.connections {
        println!("  {} -> {}", edge.from_node, edge.to_node);
    }
    Ok(())
}

pub async fn render(
    ctx: &Context,
    workflow: &Path,
    output: &Path,
    source: Option<&Path>,
    update_thumbnail: bool,
) -> CliResult<()> {
    let path = ctx.resolve(workflow);
    let mut doc = ctx.store.load(&path)?;

    let mut graph = Graph::new(ctx.registry.clone());
    let remap = graph.recreate_from_document(&doc);
    let target = doc
        .output_node(&remap)
        .ok_or_else(|| CliError::NoOutputNode(doc.metadata.name.clone()))?;
    if let Some(source) = source {
        let source = source.to_string_lossy().into_owned();
        for id in doc.input_nodes(&remap) {
            graph.set_parameter(id, INPUT_PATH_PARAM, source.as_str())?;
        }
    }

    let mut session = GraphSession::new(graph);
    let (sink, rx) = ChannelEventSink::channel();
    let printer = tokio::spawn(print_events(rx));

    let cancel = session.start_execution(target, Arc::new(sink)).await?;
    let interrupt = stop_on_ctrl_c(cancel);
    let result = session.wait().await;
    interrupt.abort();
    printer.await?;

    let artifact = result?.ok_or(CliError::NoArtifact)?;
    ctx.codec.write(output, &artifact)?;
    println!("Wrote {}", output.display());

    if update_thumbnail {
        doc.metadata.thumbnail = Some(thumbnail_data_url(&artifact)?);
        ctx.store.update(&path, &doc)?;
        log::info!("Updated thumbnail of '{}'", doc.metadata.name);
    }
    Ok(())
}

pub async fn batch(
    ctx: &Context,
    workflow: &Path,
    inputs: Vec<PathBuf>,
    out_dir: PathBuf,
) -> CliResult<()> {
    let doc = ctx.store.load(&ctx.resolve(workflow))?;
    let runner = BatchRunner::new(ctx.registry.clone(), ctx.codec.clone());

    let (sink, rx) = ChannelEventSink::channel();
    let printer = tokio::spawn(print_events(rx));
    let stop = CancellationFlag::new();
    let interrupt = stop_on_ctrl_c(stop.clone());

    let report = runner.spawn(doc, inputs, out_dir, stop, Arc::new(sink)).await?;
    interrupt.abort();
    printer.await?;

    let report = report?;
    for failure in &report.failed {
        log::error!("{}", failure.error);
    }
    Ok(())
}

pub fn delete(ctx: &Context, workflow: &Path) -> CliResult<()> {
    let path = ctx.resolve(workflow);
    if ctx.store.delete(&path)? {
        println!("Deleted {}", path.display());
    } else {
        println!("Nothing to delete at {}", path.display());
    }
    Ok(())
}

/// Raise `flag` on the first Ctrl-C
fn stop_on_ctrl_c(flag: CancellationFlag) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current step");
            flag.cancel();
        }
    })
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<ExecutionEvent>) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = describe(&event) {
            println!("{}", line);
        }
    }
}

/// One progress line per event, `None` for events not worth printing
fn describe(event: &ExecutionEvent) -> Option<String> {
    match event {
        ExecutionEvent::Progress {
            label, step, total, ..
        } => Some(format!("  [{}/{}] {}", step, total, label)),
        ExecutionEvent::NodeSkipped { node_type, .. } => {
            Some(format!("  skipped {} (missing input)", node_type))
        }
        ExecutionEvent::Failed { node_type, error, .. } => {
            Some(format!("  {} failed: {}", node_type, error))
        }
        ExecutionEvent::Cancelled => Some("  cancelled".to_string()),
        ExecutionEvent::BatchItemStarted { index, total, name } => {
            Some(format!("Processing {}/{}: {}", index, total, name))
        }
        ExecutionEvent::BatchItemCompleted { output_path, .. } => {
            Some(format!("  -> {}", output_path.display()))
        }
        ExecutionEvent::BatchItemFailed { item, error, .. } => {
            Some(format!("  {} failed: {}", item, error))
        }
        ExecutionEvent::BatchFinished {
            completed,
            failed,
            stopped,
        } => Some(format!(
            "Done: {} processed, {} failed{}",
            completed,
            failed,
            if *stopped { " (stopped early)" } else { "" }
        )),
        ExecutionEvent::Started { .. } | ExecutionEvent::Completed { .. } => None,
    }
}
