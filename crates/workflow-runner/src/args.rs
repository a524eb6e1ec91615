//! Contains [Args], which are parsed command-line flags.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parsed command line arguments.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(about = "Run and manage stored image processing workflows.")]
pub struct Args {
    /// Directory holding workflow documents. Defaults to
    /// `$PIXELGRAPH_WORKFLOWS_DIR` or the platform data directory.
    #[arg(long, global = true)]
    pub workflows_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the available node types grouped by category.
    Nodes,

    /// List stored workflows, most recently updated first.
    List,

    /// Print the nodes and connections of a stored workflow.
    Show {
        /// Workflow file, absolute or relative to the workflows directory.
        workflow: PathBuf,
    },

    /// Evaluate a workflow once and write its output image.
    Render {
        workflow: PathBuf,

        /// Where to write the rendered image.
        #[arg(long, short)]
        output: PathBuf,

        /// Replace the source image of every input node.
        #[arg(long)]
        source: Option<PathBuf>,

        /// Store a preview of the result as the workflow thumbnail.
        #[arg(long)]
        update_thumbnail: bool,
    },

    /// Apply a workflow to many images, writing `<name>_processed` files.
    Batch {
        workflow: PathBuf,

        /// Images to process, in order.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory receiving the processed images.
        #[arg(long, short = 'o')]
        out_dir: PathBuf,
    },

    /// Delete a stored workflow.
    Delete { workflow: PathBuf },
}
