mod args;
mod commands;

use std::process::ExitCode;

use args::{Args, Command};
use clap::Parser;
use commands::{CliResult, Context};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> CliResult<()> {
    let ctx = Context::new(args.workflows_dir);
    log::debug!("Using workflows directory {:?}", ctx.store.dir());

    match args.command {
        Command::Nodes => commands::nodes(&ctx),
        Command::List => commands::list(&ctx),
        Command::Show { workflow } => commands::show(&ctx, &workflow),
        Command::Render {
            workflow,
            output,
            source,
            update_thumbnail,
        } => {
            commands::render(&ctx, &workflow, &output, source.as_deref(), update_thumbnail).await
        }
        Command::Batch {
            workflow,
            inputs,
            out_dir,
        } => commands::batch(&ctx, &workflow, inputs, out_dir).await,
        Command::Delete { workflow } => commands::delete(&ctx, &workflow),
    }
}
