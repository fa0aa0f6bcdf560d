use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use conduit_config::PipelineDef;
use conduit_event::{EventEmitter, LogEmitter};
use conduit_node::{Node, StartOptions, connect};
use conduit_task::Task;
use conduit_workflow::{Closer, Workflow, WorkflowStartGroup, WorkflowStartOptions};

/// Conduit - run graphs of long-lived processing nodes
#[derive(Parser)]
#[command(name = "conduit")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a pipeline until its nodes finish or Ctrl-C is pressed
  Run {
    /// Path to the pipeline file (JSON)
    pipeline_file: PathBuf,
  },

  /// Validate a pipeline file without running it
  Check {
    /// Path to the pipeline file (JSON)
    pipeline_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conduit=info,warn")),
    )
    .with_target(false)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run { pipeline_file }) => run_pipeline(pipeline_file)?,
    Some(Commands::Check { pipeline_file }) => {
      let def = load_pipeline(&pipeline_file)?;
      println!(
        "{}: {} nodes, {} edges, {} groups",
        def.name,
        def.nodes.len(),
        def.edges.len(),
        def.groups.len()
      );
    }
    None => {
      println!("conduit - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_pipeline(path: &Path) -> Result<PipelineDef> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read pipeline file: {}", path.display()))?;
  PipelineDef::from_json(&content)
    .with_context(|| format!("invalid pipeline file: {}", path.display()))
}

fn run_pipeline(pipeline_file: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_pipeline_async(pipeline_file).await })
}

async fn run_pipeline_async(pipeline_file: PathBuf) -> Result<()> {
  let def = load_pipeline(&pipeline_file)?;
  let roots = def.roots();
  if roots.is_empty() {
    bail!("pipeline '{}' has no entry points", def.name);
  }

  let emitter: Arc<dyn EventEmitter> = Arc::new(LogEmitter);
  let task = Task::new();
  let workflow = Workflow::new(
    def.name.as_str(),
    CancellationToken::new(),
    Arc::clone(&emitter),
    task.factory(),
    Arc::new(Closer::new()),
  );

  let nodes = build_graph(&def, &emitter);
  for name in &roots {
    if let Some(node) = nodes.get(name) {
      workflow.add_child(Arc::clone(node));
    }
  }
  workflow.index_nodes();
  info!(workflow = %def.name, nodes = workflow.nodes().len(), roots = ?roots, "pipeline loaded");

  let groups = def
    .groups
    .iter()
    .map(|members| {
      let group_nodes = members
        .iter()
        .filter_map(|name| nodes.get(name).cloned())
        .collect();
      WorkflowStartGroup::new(group_nodes)
    })
    .collect();

  workflow.start_with_options(WorkflowStartOptions {
    groups,
    node: StartOptions {
      stop_when_nodes_are_done: def.stop_when_nodes_are_done,
    },
  });

  tokio::select! {
    _ = task.wait() => {}
    res = tokio::signal::ctrl_c() => {
      res.context("failed to listen for Ctrl-C")?;
      info!(workflow = %def.name, "interrupted, stopping");
      workflow.stop();
      task.wait().await;
    }
  }

  Ok(())
}

fn build_graph(def: &PipelineDef, emitter: &Arc<dyn EventEmitter>) -> HashMap<String, Arc<dyn Node>> {
  let nodes: HashMap<String, Arc<dyn Node>> = def
    .nodes
    .iter()
    .map(|n| (n.name.clone(), conduit_nodes::build(n, Arc::clone(emitter))))
    .collect();

  for edge in &def.edges {
    if let (Some(from), Some(to)) = (nodes.get(&edge.from), nodes.get(&edge.to)) {
      connect(from, to);
    }
  }

  nodes
}
