//! tasquencer admin CLI
//!
//! A small operational tool for inspecting bundled demo workflow
//! definitions and driving one end-to-end through an in-memory store —
//! useful for smoke-testing the engine without standing up a real host
//! application.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tasquencer::{
    ActionDispatcher, InMemoryStore, NullActivities, NullAudit, TaskInstanceState, WorkflowInstanceId, WorkflowStorage,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tasquencer-admin")]
#[command(about = "tasquencer admin CLI - inspect and smoke-test workflow definitions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the bundled demo workflow definitions
    ListDemos,

    /// Validate a demo definition's structure
    Validate {
        /// One of: linear_review, document_approval, composite_parent
        demo: String,
    },

    /// Print a demo definition's extracted structure as JSON
    Extract {
        demo: String,
    },

    /// Run a demo workflow end-to-end against a fresh in-memory store
    RunDemo {
        demo: String,

        /// For document_approval: "approved" or "revise"
        #[arg(long, default_value = "approved")]
        decision: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::ListDemos => {
            println!("Bundled demo definitions:");
            println!("  linear_review       - single atomic task, start -> review -> end");
            println!("  document_approval    - and-join, xor-split router, cancellation region, dummy task");
            println!("  composite_parent      - a composite task delegating to linear_review");
        }

        Commands::Validate { demo } => match build_demo(&demo) {
            Ok(net) => match net.validate_structure() {
                Ok(()) => info!("{demo}: structurally valid"),
                Err(e) => error!("{demo}: invalid — {e}"),
            },
            Err(e) => error!("{e}"),
        },

        Commands::Extract { demo } => {
            let net = build_demo(&demo)?;
            let extracted = net.extract();
            println!("{}", serde_json::to_string_pretty(&extracted)?);
        }

        Commands::RunDemo { demo, decision } => {
            run_demo(&demo, &decision).await?;
        }
    }

    Ok(())
}

fn build_demo(name: &str) -> anyhow::Result<tasquencer::WorkflowNetwork> {
    match name {
        "linear_review" => Ok(tasquencer::demos::linear_review("v1")),
        "document_approval" => Ok(tasquencer::demos::document_approval("v1")),
        "composite_parent" => Ok(tasquencer::demos::composite_parent("v1")),
        other => Err(anyhow::anyhow!("unknown demo '{other}' — see list-demos")),
    }
}

async fn run_demo(name: &str, decision: &str) -> anyhow::Result<()> {
    let storage: Arc<InMemoryStore> = Arc::new(InMemoryStore::new());
    let net = Arc::new(build_demo(name)?);
    let dispatcher = ActionDispatcher::new(net, storage.clone(), Arc::new(NullActivities), Arc::new(NullAudit));

    info!("initializing root workflow for '{name}'");
    let root = dispatcher.initialize_root_workflow_public(Value::Null).await?;
    info!("workflow {} started", root.id);

    match name {
        "linear_review" => drive_atomic_task(&dispatcher, &storage, root.id, "review", Value::Null).await?,
        "document_approval" => {
            drive_atomic_task(&dispatcher, &storage, root.id, "legal_review", Value::Null).await?;
            drive_atomic_task(&dispatcher, &storage, root.id, "content_review", Value::Null).await?;
            drive_atomic_task(&dispatcher, &storage, root.id, "decide", json!({"decision": decision})).await?;
            let chosen = if decision == "approved" { "approved" } else { "revise" };
            drive_atomic_task(&dispatcher, &storage, root.id, chosen, Value::Null).await?;
        }
        "composite_parent" => {
            error!("composite_parent has no direct work items — run-demo does not yet drive composite delegation");
            return Ok(());
        }
        _ => unreachable!("build_demo already rejected unknown names"),
    }

    let final_record = storage
        .get_workflow_instance(root.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("workflow instance vanished"))?;
    info!("workflow {} finished in state {:?}", final_record.id, final_record.state);
    Ok(())
}

/// Find the enabled task instance named `task_name`, initialize/start/
/// complete a work item under it. The CLI owns `storage` directly since
/// the engine deliberately exposes no scheduler of its own — a host is
/// expected to poll state the same way this loop does.
async fn drive_atomic_task(
    dispatcher: &ActionDispatcher,
    storage: &Arc<InMemoryStore>,
    workflow_id: WorkflowInstanceId,
    task_name: &str,
    completion_payload: Value,
) -> anyhow::Result<()> {
    let task_name = tasquencer::TaskName::from(task_name);
    let task = storage
        .scan_tasks_by_workflow(workflow_id)
        .await?
        .into_iter()
        .find(|t| t.name == task_name && t.state == TaskInstanceState::Enabled)
        .ok_or_else(|| anyhow::anyhow!("task '{task_name}' is not enabled"))?;

    let item = dispatcher.initialize_work_item_public(task.id, Value::Null).await?;
    dispatcher.start_work_item_public(item.id, Value::Null).await?;
    dispatcher.complete_work_item_public(item.id, completion_payload).await?;
    info!("task '{task_name}' completed");
    Ok(())
}
