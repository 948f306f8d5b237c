//! Orchestration engine CLI entry point.

use clap::{Parser, Subcommand};
use engine::{EngineBuilder, ProviderSettings, RuntimeConfig};
use schemas::AuthContext;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use workflow::{WorkflowInputs, WorkflowSettings};

/// Orchestration engine CLI
#[derive(Parser, Debug)]
#[command(name = "orca-engine")]
#[command(about = "AI agent orchestration engine", long_about = None)]
struct Args {
    /// Enable debug logging (overrides ORCA_DEBUG)
    #[arg(long)]
    debug: bool,

    /// Session base directory for checkpoints and the audit log
    #[arg(long, default_value = ".orca")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single workflow to completion (or pause/failure)
    Run {
        /// The natural-language task prompt
        prompt: String,

        #[arg(long, default_value = "tenant-default")]
        tenant_id: String,

        #[arg(long, default_value = "project-default")]
        project_id: String,

        #[arg(long)]
        task_id: Option<String>,

        #[arg(long)]
        max_iterations: Option<u32>,
    },
    /// Print the resolved runtime configuration (token redacted)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (runtime_config, warnings) = RuntimeConfig::from_env();

    let level = if args.debug || runtime_config.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    for warning in &warnings {
        warn!("{warning}");
    }
    info!(?runtime_config, "resolved runtime configuration");

    match args.command {
        Command::Config => {
            println!("{runtime_config:?}");
        }
        Command::Run {
            prompt,
            tenant_id,
            project_id,
            task_id,
            max_iterations,
        } => {
            run_workflow(args.base_dir, runtime_config, prompt, tenant_id, project_id, task_id, max_iterations)
                .await?;
        }
    }

    Ok(())
}

async fn run_workflow(
    base_dir: PathBuf,
    runtime_config: RuntimeConfig,
    prompt: String,
    tenant_id: String,
    project_id: String,
    task_id: Option<String>,
    max_iterations: Option<u32>,
) -> anyhow::Result<()> {
    let registry = Arc::new(registry::AgentRegistry::new());
    let mut builder = EngineBuilder::new(registry, &base_dir);
    if runtime_config.api_token.is_some() {
        builder = builder.with_provider(ProviderSettings {
            api_key_env: "ORCA_API_TOKEN".to_string(),
            base_url: runtime_config.api_url.clone(),
            model: "default".to_string(),
        });
    }
    let mut engine = builder.build()?;
    if let Some(max_iterations) = max_iterations {
        engine = engine.with_max_iterations(max_iterations);
    }

    let task_id = task_id.unwrap_or_else(|| format!("task-{}", uuid::Uuid::new_v4()));
    let auth = AuthContext::new(tenant_id.clone(), "cli-user", "cli-session");
    let inputs = WorkflowInputs {
        tenant_id,
        project_id,
        task_id,
        prompt,
        settings: WorkflowSettings::default().normalize(),
    };

    let state = engine.run(inputs, auth).await?;

    match runtime_config.output_format {
        engine::OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "phase": state.task.phase,
                    "iteration_count": state.task.iteration_count,
                    "terminal_reason": state.terminal_reason,
                    "requires_user_input": state.requires_user_input,
                })
            );
        }
        engine::OutputFormat::Text => {
            println!("phase: {:?}", state.task.phase);
            println!("iterations: {}", state.task.iteration_count);
            if let Some(reason) = &state.terminal_reason {
                println!("terminal reason: {reason}");
            }
        }
    }

    Ok(())
}
