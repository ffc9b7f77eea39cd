//! Reflex CLI - event-driven inference agent.
//!
//! Single binary that provides:
//! - `reflex run` - drive the agent against a simulated world
//! - `reflex predict` - one-shot encode + predict + resolve
//! - `reflex status` - configuration and recent decisions
//! - `reflex init` - scaffold a project

mod sim;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use reflex_core::{encode_message, ActionName};
use reflex_kernel::observability::read_recent;
use reflex_kernel::{Agent, AgentConfig, ArtifactLoader, DispatchError, ModelAdapter};

use crate::sim::{SimEvent, SimWorld};

#[derive(Parser)]
#[command(name = "reflex")]
#[command(about = "Event-driven inference agent", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent against a simulated world
    Run {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Milliseconds per world tick
        #[arg(long, default_value_t = 600)]
        tick_ms: u64,

        /// Seed for the simulated world
        #[arg(long, default_value_t = 7)]
        seed: u64,
    },

    /// Encode a chat line, run the model once and resolve the action
    Predict {
        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show agent status
    Status,

    /// Initialize a new project
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Find project root
    let project_root = match cli.project {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Some(Commands::Run {
            ticks,
            tick_ms,
            seed,
        }) => run_agent(&project_root, ticks, tick_ms, seed).await,
        Some(Commands::Predict { text, json }) => predict(&project_root, &text.join(" "), json),
        Some(Commands::Status) => show_status(&project_root),
        Some(Commands::Init) => init_project(&project_root),
        None => {
            println!("Reflex - Event-driven Inference Agent");
            println!();
            println!("Usage: reflex <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run       Run the agent against a simulated world");
            println!("  predict   One-shot prediction for a chat line");
            println!("  status    Show agent status");
            println!("  init      Initialize a new project");
            println!();
            println!("Run 'reflex --help' for more information.");
            Ok(())
        }
    }
}

fn load_config(project_root: &Path) -> Result<AgentConfig> {
    let mut config = AgentConfig::load_from_project(project_root).with_context(|| {
        format!(
            "Failed to load {}",
            AgentConfig::project_config_path(project_root).display()
        )
    })?;
    config.resolve_paths(project_root);
    Ok(config)
}

async fn run_agent(
    project_root: &Path,
    ticks: Option<u64>,
    tick_ms: u64,
    seed: u64,
) -> Result<()> {
    tracing::info!(project = %project_root.display(), seed, "Starting simulated world");

    let config = load_config(project_root)?;
    let mut world = SimWorld::new(seed);

    let (agent, mut applier) =
        Agent::activate(&config, &mut world).context("Reflex agent failed to start")?;

    let (console_tx, mut console_rx) = mpsc::unbounded_channel::<String>();
    std::thread::Builder::new()
        .name("reflex-console".into())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if console_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start console reader")?;
    let mut console_open = true;

    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
            _ = interval.tick() => {
                for event in world.advance() {
                    let dispatcher = agent.dispatcher();
                    let result = match event {
                        SimEvent::PlayerMoved => dispatcher.on_player_moved(&world),
                        SimEvent::ActorDied => dispatcher.on_actor_death(&world),
                        SimEvent::InventoryChanged => dispatcher.on_item_container_changed(&world),
                    };
                    log_dispatch(result.map(|_| ()));
                }
                log_dispatch(agent.dispatcher().on_game_tick(&world).map(|_| ()));

                if ticks.is_some_and(|limit| world.tick() >= limit) {
                    break;
                }
            }
            applied = applier.apply_next(&mut world) => {
                if applied.is_none() {
                    break;
                }
            }
            line = console_rx.recv(), if console_open => {
                let Some(line) = line else {
                    console_open = false;
                    continue;
                };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" || line == "exit" {
                    break;
                }
                if let Some(text) = line.strip_prefix("say ") {
                    log_dispatch(agent.dispatcher().on_chat_message(text, &world).map(|_| ()));
                    continue;
                }

                // Reloads read from disk; keep them off the world loop.
                let commands = agent.commands().clone();
                tokio::task::spawn_blocking(move || {
                    let reply = commands.execute(&line);
                    if !reply.ok {
                        tracing::warn!(command = %line, reply = %reply.message, "Command failed");
                    }
                });
            }
        }
    }

    agent.shutdown();
    applier.pump(&mut world);
    let stats = agent.join().await;

    println!();
    println!("Ticks: {}, notices: {}", world.tick(), world.notices());
    println!("{}", stats.summary());
    Ok(())
}

fn log_dispatch(result: std::result::Result<(), DispatchError>) {
    match result {
        Ok(()) | Err(DispatchError::ChannelDisabled(_)) => {}
        Err(e) => tracing::debug!(error = %e, "Event not dispatched"),
    }
}

fn predict(project_root: &Path, text: &str, json: bool) -> Result<()> {
    let config = load_config(project_root)?;
    let catalog = config.catalog()?;
    let models = ModelAdapter::load(Arc::new(ArtifactLoader), &config.model.path)?;

    let input = encode_message(text);
    let result = models.predict(&input);
    let action = match &result {
        Ok(id) => catalog.resolve(*id),
        Err(_) => ActionName::idle(),
    };

    if json {
        let output = serde_json::json!({
            "input": text,
            "backend": models.current().backend(),
            "action_id": result.as_ref().ok().map(|id| id.0),
            "action": action.as_str(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match result {
        Ok(id) => println!("{id} -> {action}"),
        Err(e) => println!("inference failed ({e}) -> {action}"),
    }
    Ok(())
}

fn show_status(project_root: &Path) -> Result<()> {
    let config = load_config(project_root)?;
    let catalog = config.catalog()?;

    println!("Reflex Agent Status");
    println!("===================");
    println!();
    println!("Project: {}", project_root.display());
    println!();
    match ModelAdapter::load(Arc::new(ArtifactLoader), &config.model.path) {
        Ok(models) => println!(
            "Model: {} ({})",
            config.model.path.display(),
            models.current().backend()
        ),
        Err(e) => println!("Model: unavailable - {e}"),
    }
    println!(
        "Dispatch: {} workers, queue {}, watch {}",
        config.dispatch.workers,
        config.dispatch.queue_capacity,
        if config.model.watch { "on" } else { "off" }
    );
    println!();
    println!("Actions: {}", catalog.len());
    for (id, name) in catalog.iter() {
        println!("  {:>3} {name}", id.0);
    }

    if let Some(log) = &config.decision_log {
        let recent = read_recent(log, 5);
        println!();
        println!("Recent decisions:");
        for record in &recent {
            println!(
                "  [{}] {} {} -> {}{}",
                record.timestamp.with_timezone(&Local).format("%H:%M:%S"),
                record.task_id,
                record.channel,
                record.action,
                record
                    .fallback
                    .as_deref()
                    .map(|reason| format!(" ({reason})"))
                    .unwrap_or_default()
            );
        }
    }

    Ok(())
}

fn init_project(project_root: &Path) -> Result<()> {
    let reflex_dir = project_root.join(".reflex");
    let models_dir = project_root.join("models");

    std::fs::create_dir_all(&reflex_dir)?;
    std::fs::create_dir_all(&models_dir)?;

    // Create default config
    let config_path = reflex_dir.join("config.yaml");
    if !config_path.exists() {
        let default_config = r#"# Reflex Agent Configuration

model:
  path: models/policy.json
  watch: true

actions:
  - { id: 0, name: attack }
  - { id: 1, name: defend }
  - { id: 2, name: move_north }
  - { id: 3, name: move_south }
  - { id: 4, name: move_east }
  - { id: 5, name: move_west }
  - { id: 6, name: idle }

dispatch:
  workers: 2
  queue_capacity: 64
  apply_capacity: 64

channels:
  chat: true
  tick: true
  movement: true
  death: true
  inventory: true

announce_idle: false
decision_log: .reflex/decisions.jsonl
"#;
        std::fs::write(&config_path, default_config)?;
    }

    // Create a starter model
    let model_path = models_dir.join("policy.json");
    if !model_path.exists() {
        let starter_model = r#"{
  "backend": "keyword",
  "rules": [
    { "pattern": "attack", "action": 0 },
    { "pattern": "defend", "action": 1 },
    { "pattern": "north", "action": 2 },
    { "pattern": "south", "action": 3 },
    { "pattern": "east", "action": 4 },
    { "pattern": "west", "action": 5 },
    { "pattern": "name=", "action": 0 }
  ],
  "default": 6
}
"#;
        std::fs::write(&model_path, starter_model)?;
    }

    println!("Initialized Reflex project at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .reflex/config.yaml - agent configuration");
    println!("  models/policy.json  - starter keyword model");
    println!();
    println!("Next steps:");
    println!("  1. Run: reflex predict attack the goblin");
    println!("  2. Run: reflex run --ticks 100");

    Ok(())
}
