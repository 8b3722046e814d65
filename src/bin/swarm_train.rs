//! Swarm PPO command line
//!
//! Runs the drone swarm against the offline simulator, either as a short
//! smoke run with a fixed action or as a full PPO training run.
//!
//! # Usage
//!
//! ```bash
//! # Fly every drone forward for up to 50 ticks
//! cargo run --release -- smoke --ticks 50
//!
//! # Train with a config file and save the policy
//! cargo run --release -- --config swarm.toml train --checkpoint models/swarm.ot
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use swarm_ppo::{
    config::{AppConfig, Overrides},
    env::{AgentAction, AgentMap, MultiDroneEnv, ParallelEnvironment},
    sim::OfflineSimulator,
    train::TrainingLoop,
};

/// Multi-agent drone PPO
#[derive(Parser)]
#[command(name = "swarm-train")]
#[command(about = "Train a shared PPO policy for a drone swarm", long_about = None)]
struct Cli {
    /// TOML configuration with [env] and [train] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Random seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Step budget (agents x ticks)
    #[arg(long, global = true)]
    total_steps: Option<usize>,

    /// Ticks collected per agent before each update
    #[arg(long, global = true)]
    horizon: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Step the offline swarm with a fixed forward action
    Smoke {
        /// Maximum number of ticks
        #[arg(long, default_value_t = 10)]
        ticks: usize,

        /// Forward velocity command (m/s)
        #[arg(long, default_value_t = 1.0)]
        vx: f32,
    },

    /// Train the shared policy against the offline simulator
    Train {
        /// Save the trained policy here
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Write the run summary as JSON here
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let overrides = Overrides { seed: cli.seed, total_steps: cli.total_steps, horizon: cli.horizon };
    let config = AppConfig::load(cli.config.as_deref(), &overrides)?;

    let sim = OfflineSimulator::new(config.env.agent_names());
    let env = MultiDroneEnv::new(config.env.clone(), sim);

    match cli.command {
        Command::Smoke { ticks, vx } => smoke(env, ticks, vx),
        Command::Train { checkpoint, summary_json } => {
            let mut training = TrainingLoop::new(env, config.train)?;
            let summary = training.run()?;

            tracing::info!(
                "trained {} updates over {} steps, {} episodes",
                summary.updates,
                summary.total_steps,
                summary.episodes
            );

            if let Some(path) = checkpoint {
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir)?;
                }
                training.save_checkpoint(&path)?;
                tracing::info!("saved policy to {}", path.display());
            }
            if let Some(path) = summary_json {
                let json = serde_json::to_string_pretty(&summary)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write summary {}", path.display()))?;
            }
            Ok(())
        }
    }
}

fn smoke(mut env: MultiDroneEnv<OfflineSimulator>, ticks: usize, vx: f32) -> Result<()> {
    let (observations, _) = env.reset();
    tracing::info!("smoke run with {} agents", observations.len());

    let action = AgentAction::new(vx, 0.0, 0.0, 0.0);
    for tick in 1..=ticks {
        let actions: AgentMap<AgentAction> = env.agents().iter().map(|a| (a.clone(), action)).collect();
        let step = env.step(&actions);

        println!("tick {:>4}  reward sum {:>9.3}", tick, step.total_reward());

        let all_terminated = step.terminated.values().all(|&t| t);
        let all_truncated = step.truncated.values().all(|&t| t);
        if all_terminated || all_truncated {
            break;
        }
    }

    env.close();
    Ok(())
}
