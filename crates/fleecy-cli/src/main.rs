//! fleecy: pick the VM of a participant cloud that should run a
//! federated-learning task.
//!
//! ```text
//! fleecy --config fleecy.toml select --participant p-1 --model-size 2000
//! fleecy utilizations --participant p-1 --format json
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "fleecy",
    about = "Fleecy: VM admission and placement for federated learning",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to fleecy.toml
    #[arg(short, long, global = true, default_value = "fleecy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the best VM for a task.
    ///
    /// Omitted or zero criteria fall back to [criteria] in the config file,
    /// then to the built-in defaults (1 vCPU, 512MB RAM, 5GB disk,
    /// ACTIVE, 70% CPU cap, 500MB model).
    Select {
        /// Participant id from the config file
        #[arg(short, long)]
        participant: String,
        /// Model size in MB
        #[arg(long)]
        model_size: Option<i64>,
        #[arg(long)]
        min_vcpus: Option<i64>,
        /// Minimum RAM in MB
        #[arg(long)]
        min_ram: Option<i64>,
        /// Minimum disk in GB
        #[arg(long)]
        min_disk: Option<i64>,
        /// CPU usage cap in percent
        #[arg(long)]
        max_cpu: Option<f64>,
        /// Required VM status
        #[arg(long)]
        status: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show current utilization of every VM
    Utilizations {
        #[arg(short, long)]
        participant: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Count VMs by status
    Stats {
        #[arg(short, long)]
        participant: String,
    },
    /// Validate the config file and print what it resolves to
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,fleecy=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Select {
            participant,
            model_size,
            min_vcpus,
            min_ram,
            min_disk,
            max_cpu,
            status,
            format,
        } => {
            let args = commands::select::SelectArgs {
                model_size,
                min_vcpus,
                min_ram,
                min_disk,
                max_cpu,
                status,
            };
            commands::select::select(&cli.config, &participant, &args, &format).await
        }
        Commands::Utilizations { participant, format } => {
            commands::inspect::utilizations(&cli.config, &participant, &format).await
        }
        Commands::Stats { participant } => commands::inspect::stats(&cli.config, &participant).await,
        Commands::CheckConfig => commands::inspect::check_config(&cli.config),
    }
}
