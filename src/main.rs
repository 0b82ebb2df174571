//! Sentinel CLI
//!
//! Command-line entry point:
//! - `monitor`: run the liveness monitor and the dashboard API
//! - `agent`: run the simulated field agent against the telemetry table
//! - `status`: one-shot bootstrap from the table and print the derived state
//! - `config`: print a default configuration file
//!
//! # Configuration
//!
//! Settings come from `--config`, or the first of
//! `~/.config/sentinel/config.toml`, `/etc/sentinel/config.toml`,
//! `./config.toml`. `SENTINEL_*` environment variables override the file and
//! `RUST_LOG` overrides the configured log level.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sentinel::agent::Agent;
use sentinel::api::{self, dto::StatusResponse, AppState};
use sentinel::config::{generate_default_config, Config, LoggingConfig};
use sentinel::monitor::{LivenessMonitor, MonitorService};
use sentinel::source::{
    HistorySource, LiveSource, MemoryTable, PollingFeed, ReadingSink, RestTable,
};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Telemetry liveness monitor for remote IoT agents")]
#[command(long_about = "Sentinel watches a telemetry table and reports whether the field agent is offline, nominal or reporting an anomaly.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the liveness monitor and the dashboard API
    Monitor {
        /// Use an in-memory table fed by a simulated agent
        #[arg(long)]
        demo: bool,
    },

    /// Run the simulated agent against the configured table
    Agent {
        /// Stop after this many successful uploads
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Print the state derived from the table's recent history
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config generation must not depend on a readable config
    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Monitor { demo } => run_monitor(config, demo).await,
        Commands::Agent { count } => run_agent(config, count).await,
        Commands::Status { json } => print_status(config, json).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Initialize tracing from the logging config
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("sentinel={},tower_http=info", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_monitor(config: Config, demo: bool) -> anyhow::Result<()> {
    tracing::info!("Starting Sentinel v{}", env!("CARGO_PKG_VERSION"));

    let mut demo_agent = None;

    let (history, live): (Arc<dyn HistorySource>, Arc<dyn LiveSource>) =
        if demo || !config.table.is_configured() {
            if !demo {
                tracing::warn!("No table URL configured (set SENTINEL_TABLE_URL), running in demo mode");
            }
            let table = Arc::new(MemoryTable::new());
            let agent = Agent::new(config.agent.clone())?;
            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let sink = Arc::clone(&table) as Arc<dyn ReadingSink>;
            let task = tokio::spawn(agent.run(sink, None, async {
                let _ = stop_rx.await;
            }));
            demo_agent = Some((stop_tx, task));

            (Arc::clone(&table) as Arc<dyn HistorySource>, table as Arc<dyn LiveSource>)
        } else {
            tracing::info!(table = %config.table.name, "Using telemetry table at {}", config.table.url);
            let table = Arc::new(RestTable::new(config.table.clone())?);
            let feed = PollingFeed::new(Arc::clone(&table), config.table.poll_interval());
            (table as Arc<dyn HistorySource>, Arc::new(feed) as Arc<dyn LiveSource>)
        };

    let monitor = Arc::new(MonitorService::start(config.monitor.clone(), history, live));

    let state = AppState::new(Arc::clone(&monitor), config.api.clone());
    let served = api::serve(state, &config.api).await;

    tracing::info!("Stopping liveness monitor...");
    monitor.stop().await?;

    if let Some((stop_tx, task)) = demo_agent {
        let _ = stop_tx.send(());
        let stats = task.await?;
        tracing::info!(sent = stats.sent, anomalies = stats.anomalies, "Demo agent stopped");
    }

    served?;
    tracing::info!("Sentinel stopped");
    Ok(())
}

async fn run_agent(config: Config, count: Option<u64>) -> anyhow::Result<()> {
    if !config.table.is_configured() {
        bail!("No table URL configured (set SENTINEL_TABLE_URL or [table].url)");
    }

    let table = Arc::new(RestTable::new(config.table.clone())?);
    let agent = Agent::new(config.agent.clone())?;

    let stats = agent
        .run(table as Arc<dyn ReadingSink>, count, api::shutdown_signal())
        .await;

    println!(
        "Sent {} readings ({} anomalies, {} failed)",
        stats.sent, stats.anomalies, stats.failed
    );
    Ok(())
}

async fn print_status(config: Config, json: bool) -> anyhow::Result<()> {
    if !config.table.is_configured() {
        bail!("No table URL configured (set SENTINEL_TABLE_URL or [table].url)");
    }

    let table = RestTable::new(config.table.clone())?;
    let rows = table
        .fetch_recent(config.monitor.history_capacity)
        .await
        .context("Failed to fetch recent readings")?;

    let mut monitor =
        LivenessMonitor::new(config.monitor.timeout(), config.monitor.history_capacity);
    monitor.bootstrap(rows, chrono::Utc::now(), tokio::time::Instant::now());

    let snapshot = monitor.snapshot();
    let status = StatusResponse::from_snapshot(&snapshot);

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Status:      {}", status.label);
    if let (Some(temperature), Some(vibration)) = (&status.temperature, &status.vibration) {
        println!("Temperature: {} °C", temperature);
        println!("Vibration:   {} G", vibration);
    }
    match status.last_seen {
        Some(ts) => println!("Last seen:   {}", ts.to_rfc3339()),
        None => println!("Last seen:   never"),
    }
    println!("History:     {} readings", snapshot.history.len());
    Ok(())
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Config written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
